//! `nb` command line: a terminal front end for notebook kernel sessions.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod frontend;
pub mod logging;
pub mod repl;
pub mod styles;
