//! Notebook kernel session client.
//!
//! This crate sits between a notebook front end and the kernel host
//! connection provided by `nb-runtime`:
//!
//! - [`SessionController`]: reacts to lifecycle events (resumed, restarted,
//!   shutdown, not found) and user requests, emitting [`Effect`]s
//! - [`UnsavedChangesGuard`]: dirty tracking and the check before destructive
//!   transitions
//! - [`Confirmations`]: two-step confirm/cancel for restart, shutdown and
//!   "download unsaved changes"
//! - [`NotebookClient`]: async loop wiring the controller to a connection and
//!   a [`Frontend`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use nb::{ClientOptions, NotebookClient, UserAction};
//! use nb_runtime::{FileIdentityStore, WebSocketConnector};
//!
//! let connector = Arc::new(WebSocketConnector::new("ws://localhost:2718/ws")?);
//! let store = Arc::new(FileIdentityStore::at_default_location("ws://localhost:2718/ws"));
//! let client = NotebookClient::start(connector, store, ClientOptions::default(), my_frontend);
//! client.send(UserAction::Save)?;
//! ```

pub mod client;
pub mod confirm;
pub mod controller;
pub mod document;
pub mod error;
pub mod export;
pub mod guard;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{ClientOptions, Frontend, NotebookClient, UserAction, UserActions};
pub use confirm::{Confirmation, ConfirmationId, ConfirmationKind, Confirmations};
pub use controller::{ControllerOptions, Effect, Notice, NoticeLevel, Session, SessionController, SessionState, SessionStatus, TieBreak};
pub use document::{CellRequest, Notebook, render_output};
pub use error::{Result, SessionError};
pub use export::{ExportFormat, write_export};
pub use guard::{SaveTicket, Transition, UnsavedChangesGuard};
