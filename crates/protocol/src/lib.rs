//! Wire types for the notebook kernel session protocol.
//!
//! This crate contains the serde-serializable types exchanged between a
//! notebook client and the process hosting its kernel. They describe the
//! session envelope only: handshakes, lifecycle events, control commands and
//! save acknowledgements. Cell payloads stay opaque JSON.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **Closed**: Every message family is a tagged enum matched exhaustively
//! - **Stable**: Changes only when the wire protocol changes
//!
//! Connection handling lives in `nb-runtime`, session semantics in `nb-session`.

pub mod messages;
pub mod notebook;
pub mod session;

pub use messages::*;
pub use notebook::*;
pub use session::*;
