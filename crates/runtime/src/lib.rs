//! Notebook kernel runtime: transports, connection lifecycle, and identity
//!
//! This crate provides everything below the notebook session layer:
//!
//! - **Transport**: bidirectional JSON messaging over pipes or WebSocket
//! - **Channel**: a live transport plus the `hello`/`welcome` handshake
//! - **Connection**: state machine and driver for connect, reconnect and
//!   kernel-not-found, with a bounded backoff policy
//! - **Identity**: where the active session id is remembered between runs
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  nb-session  │  Session controller, unsaved-changes guard
//! └──────┬───────┘
//!        │ ConnectionCommand / ConnectionEvent
//! ┌──────▼───────┐
//! │  nb-runtime  │  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  State machine + backoff
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Chan   │  │  Handshake, typed messages
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Pipe/WebSocket transport
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod backoff;
pub mod channel;
pub mod connection;
pub mod connector;
pub mod error;
pub mod identity;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use channel::Channel;
pub use connection::{
	AttemptOutcome, CloseReason, Connection, ConnectionAttempt, ConnectionCommand, ConnectionCommands, ConnectionEvent, ConnectionHandle, ConnectionMachine,
	ConnectionOptions, ConnectionState,
};
pub use connector::{Connector, WebSocketConnector};
pub use error::{Error, FailureKind, Result};
pub use identity::{FileIdentityStore, MemoryIdentityStore, SessionIdentityStore, default_identity_path};
pub use transport::{
	PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts, TransportReceiver, WebSocketTransport, WebSocketTransportReceiver,
	WebSocketTransportSender,
};
