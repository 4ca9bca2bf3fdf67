//! Opening transports to a kernel host.

use std::future::Future;
use std::pin::Pin;

use nb_protocol::SessionId;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{TransportParts, WebSocketTransport};

/// Opens a fresh transport for one connection attempt.
///
/// Implementations must not cache transports: every call is a new attempt.
pub trait Connector: Send + Sync {
	fn connect<'a>(&'a self, session_id: Option<&'a SessionId>) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>>;

	/// Human-readable endpoint, used for logging and as the identity-store key.
	fn endpoint(&self) -> &str;
}

/// Connects to a kernel host over WebSocket.
///
/// The session id (when known) is passed as a `session_id` query parameter in
/// addition to the `hello` message. Fragments are dropped; they never reach
/// the server.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
	endpoint: String,
	url: Url,
}

impl WebSocketConnector {
	pub fn new(url: impl Into<String>) -> Result<Self> {
		let endpoint = url.into();
		let mut url = Url::parse(&endpoint).map_err(|e| Error::InvalidArgument(format!("invalid kernel URL '{endpoint}': {e}")))?;
		if !matches!(url.scheme(), "ws" | "wss") {
			return Err(Error::InvalidArgument(format!("kernel URL must use ws:// or wss://, got '{endpoint}'")));
		}
		url.set_fragment(None);
		Ok(Self { endpoint, url })
	}

	/// URL for an attempt addressed by `session_id`.
	pub fn attempt_url(&self, session_id: Option<&SessionId>) -> Url {
		let mut url = self.url.clone();
		if let Some(id) = session_id {
			url.query_pairs_mut().append_pair("session_id", id.as_str());
		}
		url
	}
}

impl Connector for WebSocketConnector {
	fn connect<'a>(&'a self, session_id: Option<&'a SessionId>) -> Pin<Box<dyn Future<Output = Result<TransportParts>> + Send + 'a>> {
		Box::pin(async move {
			let url = self.attempt_url(session_id);
			WebSocketTransport::connect(url.as_str()).await
		})
	}

	fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_non_websocket_urls() {
		let err = WebSocketConnector::new("http://localhost:2718").unwrap_err();
		assert!(err.to_string().contains("ws://"));
	}

	#[test]
	fn attempt_url_without_session_is_base_url() {
		let connector = WebSocketConnector::new("ws://localhost:2718/ws").unwrap();
		assert_eq!(connector.attempt_url(None).as_str(), "ws://localhost:2718/ws");
	}

	#[test]
	fn attempt_url_appends_encoded_session_id() {
		let connector = WebSocketConnector::new("ws://localhost:2718/ws?file=a.py").unwrap();
		let url = connector.attempt_url(Some(&SessionId::new("s 1/2")));
		assert_eq!(url.as_str(), "ws://localhost:2718/ws?file=a.py&session_id=s+1%2F2");
		assert_eq!(url.query_pairs().find(|(k, _)| k == "session_id").map(|(_, v)| v.into_owned()).as_deref(), Some("s 1/2"));
	}

	#[test]
	fn session_query_never_lands_in_fragment() {
		let connector = WebSocketConnector::new("ws://localhost:2718/ws#nb").unwrap();
		let url = connector.attempt_url(Some(&SessionId::new("s-1")));
		assert_eq!(url.as_str(), "ws://localhost:2718/ws?session_id=s-1");
		assert_eq!(url.fragment(), None);
		assert_eq!(connector.endpoint(), "ws://localhost:2718/ws#nb");
	}

	#[test]
	fn rejects_unparseable_urls() {
		assert!(WebSocketConnector::new("not a url").is_err());
	}
}
