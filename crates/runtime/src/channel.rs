//! Channel - one connection attempt's ordered message stream.
//!
//! A [`Channel`] owns the reader and writer tasks of a transport and exposes
//! typed [`ClientMessage`]/[`ServerMessage`] traffic. It remembers the session
//! id it was opened with and is dropped when its attempt ends, so it never
//! outlives a single connection.

use nb_protocol::{ClientMessage, HandshakeOutcome, ServerMessage, SessionId};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

pub struct Channel {
	session_id: Option<SessionId>,
	outbound_tx: mpsc::UnboundedSender<Value>,
	message_rx: mpsc::UnboundedReceiver<Value>,
	reader: JoinHandle<()>,
	writer: JoinHandle<()>,
}

impl Channel {
	/// Starts the transport tasks for a connection addressed by `session_id`.
	pub fn open(parts: TransportParts, session_id: Option<SessionId>) -> Self {
		let TransportParts {
			mut sender,
			receiver,
			message_rx,
		} = parts;
		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Value>();

		let reader = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::debug!(target = "nb.channel", error = %e, "transport read loop ended");
			}
		});

		let writer = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::debug!(target = "nb.channel", error = %e, "transport write failed");
					break;
				}
			}
		});

		Self {
			session_id,
			outbound_tx,
			message_rx,
			reader,
			writer,
		}
	}

	/// Session id this channel was opened with (absent for a new-session request).
	pub fn session_id(&self) -> Option<&SessionId> {
		self.session_id.as_ref()
	}

	/// Queues a message for the writer task.
	pub fn send(&self, message: &ClientMessage) -> Result<()> {
		let value = serde_json::to_value(message)?;
		self.outbound_tx.send(value).map_err(|_| Error::ChannelClosed)
	}

	/// Receives the next server message, or `None` once the stream has ended.
	///
	/// Frames that do not decode as a [`ServerMessage`] are logged and skipped.
	pub async fn recv(&mut self) -> Option<ServerMessage> {
		while let Some(value) = self.message_rx.recv().await {
			match serde_json::from_value::<ServerMessage>(value) {
				Ok(message) => return Some(message),
				Err(e) => tracing::warn!(target = "nb.channel", error = %e, "skipping undecodable server message"),
			}
		}
		None
	}

	/// Sends `hello` and waits for the `welcome` response.
	///
	/// Messages arriving before the welcome are discarded; the caller bounds
	/// the wait with its handshake timeout.
	pub async fn handshake(&mut self) -> Result<HandshakeOutcome> {
		self.send(&ClientMessage::hello(self.session_id.clone()))?;
		loop {
			match self.recv().await {
				Some(ServerMessage::Welcome { outcome }) => return Ok(outcome),
				Some(other) => {
					tracing::debug!(target = "nb.channel", message = ?other, "ignoring message before welcome");
				}
				None => return Err(Error::ConnectionFailed("channel closed during handshake".into())),
			}
		}
	}
}

impl Drop for Channel {
	fn drop(&mut self) {
		self.reader.abort();
		self.writer.abort();
	}
}

#[cfg(test)]
mod tests {
	use nb_protocol::{KernelLifecycleEvent, SessionId};
	use tokio::io::duplex;

	use super::*;
	use crate::transport::{PipeTransport, PipeTransportSender, TransportReceiver};

	struct KernelEnd {
		sender: PipeTransportSender<tokio::io::DuplexStream>,
		rx: mpsc::UnboundedReceiver<Value>,
	}

	impl KernelEnd {
		async fn send(&mut self, message: ServerMessage) {
			self.sender.send(serde_json::to_value(message).unwrap()).await.unwrap();
		}

		async fn recv(&mut self) -> ClientMessage {
			serde_json::from_value(self.rx.recv().await.unwrap()).unwrap()
		}
	}

	fn channel_pair(session_id: Option<SessionId>) -> (Channel, KernelEnd) {
		let (client_write, kernel_read) = duplex(4096);
		let (kernel_write, client_read) = duplex(4096);

		let (client, client_rx) = PipeTransport::new(client_write, client_read);
		let channel = Channel::open(client.into_transport_parts(client_rx), session_id);

		let (kernel, kernel_rx) = PipeTransport::new(kernel_write, kernel_read);
		let (sender, receiver) = kernel.into_parts();
		tokio::spawn(async move {
			let _ = Box::new(receiver).run().await;
		});
		(channel, KernelEnd { sender, rx: kernel_rx })
	}

	#[tokio::test]
	async fn handshake_sends_hello_with_session_id() {
		let (mut channel, mut kernel) = channel_pair(Some(SessionId::new("s-9")));

		let kernel_task = tokio::spawn(async move {
			let hello = kernel.recv().await;
			kernel
				.send(ServerMessage::Welcome {
					outcome: HandshakeOutcome::Resumed {
						session_id: SessionId::new("s-9"),
						snapshot: None,
					},
				})
				.await;
			(hello, kernel)
		});

		let outcome = channel.handshake().await.unwrap();
		let (hello, _kernel) = kernel_task.await.unwrap();

		assert_eq!(hello, ClientMessage::hello(Some(SessionId::new("s-9"))));
		assert!(matches!(outcome, HandshakeOutcome::Resumed { .. }));
	}

	#[tokio::test]
	async fn handshake_skips_messages_before_welcome() {
		let (mut channel, mut kernel) = channel_pair(None);

		kernel
			.send(ServerMessage::Lifecycle {
				event: KernelLifecycleEvent::Restarted,
			})
			.await;
		kernel
			.send(ServerMessage::Welcome {
				outcome: HandshakeOutcome::Created {
					session_id: SessionId::new("fresh"),
				},
			})
			.await;

		let outcome = channel.handshake().await.unwrap();
		assert_eq!(outcome.session_id().as_str(), "fresh");
	}

	#[tokio::test]
	async fn handshake_fails_when_kernel_hangs_up() {
		let (mut channel, kernel) = channel_pair(None);
		drop(kernel);

		let err = channel.handshake().await.unwrap_err();
		assert!(matches!(err, Error::ConnectionFailed(_) | Error::ChannelClosed), "unexpected error: {err}");
	}

	#[tokio::test]
	async fn undecodable_messages_are_skipped() {
		let (mut channel, mut kernel) = channel_pair(None);

		kernel.sender.send(serde_json::json!({"type": "bogus"})).await.unwrap();
		kernel
			.send(ServerMessage::Lifecycle {
				event: KernelLifecycleEvent::Shutdown,
			})
			.await;

		assert_eq!(
			channel.recv().await,
			Some(ServerMessage::Lifecycle {
				event: KernelLifecycleEvent::Shutdown,
			})
		);
	}
}
