//! Message transports between the client and a kernel host.
//!
//! Two transports are provided:
//!
//! - [`PipeTransport`]: length-prefixed JSON over any async byte stream
//!   (stdio of a local kernel bridge, in-memory pipes in tests)
//! - [`WebSocketTransport`]: one JSON document per text frame
//!
//! Both are split into a send half ([`Transport`]) and a read loop
//! ([`TransportReceiver`]) that pushes decoded messages into an unbounded
//! channel, preserving arrival order.
//!
//! # Pipe framing
//!
//! `[length: u32 little-endian][JSON bytes]`

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::{Error, Result};


/// Upper bound for a single framed message.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Send half of a transport.
pub trait Transport: Send {
	/// Sends one JSON message.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Read half of a transport.
pub trait TransportReceiver: Send {
	/// Reads messages until the stream ends or the consumer goes away.
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// A transport split into its halves, plus the channel the read loop feeds.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Length-prefixed JSON transport over a pair of byte streams.
pub struct PipeTransport<W, R> {
	writer: W,
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport writing to `writer` and reading from `reader`.
	///
	/// Returns the transport and the receiver its read loop feeds.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				writer,
				reader,
				message_tx,
			},
			message_rx,
		)
	}

	/// Sends one framed message.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		write_frame(&mut self.writer, &message).await
	}

	/// Runs the read loop until EOF or until the receiver is dropped.
	pub async fn run(&mut self) -> Result<()> {
		read_frames(&mut self.reader, &self.message_tx).await
	}

	/// Splits into independently owned send and receive halves.
	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(
			PipeTransportSender { writer: self.writer },
			PipeTransportReceiver {
				reader: self.reader,
				message_tx: self.message_tx,
			},
		)
	}

	/// Boxes both halves together with the receiver returned by [`PipeTransport::new`].
	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}
}

/// Send half of a [`PipeTransport`].
pub struct PipeTransportSender<W> {
	writer: W,
}

impl<W> PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	pub async fn send(&mut self, message: Value) -> Result<()> {
		write_frame(&mut self.writer, &message).await
	}
}

impl<W> Transport for PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { write_frame(&mut self.writer, &message).await })
	}
}

/// Read half of a [`PipeTransport`].
pub struct PipeTransportReceiver<R> {
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R> TransportReceiver for PipeTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let PipeTransportReceiver { mut reader, message_tx } = *self;
			read_frames(&mut reader, &message_tx).await
		})
	}
}

async fn write_frame<W>(writer: &mut W, message: &Value) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	let bytes = serde_json::to_vec(message)?;
	if bytes.len() > MAX_FRAME_LEN {
		return Err(Error::ProtocolError(format!("Message too large: {} bytes", bytes.len())));
	}
	let length = bytes.len() as u32;

	writer
		.write_all(&length.to_le_bytes())
		.await
		.map_err(|e| Error::TransportError(format!("Failed to write length prefix: {e}")))?;
	writer
		.write_all(&bytes)
		.await
		.map_err(|e| Error::TransportError(format!("Failed to write message body: {e}")))?;
	writer
		.flush()
		.await
		.map_err(|e| Error::TransportError(format!("Failed to flush: {e}")))?;
	Ok(())
}

async fn read_frames<R>(reader: &mut R, message_tx: &mpsc::UnboundedSender<Value>) -> Result<()>
where
	R: AsyncRead + Unpin,
{
	loop {
		let mut len_buf = [0u8; 4];
		reader
			.read_exact(&mut len_buf)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;
		let length = u32::from_le_bytes(len_buf) as usize;
		if length > MAX_FRAME_LEN {
			return Err(Error::ProtocolError(format!("Frame length {length} exceeds limit")));
		}

		let mut body = vec![0u8; length];
		reader
			.read_exact(&mut body)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read message body: {e}")))?;

		let message: Value = serde_json::from_slice(&body)?;
		if message_tx.send(message).is_err() {
			tracing::debug!(target = "nb.transport", "message receiver dropped, stopping pipe reader");
			return Ok(());
		}
	}
}

/// JSON-over-WebSocket transport.
pub struct WebSocketTransport;

impl WebSocketTransport {
	/// Connects to `url` and returns the split transport.
	pub async fn connect(url: &str) -> Result<TransportParts> {
		let (stream, _response) = tokio_tungstenite::connect_async(url)
			.await
			.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
		tracing::debug!(target = "nb.transport", url, "websocket connected");
		Ok(Self::from_stream(stream))
	}

	/// Wraps an already established WebSocket stream.
	pub fn from_stream<S>(stream: WebSocketStream<S>) -> TransportParts
	where
		S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
	{
		let (sink, source) = stream.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		TransportParts {
			sender: Box::new(WebSocketTransportSender { sink }),
			receiver: Box::new(WebSocketTransportReceiver { source, message_tx }),
			message_rx,
		}
	}
}

/// Send half of a [`WebSocketTransport`].
pub struct WebSocketTransportSender<S> {
	sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

impl<S> Transport for WebSocketTransportSender<S>
where
	S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink.send(WsMessage::Text(text)).await?;
			Ok(())
		})
	}
}

/// Read half of a [`WebSocketTransport`].
pub struct WebSocketTransportReceiver<S> {
	source: SplitStream<WebSocketStream<S>>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<S> TransportReceiver for WebSocketTransportReceiver<S>
where
	S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			let WebSocketTransportReceiver { mut source, message_tx } = *self;
			while let Some(frame) = source.next().await {
				let message: Value = match frame? {
					WsMessage::Text(text) => serde_json::from_str(&text)?,
					WsMessage::Binary(bytes) => serde_json::from_slice(&bytes)?,
					WsMessage::Close(frame) => {
						tracing::debug!(target = "nb.transport", ?frame, "websocket closed by peer");
						return Ok(());
					}
					WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
				};
				if message_tx.send(message).is_err() {
					return Ok(());
				}
			}
			Ok(())
		})
	}
}
