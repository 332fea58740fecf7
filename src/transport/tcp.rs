//! JSON-over-TCP transport.
//!
//! Each call opens a fresh connection, writes one JSON-encoded [Request]
//! and reads one [Response] back. The server accepts connections and
//! answers any number of sequential requests per connection. Values are
//! framed by the JSON syntax itself: the reader feeds an accumulating
//! buffer to serde_json's streaming deserializer until a complete value
//! parses.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Transport;
use crate::error::Result;
use crate::node::Node;
use crate::rpc::{Request, Response};

/// The stock transport: one TCP connection per call, JSON on the wire.
#[derive(Debug, Default, Clone)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
	fn new() -> Self {
		TcpTransport
	}

	async fn invoke(&self, addr: &str, request: Request, timeout: Duration) -> Result<Response> {
		let exchange = async {
			let stream = TcpStream::connect(addr).await?;
			let mut stream = JsonStream::new(stream);
			stream.write(&request).await?;
			match stream.read::<Response>().await? {
				Some(response) => Ok(response),
				None => Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
			}
		};
		tokio::time::timeout(timeout, exchange).await?
	}

	async fn serve(node: Arc<Node<Self>>) -> Result<JoinHandle<()>> {
		let listener = TcpListener::bind(node.addr()).await?;
		info!(addr = node.addr(), "rpc server listening");
		let mut shutdown = node.shutdown_signal();
		let handle = tokio::spawn(async move {
			loop {
				tokio::select! {
					accepted = listener.accept() => {
						match accepted {
							Ok((stream, peer)) => {
								let node = node.clone();
								tokio::spawn(async move {
									if let Err(err) = serve_connection(node, stream).await {
										debug!(%peer, %err, "connection closed");
									}
								});
							}
							Err(err) => warn!(%err, "accept failed"),
						}
					}
					_ = shutdown.changed() => break,
				}
			}
			debug!("rpc server stopped");
		});
		Ok(handle)
	}
}

async fn serve_connection(node: Arc<Node<TcpTransport>>, stream: TcpStream) -> Result<()> {
	let mut stream = JsonStream::new(stream);
	while let Some(request) = stream.read::<Request>().await? {
		let response = node.dispatch(request).await;
		stream.write(&response).await?;
	}
	Ok(())
}

/// A TCP stream that reads and writes whole serde_json values.
struct JsonStream {
	stream: TcpStream,
	buffer: Vec<u8>,
}

impl JsonStream {
	fn new(stream: TcpStream) -> Self {
		JsonStream {
			stream,
			buffer: Vec::new(),
		}
	}

	/// Reads the next value, or `None` if the peer closed the stream at
	/// a value boundary.
	async fn read<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
		loop {
			// Attempt to deserialize what the buffer already holds.
			let mut values = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<T>();
			match values.next() {
				Some(Ok(value)) => {
					let consumed = values.byte_offset();
					drop(values);
					self.buffer.drain(..consumed);
					return Ok(Some(value));
				}
				// A prefix of a valid value; more bytes may arrive.
				Some(Err(err)) if err.is_eof() => {}
				Some(Err(err)) => return Err(err.into()),
				None => {}
			}

			let mut chunk = vec![0u8; 1024];
			match self.stream.read(&mut chunk).await? {
				0 => {
					if self.buffer.is_empty() {
						return Ok(None);
					}
					return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
				}
				n => self.buffer.extend_from_slice(&chunk[..n]),
			}
		}
	}

	async fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
		let raw = serde_json::to_vec(value)?;
		self.stream.write_all(&raw).await?;
		self.stream.flush().await?;
		Ok(())
	}
}
