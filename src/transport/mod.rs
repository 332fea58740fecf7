//! Transports carry the RPC surface between nodes.
//!
//! The node logic is generic over [Transport]: anything that can issue a
//! request to an address and serve inbound requests against a node can
//! carry a ring. One production implementation ships,
//! [tcp::TcpTransport].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::node::Node;
use crate::rpc::{Request, Response};

pub mod tcp;
pub use tcp::TcpTransport;

/// A request/response codec plus a server binding.
#[async_trait]
pub trait Transport: Send + Sync + Sized + 'static {
	/// A fresh transport instance.
	fn new() -> Self;

	/// Issues one request to the node listening at `addr`.
	///
	/// The whole exchange, connection setup included, is bounded by
	/// `timeout`; an elapsed timeout is a failure like any other and the
	/// peer is treated as possibly dead.
	async fn invoke(&self, addr: &str, request: Request, timeout: Duration) -> Result<Response>;

	/// Binds the node's address and serves inbound requests against it
	/// until the node shuts down.
	///
	/// Resolves once the listener is bound, so callers see bind errors;
	/// the returned handle drives the accept loop.
	async fn serve(node: Arc<Node<Self>>) -> Result<JoinHandle<()>>;
}
