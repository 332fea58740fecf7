//! The Chord node: ring state behind one lock, operations on top of it,
//! and the background maintenance that keeps the ring converged.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::ring::{NodeRef, Ring};
use crate::rpc::{Request, Response};
use crate::storage::MemStorage;
use crate::transport::Transport;

mod maintenance;
mod ops;

/// Everything mutable about a node, guarded by a single mutex.
///
/// The lock is never held across an RPC: operations snapshot what they
/// need, release, talk to peers, then re-acquire to write results back.
struct NodeState {
	/// False until `create` or `join` succeeds, false again after shutdown.
	active: bool,
	predecessor: Option<NodeRef>,
	/// Entry `i` is believed to be the successor of `self.id + 2^i`.
	/// Entry 0 is the node's successor.
	fingers: Vec<NodeRef>,
	/// Rolling cursor for fix_fingers.
	next_finger: usize,
	store: MemStorage,
}

/// One Chord node, generic over the RPC transport that carries its calls.
pub struct Node<T: Transport> {
	addr: String,
	id: u64,
	ring: Ring,
	config: NodeConfig,
	transport: T,
	state: Mutex<NodeState>,
	shutdown: watch::Sender<bool>,
}

impl<T: Transport> Node<T> {
	/// Boots a node on `addr`: binds the RPC server and spawns the
	/// maintenance tasks. The node is idle until [create](Node::create)
	/// or [join](Node::join) puts it on a ring.
	pub async fn start(addr: String, config: NodeConfig) -> Result<NodeHandle<T>> {
		config.validate()?;
		let ring = Ring::new(config.m);
		let id = ring.hash(&addr);
		let me = NodeRef {
			addr: addr.clone(),
			id,
		};
		let (shutdown, _) = watch::channel(false);
		let node = Arc::new(Node {
			addr,
			id,
			ring,
			transport: T::new(),
			state: Mutex::new(NodeState {
				active: false,
				predecessor: None,
				fingers: vec![me; config.m as usize],
				next_finger: 0,
				store: MemStorage::new(),
			}),
			config,
			shutdown,
		});
		let server = T::serve(node.clone()).await?;
		let maintenance = maintenance::spawn(&node);
		info!(addr = node.addr(), id = node.id, "node started");
		Ok(NodeHandle {
			node,
			server,
			maintenance,
		})
	}

	/// The address this node's RPC server is bound to.
	pub fn addr(&self) -> &str {
		&self.addr
	}

	/// This node's position on the ring.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// The identifier space this node lives in.
	pub fn ring(&self) -> &Ring {
		&self.ring
	}

	/// A receiver that resolves when the node shuts down. Transports
	/// select on this to stop accepting.
	pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
		self.shutdown.subscribe()
	}

	/// Stops the node: maintenance loops exit at their next tick and the
	/// RPC server stops accepting. Stored keys are not handed off.
	pub fn shutdown(&self) -> Result<()> {
		info!(addr = self.addr(), "shutting down");
		self.state()?.active = false;
		let _ = self.shutdown.send(true);
		Ok(())
	}

	/// Routes one inbound request to the matching operation, folding any
	/// failure into [Response::Error].
	pub async fn dispatch(&self, request: Request) -> Response {
		match self.handle(request).await {
			Ok(response) => response,
			Err(err) => Response::Error {
				message: err.to_string(),
			},
		}
	}

	async fn handle(&self, request: Request) -> Result<Response> {
		match request {
			Request::GetSuccessor => Ok(Response::Successor {
				node: self.successor()?,
			}),
			Request::GetPredecessor => Ok(Response::Predecessor {
				node: self.predecessor()?,
			}),
			Request::FindSuccessor { id } => {
				let (node, hops) = self.find_successor(id).await?;
				Ok(Response::FoundSuccessor { node, hops })
			}
			Request::ClosestPrecedingFinger { id } => Ok(Response::PrecedingFinger {
				node: self.closest_preceding_finger(id)?,
			}),
			Request::Notify { candidate } => {
				self.notify(candidate).await?;
				Ok(Response::Done)
			}
			Request::Create => {
				self.create()?;
				Ok(Response::Done)
			}
			Request::Join { known } => {
				self.join(&known).await?;
				Ok(Response::Done)
			}
			Request::GetLocal { key } => {
				let value = self.get_local(&key)?;
				Ok(Response::Local {
					found: value.is_some(),
					value,
				})
			}
			Request::PutLocal { key, value } => {
				self.put_local(key, value)?;
				Ok(Response::Done)
			}
			Request::Get { key } => {
				let (node, hops, value) = self.get(&key).await?;
				Ok(Response::GetResult {
					node,
					hops,
					found: value.is_some(),
					value,
				})
			}
			Request::Put { key, value } => {
				let (node, hops) = self.put(key, value).await?;
				Ok(Response::PutResult { node, hops })
			}
			Request::Shutdown => {
				self.shutdown()?;
				Ok(Response::Done)
			}
			Request::Ping => Ok(Response::Pong),
		}
	}

	fn state(&self) -> Result<MutexGuard<'_, NodeState>> {
		self.state.lock().map_err(|_| Error::StateLockPoisoned)
	}

	fn self_ref(&self) -> NodeRef {
		NodeRef {
			addr: self.addr.clone(),
			id: self.id,
		}
	}

	// --- outbound calls -------------------------------------------------
	//
	// Thin typed wrappers over Transport::invoke. Every NodeRef decoded
	// from a peer passes through check_ref before it is trusted with
	// routing decisions.

	async fn call(&self, addr: &str, request: Request) -> Result<Response> {
		match self
			.transport
			.invoke(addr, request, self.config.rpc_timeout)
			.await?
		{
			Response::Error { message } => Err(Error::Remote(message)),
			response => Ok(response),
		}
	}

	fn check_ref(&self, node: NodeRef) -> Result<NodeRef> {
		if !self.ring.contains(node.id) {
			return Err(Error::RingSizeMismatch { id: node.id });
		}
		Ok(node)
	}

	async fn rpc_find_successor(&self, addr: &str, id: u64) -> Result<(NodeRef, u32)> {
		match self.call(addr, Request::FindSuccessor { id }).await? {
			Response::FoundSuccessor { node, hops } => Ok((self.check_ref(node)?, hops)),
			_ => Err(Error::UnexpectedResponse),
		}
	}

	async fn rpc_get_predecessor(&self, addr: &str) -> Result<Option<NodeRef>> {
		match self.call(addr, Request::GetPredecessor).await? {
			Response::Predecessor { node } => node.map(|n| self.check_ref(n)).transpose(),
			_ => Err(Error::UnexpectedResponse),
		}
	}

	async fn rpc_notify(&self, addr: &str, candidate: NodeRef) -> Result<()> {
		match self.call(addr, Request::Notify { candidate }).await? {
			Response::Done => Ok(()),
			_ => Err(Error::UnexpectedResponse),
		}
	}

	async fn rpc_get_local(&self, addr: &str, key: &str) -> Result<Option<String>> {
		if addr == self.addr {
			return self.get_local(key);
		}
		let request = Request::GetLocal {
			key: key.to_string(),
		};
		match self.call(addr, request).await? {
			Response::Local { value, .. } => Ok(value),
			_ => Err(Error::UnexpectedResponse),
		}
	}

	async fn rpc_put_local(&self, addr: &str, key: String, value: String) -> Result<()> {
		if addr == self.addr {
			return self.put_local(key, value);
		}
		match self.call(addr, Request::PutLocal { key, value }).await? {
			Response::Done => Ok(()),
			_ => Err(Error::UnexpectedResponse),
		}
	}

	async fn rpc_ping(&self, addr: &str) -> Result<()> {
		match self.call(addr, Request::Ping).await? {
			Response::Pong => Ok(()),
			_ => Err(Error::UnexpectedResponse),
		}
	}
}

/// A started node plus the tasks that animate it.
///
/// Dropping the handle detaches the tasks; use [stop](NodeHandle::stop)
/// or [wait](NodeHandle::wait) for an orderly end.
pub struct NodeHandle<T: Transport> {
	node: Arc<Node<T>>,
	server: JoinHandle<()>,
	maintenance: Vec<JoinHandle<()>>,
}

impl<T: Transport> NodeHandle<T> {
	/// The node itself, for in-process calls.
	pub fn node(&self) -> &Arc<Node<T>> {
		&self.node
	}

	/// Signals shutdown and waits for the server and maintenance tasks
	/// to finish.
	pub async fn stop(self) -> Result<()> {
		self.node.shutdown()?;
		self.wait().await;
		Ok(())
	}

	/// Waits until the node shuts down, either via
	/// [shutdown](Node::shutdown) locally or a `shutdown` RPC.
	pub async fn wait(self) {
		let _ = self.server.await;
		for task in self.maintenance {
			let _ = task.await;
		}
	}
}
