//! Wire messages for the RPC surface.
//!
//! Every method a peer can invoke is one [Request] variant with a matching
//! [Response] variant. Node-level failures cross the wire as
//! [Response::Error] and surface on the caller as
//! [Error::Remote](crate::Error::Remote).

use serde::{Deserialize, Serialize};

use crate::ring::NodeRef;

/// A single inbound call to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
	/// Current successor (finger 0).
	GetSuccessor,
	/// Current predecessor, if any.
	GetPredecessor,
	/// Resolve the successor of `id`, recursively.
	FindSuccessor {
		/// Ring position to resolve; reduced mod `2^m` by the receiver.
		id: u64,
	},
	/// Closest finger preceding `id`, local table only.
	ClosestPrecedingFinger {
		/// Ring position being routed towards.
		id: u64,
	},
	/// The sender believes it may be the receiver's predecessor.
	Notify {
		/// The sender. The receiver recomputes the id from the address.
		candidate: NodeRef,
	},
	/// Become the sole member of a fresh ring.
	Create,
	/// Join the ring that the node at `known` participates in.
	Join {
		/// `"host:port"` of any ring member. The receiver derives the
		/// rest of the reference itself, so callers need not know `m`.
		known: String,
	},
	/// Read a key from the receiver's local store, no routing.
	GetLocal {
		/// Key to read.
		key: String,
	},
	/// Write a binding into the receiver's local store, no routing.
	PutLocal {
		/// Key to write.
		key: String,
		/// Value to bind.
		value: String,
	},
	/// Read a key from whichever node owns it, routing as needed.
	Get {
		/// Key to read.
		key: String,
	},
	/// Store a binding on whichever node owns the key, routing as needed.
	Put {
		/// Key to write.
		key: String,
		/// Value to bind.
		value: String,
	},
	/// Stop the node: maintenance halts and the listener closes.
	Shutdown,
	/// Liveness probe.
	Ping,
}

/// The answer to one [Request].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
	/// Answer to [Request::GetSuccessor].
	Successor {
		/// The receiver's successor.
		node: NodeRef,
	},
	/// Answer to [Request::GetPredecessor].
	Predecessor {
		/// The receiver's predecessor, unset right after create/join or
		/// after a failed liveness check.
		node: Option<NodeRef>,
	},
	/// Answer to [Request::FindSuccessor].
	FoundSuccessor {
		/// The node believed responsible for the requested id.
		node: NodeRef,
		/// Nodes visited to resolve the lookup.
		hops: u32,
	},
	/// Answer to [Request::ClosestPrecedingFinger].
	PrecedingFinger {
		/// Best local candidate, possibly the receiver itself.
		node: NodeRef,
	},
	/// Answer to [Request::GetLocal].
	Local {
		/// The bound value, if present.
		value: Option<String>,
		/// Whether the key was present.
		found: bool,
	},
	/// Answer to [Request::Get].
	GetResult {
		/// Node that owns the key.
		node: NodeRef,
		/// Nodes visited to resolve the lookup.
		hops: u32,
		/// The bound value, if present.
		value: Option<String>,
		/// Whether the key was present on the owner.
		found: bool,
	},
	/// Answer to [Request::Put].
	PutResult {
		/// Node the binding was stored on.
		node: NodeRef,
		/// Nodes visited to resolve the lookup.
		hops: u32,
	},
	/// Acknowledgement for requests with no payload to return.
	Done,
	/// Answer to [Request::Ping].
	Pong,
	/// The receiver processed the request and rejected it.
	Error {
		/// Human-readable failure description.
		message: String,
	},
}
