//! Error types shared across the crate.

/// A `Result` alias carrying [enum@Error].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by node operations and the RPC transport.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// Transport-level I/O failure (connect, read, write).
	#[error("transport i/o error: {0}")]
	Io(#[from] std::io::Error),

	/// A wire message could not be encoded or decoded.
	#[error("codec error: {0}")]
	Codec(#[from] serde_json::Error),

	/// An RPC did not complete within the configured timeout.
	#[error("rpc timed out")]
	Timeout(#[from] tokio::time::error::Elapsed),

	/// The peer processed the request but reported a failure.
	#[error("peer reported failure: {0}")]
	Remote(String),

	/// The peer answered with a response that does not match the request.
	#[error("peer sent a mismatched response")]
	UnexpectedResponse,

	/// A peer handed out an id outside `[0, 2^m)`; its ring size disagrees with ours.
	#[error("peer id {id} is outside this ring, ring sizes likely disagree")]
	RingSizeMismatch {
		/// The out-of-range id.
		id: u64,
	},

	/// `create` or `join` was invoked on a node that is already part of a ring.
	#[error("node is already part of a ring")]
	AlreadyJoined,

	/// A routed operation was invoked on a node that has not created or joined a ring.
	#[error("node has not created or joined a ring")]
	NotJoined,

	/// Another node already occupies this node's id on the ring.
	#[error("id collision with {addr}, refusing to join")]
	IdCollision {
		/// Address of the node with the colliding id.
		addr: String,
	},

	/// The ring parameter `m` is outside the supported `1..=64` range.
	#[error("invalid ring size m={m}, must be in 1..=64")]
	InvalidRingSize {
		/// The rejected ring parameter.
		m: u32,
	},

	/// A thread panicked while holding the node state lock.
	#[error("node state lock poisoned")]
	StateLockPoisoned,
}

impl Error {
	/// True for failures that mark the peer as possibly dead rather than
	/// a local protocol misuse.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			Error::Io(_) | Error::Timeout(_) | Error::RingSizeMismatch { .. }
		)
	}
}
