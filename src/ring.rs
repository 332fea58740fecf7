//! Identifier arithmetic on the ring `Z/2^m`.
//!
//! Every address and key is hashed onto the ring; all routing decisions
//! reduce to the interval predicates defined here. The half-open edge
//! cases matter: lookups use `(a, b]`, stabilization uses `(a, b)`.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The identifier space `[0, 2^m)` with modular arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
	m: u32,
	mask: u64,
}

impl Ring {
	/// A ring of size `2^m`. Callers validate `m` via
	/// [`NodeConfig::validate`](crate::NodeConfig::validate) first.
	pub fn new(m: u32) -> Self {
		Ring {
			m,
			mask: u64::MAX >> (64 - m),
		}
	}

	/// The ring parameter `m`.
	pub fn m(&self) -> u32 {
		self.m
	}

	/// Hashes an address or key string onto the ring.
	///
	/// SHA-256 of the string, reduced mod `2^m`. Stable across processes,
	/// so every peer maps the same string to the same point.
	pub fn hash(&self, data: &str) -> u64 {
		let digest = Sha256::digest(data.as_bytes());
		let mut tail = [0u8; 8];
		tail.copy_from_slice(&digest[24..32]);
		u64::from_be_bytes(tail) & self.mask
	}

	/// Reduces an arbitrary integer mod `2^m`.
	pub fn reduce(&self, id: u64) -> u64 {
		id & self.mask
	}

	/// True if `id` already lies in `[0, 2^m)`.
	pub fn contains(&self, id: u64) -> bool {
		id & !self.mask == 0
	}

	/// The start of finger `i`: `(id + 2^i) mod 2^m`.
	pub fn finger_start(&self, id: u64, i: u32) -> u64 {
		id.wrapping_add(1u64 << i) & self.mask
	}

	/// True if `x` lies strictly between `a` and `b` going clockwise.
	///
	/// With `a == b` the interval is the whole ring except `a` itself.
	pub fn between_open_open(&self, x: u64, a: u64, b: u64) -> bool {
		use std::cmp::Ordering;
		match a.cmp(&b) {
			Ordering::Less => a < x && x < b,
			Ordering::Greater => x > a || x < b,
			Ordering::Equal => x != a,
		}
	}

	/// True if `x` lies in `(a, b]` going clockwise.
	///
	/// With `a == b` the interval is the whole ring.
	pub fn between_open_closed(&self, x: u64, a: u64, b: u64) -> bool {
		x == b || self.between_open_open(x, a, b)
	}
}

/// A reference to a node: its network address and its position on the ring.
///
/// This is the universal form peers exchange. The id is never trusted as
/// received; anything that stores a `NodeRef` recomputes the id from the
/// address first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
	/// `"host:port"` of the node's RPC listener.
	pub addr: String,
	/// `hash(addr) mod 2^m`.
	pub id: u64,
}

impl NodeRef {
	/// Builds a reference for `addr`, deriving the id on the given ring.
	pub fn new(addr: impl Into<String>, ring: &Ring) -> Self {
		let addr = addr.into();
		let id = ring.hash(&addr);
		NodeRef { addr, id }
	}
}

impl fmt::Display for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}#{}", self.addr, self.id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_is_stable_and_reduced() {
		let ring = Ring::new(7);
		// Known sha256 reductions; these pin cross-process stability.
		assert_eq!(ring.hash("foo"), 46);
		assert_eq!(ring.hash("127.0.0.1:4567"), 85);
		assert!(ring.contains(ring.hash("anything at all")));
	}

	#[test]
	fn hash_depends_on_m() {
		let small = Ring::new(3);
		for s in ["a", "b", "c", "abc"] {
			assert!(small.hash(s) < 8);
		}
		let full = Ring::new(64);
		assert!(full.contains(full.hash("a")));
	}

	#[test]
	fn reduce_masks_high_bits() {
		let ring = Ring::new(7);
		assert_eq!(ring.reduce(128), 0);
		assert_eq!(ring.reduce(130), 2);
		assert_eq!(ring.reduce(127), 127);
		assert!(!ring.contains(128));
		assert!(ring.contains(127));
	}

	#[test]
	fn finger_starts_wrap() {
		let ring = Ring::new(7);
		assert_eq!(ring.finger_start(0, 0), 1);
		assert_eq!(ring.finger_start(100, 5), 4); // 100 + 32 = 132 mod 128
		assert_eq!(ring.finger_start(127, 0), 0);
		assert_eq!(ring.finger_start(64, 6), 0);
	}

	#[test]
	fn open_open_ordinary_interval() {
		let ring = Ring::new(7);
		assert!(ring.between_open_open(5, 3, 10));
		assert!(!ring.between_open_open(3, 3, 10));
		assert!(!ring.between_open_open(10, 3, 10));
		assert!(!ring.between_open_open(100, 3, 10));
	}

	#[test]
	fn open_open_wraps_around_zero() {
		let ring = Ring::new(7);
		assert!(ring.between_open_open(127, 120, 5));
		assert!(ring.between_open_open(0, 120, 5));
		assert!(ring.between_open_open(4, 120, 5));
		assert!(!ring.between_open_open(120, 120, 5));
		assert!(!ring.between_open_open(5, 120, 5));
		assert!(!ring.between_open_open(60, 120, 5));
	}

	#[test]
	fn open_open_degenerate_is_everything_but_a() {
		let ring = Ring::new(7);
		assert!(ring.between_open_open(0, 42, 42));
		assert!(ring.between_open_open(127, 42, 42));
		assert!(!ring.between_open_open(42, 42, 42));
	}

	#[test]
	fn open_closed_includes_right_endpoint() {
		let ring = Ring::new(7);
		assert!(ring.between_open_closed(10, 3, 10));
		assert!(!ring.between_open_closed(3, 3, 10));
		assert!(ring.between_open_closed(5, 120, 5));
		assert!(!ring.between_open_closed(120, 120, 5));
		// Degenerate interval covers the whole ring, endpoint included.
		assert!(ring.between_open_closed(42, 42, 42));
		assert!(ring.between_open_closed(0, 42, 42));
	}

	#[test]
	fn node_ref_derives_id_from_addr() {
		let ring = Ring::new(7);
		let n = NodeRef::new("127.0.0.1:4567", &ring);
		assert_eq!(n.id, 85);
		assert_eq!(n.to_string(), "127.0.0.1:4567#85");
	}
}
