//! The operations peers (and local callers) invoke on a node: ring
//! membership, lookup, and the storage dispatcher.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ring::NodeRef;
use crate::transport::Transport;

use super::Node;

impl<T: Transport> Node<T> {
	/// Becomes the sole member of a fresh ring: predecessor unset, every
	/// finger pointing at self.
	pub fn create(&self) -> Result<()> {
		let mut state = self.state()?;
		if state.active {
			return Err(Error::AlreadyJoined);
		}
		let me = self.self_ref();
		state.predecessor = None;
		for finger in state.fingers.iter_mut() {
			*finger = me.clone();
		}
		state.next_finger = 0;
		state.active = true;
		info!(addr = self.addr(), id = self.id(), "created a new ring");
		Ok(())
	}

	/// Joins the ring that the node at `known` participates in by asking
	/// it for this node's successor. Fingers other than the successor are
	/// repaired later by fix_fingers; keys flow in once the eventual
	/// successor learns about us through notify.
	pub async fn join(&self, known: &str) -> Result<()> {
		if self.state()?.active {
			return Err(Error::AlreadyJoined);
		}
		let (successor, _) = self.rpc_find_successor(known, self.id()).await?;
		if successor.id == self.id() && successor.addr != self.addr() {
			return Err(Error::IdCollision {
				addr: successor.addr,
			});
		}
		let mut state = self.state()?;
		if state.active {
			return Err(Error::AlreadyJoined);
		}
		state.predecessor = None;
		state.fingers[0] = successor.clone();
		state.active = true;
		info!(via = known, successor = %successor, "joined ring");
		Ok(())
	}

	/// Resolves the node responsible for `id`, recursively. Returns the
	/// owner and the number of nodes visited.
	pub async fn find_successor(&self, id: u64) -> Result<(NodeRef, u32)> {
		let id = self.ring().reduce(id);
		let successor = {
			let state = self.state()?;
			if !state.active {
				return Err(Error::NotJoined);
			}
			state.fingers[0].clone()
		};
		if self.ring().between_open_closed(id, self.id(), successor.id) {
			return Ok((successor, 1));
		}
		let next = self.closest_preceding_finger(id)?;
		if next.addr == self.addr() {
			// No finger improves on us; our successor is the best answer.
			return Ok((successor, 1));
		}
		let (node, hops) = self.rpc_find_successor(&next.addr, id).await?;
		Ok((node, hops + 1))
	}

	/// The closest finger strictly preceding `id`, from the local table
	/// only. Falls back to self when no finger qualifies.
	pub fn closest_preceding_finger(&self, id: u64) -> Result<NodeRef> {
		let id = self.ring().reduce(id);
		let state = self.state()?;
		if !state.active {
			return Err(Error::NotJoined);
		}
		for finger in state.fingers.iter().rev() {
			if self.ring().between_open_open(finger.id, self.id(), id) {
				return Ok(finger.clone());
			}
		}
		Ok(self.self_ref())
	}

	/// Handles a peer claiming to be our predecessor. Adopting a new
	/// predecessor hands it the keys it now owns.
	pub async fn notify(&self, candidate: NodeRef) -> Result<()> {
		// The id travelled over the wire; derive it ourselves.
		let candidate = NodeRef::new(candidate.addr, self.ring());
		let outgoing = {
			let mut state = self.state()?;
			if !state.active {
				return Err(Error::NotJoined);
			}
			let adopt = match &state.predecessor {
				None => true,
				Some(p) => self
					.ring()
					.between_open_open(candidate.id, p.id, self.id()),
			};
			if !adopt {
				return Ok(());
			}
			let previous = state.predecessor.replace(candidate.clone());
			debug!(predecessor = %candidate, "adopted new predecessor");
			match previous {
				// The span between the old and new predecessor changes hands.
				Some(p) => {
					let ring = *self.ring();
					state.store.drain_interval(&ring, p.id, candidate.id)
				}
				// First predecessor we hear of: everything outside our own
				// span (candidate, self] is its problem now.
				None => {
					let ring = *self.ring();
					let id = self.id();
					state.store.drain_outside(&ring, candidate.id, id)
				}
			}
		};
		if outgoing.is_empty() {
			return Ok(());
		}
		info!(count = outgoing.len(), to = %candidate, "transferring keys to new predecessor");
		let mut undelivered = Vec::new();
		for (key, value) in outgoing {
			if let Err(err) = self
				.rpc_put_local(&candidate.addr, key.clone(), value.clone())
				.await
			{
				warn!(%key, %err, "key transfer failed, keeping binding");
				undelivered.push((key, value));
			}
		}
		if !undelivered.is_empty() {
			let mut state = self.state()?;
			for (key, value) in undelivered {
				state.store.put(key, value);
			}
		}
		Ok(())
	}

	/// Stores a binding on whichever node owns the key. Returns the owner
	/// and the lookup hop count.
	pub async fn put(&self, key: String, value: String) -> Result<(NodeRef, u32)> {
		let hash = self.ring().hash(&key);
		let (target, hops) = self.find_successor(hash).await?;
		self.rpc_put_local(&target.addr, key, value).await?;
		Ok((target, hops))
	}

	/// Looks a key up on whichever node owns it. Returns the owner, the
	/// lookup hop count, and the value if the owner holds one.
	pub async fn get(&self, key: &str) -> Result<(NodeRef, u32, Option<String>)> {
		let hash = self.ring().hash(key);
		let (target, hops) = self.find_successor(hash).await?;
		let value = self.rpc_get_local(&target.addr, key).await?;
		Ok((target, hops, value))
	}

	/// Reads a key from the local store only. Absence is not an error.
	pub fn get_local(&self, key: &str) -> Result<Option<String>> {
		Ok(self.state()?.store.get(key))
	}

	/// Writes a binding into the local store only. Also the entry point
	/// for transfer inflow from a successor shedding keys.
	pub fn put_local(&self, key: String, value: String) -> Result<()> {
		self.state()?.store.put(key, value);
		Ok(())
	}

	/// This node's current successor (finger 0).
	pub fn successor(&self) -> Result<NodeRef> {
		Ok(self.state()?.fingers[0].clone())
	}

	/// This node's current predecessor, if known.
	pub fn predecessor(&self) -> Result<Option<NodeRef>> {
		Ok(self.state()?.predecessor.clone())
	}

	/// A snapshot of the finger table. Entry `i` is believed to be the
	/// successor of `self.id + 2^i`.
	pub fn fingers(&self) -> Result<Vec<NodeRef>> {
		Ok(self.state()?.fingers.clone())
	}

	/// True once the node has created or joined a ring and has not shut
	/// down since.
	pub fn is_active(&self) -> Result<bool> {
		Ok(self.state()?.active)
	}
}
