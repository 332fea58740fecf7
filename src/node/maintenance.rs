//! Periodic ring repair: stabilize, fix_fingers, check_predecessor.
//!
//! Three independent loops with their own periods. Failures are logged
//! and retried on the next tick; a dead peer never wedges a loop. Each
//! round reads node state under the lock, releases it for any RPCs, and
//! re-acquires to write results.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::error::Result;
use crate::ring::NodeRef;
use crate::transport::Transport;

use super::Node;

/// Spawns the three maintenance loops for a started node.
pub(super) fn spawn<T: Transport>(node: &Arc<Node<T>>) -> Vec<JoinHandle<()>> {
	vec![
		tokio::spawn(run(node.clone(), Task::Stabilize)),
		tokio::spawn(run(node.clone(), Task::FixFingers)),
		tokio::spawn(run(node.clone(), Task::CheckPredecessor)),
	]
}

#[derive(Clone, Copy, Debug)]
enum Task {
	Stabilize,
	FixFingers,
	CheckPredecessor,
}

async fn run<T: Transport>(node: Arc<Node<T>>, task: Task) {
	let period = match task {
		Task::Stabilize => node.config.stabilize_interval,
		Task::FixFingers => node.config.fix_fingers_interval,
		Task::CheckPredecessor => node.config.check_predecessor_interval,
	};
	let mut ticker = interval(period);
	let mut shutdown = node.shutdown_signal();
	loop {
		tokio::select! {
			_ = ticker.tick() => {
				let round = match task {
					Task::Stabilize => node.stabilize().await,
					Task::FixFingers => node.fix_fingers().await,
					Task::CheckPredecessor => node.check_predecessor().await,
				};
				if let Err(err) = round {
					// Dead peers are routine; anything else deserves a look.
					if err.is_transient() {
						debug!(?task, %err, "maintenance round failed");
					} else {
						warn!(?task, %err, "maintenance round failed");
					}
				}
			}
			_ = shutdown.changed() => break,
		}
	}
	debug!(?task, "maintenance loop stopped");
}

impl<T: Transport> Node<T> {
	/// One stabilization round: reconcile our successor with the
	/// successor's view of its predecessor, then notify the successor of
	/// our existence. A no-op until the node is on a ring.
	pub async fn stabilize(&self) -> Result<()> {
		let mut successor = {
			let state = self.state()?;
			if !state.active {
				return Ok(());
			}
			state.fingers[0].clone()
		};
		let candidate = if successor.addr == self.addr() {
			self.predecessor()?
		} else {
			self.rpc_get_predecessor(&successor.addr).await?
		};
		if let Some(candidate) = candidate {
			let candidate = NodeRef::new(candidate.addr, self.ring());
			if self
				.ring()
				.between_open_open(candidate.id, self.id(), successor.id)
			{
				debug!(successor = %candidate, "stabilize adopted closer successor");
				self.state()?.fingers[0] = candidate.clone();
				successor = candidate;
			}
		}
		let me = self.self_ref();
		if successor.addr == self.addr() {
			self.notify(me).await
		} else {
			self.rpc_notify(&successor.addr, me).await
		}
	}

	/// One fix_fingers round: advance the rolling cursor and repair that
	/// finger by resolving its start point afresh.
	pub async fn fix_fingers(&self) -> Result<()> {
		let (index, start) = {
			let mut state = self.state()?;
			if !state.active {
				return Ok(());
			}
			state.next_finger = (state.next_finger + 1) % self.ring().m() as usize;
			let index = state.next_finger;
			(index, self.ring().finger_start(self.id(), index as u32))
		};
		let (node, _) = self.find_successor(start).await?;
		self.state()?.fingers[index] = node;
		Ok(())
	}

	/// One check_predecessor round: ping the predecessor and clear it if
	/// it does not answer.
	pub async fn check_predecessor(&self) -> Result<()> {
		let predecessor = {
			let state = self.state()?;
			if !state.active {
				return Ok(());
			}
			state.predecessor.clone()
		};
		let predecessor = match predecessor {
			Some(p) if p.addr != self.addr() => p,
			_ => return Ok(()),
		};
		if let Err(err) = self.rpc_ping(&predecessor.addr).await {
			debug!(predecessor = %predecessor, %err, "predecessor unreachable, clearing");
			let mut state = self.state()?;
			// Only clear what we actually pinged; it may have changed.
			if state
				.predecessor
				.as_ref()
				.is_some_and(|p| p.addr == predecessor.addr)
			{
				state.predecessor = None;
			}
		}
		Ok(())
	}
}
