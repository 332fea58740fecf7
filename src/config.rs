//! Node configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Tunables for a single node. All peers in one ring must agree on `m`;
/// the intervals and timeout are free to differ per node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
	/// Ring parameter: identifiers live in `[0, 2^m)`.
	pub m: u32,
	/// Period of the stabilize task.
	pub stabilize_interval: Duration,
	/// Period of the fix-fingers task.
	pub fix_fingers_interval: Duration,
	/// Period of the check-predecessor task.
	pub check_predecessor_interval: Duration,
	/// Upper bound on a single outbound RPC, connect included.
	pub rpc_timeout: Duration,
}

impl NodeConfig {
	/// Config with the given ring parameter and default timing.
	pub fn new(m: u32) -> Self {
		NodeConfig {
			m,
			..NodeConfig::default()
		}
	}

	/// Rejects ring sizes the id arithmetic cannot represent.
	pub fn validate(&self) -> Result<()> {
		if self.m == 0 || self.m > 64 {
			return Err(Error::InvalidRingSize { m: self.m });
		}
		Ok(())
	}
}

impl Default for NodeConfig {
	fn default() -> Self {
		NodeConfig {
			m: 8,
			stabilize_interval: Duration::from_millis(500),
			fix_fingers_interval: Duration::from_millis(500),
			check_predecessor_interval: Duration::from_secs(1),
			rpc_timeout: Duration::from_secs(3),
		}
	}
}
