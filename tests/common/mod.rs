use std::time::Duration;

use chord_ring::{NodeConfig, NodeHandle, TcpNode, TcpTransport};
use tokio::time::sleep;

/// Config with maintenance cranked up so rings converge in a couple of
/// seconds instead of minutes.
pub fn fast_config(m: u32) -> NodeConfig {
	NodeConfig {
		m,
		stabilize_interval: Duration::from_millis(50),
		fix_fingers_interval: Duration::from_millis(50),
		check_predecessor_interval: Duration::from_millis(100),
		rpc_timeout: Duration::from_secs(2),
	}
}

pub fn addr(port: u16) -> String {
	format!("127.0.0.1:{port}")
}

/// Boots one node per port. The first creates a fresh ring, the rest
/// join through it.
pub async fn make_ring(ports: &[u16], m: u32) -> Vec<NodeHandle<TcpTransport>> {
	let mut handles = Vec::new();
	for (i, port) in ports.iter().enumerate() {
		let handle = TcpNode::start(addr(*port), fast_config(m))
			.await
			.expect("node should start");
		if i == 0 {
			handle.node().create().expect("create should succeed");
		} else {
			handle
				.node()
				.join(&addr(ports[0]))
				.await
				.expect("join should succeed");
		}
		handles.push(handle);
		sleep(Duration::from_millis(100)).await;
	}
	handles
}

/// Long enough for dozens of maintenance ticks under fast_config.
pub async fn settle() {
	sleep(Duration::from_secs(2)).await;
}
