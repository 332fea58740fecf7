mod common;

use std::time::Duration;

use chord_ring::rpc::{Request, Response};
use chord_ring::{Error, TcpNode, TcpTransport, Transport};

// Ids below assume m = 7; they are sha256(addr) mod 128 and pin the ring
// layouts the assertions depend on.

#[tokio::test]
async fn solo_ring_put_get() {
	// 127.0.0.1:4567 sits at id 85.
	let handle = TcpNode::start(common::addr(4567), common::fast_config(7))
		.await
		.unwrap();
	let node = handle.node();
	node.create().unwrap();

	let (owner, hops) = node.put("foo".into(), "bar".into()).await.unwrap();
	assert_eq!(owner.addr, common::addr(4567));
	assert!(hops <= 1);

	let (owner, hops, value) = node.get("foo").await.unwrap();
	assert_eq!(owner.addr, common::addr(4567));
	assert!(hops <= 1);
	assert_eq!(value.as_deref(), Some("bar"));

	// A solo node is its own successor, and becomes its own predecessor
	// after the first self-stabilize cycle.
	common::settle().await;
	let pred = node.predecessor().unwrap().expect("predecessor set");
	assert_eq!(pred.addr, common::addr(4567));
	assert_eq!(node.successor().unwrap().addr, common::addr(4567));
}

#[tokio::test]
async fn two_node_ring_converges() {
	// Ids 115 (:4620) and 13 (:4622).
	let handles = common::make_ring(&[4620, 4622], 7).await;
	common::settle().await;

	let a = handles[0].node();
	let b = handles[1].node();
	assert_eq!(a.successor().unwrap().addr, b.addr());
	assert_eq!(b.successor().unwrap().addr, a.addr());
	assert_eq!(a.predecessor().unwrap().unwrap().addr, b.addr());
	assert_eq!(b.predecessor().unwrap().unwrap().addr, a.addr());
}

#[tokio::test]
async fn three_node_routing_agrees() {
	// Ids 114 (:4630), 12 (:4631), 84 (:4632); everyone joins via :4630.
	let handles = common::make_ring(&[4630, 4631, 4632], 7).await;
	common::settle().await;
	common::settle().await;

	// The successor of 0 is the node with the smallest id, :4631.
	for handle in &handles {
		let (owner, hops) = handle.node().find_successor(0).await.unwrap();
		assert_eq!(owner.addr, common::addr(4631));
		assert!(hops <= 7);
	}

	// Lookups from any two nodes agree on arbitrary ids too.
	for id in [5, 40, 90, 120] {
		let (from_a, _) = handles[0].node().find_successor(id).await.unwrap();
		let (from_b, _) = handles[1].node().find_successor(id).await.unwrap();
		let (from_c, _) = handles[2].node().find_successor(id).await.unwrap();
		assert_eq!(from_a, from_b);
		assert_eq!(from_b, from_c);
	}

	// After full fix_fingers passes, every finger entry matches a fresh
	// lookup of its start point.
	let node = handles[0].node();
	let fingers = node.fingers().unwrap();
	for (i, finger) in fingers.iter().enumerate() {
		let start = node.ring().finger_start(node.id(), i as u32);
		let (expected, _) = node.find_successor(start).await.unwrap();
		assert_eq!(finger.id, expected.id, "finger {i} out of date");
	}
}

#[tokio::test]
async fn keys_migrate_to_new_predecessor() {
	// :4640 sits at id 26, :4641 at 39, and hash("hello") = 36 lies in
	// (26, 39]: once :4641 joins, it owns the binding.
	let a = TcpNode::start(common::addr(4640), common::fast_config(7))
		.await
		.unwrap();
	a.node().create().unwrap();
	a.node().put("hello".into(), "world".into()).await.unwrap();
	assert_eq!(a.node().get_local("hello").unwrap().as_deref(), Some("world"));

	let b = TcpNode::start(common::addr(4641), common::fast_config(7))
		.await
		.unwrap();
	b.node().join(&common::addr(4640)).await.unwrap();
	common::settle().await;

	assert_eq!(b.node().get_local("hello").unwrap().as_deref(), Some("world"));
	assert!(a.node().get_local("hello").unwrap().is_none());

	// Routed reads from either node find the migrated binding.
	let (owner, hops, value) = a.node().get("hello").await.unwrap();
	assert_eq!(owner.addr, common::addr(4641));
	assert!(hops <= 7);
	assert_eq!(value.as_deref(), Some("world"));
}

#[tokio::test]
async fn create_and_join_reject_misuse() {
	let handle = TcpNode::start(common::addr(4660), common::fast_config(7))
		.await
		.unwrap();
	let node = handle.node();

	// Routed operations need ring membership first.
	assert!(matches!(node.find_successor(0).await, Err(Error::NotJoined)));
	assert!(matches!(node.get("k").await, Err(Error::NotJoined)));

	node.create().unwrap();
	assert!(matches!(node.create(), Err(Error::AlreadyJoined)));
	assert!(matches!(
		node.join("127.0.0.1:1").await,
		Err(Error::AlreadyJoined)
	));
}

#[tokio::test]
async fn shutdown_makes_rpcs_fail_and_clears_predecessor() {
	// Ids 101 (:4650) and 17 (:4652).
	let handles = common::make_ring(&[4650, 4652], 7).await;
	common::settle().await;

	let a = handles[0].node();
	assert_eq!(
		a.predecessor().unwrap().unwrap().addr,
		common::addr(4652)
	);

	// Shut the second node down through the RPC surface, as a peer would.
	let transport = TcpTransport::new();
	let timeout = Duration::from_secs(2);
	let response = transport
		.invoke(&common::addr(4652), Request::Shutdown, timeout)
		.await
		.unwrap();
	assert!(matches!(response, Response::Done));

	common::settle().await;
	assert!(transport
		.invoke(&common::addr(4652), Request::Ping, timeout)
		.await
		.is_err());
	assert!(a.predecessor().unwrap().is_none());
}

#[tokio::test]
async fn rpc_surface_round_trip() {
	let _handle = TcpNode::start(common::addr(4670), common::fast_config(7))
		.await
		.unwrap();
	let addr = common::addr(4670);
	let transport = TcpTransport::new();
	let timeout = Duration::from_secs(2);

	let invoke = |request| transport.invoke(&addr, request, timeout);

	assert!(matches!(invoke(Request::Ping).await.unwrap(), Response::Pong));
	assert!(matches!(
		invoke(Request::Create).await.unwrap(),
		Response::Done
	));
	// Creating twice is refused, as a wire-level error rather than a
	// broken connection.
	assert!(matches!(
		invoke(Request::Create).await.unwrap(),
		Response::Error { .. }
	));

	match invoke(Request::Put {
		key: "k".into(),
		value: "v".into(),
	})
	.await
	.unwrap()
	{
		Response::PutResult { node, hops } => {
			assert_eq!(node.addr, addr);
			assert!(hops <= 1);
		}
		other => panic!("unexpected response: {other:?}"),
	}

	match invoke(Request::Get { key: "k".into() }).await.unwrap() {
		Response::GetResult { value, found, .. } => {
			assert!(found);
			assert_eq!(value.as_deref(), Some("v"));
		}
		other => panic!("unexpected response: {other:?}"),
	}

	match invoke(Request::GetLocal {
		key: "missing".into(),
	})
	.await
	.unwrap()
	{
		Response::Local { value, found } => {
			assert!(!found);
			assert!(value.is_none());
		}
		other => panic!("unexpected response: {other:?}"),
	}

	match invoke(Request::GetSuccessor).await.unwrap() {
		Response::Successor { node } => assert_eq!(node.addr, addr),
		other => panic!("unexpected response: {other:?}"),
	}
}
