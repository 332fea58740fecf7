#![deny(missing_docs)]

//! A Chord distributed hash table.
//!
//! Every node occupies a position on a ring of `2^m` identifiers, owns
//! the keys that hash into the span between its predecessor and itself,
//! and keeps a finger table so lookups resolve in O(log N) hops. Joins,
//! leaves, and failures are repaired by three periodic maintenance
//! tasks: stabilize, fix_fingers, and check_predecessor.
//!
//! The node logic is generic over a [Transport](transport::Transport)
//! that carries the RPC surface; [TcpNode] wires it to the stock
//! JSON-over-TCP implementation.
//!
//! # Examples
//! Boot a node, start a fresh ring, and store a binding:
//! ```no_run
//! # use chord_ring::{NodeConfig, TcpNode};
//! # #[tokio::main]
//! # async fn main() -> chord_ring::Result<()> {
//! let handle = TcpNode::start("127.0.0.1:4567".into(), NodeConfig::new(7)).await?;
//! handle.node().create()?;
//!
//! let (owner, hops) = handle.node().put("foo".into(), "bar".into()).await?;
//! println!("stored on {owner} in {hops} hops");
//! # Ok(())
//! # }
//! ```
//!
//! A second node joins through any existing member and the ring
//! re-partitions itself:
//! ```no_run
//! # use chord_ring::{NodeConfig, TcpNode};
//! # #[tokio::main]
//! # async fn main() -> chord_ring::Result<()> {
//! let handle = TcpNode::start("127.0.0.1:4569".into(), NodeConfig::new(7)).await?;
//! handle.node().join("127.0.0.1:4567").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod ring;
pub mod rpc;
pub mod storage;
pub mod transport;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::{Node, NodeHandle};
pub use ring::{NodeRef, Ring};
pub use transport::{TcpTransport, Transport};

/// A node wired to the JSON-over-TCP transport.
pub type TcpNode = Node<TcpTransport>;
