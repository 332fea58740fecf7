//! Command-line front-end: run a node, or drive a running one.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chord_ring::rpc::{Request, Response};
use chord_ring::{NodeConfig, TcpNode, TcpTransport, Transport};

#[derive(Parser)]
#[command(name = "chord-ring", about = "A Chord distributed hash table node")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Run a node listening on host:port with ring parameter m.
	Server {
		/// Host to bind.
		host: String,
		/// Port to bind.
		port: u16,
		/// Ring parameter: identifiers live in [0, 2^m). Must agree
		/// across all peers of one ring.
		m: u32,
	},
	/// Send one command to the node at host:port.
	Client {
		/// Host of the target node.
		host: String,
		/// Port of the target node.
		port: u16,
		#[command(subcommand)]
		verb: Verb,
	},
}

#[derive(Subcommand)]
enum Verb {
	/// Make the target the sole member of a fresh ring.
	Create,
	/// Make the target join the ring a known node participates in.
	Join {
		/// Host of the known node.
		host: String,
		/// Port of the known node.
		port: u16,
	},
	/// Resolve the node responsible for a ring position.
	#[command(alias = "find_successor")]
	FindSuccessor {
		/// Position on the ring.
		id: u64,
	},
	/// Store a binding on whichever node owns the key.
	Put {
		/// Key to store.
		key: String,
		/// Value to bind.
		value: String,
	},
	/// Look a key up on whichever node owns it.
	Get {
		/// Key to look up.
		key: String,
	},
	/// Shut the target node down gracefully.
	Shutdown,
	/// Probe the target node for liveness.
	Ping,
	/// Show the target node's predecessor.
	Predecessor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(fmt::layer())
		.with(
			EnvFilter::builder()
				.with_default_directive(LevelFilter::INFO.into())
				.from_env_lossy(),
		)
		.init();

	match Cli::parse().command {
		Command::Server { host, port, m } => serve(host, port, m).await,
		Command::Client { host, port, verb } => client(host, port, verb).await,
	}
}

async fn serve(host: String, port: u16, m: u32) -> anyhow::Result<()> {
	let addr = format!("{host}:{port}");
	let handle = TcpNode::start(addr.clone(), NodeConfig::new(m))
		.await
		.with_context(|| format!("failed to start node on {addr}"))?;
	handle.wait().await;
	Ok(())
}

async fn client(host: String, port: u16, verb: Verb) -> anyhow::Result<()> {
	let addr = format!("{host}:{port}");
	let request = match &verb {
		Verb::Create => Request::Create,
		Verb::Join { host, port } => Request::Join {
			known: format!("{host}:{port}"),
		},
		Verb::FindSuccessor { id } => Request::FindSuccessor { id: *id },
		Verb::Put { key, value } => Request::Put {
			key: key.clone(),
			value: value.clone(),
		},
		Verb::Get { key } => Request::Get { key: key.clone() },
		Verb::Shutdown => Request::Shutdown,
		Verb::Ping => Request::Ping,
		Verb::Predecessor => Request::GetPredecessor,
	};

	let transport = TcpTransport::new();
	let timeout = NodeConfig::default().rpc_timeout;
	let response = transport
		.invoke(&addr, request, timeout)
		.await
		.with_context(|| format!("rpc to {addr} failed"))?;

	match response {
		Response::Error { message } => bail!("{addr} rejected the request: {message}"),
		Response::Done => println!("ok"),
		Response::Pong => println!("pong"),
		Response::FoundSuccessor { node, hops } => println!("{node} ({hops} hops)"),
		Response::Predecessor { node: Some(node) } => println!("{node}"),
		Response::Predecessor { node: None } => println!("(none)"),
		Response::PutResult { node, hops } => println!("stored on {node} ({hops} hops)"),
		Response::GetResult {
			node,
			hops,
			value: Some(value),
			..
		} => println!("{value} [on {node}, {hops} hops]"),
		Response::GetResult { node, hops, .. } => {
			println!("(not found) [asked {node}, {hops} hops]")
		}
		other => bail!("{addr} sent an unexpected response: {other:?}"),
	}
	Ok(())
}
