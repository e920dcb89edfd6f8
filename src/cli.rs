// CLI commands

use crate::core::Transaction;
use crate::network::{peer, Message, Node, NodeConfig};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

/// Interval between chain status reports while a node runs
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "minichain")]
#[command(about = "Minimal proof-of-work blockchain node", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a mining node
    Run {
        /// Listening address
        #[arg(long, default_value = "127.0.0.1:7331")]
        listen: SocketAddr,

        /// Known peer address (repeat for multiple peers)
        #[arg(long = "peer")]
        peers: Vec<SocketAddr>,

        /// Required leading zero hex symbols in a block hash
        #[arg(long, default_value = "4")]
        difficulty: u32,

        /// Balance granted to accounts on first reference
        #[arg(long, default_value = "100")]
        opening_balance: u64,

        /// Account credited with mined fees
        #[arg(long)]
        miner: String,

        /// Mining poll interval in milliseconds
        #[arg(long, default_value = "2000")]
        mine_interval_ms: u64,
    },

    /// Build a transaction and submit it to a node
    Send {
        /// Target node address
        #[arg(long, default_value = "127.0.0.1:7331")]
        node: SocketAddr,

        /// Sender account
        #[arg(long)]
        from: String,

        /// Receiver account
        #[arg(long)]
        to: String,

        /// Amount to transfer
        #[arg(long)]
        amount: u64,

        /// Fee for the mining node
        #[arg(long, default_value = "0")]
        fee: u64,
    },
}

/// Dispatch a parsed command
pub async fn execute(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Run {
            listen,
            peers,
            difficulty,
            opening_balance,
            miner,
            mine_interval_ms,
        } => {
            run_node(NodeConfig {
                listen_addr: listen,
                peers,
                difficulty,
                opening_balance,
                miner_id: miner,
                mine_interval: Duration::from_millis(mine_interval_ms),
            })
            .await
        }
        Commands::Send {
            node,
            from,
            to,
            amount,
            fee,
        } => send_transaction(node, from, to, amount, fee).await,
    }
}

/// Run a node until interrupted: listener, miner, and a periodic status
/// report (height, head, validity) for anyone watching the log.
async fn run_node(config: NodeConfig) -> Result<(), String> {
    let node = Node::new(config);
    node.start_listener().await?;
    node.start_miner();

    loop {
        tokio::time::sleep(STATUS_INTERVAL).await;
        let chain = node.chain_snapshot().await;
        log::info!(
            "Chain status: {} blocks, head {}, {} pending, valid={}",
            chain.len(),
            chain.head_hash(),
            node.pending_count().await,
            node.chain_is_valid().await
        );
    }
}

/// Client-side submission: build the transaction locally and hand it to a
/// node over the wire. Signing, if any, happens before this point.
async fn send_transaction(
    node: SocketAddr,
    from: String,
    to: String,
    amount: u64,
    fee: u64,
) -> Result<(), String> {
    let tx = Transaction::new(from, to, amount, fee);
    let id = tx.tx_hash;

    peer::send_message(node, &Message::Transaction(tx)).await?;

    println!("Transaction submitted to {}", node);
    println!("  TXID: {}", id);
    Ok(())
}
