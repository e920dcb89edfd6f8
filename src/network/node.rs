// Network node: shared state, listener, mining loop, gossip

use crate::chain::Chain;
use crate::consensus::{BlockValidator, ForkDecision, Miner, MiningOutcome, ValidationError};
use crate::core::{Address, Block, BlockBuilder, Hash256, Transaction};
use crate::ledger::Ledger;
use crate::mempool::Mempool;
use crate::network::{peer, Message};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock, Semaphore};
use tokio::time::timeout;

/// Idle budget per inbound connection read
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Concurrent inbound connection cap; excess connections are turned away
const MAX_INBOUND_CONNECTIONS: usize = 64;

/// Seen-set reset threshold
const SEEN_LIMIT: usize = 65_536;

/// Node configuration surface
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Listening endpoint
    pub listen_addr: SocketAddr,
    /// Statically configured peer addresses
    pub peers: Vec<SocketAddr>,
    /// Required leading zero hex symbols in a block hash
    pub difficulty: u32,
    /// Balance granted to accounts on first reference
    pub opening_balance: u64,
    /// Beneficiary credited with mined fees
    pub miner_id: Address,
    /// How often the mining loop checks the pending pool
    pub mine_interval: Duration,
}

/// The shared mutable resources: chain, ledger, and pending pool.
/// Guarded by one lock so block-append plus ledger-apply is a single
/// critical section.
struct State {
    chain: Chain,
    ledger: Ledger,
    mempool: Mempool,
}

/// A running node. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Node {
    config: Arc<NodeConfig>,
    state: Arc<RwLock<State>>,
    peers: Arc<RwLock<Vec<SocketAddr>>>,
    /// Recently observed transaction/block IDs, to stop gossip loops
    seen: Arc<RwLock<HashSet<Hash256>>>,
    /// Current chain tip, watched by the miner for cancellation
    head: Arc<watch::Sender<Hash256>>,
    inbound_slots: Arc<Semaphore>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        let chain = Chain::new();
        let ledger = Ledger::new(config.opening_balance);
        let (head, _) = watch::channel(chain.head_hash());

        Self {
            peers: Arc::new(RwLock::new(config.peers.clone())),
            config: Arc::new(config),
            state: Arc::new(RwLock::new(State {
                chain,
                ledger,
                mempool: Mempool::new(),
            })),
            seen: Arc::new(RwLock::new(HashSet::new())),
            head: Arc::new(head),
            inbound_slots: Arc::new(Semaphore::new(MAX_INBOUND_CONNECTIONS)),
        }
    }

    fn validator(&self) -> BlockValidator {
        BlockValidator::new(self.config.difficulty)
    }

    /// Bind the listening socket and spawn the accept loop. Failing to bind
    /// is the one fatal startup error. Returns the bound address.
    pub async fn start_listener(&self) -> Result<SocketAddr, String> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", self.config.listen_addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read local address: {}", e))?;

        log::info!("Node listening on {}", local_addr);

        let node = self.clone();
        tokio::spawn(async move {
            node.accept_loop(listener).await;
        });

        Ok(local_addr)
    }

    /// Spawn the periodic mining loop
    pub fn start_miner(&self) {
        let node = self.clone();
        let interval = self.config.mine_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = node.mine_once().await {
                    log::error!("Mining attempt failed: {}", e);
                }
            }
        });
    }

    async fn accept_loop(&self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    // Bounded handler pool: turn away connections beyond the cap
                    let permit = match self.inbound_slots.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            log::warn!("Rejecting connection from {}: connection limit", addr);
                            continue;
                        }
                    };

                    log::debug!("New connection from {}", addr);
                    let node = self.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = node.handle_connection(stream, addr).await {
                            log::error!("Connection {} error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Read newline-delimited envelopes until the peer closes or idles out.
    /// A malformed payload is logged and dropped; the loop stays alive.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<(), String> {
        let mut lines = BufReader::new(stream).lines();

        loop {
            let line = match timeout(READ_TIMEOUT, lines.next_line()).await {
                Err(_) => {
                    log::debug!("Connection {} idle, closing", addr);
                    break;
                }
                Ok(Err(e)) => return Err(format!("Read error from {}: {}", addr, e)),
                Ok(Ok(None)) => break,
                Ok(Ok(Some(line))) => line,
            };

            if line.trim().is_empty() {
                continue;
            }

            let message = match Message::from_wire_line(&line) {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("Dropping malformed message from {}: {}", addr, e);
                    continue;
                }
            };

            self.handle_message(message, addr).await;
        }

        Ok(())
    }

    async fn handle_message(&self, message: Message, addr: SocketAddr) {
        match message {
            Message::Transaction(tx) => {
                let id = tx.tx_hash;
                match self.submit_transaction(tx).await {
                    Ok(true) => log::debug!("Pooled transaction {} from {}", id, addr),
                    Ok(false) => log::debug!("Ignoring duplicate transaction {} from {}", id, addr),
                    Err(e) => log::warn!("Rejected transaction {} from {}: {}", id, addr, e),
                }
            }
            Message::Block(block) => {
                let id = block.block_hash;
                match self.accept_block(block).await {
                    Ok(true) => log::info!("Appended block {} from {}", id, addr),
                    Ok(false) => log::debug!("Ignoring duplicate block {} from {}", id, addr),
                    Err(e) => log::warn!("Rejected block {} from {}: {}", id, addr, e),
                }
            }
        }
    }

    /// Admit a transaction to the pending pool and gossip it onward.
    ///
    /// Returns Ok(false) for a duplicate, Err for a transaction that fails
    /// the identifier or balance screen. A rejected transaction never
    /// reaches the pool.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<bool, String> {
        if !tx.verify_hash() {
            return Err("Transaction id does not match its content".to_string());
        }

        // Already observed: mined into a block or pooled earlier
        if self.seen.read().await.contains(&tx.tx_hash) {
            return Ok(false);
        }

        {
            let mut state = self.state.write().await;

            if state.mempool.contains(&tx.tx_hash) {
                return Ok(false);
            }

            // Balance screen against current state. Final say stays with
            // block validation; this keeps obviously unfundable transfers
            // out of the pool.
            let available = state.ledger.balance(&tx.sender);
            let required = tx.amount.saturating_add(tx.fee);
            if available < required {
                return Err(format!(
                    "Insufficient funds for {}: required {}, available {}",
                    tx.sender, required, available
                ));
            }

            state.mempool.insert(tx.clone());
        }

        if self.mark_seen(tx.tx_hash).await {
            self.broadcast(Message::Transaction(tx)).await;
        }
        Ok(true)
    }

    /// Validate a block against the current head, apply its transactions,
    /// append it, and gossip it onward.
    ///
    /// Returns Ok(false) for an already-seen block. Any validation or
    /// ledger failure rejects the block outright with no partial state
    /// change.
    pub async fn accept_block(&self, block: Block) -> Result<bool, ValidationError> {
        {
            let seen = self.seen.read().await;
            if seen.contains(&block.block_hash) {
                return Ok(false);
            }
        }

        let new_head = {
            let mut state = self.state.write().await;

            let head = state.chain.head_hash();
            self.validator().validate_block(&block, &head)?;
            state.ledger.apply_batch(&block.transactions, &block.miner)?;

            let confirmed: Vec<Hash256> =
                block.transactions.iter().map(|tx| tx.tx_hash).collect();
            state.mempool.remove(&confirmed);
            state.chain.append(block.clone());

            log::info!(
                "Chain extended to height {}: {} ({} txs, merkle {})",
                state.chain.len() - 1,
                block.block_hash,
                block.transactions.len(),
                block.merkle_root
            );
            state.chain.head_hash()
        };

        // Wakes the miner off any now-stale candidate
        self.head.send_replace(new_head);

        self.mark_seen(block.block_hash).await;
        // A confirmed transaction is consumed: it must never re-enter the
        // pool even if its gossip arrives after the block that mined it
        for tx in &block.transactions {
            self.mark_seen(tx.tx_hash).await;
        }
        self.broadcast(Message::Block(block)).await;
        Ok(true)
    }

    /// Run the fork-choice rule against a fully materialized candidate
    /// chain. Adopts it (chain and replayed ledger together) only if it is
    /// strictly longer and valid from genesis. Returns whether a switch
    /// happened.
    pub async fn resolve_fork(&self, candidate: Chain) -> bool {
        let mut state = self.state.write().await;

        match self
            .validator()
            .resolve_fork(&state.chain, &candidate, self.config.opening_balance)
        {
            ForkDecision::KeepCurrent => false,
            ForkDecision::Adopt(ledger) => {
                let confirmed: Vec<Hash256> = candidate
                    .blocks()
                    .iter()
                    .flat_map(|b| b.transactions.iter().map(|tx| tx.tx_hash))
                    .collect();
                state.mempool.remove(&confirmed);

                log::info!(
                    "Adopting longer fork: {} blocks (was {})",
                    candidate.len(),
                    state.chain.len()
                );
                state.chain = candidate;
                state.ledger = ledger;

                self.head.send_replace(state.chain.head_hash());
                true
            }
        }
    }

    /// One mining round: screen the pending pool against the ledger, build
    /// a candidate on the current head, and search for a nonce. Returns the
    /// mined block, or None when there was nothing to mine or the search
    /// went stale.
    pub async fn mine_once(&self) -> Result<Option<Block>, String> {
        let candidate = {
            let mut state = self.state.write().await;
            if state.mempool.is_empty() {
                return Ok(None);
            }

            // Never mine a batch the ledger would reject: screen each
            // pending transaction against a scratch ledger and drop the
            // unfundable ones from the pool.
            let mut scratch = state.ledger.clone();
            let mut batch = Vec::new();
            let mut rejected = Vec::new();
            for tx in state.mempool.pending() {
                match scratch.apply_batch(std::slice::from_ref(tx), &self.config.miner_id) {
                    Ok(()) => batch.push(tx.clone()),
                    Err(e) => {
                        log::warn!("Dropping unfundable transaction {}: {}", tx.tx_hash, e);
                        rejected.push(tx.tx_hash);
                    }
                }
            }
            state.mempool.remove(&rejected);

            if batch.is_empty() {
                return Ok(None);
            }

            BlockBuilder::new(state.chain.head_hash(), batch, self.config.miner_id.clone())
        };

        let miner = Miner::new(self.config.difficulty);
        let head_rx = self.head.subscribe();
        let outcome = tokio::task::spawn_blocking(move || miner.mine(candidate, &head_rx))
            .await
            .map_err(|e| format!("Mining task failed: {}", e))?;

        match outcome {
            MiningOutcome::Stale => {
                log::info!("Mining round went stale, will retry on the new head");
                Ok(None)
            }
            MiningOutcome::Mined(block) => match self.accept_block(block.clone()).await {
                Ok(_) => Ok(Some(block)),
                // Lost the race after sealing: a competing block landed first
                Err(ValidationError::BrokenLinkage) => {
                    log::info!("Mined block {} is stale, discarding", block.block_hash);
                    Ok(None)
                }
                Err(e) => Err(format!("Mined block failed validation: {}", e)),
            },
        }
    }

    async fn broadcast(&self, message: Message) {
        let peers = self.peers.read().await.clone();
        if peers.is_empty() {
            return;
        }
        let failures = peer::broadcast(&peers, &message).await;
        if !failures.is_empty() {
            log::debug!("Broadcast reached {}/{} peers", peers.len() - failures.len(), peers.len());
        }
    }

    /// Record an observed payload ID. Returns true when it was new.
    async fn mark_seen(&self, id: Hash256) -> bool {
        let mut seen = self.seen.write().await;
        if seen.len() >= SEEN_LIMIT {
            seen.clear();
        }
        seen.insert(id)
    }

    /// Register an additional peer address
    pub async fn add_peer(&self, addr: SocketAddr) {
        let mut peers = self.peers.write().await;
        if !peers.contains(&addr) {
            peers.push(addr);
        }
    }

    /// Immutable snapshot of the chain, for explorer-style consumers
    pub async fn chain_snapshot(&self) -> Chain {
        self.state.read().await.chain.clone()
    }

    /// Current chain length, genesis included
    pub async fn chain_length(&self) -> usize {
        self.state.read().await.chain.len()
    }

    /// Validity flag: full re-validation of the current chain from genesis
    pub async fn chain_is_valid(&self) -> bool {
        let chain = self.chain_snapshot().await;
        self.validator()
            .validate_chain(&chain, self.config.opening_balance)
            .is_ok()
    }

    /// Current balance of an account
    pub async fn balance(&self, account: &str) -> u64 {
        self.state.read().await.ledger.balance(account)
    }

    /// Number of pending transactions
    pub async fn pending_count(&self) -> usize {
        self.state.read().await.mempool.len()
    }
}
