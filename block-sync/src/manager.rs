//! The sync session.
//!
//! [`SyncManager::start`] opens a session towards a target height and blocks
//! while three loops run on their own threads:
//!
//! 1. **Download** expires stale requests, picks the lowest queued height
//!    and asks a random qualified idle peer for it.
//! 2. **Import** stages received blocks up to the next checkpoint, checks
//!    the checkpoint votes and the hash links below it, then imports the run
//!    in order with vote validation skipped.
//! 3. **Report** logs the import rate and queue sizes.
//!
//! Every loop iteration and [`SyncManager::on_message`] hold the single
//! session lock while touching the queues. Requests and disconnects are
//! issued after it is released.

use {
    crate::{
        channel::{Blockchain, Capability, Channel, ChannelProvider, DisconnectReason},
        config::SyncConfig,
        error::{Result, SyncError},
        message::{assemble_block_parts, SyncMessage, SyncRequest},
        progress::SyncProgress,
        queues::{PendingBlock, QueueSnapshot, SyncQueues},
    },
    crossbeam_channel::{bounded, select, tick, Receiver, Sender},
    log::{debug, error, info, trace, warn},
    parking_lot::Mutex,
    rand::Rng,
    std::{
        collections::HashSet,
        sync::Arc,
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
    tessera_ledger_types::{Block, BlockPart},
    tessera_monitoring::SyncMetrics,
};

/// Parts requested for heights whose votes are covered by a later checkpoint.
const PARTS_WITHOUT_VOTES: [BlockPart; 2] = [BlockPart::Header, BlockPart::Transactions];
const PARTS_WITH_VOTES: [BlockPart; 3] = [
    BlockPart::Header,
    BlockPart::Transactions,
    BlockPart::Votes,
];

#[derive(Debug)]
struct SessionState {
    queues: SyncQueues,
    bad_peers: HashSet<String>,
    begin: u64,
    current: u64,
    target: u64,
    latest_queued_task: u64,
    last_observed: u64,
    started_at: Instant,
}

impl SessionState {
    fn new() -> Self {
        Self {
            queues: SyncQueues::default(),
            bad_peers: HashSet::new(),
            begin: 0,
            current: 0,
            target: 0,
            latest_queued_task: 0,
            last_observed: 0,
            started_at: Instant::now(),
        }
    }
}

struct SyncInner {
    config: SyncConfig,
    validator_update_interval: u64,
    chain: Arc<dyn Blockchain>,
    channels: Arc<dyn ChannelProvider>,
    metrics: Arc<SyncMetrics>,
    session: Mutex<SessionState>,
    /// Present while a session runs; dropping it ends every loop and wakes
    /// the caller blocked in `start`.
    exit: Mutex<Option<Sender<()>>>,
}

/// Downloads blocks from peers and imports them into a [`Blockchain`].
///
/// Cloning yields another handle to the same engine, so one thread can
/// `stop` a session another thread is blocked in.
#[derive(Clone)]
pub struct SyncManager {
    inner: Arc<SyncInner>,
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("config", &self.inner.config)
            .field("validator_update_interval", &self.inner.validator_update_interval)
            .finish_non_exhaustive()
    }
}

impl SyncManager {
    pub fn new(
        config: SyncConfig,
        validator_update_interval: u64,
        chain: Arc<dyn Blockchain>,
        channels: Arc<dyn ChannelProvider>,
    ) -> Result<Self> {
        Self::with_metrics(
            config,
            validator_update_interval,
            chain,
            channels,
            Arc::new(SyncMetrics::new()),
        )
    }

    pub fn with_metrics(
        config: SyncConfig,
        validator_update_interval: u64,
        chain: Arc<dyn Blockchain>,
        channels: Arc<dyn ChannelProvider>,
        metrics: Arc<SyncMetrics>,
    ) -> Result<Self> {
        config.validate()?;
        if validator_update_interval == 0 {
            return Err(SyncError::InvalidConfig(
                "validator update interval must be positive".to_string(),
            ));
        }
        Ok(Self {
            inner: Arc::new(SyncInner {
                config,
                validator_update_interval,
                chain,
                channels,
                metrics,
                session: Mutex::new(SessionState::new()),
                exit: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.inner.metrics
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Syncs towards `target` (exclusive) and returns when the chain head
    /// reaches `target - 1` or [`stop`](Self::stop) is called. Does nothing
    /// if a session is already running.
    pub fn start(&self, target: u64) {
        let Some(exit) = self.inner.open_session(target) else {
            debug!("Sync already running, ignoring start({target})");
            return;
        };
        info!(
            "Syncing started, best known block = {}",
            target.saturating_sub(1)
        );

        let handles = self.spawn_loops(&exit);

        // only returns once the sender is dropped by stop()
        let _ = exit.recv();
        for handle in handles {
            if handle.join().is_err() {
                error!("A sync loop panicked");
            }
        }

        let elapsed = self.inner.session.lock().started_at.elapsed();
        info!("Syncing finished, took {elapsed:?}");
    }

    /// Ends the running session, if any. Loops finish their current
    /// iteration and the queues are cleared.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Handles an inbound sync message from `channel`. Ignored unless a
    /// session is running.
    pub fn on_message(&self, channel: Arc<dyn Channel>, message: SyncMessage) {
        if !self.inner.is_running() {
            return;
        }
        let size = message.payload_size();
        if size > self.inner.config.max_message_size {
            let err = SyncError::MessageTooLarge {
                size,
                max: self.inner.config.max_message_size,
            };
            warn!("Dropping message from {}: {err}", channel.peer_id());
            self.inner.metrics.dropped_messages.inc();
            return;
        }

        let block = match message {
            SyncMessage::Block(block) => block,
            SyncMessage::BlockParts {
                number,
                parts,
                data,
            } => match assemble_block_parts(number, parts, &data) {
                Ok(block) => block,
                Err(err) => {
                    warn!(
                        "Dropping block parts #{number} from {}: {err}",
                        channel.peer_id()
                    );
                    self.inner.metrics.dropped_messages.inc();
                    return;
                }
            },
            SyncMessage::BlockHeader(header) => {
                debug!(
                    "Ignoring deprecated block header #{} from {}",
                    header.number,
                    channel.peer_id()
                );
                return;
            }
        };
        self.inner.add_block(block, channel);
    }

    pub fn progress(&self) -> SyncProgress {
        let state = self.inner.session.lock();
        SyncProgress {
            starting_height: state.begin,
            current_height: state.current,
            target_height: state.target,
            elapsed: state.started_at.elapsed(),
        }
    }

    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.inner.session.lock().queues.snapshot()
    }

    /// Whether `peer_id` served an invalid block in this session.
    pub fn is_bad_peer(&self, peer_id: &str) -> bool {
        self.inner.session.lock().bad_peers.contains(peer_id)
    }

    fn spawn_loops(&self, exit: &Receiver<()>) -> Vec<JoinHandle<()>> {
        let config = &self.inner.config;
        let loops: [(&str, Duration, fn(&SyncInner)); 3] = [
            ("tesseraSyncDl", config.download_interval(), SyncInner::download),
            ("tesseraSyncImp", config.import_interval(), SyncInner::process),
            ("tesseraSyncRpt", config.report_interval(), SyncInner::report),
        ];

        let mut handles = Vec::with_capacity(loops.len());
        for (name, interval, step) in loops {
            let inner = self.inner.clone();
            let exit = exit.clone();
            let spawned = thread::Builder::new()
                .name(name.to_string())
                .spawn(move || run_loop(&inner, &exit, interval, step));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    error!("Failed to spawn {name}: {err}");
                    self.inner.stop();
                }
            }
        }
        handles
    }
}

/// Manual stepping of a session, for tests that need deterministic
/// interleavings.
#[cfg(any(test, feature = "dev-context-only-utils"))]
impl SyncManager {
    /// Opens a session without spawning its loops. Returns false if one is
    /// already running.
    pub fn begin_session(&self, target: u64) -> bool {
        self.inner.open_session(target).is_some()
    }

    pub fn run_download_once(&self) {
        self.inner.download();
    }

    pub fn run_import_once(&self) {
        self.inner.process();
    }

    pub fn run_report_once(&self) {
        self.inner.report();
    }
}

fn run_loop(inner: &SyncInner, exit: &Receiver<()>, interval: Duration, step: fn(&SyncInner)) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(exit) -> _ => break,
            recv(ticker) -> _ => step(inner),
        }
    }
}

impl SyncInner {
    fn is_running(&self) -> bool {
        self.exit.lock().is_some()
    }

    fn open_session(&self, target: u64) -> Option<Receiver<()>> {
        let mut exit = self.exit.lock();
        if exit.is_some() {
            return None;
        }
        let (sender, receiver) = bounded(0);
        *exit = Some(sender);

        let head = self.chain.latest_block_number();
        let mut state = self.session.lock();
        state.queues.clear();
        state.bad_peers.clear();
        state.begin = head.saturating_add(1);
        state.current = head.saturating_add(1);
        state.target = target;
        state.latest_queued_task = head;
        state.last_observed = head;
        state.started_at = Instant::now();
        self.grow_to_download(&mut state);

        self.metrics.sessions_started.inc();
        self.metrics.bad_peers.set(0);
        self.refresh_gauges(&state);
        Some(receiver)
    }

    fn stop(&self) {
        let Some(sender) = self.exit.lock().take() else {
            return;
        };
        drop(sender);

        let mut state = self.session.lock();
        state.queues.clear();
        self.refresh_gauges(&state);
        debug!("Sync session stopped at block #{}", state.current);
    }

    /// A height skips vote download and validation when it is not a
    /// validator-set pivot and lies more than one interval below the target.
    fn skip_votes(&self, number: u64, target: u64) -> bool {
        let interval = self.validator_update_interval;
        let is_pivot = number.checked_rem(interval) == Some(0);
        let is_safe = number < target.saturating_sub(interval);
        !is_pivot && is_safe
    }

    /// Queues heights after the last queued one, once `to_download` fell
    /// under half its capacity.
    fn grow_to_download(&self, state: &mut SessionState) {
        let capacity = self.config.max_queued_jobs;
        if state.queues.to_download.len() >= capacity / 2 {
            return;
        }
        let mut task = state.latest_queued_task.saturating_add(1);
        while task < state.target && state.queues.to_download.len() < capacity {
            state.latest_queued_task = state.latest_queued_task.max(task);
            if !self.chain.has_block(task) && !state.queues.contains(task) {
                state.queues.to_download.insert(task);
            }
            task = task.saturating_add(1);
        }
    }

    fn download(&self) {
        if !self.is_running() {
            return;
        }
        let Some((channel, request)) = self.next_request() else {
            return;
        };
        debug!(
            "Requesting block #{} from {}: {:?}",
            request.number(),
            channel.peer_id(),
            request.requested_parts()
        );
        self.metrics.blocks_requested.inc();
        if let Err(err) = channel.send(request) {
            // the height stays in to_receive until it expires
            warn!("{err}");
        }
    }

    fn next_request(&self) -> Option<(Arc<dyn Channel>, SyncRequest)> {
        let mut state = self.session.lock();

        let now = Instant::now();
        for height in state.queues.expire(now, self.config.download_timeout()) {
            warn!("Failed to download block #{height}, expired");
            self.metrics.download_timeouts.inc();
        }

        if state.queues.to_receive.len() > self.config.max_pending_jobs {
            trace!("Max pending jobs reached");
            return None;
        }

        let task = *state.queues.to_download.first()?;

        let pending_blocks = state.queues.pending_blocks();
        if pending_blocks > self.config.max_pending_blocks
            && state
                .queues
                .lowest_to_validate()
                .is_some_and(|lowest| task > lowest)
        {
            trace!(
                "Max pending blocks reached - {pending_blocks} > {}",
                self.config.max_pending_blocks
            );
            return None;
        }

        let mut candidates: Vec<Arc<dyn Channel>> = self
            .channels
            .active_channels()
            .into_iter()
            .filter(|channel| {
                channel.is_idle()
                    && channel.remote_height() >= task
                    && !state.bad_peers.contains(channel.peer_id())
                    && (!self.config.fast_sync || channel.supports(Capability::FastSync))
            })
            .collect();
        trace!("Qualified idle peers = {}", candidates.len());
        if candidates.is_empty() {
            return None;
        }
        let channel = candidates.swap_remove(rand::rng().random_range(0..candidates.len()));

        let request = if self.config.fast_sync {
            let parts: &[BlockPart] = if self.skip_votes(task, state.target) {
                &PARTS_WITHOUT_VOTES
            } else {
                &PARTS_WITH_VOTES
            };
            SyncRequest::GetBlockParts {
                number: task,
                parts: BlockPart::encode(parts),
            }
        } else {
            SyncRequest::GetBlock { number: task }
        };

        state.queues.to_download.remove(&task);
        state.queues.to_receive.insert(task, now);
        self.grow_to_download(&mut state);
        self.refresh_gauges(&state);
        Some((channel, request))
    }

    fn add_block(&self, block: Block, channel: Arc<dyn Channel>) {
        let number = block.number();
        let mut state = self.session.lock();
        if !state.queues.to_receive.contains_key(&number) {
            debug!(
                "Ignoring block #{number} from {}, not awaited",
                channel.peer_id()
            );
            return;
        }
        state.queues.receive(PendingBlock { block, channel });
        self.metrics.blocks_received.inc();
        self.refresh_gauges(&state);
    }

    fn process(&self) {
        if !self.is_running() {
            return;
        }
        let mut disconnect = Vec::new();
        let finished = self.import_ready_blocks(&mut disconnect);
        for channel in disconnect {
            info!("Disconnecting {} after an invalid block", channel.peer_id());
            channel.disconnect(DisconnectReason::BadPeer);
        }
        if finished {
            self.stop();
        }
    }

    /// Returns true once the chain head reached `target - 1`.
    fn import_ready_blocks(&self, disconnect: &mut Vec<Arc<dyn Channel>>) -> bool {
        let latest = self.chain.latest_block_number();
        let mut state = self.session.lock();
        if latest.saturating_add(1) >= state.target {
            return true;
        }

        let from = latest.saturating_add(1);
        let mut checkpoint = from;
        while self.skip_votes(checkpoint, state.target) {
            checkpoint = checkpoint.saturating_add(1);
        }

        while let Some(entry) = state.queues.to_validate.first_entry() {
            let number = *entry.key();
            if number <= latest {
                entry.remove();
            } else if number <= checkpoint {
                let pending = entry.remove();
                state.queues.to_import.insert(number, pending);
            } else {
                break;
            }
        }
        state.queues.to_import.retain(|number, _| *number > latest);

        let complete = (from..=checkpoint).all(|n| state.queues.to_import.contains_key(&n));
        if complete && self.validate_block_hashes(&mut state, from, checkpoint, disconnect) {
            for number in from..=checkpoint {
                let Some(pending) = state.queues.to_import.remove(&number) else {
                    break;
                };
                match self.chain.import_block(&pending.block, false) {
                    Ok(true) => {
                        self.metrics.blocks_imported.inc();
                        if number == checkpoint {
                            info!("Imported checkpoint block #{number}");
                        } else {
                            debug!("Imported block #{number}");
                        }
                    }
                    Ok(false) => {
                        self.handle_invalid_block(&mut state, number, &pending.channel, disconnect);
                        break;
                    }
                    Err(fault) => {
                        error!("Failed to import block #{number}, will retry: {fault}");
                        state.queues.to_import.insert(number, pending);
                        break;
                    }
                }
            }
            state.current = self.chain.latest_block_number().saturating_add(1);
        }

        self.refresh_gauges(&state);
        false
    }

    /// Checks the votes of block `to` and the hash links of `from..=to`,
    /// all of which must be in `to_import`.
    fn validate_block_hashes(
        &self,
        state: &mut SessionState,
        from: u64,
        to: u64,
        disconnect: &mut Vec<Arc<dyn Channel>>,
    ) -> bool {
        let Some(checkpoint) = state.queues.to_import.get(&to) else {
            return false;
        };
        if !self.chain.validate_block_votes(&checkpoint.block) {
            let channel = checkpoint.channel.clone();
            self.handle_invalid_block(state, to, &channel, disconnect);
            return false;
        }

        let mut number = to;
        while number > from {
            let parent_number = number.saturating_sub(1);
            let (Some(parent), Some(child)) = (
                state.queues.to_import.get(&parent_number),
                state.queues.to_import.get(&number),
            ) else {
                return false;
            };
            let linked = parent
                .block
                .hash()
                .is_ok_and(|hash| hash == *child.block.parent_hash());
            if !linked {
                let channel = parent.channel.clone();
                self.handle_invalid_block(state, parent_number, &channel, disconnect);
                return false;
            }
            number = parent_number;
        }
        true
    }

    /// Re-queues `number`, drops it from every other queue and bans the peer
    /// that served it for the rest of the session.
    fn handle_invalid_block(
        &self,
        state: &mut SessionState,
        number: u64,
        channel: &Arc<dyn Channel>,
        disconnect: &mut Vec<Arc<dyn Channel>>,
    ) {
        warn!("Invalid block #{number} from peer {}", channel.peer_id());
        state.queues.requeue(number);
        state.bad_peers.insert(channel.peer_id().to_string());
        self.metrics.invalid_blocks.inc();
        self.metrics.bad_peers.set_len(state.bad_peers.len());
        if self.config.disconnect_on_invalid_block {
            disconnect.push(channel.clone());
        }
    }

    fn report(&self) {
        if !self.is_running() {
            return;
        }
        let latest = self.chain.latest_block_number();
        let mut state = self.session.lock();
        let rate = latest
            .saturating_sub(state.last_observed)
            .checked_div(self.config.report_interval_secs)
            .unwrap_or(0);
        info!(
            "Syncing status: importing {rate} blocks per second, {} to download, {} to receive, \
             {} to validate, {} to import",
            state.queues.to_download.len(),
            state.queues.to_receive.len(),
            state.queues.to_validate.len(),
            state.queues.to_import.len(),
        );
        state.last_observed = latest;
        self.refresh_gauges(&state);
    }

    fn refresh_gauges(&self, state: &SessionState) {
        self.metrics.to_download.set_len(state.queues.to_download.len());
        self.metrics.to_receive.set_len(state.queues.to_receive.len());
        self.metrics.to_validate.set_len(state.queues.to_validate.len());
        self.metrics.to_import.set_len(state.queues.to_import.len());
    }
}
