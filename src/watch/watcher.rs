// src/watch/watcher.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument, Span};

use crate::errors::{Result, RunwatchError};
use crate::fs::FileSystem;
use crate::watch::batch::ChangeEventBatch;
use crate::watch::ignore::IgnoreMatcher;
use crate::watch::snapshot::{diff, scan_tree, Snapshot};

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polling behaviour of a [`ChangeWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub recursive: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            recursive: true,
        }
    }
}

/// Lifecycle of a watch session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    NotStarted,
    Running,
    Stopped,
}

impl SessionPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionPhase::NotStarted,
            1 => SessionPhase::Running,
            _ => SessionPhase::Stopped,
        }
    }
}

/// Shared, read-only view of a session's lifecycle.
///
/// Cloned handles stay valid after the watcher itself has been moved into
/// (or dropped by) the orchestrator.
#[derive(Debug, Clone)]
pub struct SessionState(Arc<AtomicU8>);

impl SessionState {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SessionPhase::NotStarted as u8)))
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.phase() == SessionPhase::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.phase() == SessionPhase::Stopped
    }

    fn advance(&self, to: SessionPhase) {
        self.0.fetch_max(to as u8, Ordering::AcqRel);
    }
}

/// Consumable stream of change batches from one session.
///
/// Ends (yields `None`) once the session has been stopped and the in-flight
/// poll has finished.
#[derive(Debug)]
pub struct ChangeBatches {
    rx: mpsc::UnboundedReceiver<ChangeEventBatch>,
}

impl ChangeBatches {
    pub async fn next(&mut self) -> Option<ChangeEventBatch> {
        self.rx.recv().await
    }

    /// Take a batch that is already buffered, without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEventBatch> {
        self.rx.try_recv().ok()
    }
}

/// Recursive polling watcher over a directory tree.
pub struct ChangeWatcher {
    root: PathBuf,
    options: WatchOptions,
    fs: Arc<dyn FileSystem>,
    matcher: Arc<IgnoreMatcher>,
    state: SessionState,
    stop: CancellationToken,
    batches_tx: Option<mpsc::UnboundedSender<ChangeEventBatch>>,
    batches_rx: Option<mpsc::UnboundedReceiver<ChangeEventBatch>>,
    poller: Option<JoinHandle<()>>,
    span: Span,
}

impl fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    /// Create a watcher for `root`, loading its ignore rules immediately.
    ///
    /// Nothing is polled until [`ChangeWatcher::start`] is called.
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, options: WatchOptions) -> Self {
        let root = root.into();
        // Canonicalize once so we have a stable base path.
        let root = fs.canonicalize(&root).unwrap_or(root);
        let matcher = IgnoreMatcher::load(fs.as_ref(), &root);
        let span = info_span!("watch", root = %root.display());
        Self::with_matcher(fs, root, matcher, options).with_span(span)
    }

    /// Create a watcher with an explicit matcher instead of the root's ignore file.
    pub fn with_matcher(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        matcher: IgnoreMatcher,
        options: WatchOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            root: root.into(),
            options,
            fs,
            matcher: Arc::new(matcher),
            state: SessionState::new(),
            stop: CancellationToken::new(),
            batches_tx: Some(tx),
            batches_rx: Some(rx),
            poller: None,
            span: Span::none(),
        }
    }

    /// Replace the span the poll task logs under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }

    pub fn session_state(&self) -> SessionState {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Take the baseline snapshot and spawn the poll task.
    ///
    /// The baseline scan runs on the blocking pool. Must be called from
    /// within a Tokio runtime. A session can only be started once.
    pub async fn start(&mut self) -> Result<()> {
        if self.state.phase() != SessionPhase::NotStarted {
            return Err(RunwatchError::WatchError(format!(
                "watch session on {:?} was already started",
                self.root
            )));
        }

        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();
        let matcher = Arc::clone(&self.matcher);
        let recursive = self.options.recursive;
        let baseline = tokio::task::spawn_blocking(move || {
            scan_tree(fs.as_ref(), &root, &matcher, recursive, &Snapshot::new())
        })
        .await?
        .map_err(|err| RunwatchError::WatchError(format!("{err:#}")))?;

        let tx = self.batches_tx.take().ok_or_else(|| {
            RunwatchError::WatchError("watch session has no batch sender".to_string())
        })?;

        self.span.in_scope(|| {
            info!(
                files = baseline.len(),
                poll_interval = ?self.options.poll_interval,
                "watch session started"
            )
        });

        let poll = PollLoop {
            fs: Arc::clone(&self.fs),
            root: self.root.clone(),
            matcher: Arc::clone(&self.matcher),
            options: self.options,
            stop: self.stop.clone(),
            tx,
        };
        self.poller = Some(tokio::spawn(poll.run(baseline).instrument(self.span.clone())));
        self.state.advance(SessionPhase::Running);
        Ok(())
    }

    /// Signal the poll task to finish. Idempotent.
    ///
    /// The batch stream ends once the in-flight poll (if any) completes.
    pub fn stop(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        self.stop.cancel();
        // A session that never started still owns the sender.
        self.batches_tx = None;
        self.state.advance(SessionPhase::Stopped);
        self.span.in_scope(|| debug!("watch session stopped"));
    }

    /// Wait for the poll task to exit after [`ChangeWatcher::stop`].
    pub async fn wait_stopped(&mut self) {
        if let Some(poller) = self.poller.take() {
            if let Err(err) = poller.await {
                self.span
                    .in_scope(|| debug!(error = %err, "poll task ended abnormally"));
            }
        }
    }

    /// The session's batch stream. Can only be taken once.
    pub fn change_batches(&mut self) -> Result<ChangeBatches> {
        self.batches_rx
            .take()
            .map(|rx| ChangeBatches { rx })
            .ok_or_else(|| {
                RunwatchError::WatchError("change batch stream was already taken".to_string())
            })
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop.cancel();
        self.state.advance(SessionPhase::Stopped);
    }
}

/// State owned by the background poll task.
struct PollLoop {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    matcher: Arc<IgnoreMatcher>,
    options: WatchOptions,
    stop: CancellationToken,
    tx: mpsc::UnboundedSender<ChangeEventBatch>,
}

impl PollLoop {
    async fn run(self, mut snapshot: Snapshot) {
        let period = self.options.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fs = Arc::clone(&self.fs);
            let root = self.root.clone();
            let matcher = Arc::clone(&self.matcher);
            let recursive = self.options.recursive;
            let previous = std::mem::take(&mut snapshot);

            let scanned = tokio::task::spawn_blocking(move || {
                let current = scan_tree(fs.as_ref(), &root, &matcher, recursive, &previous);
                (previous, current)
            })
            .await;

            let (previous, current) = match scanned {
                Ok(result) => result,
                Err(err) => {
                    debug!(error = %err, "poll task panicked; ending session");
                    break;
                }
            };

            let current = match current {
                Ok(current) => current,
                Err(err) => {
                    debug!(error = %err, "poll skipped; root could not be listed");
                    snapshot = previous;
                    continue;
                }
            };

            let events = diff(&previous, &current, SystemTime::now());
            snapshot = current;

            if let Some(batch) = ChangeEventBatch::new(events) {
                debug!(changes = batch.len(), "{batch}");
                if self.tx.send(batch).is_err() {
                    debug!("batch stream dropped; ending session");
                    break;
                }
            }
        }

        debug!("poll loop finished");
    }
}
