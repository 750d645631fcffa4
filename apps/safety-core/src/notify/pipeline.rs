//! Queue, worker, and watchdog wiring.
//!
//! The worker owns delivery: it pops alerts, applies emergency rate
//! limiting, and sends through the transport under a client-side timeout.
//! The watchdog owns liveness: if the queue has a backlog and the worker
//! has made no dequeue progress past the stall threshold, it cancels and
//! respawns the worker. Progress is reset on restart, so one stall episode
//! costs exactly one restart.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;

use super::Notifier;
use super::push::AlertTransport;
use super::queue::AlertQueue;
use super::rate_limit::EmergencyRateLimiter;
use super::request::{NotificationRequest, Priority};

/// How long a cancelled worker gets to wind down before being aborted.
const WORKER_STOP_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Worker supervision state
// ============================================================================

/// Observable worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Worker task is live.
    Running,
    /// Watchdog is mid-restart.
    Restarting,
}

struct WorkerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Supervisor {
    state: WorkerState,
    restarts: u64,
    worker: Option<WorkerHandle>,
}

struct Shared {
    queue: AlertQueue,
    transport: Arc<dyn AlertTransport>,
    limiter: EmergencyRateLimiter,
    send_timeout: Duration,
    heartbeat_interval: Duration,
    stall_threshold: Duration,
    /// Last time the worker demonstrated dequeue progress.
    progress: Mutex<Instant>,
    supervisor: Mutex<Supervisor>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn touch_progress(&self) {
        *lock(&self.progress) = Instant::now();
    }

    fn since_progress(&self) -> Duration {
        lock(&self.progress).elapsed()
    }

    async fn deliver(&self, request: NotificationRequest) {
        if request.priority == Priority::Emergency && !self.limiter.should_send(&request.key) {
            debug!(key = %request.key, "Emergency alert suppressed by rate limit");
            return;
        }
        match time::timeout(self.send_timeout, self.transport.deliver(&request)).await {
            Ok(Ok(())) => debug!(key = %request.key, "Alert delivered"),
            Ok(Err(err)) => {
                warn!(key = %request.key, error = %err, "Alert delivery failed, dropping");
            }
            Err(_) => {
                warn!(
                    key = %request.key,
                    timeout_secs = self.send_timeout.as_secs(),
                    "Alert delivery timed out, dropping"
                );
            }
        }
    }
}

/// Stall predicate: a worker is only stalled while there is work it is
/// failing to take.
fn is_stalled(queue_len: usize, since_progress: Duration, threshold: Duration) -> bool {
    queue_len > 0 && since_progress >= threshold
}

// ============================================================================
// Worker and watchdog loops
// ============================================================================

fn spawn_worker(shared: &Arc<Shared>) -> WorkerHandle {
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(worker_loop(Arc::clone(shared), cancel.clone()));
    WorkerHandle { cancel, handle }
}

async fn worker_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut heartbeat = time::interval(shared.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = heartbeat.tick() => {
                debug!(queue_len = shared.queue.len(), "Notification worker heartbeat");
            }
            request = shared.queue.pop() => {
                shared.touch_progress();
                shared.deliver(request).await;
                shared.touch_progress();
            }
        }
    }
    debug!("Notification worker stopped");
}

async fn stop_worker(worker: WorkerHandle) {
    worker.cancel.cancel();
    let abort = worker.handle.abort_handle();
    match time::timeout(WORKER_STOP_GRACE, worker.handle).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "Notification worker task failed"),
        Err(_) => {
            abort.abort();
            warn!("Notification worker did not stop in time, aborted");
        }
    }
}

async fn restart_worker(shared: &Arc<Shared>) {
    // Bookkeeping under the lock; cancellation and the respawn happen
    // outside it.
    let taken = {
        let mut supervisor = lock(&shared.supervisor);
        supervisor.state = WorkerState::Restarting;
        supervisor.restarts += 1;
        supervisor.worker.take()
    };
    if let Some(worker) = taken {
        stop_worker(worker).await;
    }
    shared.touch_progress();
    let replacement = spawn_worker(shared);
    let mut supervisor = lock(&shared.supervisor);
    supervisor.worker = Some(replacement);
    supervisor.state = WorkerState::Running;
}

async fn watchdog_loop(shared: Arc<Shared>, cancel: CancellationToken, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let since = shared.since_progress();
                let backlog = shared.queue.len();
                if is_stalled(backlog, since, shared.stall_threshold) {
                    warn!(
                        queue_len = backlog,
                        stalled_secs = since.as_secs(),
                        "Notification worker stalled, restarting"
                    );
                    restart_worker(&shared).await;
                }
            }
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Self-healing notification pipeline: bounded queue, delivery worker,
/// liveness watchdog.
pub struct NotificationPipeline {
    shared: Arc<Shared>,
    watchdog_cancel: CancellationToken,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationPipeline {
    /// Spawn the worker and watchdog and return the running pipeline.
    #[must_use]
    pub fn start(config: &NotificationConfig, transport: Arc<dyn AlertTransport>) -> Self {
        let shared = Arc::new(Shared {
            queue: AlertQueue::new(config.queue_capacity),
            transport,
            limiter: EmergencyRateLimiter::new(config.emergency_renotify_interval()),
            send_timeout: config.send_timeout(),
            heartbeat_interval: config.heartbeat_interval(),
            stall_threshold: config.stall_threshold(),
            progress: Mutex::new(Instant::now()),
            supervisor: Mutex::new(Supervisor {
                state: WorkerState::Running,
                restarts: 0,
                worker: None,
            }),
        });
        let worker = spawn_worker(&shared);
        lock(&shared.supervisor).worker = Some(worker);

        let watchdog_cancel = CancellationToken::new();
        let watchdog = tokio::spawn(watchdog_loop(
            Arc::clone(&shared),
            watchdog_cancel.clone(),
            config.watchdog_interval(),
        ));
        info!(
            queue_capacity = config.queue_capacity,
            stall_threshold_secs = config.stall_threshold_secs,
            "Notification pipeline started"
        );
        Self {
            shared,
            watchdog_cancel,
            watchdog: Mutex::new(Some(watchdog)),
        }
    }

    /// Current worker lifecycle state.
    #[must_use]
    pub fn worker_state(&self) -> WorkerState {
        lock(&self.shared.supervisor).state
    }

    /// Number of watchdog-initiated restarts so far.
    #[must_use]
    pub fn restarts(&self) -> u64 {
        lock(&self.shared.supervisor).restarts
    }

    /// Number of alerts currently queued.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Stop the watchdog, then the worker, then drain the queue: remaining
    /// high/emergency alerts are delivered best-effort, normal-priority
    /// alerts are discarded.
    pub async fn shutdown(&self) {
        self.watchdog_cancel.cancel();
        let watchdog = lock(&self.watchdog).take();
        if let Some(handle) = watchdog {
            let _ = handle.await;
        }
        let worker = lock(&self.shared.supervisor).worker.take();
        if let Some(worker) = worker {
            stop_worker(worker).await;
        }

        let mut discarded = 0usize;
        for request in self.shared.queue.drain() {
            if request.priority.droppable() {
                discarded += 1;
            } else {
                self.shared.deliver(request).await;
            }
        }
        info!(discarded, "Notification pipeline stopped");
    }
}

impl Notifier for NotificationPipeline {
    fn notify(&self, request: NotificationRequest) -> bool {
        let key = request.key.clone();
        let accepted = self.shared.queue.push(request);
        if !accepted {
            warn!(key = %key, "Notification dropped, queue at capacity");
        }
        accepted
    }
}
