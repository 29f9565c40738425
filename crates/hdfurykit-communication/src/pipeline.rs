//! Serialized command pipeline
//!
//! A single consumer task drains a FIFO queue of caller requests, enforces
//! a minimum spacing between dispatches (the units drop lines that arrive
//! back to back), and resolves each caller's completion handle exactly
//! once.

use crate::config::PipelineConfig;
use async_trait::async_trait;
use hdfurykit_core::StatusCode;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Seam between the pipeline and the wire layer
///
/// The controller supplies the production implementation; tests substitute
/// their own to observe dispatch timing.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Execute one command identifier, folding any failure into a status
    async fn dispatch(&self, command: &str) -> StatusCode;
}

/// A queued caller request
struct PendingCommand {
    command: String,
    done: oneshot::Sender<StatusCode>,
}

/// Shared pipeline counters read by the keep-alive loop
#[derive(Default)]
pub struct PipelineStats {
    in_flight: AtomicBool,
    queued: AtomicUsize,
    last_dispatch: Mutex<Option<Instant>>,
    last_success: Mutex<Option<Instant>>,
}

impl PipelineStats {
    /// True while a dispatch is executing or requests are queued
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Relaxed) || self.queued.load(Ordering::Relaxed) > 0
    }

    /// Number of requests waiting in the queue
    pub fn queued_commands(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Time since the last successful dispatch, if any ever completed
    pub fn time_since_success(&self) -> Option<Duration> {
        self.last_success.lock().map(|t| t.elapsed())
    }

    /// Refresh the success timestamp without a dispatch
    ///
    /// Used after an out-of-band reconnect proves the link healthy.
    pub fn mark_success_now(&self) {
        *self.last_success.lock() = Some(Instant::now());
    }

    fn record_dispatch(&self, result: StatusCode) {
        let now = Instant::now();
        *self.last_dispatch.lock() = Some(now);
        if result == StatusCode::Ok {
            *self.last_success.lock() = Some(now);
        }
    }
}

/// Single-consumer command queue with rate limiting
pub struct CommandPipeline {
    tx: mpsc::UnboundedSender<PendingCommand>,
    shutdown: mpsc::Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<PipelineStats>,
    config: PipelineConfig,
}

impl CommandPipeline {
    /// Spawn the consumer task
    pub fn spawn(dispatcher: Arc<dyn CommandDispatcher>, config: PipelineConfig) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingCommand>();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let stats = Arc::new(PipelineStats::default());

        let worker_stats = stats.clone();
        let min_interval = Duration::from_millis(config.min_command_interval_ms);
        let worker = tokio::spawn(async move {
            tracing::info!("Command pipeline started");
            loop {
                let pending = tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    pending = rx.recv() => match pending {
                        Some(pending) => pending,
                        None => break,
                    },
                };
                worker_stats.queued.fetch_sub(1, Ordering::Relaxed);

                let since_last = worker_stats.last_dispatch.lock().map(|t| t.elapsed());
                if let Some(since_last) = since_last {
                    if since_last < min_interval {
                        let wait = min_interval - since_last;
                        tracing::debug!("Rate limiting: sleeping {:?} before command", wait);
                        sleep(wait).await;
                    }
                }

                worker_stats.in_flight.store(true, Ordering::Relaxed);
                let result = dispatcher.dispatch(&pending.command).await;
                worker_stats.in_flight.store(false, Ordering::Relaxed);
                worker_stats.record_dispatch(result);

                // The caller may have given up waiting; resolving an
                // abandoned handle is a no-op.
                let _ = pending.done.send(result);
            }
            tracing::info!("Command pipeline stopped");
        });

        Self {
            tx,
            shutdown: shutdown_tx,
            worker: Mutex::new(Some(worker)),
            stats,
            config,
        }
    }

    /// Shared counters for health checks
    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    /// Queue a command and wait for its result
    ///
    /// The wait is capped; when the cap expires the caller gets
    /// `ServerError` but the dispatch itself is NOT cancelled — it still
    /// runs to completion and resolves its (now abandoned) handle.
    pub async fn enqueue(&self, command: &str) -> StatusCode {
        let (done_tx, done_rx) = oneshot::channel();
        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        let pending = PendingCommand {
            command: command.to_string(),
            done: done_tx,
        };
        if self.tx.send(pending).is_err() {
            self.stats.queued.fetch_sub(1, Ordering::Relaxed);
            tracing::error!("Command '{}' rejected: pipeline is stopped", command);
            return StatusCode::ServerError;
        }

        match timeout(
            Duration::from_millis(self.config.enqueue_timeout_ms),
            done_rx,
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                tracing::error!("Command '{}' abandoned: pipeline stopped", command);
                StatusCode::ServerError
            }
            Err(_) => {
                tracing::error!("Command '{}' timed out in queue", command);
                StatusCode::ServerError
            }
        }
    }

    /// Stop the consumer; queued requests are abandoned
    pub async fn shutdown(&self) {
        let _ = self.shutdown.try_send(());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.abort();
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingDispatcher {
        dispatched: Mutex<Vec<(String, Instant)>>,
        result: StatusCode,
        delay: Duration,
    }

    impl RecordingDispatcher {
        fn new(result: StatusCode) -> Arc<Self> {
            Arc::new(Self {
                dispatched: Mutex::new(Vec::new()),
                result,
                delay: Duration::ZERO,
            })
        }

        fn slow(result: StatusCode, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                dispatched: Mutex::new(Vec::new()),
                result,
                delay,
            })
        }
    }

    #[async_trait]
    impl CommandDispatcher for RecordingDispatcher {
        async fn dispatch(&self, command: &str) -> StatusCode {
            self.dispatched
                .lock()
                .push((command.to_string(), Instant::now()));
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.result
        }
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            min_command_interval_ms: 50,
            enqueue_timeout_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn commands_complete_in_fifo_order() {
        let dispatcher = RecordingDispatcher::new(StatusCode::Ok);
        let pipeline = CommandPipeline::spawn(dispatcher.clone(), fast_config());

        assert_eq!(pipeline.enqueue("set_cec_on").await, StatusCode::Ok);
        assert_eq!(pipeline.enqueue("set_cec_off").await, StatusCode::Ok);

        let dispatched = dispatcher.dispatched.lock();
        let names: Vec<_> = dispatched.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["set_cec_on", "set_cec_off"]);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn consecutive_dispatches_are_spaced() {
        let dispatcher = RecordingDispatcher::new(StatusCode::Ok);
        let pipeline = CommandPipeline::spawn(dispatcher.clone(), fast_config());

        pipeline.enqueue("set_oled_on").await;
        pipeline.enqueue("set_oled_off").await;
        pipeline.enqueue("set_oled_on").await;

        let dispatched = dispatcher.dispatched.lock();
        for pair in dispatched.windows(2) {
            let gap = pair[1].1.duration_since(pair[0].1);
            assert!(
                gap >= Duration::from_millis(45),
                "dispatch gap {:?} below minimum spacing",
                gap
            );
        }
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn caller_wait_expires_without_cancelling_dispatch() {
        let dispatcher =
            RecordingDispatcher::slow(StatusCode::Ok, Duration::from_millis(300));
        let pipeline = CommandPipeline::spawn(
            dispatcher.clone(),
            PipelineConfig {
                min_command_interval_ms: 0,
                enqueue_timeout_ms: 50,
            },
        );

        // The caller gives up before the slow dispatch finishes.
        assert_eq!(pipeline.enqueue("set_cec_on").await, StatusCode::ServerError);

        // The dispatch itself still ran.
        sleep(Duration::from_millis(400)).await;
        assert_eq!(dispatcher.dispatched.lock().len(), 1);
        assert!(!pipeline.stats().is_busy());
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn success_timestamp_tracks_only_ok_results() {
        let dispatcher = RecordingDispatcher::new(StatusCode::ServerError);
        let pipeline = CommandPipeline::spawn(dispatcher, fast_config());

        assert!(pipeline.stats().time_since_success().is_none());
        pipeline.enqueue("set_cec_on").await;
        assert!(pipeline.stats().time_since_success().is_none());

        let ok_dispatcher = RecordingDispatcher::new(StatusCode::Ok);
        let ok_pipeline = CommandPipeline::spawn(ok_dispatcher, fast_config());
        ok_pipeline.enqueue("set_cec_on").await;
        assert!(ok_pipeline.stats().time_since_success().is_some());

        pipeline.shutdown().await;
        ok_pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_rejected() {
        let dispatcher = RecordingDispatcher::new(StatusCode::Ok);
        let pipeline = CommandPipeline::spawn(dispatcher, fast_config());
        pipeline.shutdown().await;
        assert_eq!(
            pipeline.enqueue("set_cec_on").await,
            StatusCode::ServerError
        );
    }
}
