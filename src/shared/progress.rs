//! Dual-mode percentage estimator with a periodic heartbeat.
//!
//! Date-coverage mode measures how far back pagination has reached inside a date window;
//! count mode measures collected messages against a limit. Counters are written by the
//! fetch/summarize callback and read by the heartbeat task, both through the internal lock.

use crate::domain::ProgressEvent;
use crate::ports::ProgressSink;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Every report is out of 100.
pub const PROGRESS_TOTAL: f64 = 100.0;

const MIN_HEARTBEAT: Duration = Duration::from_millis(1);

/// Heartbeat period actually used; tokio intervals reject a zero period.
pub fn heartbeat_period(configured: Duration) -> Duration {
    configured.max(MIN_HEARTBEAT)
}

/// Telegram launch date, used as window start when only an end date is known.
pub fn platform_origin() -> DateTime<Utc> {
    DateTime::from_timestamp(1_376_438_400, 0).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressMode {
    /// Progress = (end − earliest seen) / (end − start).
    DateCoverage {
        end: DateTime<Utc>,
        total_seconds: i64,
    },
    /// Progress = collected / limit. A zero limit stays at 0.
    Count { limit: usize },
}

impl ProgressMode {
    /// Date coverage when a date filter is present and no count limit is given; count otherwise.
    pub fn for_window(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        count_limit: usize,
        now: DateTime<Utc>,
    ) -> Self {
        if (from.is_some() || to.is_some()) && count_limit == 0 {
            Self::date_coverage(from, to, now)
        } else {
            Self::Count { limit: count_limit }
        }
    }

    pub fn date_coverage(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let start = from.unwrap_or_else(platform_origin);
        let end = to.unwrap_or(now);
        let total_seconds = (end - start).num_seconds().max(1);
        Self::DateCoverage { end, total_seconds }
    }
}

#[derive(Debug, Default)]
struct Counters {
    earliest: Option<DateTime<Utc>>,
    collected: usize,
    last_message: String,
    high_water: f64,
}

struct Shared {
    mode: ProgressMode,
    sink: Arc<dyn ProgressSink>,
    token: Option<String>,
    counters: Mutex<Counters>,
}

impl Shared {
    fn counters(&self) -> MutexGuard<'_, Counters> {
        // A panic while holding this lock cannot leave counters half-written; keep going.
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn raw_progress(&self, c: &Counters) -> f64 {
        let p = match self.mode {
            ProgressMode::DateCoverage { end, total_seconds } => match c.earliest {
                None => 0.0,
                Some(earliest) => {
                    let covered = (end - earliest).num_seconds().max(0);
                    covered as f64 / total_seconds as f64 * PROGRESS_TOTAL
                }
            },
            ProgressMode::Count { limit } if limit > 0 => {
                c.collected as f64 / limit as f64 * PROGRESS_TOTAL
            }
            ProgressMode::Count { .. } => 0.0,
        };
        p.clamp(0.0, PROGRESS_TOTAL)
    }

    fn snapshot(&self) -> f64 {
        let mut c = self.counters();
        let p = self.raw_progress(&c);
        if p > c.high_water {
            c.high_water = p;
        }
        c.high_water
    }

    fn send(&self, message: String) {
        let progress = self.snapshot();
        self.sink.notify(ProgressEvent {
            progress,
            total: PROGRESS_TOTAL,
            message,
            progress_token: self.token.clone(),
        });
    }
}

/// Percentage estimator private to one operation.
///
/// Lifecycle: created → `start()` → `stop()`. Starting twice or stopping a non-running
/// estimator panics.
pub struct ProgressEstimator {
    shared: Arc<Shared>,
    heartbeat: Duration,
    state: AtomicU8,
    shutdown: CancellationToken,
}

impl ProgressEstimator {
    pub fn new(
        mode: ProgressMode,
        sink: Arc<dyn ProgressSink>,
        token: Option<String>,
        heartbeat: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                mode,
                sink,
                token,
                counters: Mutex::new(Counters::default()),
            }),
            heartbeat: heartbeat_period(heartbeat),
            state: AtomicU8::new(STATE_CREATED),
            shutdown: CancellationToken::new(),
        }
    }

    /// Launch the heartbeat: every interval, re-send the last status message (if any).
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self) {
        if self
            .state
            .compare_exchange(
                STATE_CREATED,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            panic!("progress estimator already started");
        }

        let shared = Arc::clone(&self.shared);
        let shutdown = self.shutdown.clone();
        let period = self.heartbeat;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = ticker.tick() => {
                        let msg = shared.counters().last_message.clone();
                        if !msg.is_empty() {
                            shared.send(msg);
                        }
                    }
                }
            }
        });
    }

    /// Stop the heartbeat.
    pub fn stop(&self) {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            panic!("progress estimator is not running");
        }
        self.shutdown.cancel();
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.shared.counters().last_message = msg.into();
    }

    pub fn set_collected(&self, count: usize) {
        self.shared.counters().collected = count;
    }

    /// Record a message timestamp; only an earlier one moves the estimate.
    pub fn observe_earliest(&self, t: DateTime<Utc>) {
        let mut c = self.shared.counters();
        if c.earliest.is_none_or(|e| t < e) {
            c.earliest = Some(t);
        }
    }

    /// Current percentage in [0, 100], never lower than a previous snapshot.
    pub fn snapshot(&self) -> f64 {
        self.shared.snapshot()
    }

    /// Emit a notification with the current percentage.
    pub fn send(&self, message: impl Into<String>) {
        self.shared.send(message.into());
    }
}

impl Drop for ProgressEstimator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
