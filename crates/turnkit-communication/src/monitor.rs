//! Continuous monitor
//!
//! Passive observation of device output outside the request/response cycle.
//! A background task drains the incoming buffer line by line and hands each
//! line, timestamped, to a caller-supplied callback. The task shares the
//! command channel's mutex, so it never reads mid-exchange.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::channel::CommandChannel;

/// Idle sleep between polls. Also bounds cancellation latency.
pub const MONITOR_POLL: Duration = Duration::from_millis(10);

/// One line of passively observed device output.
#[derive(Debug, Clone)]
pub struct MonitorLine {
    /// When the line was read.
    pub received_at: DateTime<Local>,
    /// The line, trimmed.
    pub text: String,
}

/// Callback invoked for each monitored line.
pub type LineCallback = Arc<dyn Fn(MonitorLine) + Send + Sync>;

/// A running monitor task.
///
/// Exists only while monitoring is requested; torn down on stop or
/// disconnect.
pub struct MonitorSession {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MonitorSession {
    /// Spawn the polling task.
    ///
    /// With `duration` set the task stops itself at the deadline (bounded
    /// mode); without, it runs until [`MonitorSession::stop`].
    pub fn spawn(
        channel: Arc<Mutex<CommandChannel>>,
        duration: Option<Duration>,
        on_line: LineCallback,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let task = tokio::spawn(async move {
            let deadline = duration.map(|d| tokio::time::Instant::now() + d);
            loop {
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                if let Some(deadline) = deadline {
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                }

                // Lock held only for a single poll, so a foreground
                // exchange is never interleaved with.
                let polled = {
                    let mut channel = channel.lock().await;
                    channel.poll_line()
                };

                match polled {
                    Ok(Some(text)) => on_line(MonitorLine {
                        received_at: Local::now(),
                        text,
                    }),
                    Ok(None) => tokio::time::sleep(MONITOR_POLL).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "monitor read failed");
                        tokio::time::sleep(MONITOR_POLL).await;
                    }
                }
            }
            tracing::debug!("monitor stopped");
        });

        Self { stop, task }
    }

    /// Request a stop and tear the task down. Latency is bounded by
    /// [`MONITOR_POLL`].
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.task.abort();
    }

    /// Whether the task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Wait for a bounded session to reach its deadline.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}
