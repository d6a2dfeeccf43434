//! Periodic watchdog: recovers in-progress references that have sat past
//! the stuck threshold, the backstop for hangs that never hit a worker's
//! own per-task timeout.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::task_queue::TaskQueue;

/// Runs until the queue's drain condition holds or `shutdown` fires,
/// ticking every `watchdog_interval`. Each tick snapshots
/// `stuck(stuck_threshold)`, recovers every stuck reference, and logs a
/// progress summary.
pub async fn watchdog_loop(
    queue: Arc<TaskQueue>,
    watchdog_interval: Duration,
    stuck_threshold: Duration,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            () = tokio::time::sleep(watchdog_interval) => {}
        }

        let stuck = queue.stuck(stuck_threshold).await;
        for reference in &stuck {
            warn!(reference = %reference, "watchdog recovering stuck reference");
            queue.recover(reference).await;
        }

        queue.log_progress().await;

        if queue.stats().await.is_drained() {
            return;
        }
    }
}
