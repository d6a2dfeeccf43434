//! The in-memory task queue: the only arbiter of which worker processes
//! which reference.
//!
//! A single mutex guards `pending`, `inProgress`, `completed` and
//! `retries` together, so every operation below is one atomic step rather
//! than four independently-locked maps — a per-collection lock would let
//! a worker observe the four collections in an inconsistent combination
//! between locks.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

struct InProgressEntry {
    worker_id: usize,
    started_at: Instant,
    #[allow(dead_code)]
    attempt: u32,
}

struct State {
    pending: VecDeque<String>,
    in_progress: HashMap<String, InProgressEntry>,
    completed: HashSet<String>,
    retries: HashMap<String, u32>,
    terminal_failed: HashSet<String>,
}

/// Queue-conservation statistics, per spec §4.1 `stats()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub terminal_failed: usize,
}

impl QueueStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.terminal_failed
    }

    /// The drain condition: no pending work and no in-flight attempts.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.in_progress == 0
    }
}

pub struct TaskQueue {
    state: Mutex<State>,
}

impl TaskQueue {
    #[must_use]
    pub fn new(initial: Vec<String>) -> Self {
        Self {
            state: Mutex::new(State {
                pending: initial.into(),
                in_progress: HashMap::new(),
                completed: HashSet::new(),
                retries: HashMap::new(),
                terminal_failed: HashSet::new(),
            }),
        }
    }

    /// Pop the head of `pending` for `worker_id`, recording an in-progress
    /// entry. Returns `None` if `pending` is currently empty — the caller
    /// distinguishes "empty but work outstanding" from "drained" via
    /// [`TaskQueue::stats`].
    pub async fn get(&self, worker_id: usize) -> Option<String> {
        let mut state = self.state.lock().await;
        let reference = state.pending.pop_front()?;
        let attempt = state.retries.get(&reference).copied().unwrap_or(0) + 1;
        state.in_progress.insert(
            reference.clone(),
            InProgressEntry {
                worker_id,
                started_at: Instant::now(),
                attempt,
            },
        );
        Some(reference)
    }

    /// Record a successful terminal outcome for `reference`.
    pub async fn complete(&self, reference: &str) {
        let mut state = self.state.lock().await;
        state.in_progress.remove(reference);
        state.completed.insert(reference.to_string());
        state.retries.remove(reference);
    }

    /// Record a failed attempt. Requeues onto `pending` if `retries[ref]`
    /// is still within `max_retries`; otherwise records a terminal
    /// failure. Returns `true` if this was a terminal failure.
    pub async fn fail(&self, reference: &str, max_retries: u32) -> bool {
        let mut state = self.state.lock().await;
        state.in_progress.remove(reference);
        let attempts = state.retries.entry(reference.to_string()).or_insert(0);
        *attempts += 1;

        if *attempts <= max_retries {
            state.pending.push_back(reference.to_string());
            false
        } else {
            state.retries.remove(reference);
            state.terminal_failed.insert(reference.to_string());
            true
        }
    }

    /// References whose `inProgress` entry is older than `threshold`.
    pub async fn stuck(&self, threshold: std::time::Duration) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .in_progress
            .iter()
            .filter(|(_, entry)| entry.started_at.elapsed() >= threshold)
            .map(|(reference, _)| reference.clone())
            .collect()
    }

    /// Remove `reference` from `inProgress` and re-append it to `pending`
    /// (tail, per spec — head is also acceptable but tail is simpler and
    /// still bounded by the watchdog period).
    pub async fn recover(&self, reference: &str) {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.in_progress.remove(reference) {
            warn!(
                reference,
                worker_id = entry.worker_id,
                stuck_for_secs = entry.started_at.elapsed().as_secs(),
                "recovering stuck reference"
            );
            state.pending.push_back(reference.to_string());
        }
    }

    pub async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        QueueStats {
            pending: state.pending.len(),
            in_progress: state.in_progress.len(),
            completed: state.completed.len(),
            terminal_failed: state.terminal_failed.len(),
        }
    }

    pub async fn terminal_failures(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.terminal_failed.iter().cloned().collect()
    }

    /// Log a progress summary at the current stats snapshot.
    pub async fn log_progress(&self) {
        let stats = self.stats().await;
        info!(
            pending = stats.pending,
            in_progress = stats.in_progress,
            completed = stats.completed,
            terminal_failed = stats.terminal_failed,
            "queue progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn get_returns_none_when_pending_is_empty() {
        let queue = TaskQueue::new(vec![]);
        assert_eq!(queue.get(0).await, None);
    }

    #[tokio::test]
    async fn complete_moves_reference_out_of_in_progress() {
        let queue = TaskQueue::new(vec!["A".to_string()]);
        let r = queue.get(0).await.unwrap();
        assert_eq!(r, "A");
        queue.complete(&r).await;

        let stats = queue.stats().await;
        assert_eq!(stats.in_progress, 0);
        assert_eq!(stats.completed, 1);
        assert!(stats.is_drained());
    }

    #[tokio::test]
    async fn fail_requeues_until_max_retries_then_terminal() {
        let queue = TaskQueue::new(vec!["A".to_string()]);

        // attempt 1
        queue.get(0).await.unwrap();
        let terminal = queue.fail("A", 2).await;
        assert!(!terminal);
        assert_eq!(queue.stats().await.pending, 1);

        // attempt 2
        queue.get(0).await.unwrap();
        let terminal = queue.fail("A", 2).await;
        assert!(!terminal);

        // attempt 3 (== max_retries + 1 total attempts)
        queue.get(0).await.unwrap();
        let terminal = queue.fail("A", 2).await;
        assert!(terminal);

        let stats = queue.stats().await;
        assert_eq!(stats.terminal_failed, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.in_progress, 0);
        assert!(stats.is_drained());
    }

    #[tokio::test]
    async fn queue_conservation_holds_across_get_fail_cycles() {
        let initial: Vec<String> = (0..20).map(|i| format!("R{i}")).collect();
        let total = initial.len();
        let queue = TaskQueue::new(initial);

        for _ in 0..total {
            let r = queue.get(0).await.unwrap();
            if r.ends_with('3') {
                queue.fail(&r, 0).await;
            } else {
                queue.complete(&r).await;
            }
        }

        // Drain any requeued failures from retries exhausted immediately (max_retries=0).
        while let Some(r) = queue.get(0).await {
            queue.fail(&r, 0).await;
        }

        let stats = queue.stats().await;
        assert_eq!(stats.total(), total);
    }

    #[tokio::test]
    async fn stuck_detects_entries_older_than_threshold() {
        let queue = TaskQueue::new(vec!["A".to_string()]);
        queue.get(0).await.unwrap();

        assert!(queue.stuck(Duration::from_secs(10)).await.is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let stuck = queue.stuck(Duration::from_millis(10)).await;
        assert_eq!(stuck, vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn recover_moves_stuck_reference_back_to_pending() {
        let queue = TaskQueue::new(vec!["A".to_string()]);
        queue.get(0).await.unwrap();
        queue.recover("A").await;

        let stats = queue.stats().await;
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 0);

        // Another worker can now pick it up.
        let r = queue.get(1).await.unwrap();
        assert_eq!(r, "A");
    }

    #[tokio::test]
    async fn a_reference_is_never_in_two_worker_in_progress_entries_at_once() {
        let queue = Arc::new(TaskQueue::new(vec!["A".to_string()]));
        let a = queue.clone();
        let b = queue.clone();

        let (r1, r2) = tokio::join!(
            async move { a.get(0).await },
            async move { b.get(1).await },
        );

        // Only one of the two concurrent getters can have received "A".
        assert!(r1.is_some() ^ r2.is_some());
    }
}
