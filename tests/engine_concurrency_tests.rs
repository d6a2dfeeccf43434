//! End-to-end exercise of the task queue and PDF critical section together,
//! simulating several concurrent workers without a real browser — the
//! scenarios from spec.md §8 that don't require driving Chrome.

use pdf_harvester::engine::{PdfLock, TaskQueue};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scenario 2 ("Parallel no-fault") without a browser: N workers race
/// against a shared queue and a shared PDF lock. Checks I1 (never two
/// workers inside the critical section at once), I3 (each reference
/// completes exactly once) and I5/I6 (conservation and drain).
#[tokio::test]
async fn parallel_workers_never_double_process_or_overlap_critical_section() {
    const WORKER_COUNT: usize = 5;
    const REFERENCE_COUNT: usize = 50;

    let references: Vec<String> = (0..REFERENCE_COUNT).map(|i| format!("REF-{i}")).collect();
    let queue = Arc::new(TaskQueue::new(references.clone()));
    let pdf_lock = Arc::new(PdfLock::new(Duration::from_millis(2)));

    let concurrent_in_section = Arc::new(AtomicUsize::new(0));
    let max_concurrent_in_section = Arc::new(AtomicUsize::new(0));
    let completions: Arc<std::sync::Mutex<Vec<String>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for worker_id in 0..WORKER_COUNT {
        let queue = queue.clone();
        let pdf_lock = pdf_lock.clone();
        let concurrent_in_section = concurrent_in_section.clone();
        let max_concurrent_in_section = max_concurrent_in_section.clone();
        let completions = completions.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let Some(reference) = queue.get(worker_id).await else {
                    if queue.stats().await.is_drained() {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    continue;
                };

                let concurrent_in_section = concurrent_in_section.clone();
                let max_concurrent_in_section = max_concurrent_in_section.clone();
                pdf_lock
                    .run(
                        async {
                            let now = concurrent_in_section.fetch_add(1, Ordering::SeqCst) + 1;
                            max_concurrent_in_section.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(1)).await;
                            concurrent_in_section.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, anyhow::Error>(())
                        },
                        || async { Ok(()) },
                    )
                    .await
                    .unwrap();

                completions.lock().unwrap().push(reference.clone());
                queue.complete(&reference).await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // I1
    assert_eq!(max_concurrent_in_section.load(Ordering::SeqCst), 1);

    // I3: every reference completed exactly once.
    let completions = completions.lock().unwrap();
    assert_eq!(completions.len(), REFERENCE_COUNT);
    let mut unique = completions.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), REFERENCE_COUNT);

    // I5/I6: drain condition holds and every reference is accounted for.
    let stats = queue.stats().await;
    assert!(stats.is_drained());
    assert_eq!(stats.completed, REFERENCE_COUNT);
    assert_eq!(stats.total(), REFERENCE_COUNT);
}

/// Scenario 3 ("Per-task timeout") at the queue layer: a reference that
/// keeps failing is retried up to `maxRetries + 1` attempts total, then
/// becomes a terminal failure rather than looping forever (I4).
#[tokio::test]
async fn a_reference_that_always_fails_is_attempted_at_most_max_retries_plus_one_times() {
    let queue = TaskQueue::new(vec!["STUCK".to_string()]);
    let max_retries = 2;
    let mut attempts = 0;

    loop {
        let Some(reference) = queue.get(0).await else { break };
        attempts += 1;
        let terminal = queue.fail(&reference, max_retries).await;
        if terminal {
            break;
        }
    }

    assert_eq!(attempts, max_retries as usize + 1);
    let stats = queue.stats().await;
    assert_eq!(stats.terminal_failed, 1);
    assert!(stats.is_drained());
}

/// Scenario 4 ("Watchdog recovery") at the queue layer: a reference
/// whose worker never returns it is detected as stuck and handed back
/// out to any other caller of `get`.
#[tokio::test]
async fn watchdog_recovers_a_stuck_reference_for_a_different_worker() {
    let queue = TaskQueue::new(vec!["ORPHANED".to_string()]);
    let reference = queue.get(0).await.unwrap();
    assert_eq!(reference, "ORPHANED");

    tokio::time::sleep(Duration::from_millis(20)).await;
    let stuck = queue.stuck(Duration::from_millis(10)).await;
    assert_eq!(stuck, vec!["ORPHANED".to_string()]);

    for r in &stuck {
        queue.recover(r).await;
    }

    // A different worker can now pick it up.
    let recovered = queue.get(1).await.unwrap();
    assert_eq!(recovered, "ORPHANED");
    queue.complete(&recovered).await;

    let stats = queue.stats().await;
    assert!(stats.is_drained());
    assert_eq!(stats.completed, 1);
}
