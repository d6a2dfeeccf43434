//! Resume idempotence (spec.md I7, scenario 6): a run directory's
//! tracking store, reloaded after a simulated crash, must exclude every
//! already-downloaded reference and nothing else.

use pdf_harvester::run_dir::RunDirectory;
use pdf_harvester::tracking::TrackingStore;
use tempfile::TempDir;

#[tokio::test]
async fn second_run_only_processes_references_not_yet_downloaded() {
    let temp = TempDir::new().unwrap();
    let run_dir = RunDirectory::create_for_today(temp.path()).unwrap();

    let inventory: Vec<String> = (0..20).map(|i| format!("REF-{i:02}")).collect();

    // First "run": five references complete successfully before a simulated crash.
    {
        let tracking = TrackingStore::load(run_dir.tracking_path()).unwrap();
        for reference in &inventory[0..5] {
            std::fs::write(run_dir.pdf_path(reference), b"%PDF-1.4 fake").unwrap();
            tracking.mark_downloaded(reference).await.unwrap();
        }
    }

    // Restart against the same run directory.
    let reloaded = TrackingStore::load(run_dir.tracking_path()).unwrap();
    let pending = reloaded
        .pending_references(&inventory, &run_dir.pdfs_dir())
        .await;

    assert_eq!(pending.len(), 15);
    for reference in &inventory[0..5] {
        assert!(!pending.contains(reference));
    }
    for reference in &inventory[5..20] {
        assert!(pending.contains(reference));
    }

    // Finish the remaining references and confirm nothing is left pending,
    // and that re-marking an already-downloaded reference is a no-op
    // (downloaded is never demoted, even across restarts).
    for reference in &inventory[5..20] {
        std::fs::write(run_dir.pdf_path(reference), b"%PDF-1.4 fake").unwrap();
        reloaded.mark_downloaded(reference).await.unwrap();
    }
    reloaded.mark_failed(&inventory[0]).await.unwrap();

    let final_pending = reloaded
        .pending_references(&inventory, &run_dir.pdfs_dir())
        .await;
    assert!(final_pending.is_empty());
}

#[tokio::test]
async fn a_failed_reference_whose_file_exists_is_not_reprocessed_on_resume() {
    let temp = TempDir::new().unwrap();
    let run_dir = RunDirectory::create_for_today(temp.path()).unwrap();
    let inventory = vec!["REF-A".to_string()];

    let tracking = TrackingStore::load(run_dir.tracking_path()).unwrap();
    // A failed reference whose PDF somehow exists on disk (e.g. downloaded
    // just before the process was killed, before the tracking write landed)
    // should not be requeued.
    std::fs::write(run_dir.pdf_path("REF-A"), b"%PDF-1.4 fake").unwrap();
    tracking.mark_failed("REF-A").await.unwrap();

    let pending = tracking
        .pending_references(&inventory, &run_dir.pdfs_dir())
        .await;
    assert!(pending.is_empty());
}
