mod common;

use backend::memory::MemoryProject;
use services::services::collection_copier::CollectionCopier;

use common::{document, seed_documents};

#[tokio::test]
async fn test_large_collection_commits_in_batches_of_500() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_documents(&source, "prayers", 1200);

    let (src, dst) = (source.project(), target.project());
    let copier = CollectionCopier::new(&src, &dst, 500);
    let report = copier.copy_collection("prayers").await;

    assert_eq!(report.documents_copied, 1200);
    assert_eq!(report.batches_committed, 3);
    assert_eq!(target.calls().commits, vec![500, 500, 200]);
    assert_eq!(target.document_ids("prayers"), source.document_ids("prayers"));
    assert_eq!(target.documents("prayers"), source.documents("prayers"));
}

#[tokio::test]
async fn test_report_lines_per_collection() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_documents(&source, "users", 3);

    let (src, dst) = (source.project(), target.project());
    let reports = CollectionCopier::new(&src, &dst, 500)
        .copy_all(&["users".to_string(), "prayers".to_string()])
        .await;

    let lines: Vec<String> = reports.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["users: 3 documents copied", "prayers: 0 documents copied"]);
    // Empty collection never commits
    assert_eq!(target.calls().commits, vec![3]);
}

#[tokio::test]
async fn test_failed_collection_does_not_stop_the_rest() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_documents(&source, "users", 2);
    seed_documents(&source, "prayers", 4);
    source.insert_document(document("journey", "j1"));
    source.fail_listing_collection("users");
    target.fail_commits_to("prayers");

    let (src, dst) = (source.project(), target.project());
    let collections: Vec<String> = ["users", "prayers", "journey"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let reports = CollectionCopier::new(&src, &dst, 500)
        .copy_all(&collections)
        .await;

    assert_eq!(reports.len(), 3);
    assert!(reports[0].error.is_some());
    assert!(reports[1].error.is_some());
    assert_eq!(reports[1].documents_read, 4);
    assert_eq!(reports[1].documents_copied, 0);
    assert!(reports[1].to_string().starts_with("prayers: FAILED after 0 of 4"));
    assert!(reports[2].is_success());
    assert_eq!(target.document_ids("journey"), vec!["j1"]);
}

#[tokio::test]
async fn test_smaller_batch_size_is_respected() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_documents(&source, "avatars", 25);

    let (src, dst) = (source.project(), target.project());
    let report = CollectionCopier::new(&src, &dst, 10)
        .copy_collection("avatars")
        .await;

    assert_eq!(report.documents_copied, 25);
    assert_eq!(target.calls().commits, vec![10, 10, 5]);
}
