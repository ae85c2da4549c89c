mod common;

use backend::memory::MemoryProject;
use services::services::cleanup::{CleanupOutcome, CleanupPhase, SourceCleanup};

use common::{ScriptedAnswer, config, seed_documents, seed_users};

fn seeded_source() -> std::sync::Arc<MemoryProject> {
    let source = MemoryProject::new("old-project");
    seed_documents(&source, "users", 3);
    seed_documents(&source, "prayers", 700);
    seed_users(&source, 12);
    source
}

#[tokio::test]
async fn test_anything_but_exact_yes_deletes_nothing() {
    for answer in ["yes", "", " YES", "YES ", "Yes", "y"] {
        let source = seeded_source();
        let project = source.project();
        let config = config();
        let cleanup = SourceCleanup::new(&project, &config);

        let outcome = cleanup
            .run(CleanupPhase::Full, &ScriptedAnswer::new(answer))
            .await
            .unwrap();

        assert_eq!(outcome, CleanupOutcome::Aborted, "answer {:?}", answer);
        assert_eq!(source.calls().delete_calls(), 0);
        assert!(source.calls().commits.is_empty());
        assert_eq!(source.user_count(), 12);
    }
}

#[tokio::test]
async fn test_confirmed_full_cleanup_deletes_everything() {
    let source = seeded_source();
    let project = source.project();
    let config = config();
    let answer = ScriptedAnswer::new("YES");

    let outcome = SourceCleanup::new(&project, &config)
        .run(CleanupPhase::Full, &answer)
        .await
        .unwrap();

    let CleanupOutcome::Completed(report) = outcome else {
        panic!("cleanup was not run");
    };
    let users = report.collections.iter().find(|c| c.collection == "users").unwrap();
    let prayers = report.collections.iter().find(|c| c.collection == "prayers").unwrap();
    assert_eq!(users.documents_deleted, 3);
    assert_eq!(prayers.documents_deleted, 700);
    assert_eq!(prayers.batches_committed, 2);
    assert_eq!(report.auth.as_ref().unwrap().deleted, 12);

    assert!(source.documents("prayers").is_empty());
    assert_eq!(source.user_count(), 0);
    assert!(source.calls().commits.iter().all(|&size| size <= 500));
    assert_eq!(source.calls().user_deletes, 12);

    let prompts = answer.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("old-project"));
}

#[tokio::test]
async fn test_firestore_phase_leaves_users() {
    let source = seeded_source();
    let project = source.project();
    let config = config();

    let outcome = SourceCleanup::new(&project, &config)
        .run(CleanupPhase::Firestore, &ScriptedAnswer::new("YES"))
        .await
        .unwrap();

    let CleanupOutcome::Completed(report) = outcome else {
        panic!("cleanup was not run");
    };
    assert!(report.auth.is_none());
    assert!(source.documents("users").is_empty());
    assert_eq!(source.user_count(), 12);
    assert_eq!(source.calls().user_deletes, 0);
}

#[tokio::test]
async fn test_auth_phase_continues_past_failed_delete() {
    let source = seeded_source();
    source.fail_deleting_user("uid-00004");
    let project = source.project();
    let mut config = config();
    config.auth_page_size = 5;

    let outcome = SourceCleanup::new(&project, &config)
        .run(CleanupPhase::Auth, &ScriptedAnswer::new("YES"))
        .await
        .unwrap();

    let CleanupOutcome::Completed(report) = outcome else {
        panic!("cleanup was not run");
    };
    let auth = report.auth.unwrap();
    assert_eq!(auth.users_seen, 12);
    assert_eq!(auth.deleted, 11);
    assert_eq!(auth.failed, vec!["uid-00004"]);
    assert!(report.collections.is_empty());
    assert_eq!(source.documents("users").len(), 3);
}

#[tokio::test]
async fn test_collection_failure_does_not_stop_cleanup() {
    let source = seeded_source();
    source.fail_listing_collection("users");
    let project = source.project();
    let config = config();

    let outcome = SourceCleanup::new(&project, &config)
        .run(CleanupPhase::Firestore, &ScriptedAnswer::new("YES"))
        .await
        .unwrap();

    let CleanupOutcome::Completed(report) = outcome else {
        panic!("cleanup was not run");
    };
    assert!(report.collections[0].error.is_some());
    assert_eq!(source.documents("users").len(), 3);
    assert!(source.documents("prayers").is_empty());
}
