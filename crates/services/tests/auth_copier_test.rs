mod common;

use backend::{memory::MemoryProject, models::AuthUser};
use services::services::auth_copier::AuthCopier;

use common::seed_users;

#[tokio::test]
async fn test_pages_through_every_user() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_users(&source, 2500);

    let (src, dst) = (source.project(), target.project());
    let report = AuthCopier::new(&src, &dst, 1000).copy_all().await;

    assert_eq!(report.pages, 3);
    assert_eq!(report.users_seen, 2500);
    assert_eq!(report.created, 2500);
    assert_eq!(report.created + report.already_existed + report.failed.len(), 2500);
    assert_eq!(target.user_count(), 2500);
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_users(&source, 40);

    let (src, dst) = (source.project(), target.project());
    let copier = AuthCopier::new(&src, &dst, 15);
    let first = copier.copy_all().await;
    let second = copier.copy_all().await;

    assert_eq!(first.created, 40);
    assert_eq!(second.created, 0);
    assert_eq!(second.already_existed, 40);
    assert!(second.failed.is_empty());
    assert_eq!(target.calls().user_creates, 40);
}

#[tokio::test]
async fn test_user_fields_and_password_preserved() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    let mut user = AuthUser::new("alice");
    user.email = Some("alice@example.com".to_string());
    user.display_name = Some("Alice".to_string());
    user.photo_url = Some("https://example.com/a.png".to_string());
    user.email_verified = true;
    user.disabled = true;
    user.password_hash = Some("aGFzaA==".to_string());
    user.password_salt = Some("c2FsdA==".to_string());
    source.insert_user(user.clone());

    let (src, dst) = (source.project(), target.project());
    AuthCopier::new(&src, &dst, 1000).copy_all().await;

    assert_eq!(target.user("alice").unwrap(), user);
}

#[tokio::test]
async fn test_creation_failure_is_counted_and_loop_continues() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_users(&source, 5);
    target.fail_creating_user("uid-00002");

    let (src, dst) = (source.project(), target.project());
    let report = AuthCopier::new(&src, &dst, 2).copy_all().await;

    assert_eq!(report.created, 4);
    assert_eq!(report.failed, vec!["uid-00002"]);
    assert_eq!(report.users_seen, 5);
}

#[tokio::test]
async fn test_listing_failure_ends_phase() {
    let source = MemoryProject::new("old-project");
    let target = MemoryProject::new("new-project");
    seed_users(&source, 3);
    source.fail_listing_users();

    let (src, dst) = (source.project(), target.project());
    let report = AuthCopier::new(&src, &dst, 1000).copy_all().await;

    assert!(report.error.is_some());
    assert_eq!(report.users_seen, 0);
    assert_eq!(target.user_count(), 0);
}
