//! User service against an in-memory database.

mod support;

use domain::{UpdateUser, UserRole};

use support::{new_admin, new_user, setup};
use user_service_lib::service::{UserManager, UserService};

async fn seeded(active: usize, deleted: usize) -> (support::Harness, UserManager) {
    let harness = setup().await;
    let service = UserManager::new(harness.persistence.clone()).unwrap();

    let created = service
        .create_users((1..=active + deleted).map(new_user).collect())
        .await
        .unwrap();
    let mut ids: Vec<i32> = created.iter().map(|u| u.id).collect();
    ids.sort_unstable();

    // soft-delete the newest rows so they would lead a descending listing
    for id in ids.iter().rev().take(deleted) {
        service.soft_delete_user(*id).await.unwrap().unwrap();
    }
    (harness, service)
}

#[tokio::test]
async fn test_active_users_first_page() {
    let (_harness, service) = seeded(15, 5).await;

    let page = service.list_active_users(1, 10).await.unwrap();

    assert_eq!(page.len(), 10);
    assert!(page.iter().all(|u| u.deleted_at.is_none()));
    assert!(page.windows(2).all(|w| w[0].id > w[1].id));
}

#[tokio::test]
async fn test_active_users_second_page_holds_the_rest() {
    let (_harness, service) = seeded(15, 5).await;

    let first = service.list_active_users(1, 10).await.unwrap();
    let second = service.list_active_users(2, 10).await.unwrap();

    assert_eq!(second.len(), 5);
    assert!(first.last().unwrap().id > second.first().unwrap().id);
}

#[tokio::test]
async fn test_counts() {
    let (_harness, service) = seeded(15, 5).await;

    assert_eq!(service.count_users().await.unwrap(), 20);
    assert_eq!(service.count_active_users().await.unwrap(), 15);
}

#[tokio::test]
async fn test_plain_listing_includes_soft_deleted() {
    let (_harness, service) = seeded(3, 2).await;

    let all = service.list_users(1, 10).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all.iter().filter(|u| u.is_deleted()).count(), 2);
}

#[tokio::test]
async fn test_active_users_with_role() {
    let harness = setup().await;
    let service = UserManager::new(harness.persistence.clone()).unwrap();
    service
        .create_users((1..=4).map(new_user).collect())
        .await
        .unwrap();
    let admins = service
        .create_users((5..=7).map(new_admin).collect())
        .await
        .unwrap();
    let retired = admins.iter().map(|u| u.id).max().unwrap();
    service.soft_delete_user(retired).await.unwrap();

    let page = service
        .list_active_users_with_role(UserRole::Admin, 1, 10)
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert!(page.iter().all(|u| u.is_admin() && u.is_active()));
    assert!(page.iter().all(|u| u.id != retired));
}

#[tokio::test]
async fn test_soft_delete_and_restore() {
    let harness = setup().await;
    let service = UserManager::new(harness.persistence.clone()).unwrap();
    let user = service.create_user(new_user(1)).await.unwrap();

    let deleted = service.soft_delete_user(user.id).await.unwrap().unwrap();
    assert!(deleted.is_deleted());
    assert_eq!(service.count_active_users().await.unwrap(), 0);
    // soft-deleted rows stay reachable by id
    assert!(service.get_user(user.id).await.unwrap().is_some());

    let restored = service.restore_user(user.id).await.unwrap().unwrap();
    assert!(restored.is_active());
    assert_eq!(service.count_active_users().await.unwrap(), 1);

    assert!(service.soft_delete_user(404).await.unwrap().is_none());
    assert!(service.restore_user(404).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_and_delete_through_service() {
    let harness = setup().await;
    let service = UserManager::new(harness.persistence.clone()).unwrap();
    let user = service.create_user(new_user(1)).await.unwrap();

    let updated = service
        .update_user(user.id, UpdateUser::default().role(UserRole::Admin))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, UserRole::Admin);
    assert_eq!(updated.name, user.name);

    service.delete_user(user.id).await.unwrap();
    assert!(service.get_user(user.id).await.unwrap().is_none());
    assert_eq!(service.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_each_call_is_its_own_transaction() {
    let harness = setup().await;
    let service = UserManager::new(harness.persistence.clone()).unwrap();
    service.create_user(new_user(1)).await.unwrap();

    // the failing call does not undo the earlier one
    assert!(service.create_user(new_user(1)).await.is_err());
    assert_eq!(service.count_users().await.unwrap(), 1);
}
