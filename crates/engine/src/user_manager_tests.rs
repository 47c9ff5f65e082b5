use reaper_core::model::Permissions;
use reaper_storage::Store;

use super::{UserManager, UserUpdate};

async fn manager() -> UserManager {
    let store = Store::connect_in_memory().await.expect("connect");
    UserManager::new(store)
}

#[tokio::test]
async fn add_hashes_password_rather_than_storing_it_plain() {
    let users = manager().await;
    users
        .add("alice", Some("hunter2"), Permissions::default())
        .await
        .expect("add");

    let fetched = users.get("alice").await.expect("get").expect("present");
    let hash = fetched.password_hash.expect("hash present");
    assert_ne!(hash, "hunter2");
    assert!(hash.starts_with("$argon2"));
}

#[tokio::test]
async fn add_rejects_empty_username() {
    let users = manager().await;
    let err = users.add("", None, Permissions::default()).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn update_replaces_password_hash_and_permissions() {
    let users = manager().await;
    users.add("alice", Some("hunter2"), Permissions::default()).await.expect("add");
    let original_hash = users.get("alice").await.expect("get").expect("present").password_hash;

    users
        .update(
            "alice",
            UserUpdate {
                password: Some("better-password".to_string()),
                permissions: Some(Permissions {
                    custom_mode: true,
                    extra: Default::default(),
                }),
            },
        )
        .await
        .expect("update");

    let updated = users.get("alice").await.expect("get").expect("present");
    assert!(updated.permissions.custom_mode);
    assert_ne!(updated.password_hash, original_hash);
}

#[tokio::test]
async fn update_unknown_user_is_an_error() {
    let users = manager().await;
    let err = users
        .update("ghost", UserUpdate::default())
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn admin_cannot_be_deleted_through_the_manager() {
    let users = manager().await;
    users.add("admin", None, Permissions::default()).await.expect("add");
    assert!(users.delete("admin").await.is_err());
}

#[tokio::test]
async fn non_admin_delete_round_trips() {
    let users = manager().await;
    users.add("bob", None, Permissions::default()).await.expect("add");
    assert!(users.delete("bob").await.expect("delete"));
    assert!(users.get("bob").await.expect("get").is_none());
}
