//! Secret Service integration tests against a real daemon.
//!
//! These tests need a session bus with a Secret Service provider (GNOME
//! Keyring, KeePassXC, ...). The default collection may prompt for a
//! password on first unlock.
//!
//! Run with:
//!   cargo test --test integration_dbus -- --ignored
//!
//! In CI, start `dbus-run-session` with an unlocked gnome-keyring-daemon.

#![cfg(feature = "dbus")]

use lkru::transports::dbus::DbusTransport;
use lkru::{CollectionHandle, Config};
use std::sync::Arc;
use std::time::Duration;

fn test_config() -> Config {
    let application = std::env::var("LKRU_TEST_APPLICATION")
        .unwrap_or_else(|_| "lkru-integration-test".to_string());

    Config::new(application).with_prompt_timeout(Some(Duration::from_secs(60)))
}

async fn setup_handle() -> CollectionHandle {
    let transport = DbusTransport::session_bus()
        .await
        .expect("Failed to connect to the session bus");
    let handle = CollectionHandle::open(test_config(), Arc::new(transport))
        .await
        .expect("Failed to open collection");

    handle.unlock().await.expect("Failed to unlock collection");
    handle
}

#[tokio::test]
#[ignore] // Run only when a Secret Service daemon is available
async fn test_dbus_set_and_get() {
    let handle = setup_handle().await;

    handle
        .set("test-secret-1", b"my-secret-value".to_vec())
        .await
        .expect("Failed to set secret");

    let retrieved = handle
        .get("test-secret-1")
        .await
        .expect("Failed to get secret");
    assert_eq!(retrieved, b"my-secret-value");

    // Clean up
    handle.delete("test-secret-1").await.ok();
    handle.close().await.expect("Failed to close session");
}

#[tokio::test]
#[ignore]
async fn test_dbus_overwrite() {
    let handle = setup_handle().await;

    handle.set("test-secret-2", b"initial".to_vec()).await.unwrap();
    handle.set("test-secret-2", b"updated".to_vec()).await.unwrap();

    assert_eq!(handle.get("test-secret-2").await.unwrap(), b"updated");

    // Exactly one item: a second delete finds nothing.
    handle.delete("test-secret-2").await.unwrap();
    assert!(handle.delete("test-secret-2").await.unwrap_err().is_not_found());

    handle.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_dbus_not_found() {
    let handle = setup_handle().await;

    let err = handle
        .get("test-secret-that-does-not-exist")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);

    handle.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_dbus_namespace_isolation() {
    let transport = Arc::new(
        DbusTransport::session_bus()
            .await
            .expect("Failed to connect to the session bus"),
    );
    let tool_a = CollectionHandle::open(test_config().with_application("lkru-test-a"), transport.clone())
        .await
        .unwrap();
    let tool_b = CollectionHandle::open(test_config().with_application("lkru-test-b"), transport)
        .await
        .unwrap();
    tool_a.unlock().await.unwrap();

    tool_a.set("shared-label", b"from-a".to_vec()).await.unwrap();
    tool_b.set("shared-label", b"from-b".to_vec()).await.unwrap();

    assert_eq!(tool_a.get("shared-label").await.unwrap(), b"from-a");
    assert_eq!(tool_b.get("shared-label").await.unwrap(), b"from-b");

    tool_a.delete("shared-label").await.ok();
    tool_b.delete("shared-label").await.ok();
    tool_a.close().await.unwrap();
    tool_b.close().await.unwrap();
}
