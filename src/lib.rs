//! lkru - Linux Keyring Utility.
//!
//! lkru stores namespaced secrets in the desktop keyring through the
//! freedesktop Secret Service API. Secrets are addressed by an
//! `(application, label)` pair, which lkru turns into an exact attribute
//! match, so different tools can share a keyring without clobbering each
//! other's entries.
//!
//! # Features
//!
//! - **Async/Await**: Built on tokio, one outstanding bus call at a time
//! - **Prompts**: Unlock and delete prompts are driven to completion with an
//!   optional timeout
//! - **Safe replace**: A secret is only replaced when an exact match exists
//! - **Error Context**: Errors carry the collection, application and label
//! - **Testable**: An in-memory daemon stands in for the session bus
//!
//! # Quick Start
//!
//! ```no_run
//! use lkru::transports::dbus::DbusTransport;
//! use lkru::{CollectionHandle, Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> lkru::Result<()> {
//!     let transport = Arc::new(DbusTransport::session_bus().await?);
//!     let handle = CollectionHandle::open(Config::new("myapp"), transport).await?;
//!
//!     // Unlocking may pop up a password dialog.
//!     handle.unlock().await?;
//!
//!     handle.set("api-key", b"sk-secret123".to_vec()).await?;
//!     let secret = handle.get("api-key").await?;
//!     println!("Secret: {}", String::from_utf8_lossy(&secret));
//!
//!     handle.delete("api-key").await?;
//!     handle.close().await
//! }
//! ```
//!
//! # Transports
//!
//! | Transport | Feature Flag | Notes |
//! |-----------|-------------|-------|
//! | D-Bus | `dbus` (default) | User session bus via zbus |
//! | Mock | `mock` (default) | In-memory Secret Service daemon |

pub mod attributes;
pub mod collection;
pub mod config;
pub mod encoding;
pub mod error;
pub mod item;
pub mod path;
pub mod registry;
pub mod session;
pub mod transport;
pub mod transports;
pub mod unlock;
pub mod validation;

pub use attributes::Attributes;
pub use collection::CollectionHandle;
pub use config::Config;
pub use encoding::Encoding;
pub use error::{Result, SecretServiceError, UnlockFailure};
pub use item::{Item, Secret, SetOutcome};
pub use path::ObjectPath;
pub use session::Session;
pub use transport::{PromptCompletion, PromptSubscription, Transport};
