//! Collection handle: one collection, one session, one transport.

use crate::registry::ItemRegistry;
use crate::session::Session;
use crate::transport::Transport;
use crate::unlock::UnlockCoordinator;
use crate::{Attributes, Config, ObjectPath, Result, Secret, SecretServiceError, SetOutcome};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Handle bound to a collection and an open session.
///
/// Opening the handle resolves the collection path and opens a session.
/// Operations on one handle are serialised, so it can be shared across
/// tasks without interleaving calls on the session.
///
/// Callers unlock the collection first, then get, set or delete secrets:
///
/// ```no_run
/// use lkru::transports::dbus::DbusTransport;
/// use lkru::{CollectionHandle, Config};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> lkru::Result<()> {
///     let transport = Arc::new(DbusTransport::session_bus().await?);
///     let handle = CollectionHandle::open(Config::new("my-tool"), transport).await?;
///
///     handle.unlock().await?;
///     handle.set("api-key", b"sk-secret123".to_vec()).await?;
///     let value = handle.get("api-key").await?;
///     assert_eq!(value, b"sk-secret123");
///
///     handle.close().await
/// }
/// ```
///
/// Call [`close`](Self::close) when done. A handle dropped without closing
/// logs a warning and closes its session in the background if a tokio
/// runtime is available.
pub struct CollectionHandle {
    transport: Arc<dyn Transport>,
    config: Config,
    path: ObjectPath,
    session: Option<Session>,
    op_lock: Mutex<()>,
}

impl CollectionHandle {
    /// Resolves the configured collection and opens a session.
    ///
    /// # Errors
    ///
    /// - [`SecretServiceError::InvalidName`]: the collection name is not a
    ///   valid path element
    /// - [`SecretServiceError::Transport`]: the session could not be opened
    pub async fn open(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let path = config.collection_path()?;
        let session = Session::open(transport.as_ref()).await?;
        debug!(collection = %path, application = %config.application, "collection handle opened");

        Ok(Self {
            transport,
            config,
            path,
            session: Some(session),
            op_lock: Mutex::new(()),
        })
    }

    /// Object path of the collection.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Configuration the handle was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The open session.
    pub fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| SecretServiceError::Other(anyhow::anyhow!("session already closed")))
    }

    /// Unlocks the collection, driving a prompt if the daemon needs one.
    ///
    /// # Errors
    ///
    /// - [`SecretServiceError::UnlockVerification`]: the daemon did not
    ///   unlock this collection
    /// - [`SecretServiceError::PromptDismissed`]: the user declined
    /// - [`SecretServiceError::PromptTimeout`]: the prompt never completed
    pub async fn unlock(&self) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        UnlockCoordinator::new(self.transport.as_ref(), self.config.prompt_timeout)
            .unlock_collection(&self.path, &self.config.default_alias_path())
            .await
    }

    /// Fetches the raw bytes stored under `label`.
    ///
    /// # Errors
    ///
    /// Failures are wrapped in [`SecretServiceError::Operation`]; use
    /// [`SecretServiceError::is_not_found`] to detect a missing secret.
    pub async fn get(&self, label: &str) -> Result<Vec<u8>> {
        self.get_secret(label).await.map(|secret| secret.value)
    }

    /// Fetches the full payload stored under `label`.
    pub async fn get_secret(&self, label: &str) -> Result<Secret> {
        let _guard = self.op_lock.lock().await;
        let result = async {
            let attributes = self.attributes(label)?;
            self.registry()?.get(&attributes).await
        }
        .await;
        result.map_err(|e| self.wrap("get", label, e))
    }

    /// Stores `value` under `label`, replacing the existing secret.
    pub async fn set(&self, label: &str, value: Vec<u8>) -> Result<SetOutcome> {
        let _guard = self.op_lock.lock().await;
        let result = async {
            let attributes = self.attributes(label)?;
            let registry = self.registry()?;
            let secret = registry.payload(value, &self.config.content_type);
            registry.set(&attributes, label, &secret).await
        }
        .await;
        result.map_err(|e| self.wrap("set", label, e))
    }

    /// Deletes the secret stored under `label`.
    pub async fn delete(&self, label: &str) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        let result = async {
            let attributes = self.attributes(label)?;
            self.registry()?.delete(&attributes).await
        }
        .await;
        result.map_err(|e| self.wrap("delete", label, e))
    }

    /// Closes the session.
    pub async fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => session.close(self.transport.as_ref()).await,
            None => Ok(()),
        }
    }

    fn attributes(&self, label: &str) -> Result<Attributes> {
        Attributes::for_secret(&self.config.agent, &self.config.application, label)
    }

    fn registry(&self) -> Result<ItemRegistry<'_>> {
        Ok(ItemRegistry::new(
            self.transport.as_ref(),
            &self.path,
            self.session()?,
            self.config.prompt_timeout,
        ))
    }

    fn wrap(&self, operation: &str, label: &str, err: SecretServiceError) -> SecretServiceError {
        SecretServiceError::operation(
            operation,
            self.path.clone(),
            &self.config.application,
            label,
            err,
        )
    }
}

impl Drop for CollectionHandle {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        warn!(session = %session.path(), "collection handle dropped without close");

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let transport = Arc::clone(&self.transport);
                runtime.spawn(async move {
                    let path = session.path().clone();
                    if let Err(e) = session.close(transport.as_ref()).await {
                        warn!(session = %path, error = %e, "best-effort session close failed");
                    }
                });
            }
            Err(_) => {
                warn!(session = %session.path(), "no runtime to close session; it leaks until the daemon reaps it");
            }
        }
    }
}
