//! Transport trait for reaching the keyring daemon.
//!
//! This module defines the [`Transport`] trait: the Secret Service method
//! surface this crate consumes, with typed arguments and replies. Signal
//! payloads are decoded once, here at the boundary, into
//! [`PromptCompletion`], so nothing above this layer inspects raw bus values.

use crate::{Attributes, ObjectPath, Result, Secret};
use async_trait::async_trait;

/// Session negotiation algorithm used by this crate.
pub const ALGORITHM_PLAIN: &str = "plain";

/// The `Completed` signal of a prompt, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptCompletion {
    /// The user declined the prompt.
    Dismissed,
    /// The prompt finished. Carries the object paths found in the result
    /// payload (empty when the result was not a path set).
    Completed(Vec<ObjectPath>),
}

/// A live subscription to one prompt's `Completed` signal.
///
/// Dropping the subscription removes it from the bus.
#[async_trait]
pub trait PromptSubscription: Send {
    /// Waits for the next `Completed` signal.
    ///
    /// # Errors
    ///
    /// Returns [`SecretServiceError::Transport`](crate::SecretServiceError::Transport)
    /// if the signal stream ends or the payload cannot be decoded.
    async fn completed(&mut self) -> Result<PromptCompletion>;
}

/// Transport represents a connection to a Secret Service daemon.
///
/// All implementations must be `Send + Sync` so a handle can be shared
/// across tasks. Implementations map a "no such object" reply from an
/// item call ([`get_secret`](Self::get_secret),
/// [`delete_item`](Self::delete_item)) to
/// [`SecretServiceError::NotFound`](crate::SecretServiceError::NotFound).
/// Every other failure, including a missing collection, is a
/// [`SecretServiceError::Transport`](crate::SecretServiceError::Transport).
///
/// # Implementations
///
/// - [`DbusTransport`](crate::transports::dbus::DbusTransport): the user's session bus
/// - [`MockTransport`](crate::transports::mock::MockTransport): in-memory daemon for tests
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the transport name (e.g., "dbus", "mock").
    fn name(&self) -> &str;

    // ========================================================================
    // Service
    // ========================================================================

    /// `Service.OpenSession`: negotiates a session and returns its path.
    async fn open_session(&self, algorithm: &str) -> Result<ObjectPath>;

    /// `Service.Unlock`: returns the objects already unlocked and a prompt
    /// path (`/` when no prompt is needed).
    async fn unlock(&self, objects: &[ObjectPath]) -> Result<(Vec<ObjectPath>, ObjectPath)>;

    // ========================================================================
    // Session
    // ========================================================================

    /// `Session.Close`.
    async fn close_session(&self, session: &ObjectPath) -> Result<()>;

    // ========================================================================
    // Prompt
    // ========================================================================

    /// Subscribes to the `Completed` signal of one prompt object.
    ///
    /// Must be called before [`prompt`](Self::prompt) so the signal cannot be
    /// missed.
    async fn subscribe_prompt(&self, prompt: &ObjectPath) -> Result<Box<dyn PromptSubscription>>;

    /// `Prompt.Prompt`: asks the daemon to show the prompt.
    async fn prompt(&self, prompt: &ObjectPath, window_id: &str) -> Result<()>;

    // ========================================================================
    // Collection
    // ========================================================================

    /// `Collection.SearchItems`: paths of the items whose attributes match exactly.
    async fn search_items(
        &self,
        collection: &ObjectPath,
        attributes: &Attributes,
    ) -> Result<Vec<ObjectPath>>;

    /// `Collection.CreateItem`: returns the item path and a prompt path.
    async fn create_item(
        &self,
        collection: &ObjectPath,
        label: &str,
        attributes: &Attributes,
        secret: &Secret,
        replace: bool,
    ) -> Result<(ObjectPath, ObjectPath)>;

    // ========================================================================
    // Item
    // ========================================================================

    /// `Item.GetSecret`.
    async fn get_secret(&self, item: &ObjectPath, session: &ObjectPath) -> Result<Secret>;

    /// `Item.Delete`: returns a prompt path.
    async fn delete_item(&self, item: &ObjectPath) -> Result<ObjectPath>;
}
