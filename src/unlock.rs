//! Unlocking collections, including the daemon's interactive prompts.
//!
//! When an unlock needs user interaction the daemon answers with a prompt
//! object instead of unlocking. Driving a prompt is always:
//!
//! 1. subscribe to the prompt's `Completed` signal,
//! 2. call `Prompt` on it,
//! 3. wait for exactly one `Completed` signal,
//! 4. drop the subscription.
//!
//! Subscribing first means a daemon that completes immediately cannot
//! outrun us. The subscription is dropped on every exit path, including
//! timeouts and transport errors.

use crate::error::UnlockFailure;
use crate::transport::{PromptCompletion, Transport};
use crate::{ObjectPath, Result, SecretServiceError};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

/// Drives one prompt to completion.
///
/// A dismissed prompt is returned as [`PromptCompletion::Dismissed`]; the
/// caller decides what dismissal means for its operation.
///
/// # Errors
///
/// - [`SecretServiceError::PromptTimeout`]: no `Completed` signal within `timeout`
/// - [`SecretServiceError::Transport`]: subscribing, prompting or receiving failed
pub async fn drive_prompt(
    transport: &dyn Transport,
    prompt: &ObjectPath,
    timeout: Option<Duration>,
) -> Result<PromptCompletion> {
    let mut subscription = transport.subscribe_prompt(prompt).await?;
    debug!(%prompt, "subscribed to prompt completion");

    transport.prompt(prompt, "").await?;
    debug!(%prompt, ?timeout, "prompt triggered, waiting for completion");

    let completion = match timeout {
        Some(limit) => tokio::time::timeout(limit, subscription.completed())
            .await
            .map_err(|_| SecretServiceError::PromptTimeout {
                prompt: prompt.clone(),
                timeout: limit,
            })??,
        None => subscription.completed().await?,
    };

    debug!(%prompt, ?completion, "prompt completed");
    Ok(completion)
}

/// Unlocks collections, resolving prompts as they come.
pub struct UnlockCoordinator<'a> {
    transport: &'a dyn Transport,
    prompt_timeout: Option<Duration>,
}

impl<'a> UnlockCoordinator<'a> {
    /// Creates a coordinator. `prompt_timeout` of `None` waits forever.
    pub fn new(transport: &'a dyn Transport, prompt_timeout: Option<Duration>) -> Self {
        Self {
            transport,
            prompt_timeout,
        }
    }

    /// Unlocks each object in turn and returns every path the daemon
    /// reported as unlocked.
    ///
    /// Each object gets its own `Unlock` call. Paths reported directly and
    /// paths carried by a prompt's result are unioned.
    ///
    /// # Errors
    ///
    /// - [`SecretServiceError::PromptDismissed`]: the user declined a prompt
    /// - [`SecretServiceError::PromptTimeout`]: a prompt never completed
    /// - [`SecretServiceError::Transport`]: a bus call failed
    pub async fn unlock(&self, objects: &[ObjectPath]) -> Result<BTreeSet<ObjectPath>> {
        let mut unlocked = BTreeSet::new();

        for object in objects {
            let (already, prompt) = self.transport.unlock(std::slice::from_ref(object)).await?;
            debug!(%object, unlocked = already.len(), %prompt, "unlock requested");
            unlocked.extend(already);

            if prompt.is_no_prompt() {
                continue;
            }

            match drive_prompt(self.transport, &prompt, self.prompt_timeout).await? {
                PromptCompletion::Dismissed => {
                    return Err(SecretServiceError::PromptDismissed(prompt));
                }
                PromptCompletion::Completed(paths) => unlocked.extend(paths),
            }
        }

        Ok(unlocked)
    }

    /// Unlocks one collection and checks the daemon unlocked that collection.
    ///
    /// The default alias is checked loosely: daemons report the concrete
    /// collection behind an alias, so any unlocked path counts. Any other
    /// collection must appear verbatim in the unlocked set.
    ///
    /// # Errors
    ///
    /// Everything [`unlock`](Self::unlock) returns, plus
    /// [`SecretServiceError::UnlockVerification`].
    pub async fn unlock_collection(
        &self,
        collection: &ObjectPath,
        default_alias: &ObjectPath,
    ) -> Result<()> {
        let unlocked = self.unlock(std::slice::from_ref(collection)).await?;
        verify_unlocked(collection, default_alias, &unlocked)
    }
}

/// Checks that `collection` is covered by the unlocked set.
pub fn verify_unlocked(
    collection: &ObjectPath,
    default_alias: &ObjectPath,
    unlocked: &BTreeSet<ObjectPath>,
) -> Result<()> {
    if unlocked.contains(collection) || (collection == default_alias && !unlocked.is_empty()) {
        return Ok(());
    }

    let reason = if unlocked.is_empty() {
        UnlockFailure::NothingUnlocked
    } else {
        UnlockFailure::OtherCollections(unlocked.len())
    };
    Err(SecretServiceError::UnlockVerification {
        collection: collection.clone(),
        reason,
    })
}
