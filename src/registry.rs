//! Attribute-addressed item operations within one collection.
//!
//! Every operation starts with a search on the full attribute set. There is
//! no client-side cache: the daemon is asked every time.

use crate::session::Session;
use crate::transport::{PromptCompletion, Transport};
use crate::unlock::drive_prompt;
use crate::{Attributes, ObjectPath, Result, Secret, SecretServiceError, SetOutcome};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Item operations bound to a collection and an open session.
pub struct ItemRegistry<'a> {
    transport: &'a dyn Transport,
    collection: &'a ObjectPath,
    session: &'a Session,
    prompt_timeout: Option<Duration>,
}

impl<'a> ItemRegistry<'a> {
    /// Creates a registry for `collection`, scoped to `session`.
    pub fn new(
        transport: &'a dyn Transport,
        collection: &'a ObjectPath,
        session: &'a Session,
        prompt_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            collection,
            session,
            prompt_timeout,
        }
    }

    /// Finds the single item matching `attributes`.
    ///
    /// # Errors
    ///
    /// - [`SecretServiceError::NotFound`]: nothing matched
    /// - [`SecretServiceError::Ambiguous`]: more than one item matched; never
    ///   resolved by picking one
    pub async fn search(&self, attributes: &Attributes) -> Result<ObjectPath> {
        let mut items = self
            .transport
            .search_items(self.collection, attributes)
            .await?;
        debug!(collection = %self.collection, matches = items.len(), "items searched");

        match items.len() {
            0 => Err(SecretServiceError::NotFound),
            1 => Ok(items.remove(0)),
            n => Err(SecretServiceError::Ambiguous(n)),
        }
    }

    /// Fetches the payload of the item matching `attributes`.
    ///
    /// # Errors
    ///
    /// Search errors are passed through unchanged; fetching can fail with
    /// [`SecretServiceError::Transport`].
    pub async fn get(&self, attributes: &Attributes) -> Result<Secret> {
        let item = self.search(attributes).await?;
        let secret = self.transport.get_secret(&item, self.session.path()).await?;
        debug!(%item, bytes = secret.value.len(), "secret fetched");
        Ok(secret)
    }

    /// Builds a payload for this registry's session.
    pub fn payload(&self, value: Vec<u8>, content_type: &str) -> Secret {
        Secret::new(self.session.path().clone(), value, content_type)
    }

    /// Creates the item, or replaces the one matching `attributes`.
    ///
    /// `replace` is only sent as `true` when the existence check found an exact
    /// match on the full attribute set. Some daemons apply `replace=true` to
    /// any item with the same label, which would silently clobber an
    /// unrelated secret.
    ///
    /// The check and the create are two calls: another client can create or
    /// delete the same item in between. That window is not closed here.
    ///
    /// A prompt returned by the daemon is not driven; it is reported as
    /// [`SetOutcome::PromptPending`].
    ///
    /// # Errors
    ///
    /// - [`SecretServiceError::Ambiguous`]: the existence check matched several items
    /// - [`SecretServiceError::Transport`]: the check or the create failed
    pub async fn set(
        &self,
        attributes: &Attributes,
        label: &str,
        secret: &Secret,
    ) -> Result<SetOutcome> {
        let replace = match self.search(attributes).await {
            Ok(_) => true,
            Err(SecretServiceError::NotFound) => false,
            Err(e) => return Err(e),
        };
        debug!(collection = %self.collection, label, replace, "creating item");

        let (item, prompt) = self
            .transport
            .create_item(self.collection, label, attributes, secret, replace)
            .await?;

        if !prompt.is_no_prompt() {
            warn!(%prompt, label, "daemon requested a prompt to create the item; not driven");
            return Ok(SetOutcome::PromptPending(prompt));
        }

        info!(%item, label, replaced = replace, "secret stored");
        Ok(SetOutcome::Stored(item))
    }

    /// Deletes the item matching `attributes`.
    ///
    /// If the daemon asks for a prompt to delete, the prompt is driven like
    /// an unlock prompt.
    ///
    /// # Errors
    ///
    /// - [`SecretServiceError::NotFound`]: nothing matched, or the item
    ///   vanished before the delete call
    /// - [`SecretServiceError::Ambiguous`]: more than one item matched
    /// - [`SecretServiceError::PromptDismissed`]: the user declined the delete
    pub async fn delete(&self, attributes: &Attributes) -> Result<()> {
        let item = self.search(attributes).await?;
        let prompt = self.transport.delete_item(&item).await?;

        if !prompt.is_no_prompt() {
            debug!(%item, %prompt, "delete needs a prompt");
            if drive_prompt(self.transport, &prompt, self.prompt_timeout).await?
                == PromptCompletion::Dismissed
            {
                return Err(SecretServiceError::PromptDismissed(prompt));
            }
        }

        info!(%item, "secret deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::mock::{MockCall, MockTransport, PromptBehavior};

    fn attrs(app: &str, label: &str) -> Attributes {
        Attributes::for_secret("agent", app, label).unwrap()
    }

    fn login() -> ObjectPath {
        ObjectPath::collection("login")
    }

    async fn setup(transport: &MockTransport) -> Session {
        Session::open(transport).await.unwrap()
    }

    #[tokio::test]
    async fn test_search_not_found() {
        let transport = MockTransport::new();
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let result = registry.search(&attrs("app", "missing")).await;
        assert!(matches!(result, Err(SecretServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_search_ambiguous() {
        let transport = MockTransport::new();
        transport.insert_item("login", "dup", attrs("app", "dup"), b"one");
        transport.insert_item("login", "dup", attrs("app", "dup"), b"two");
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        assert!(matches!(
            registry.search(&attrs("app", "dup")).await,
            Err(SecretServiceError::Ambiguous(2))
        ));
        assert!(matches!(
            registry.get(&attrs("app", "dup")).await,
            Err(SecretServiceError::Ambiguous(2))
        ));

        let secret = registry.payload(b"three".to_vec(), "text/plain");
        assert!(matches!(
            registry.set(&attrs("app", "dup"), "dup", &secret).await,
            Err(SecretServiceError::Ambiguous(2))
        ));
        // The existence check failed, so nothing was created.
        assert!(!transport
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::CreateItem { .. })));
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let transport = MockTransport::new();
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let secret = registry.payload(b"sekret".to_vec(), "text/plain");
        let outcome = registry.set(&attrs("app", "key"), "key", &secret).await.unwrap();
        assert!(matches!(outcome, SetOutcome::Stored(_)));

        let fetched = registry.get(&attrs("app", "key")).await.unwrap();
        assert_eq!(fetched.value, b"sekret");
        assert_eq!(&fetched.session, session.path());
    }

    #[tokio::test]
    async fn test_set_replace_flag_follows_search() {
        let transport = MockTransport::new();
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let first = registry.payload(b"one".to_vec(), "text/plain");
        let second = registry.payload(b"two".to_vec(), "text/plain");
        registry.set(&attrs("app", "key"), "key", &first).await.unwrap();
        registry.set(&attrs("app", "key"), "key", &second).await.unwrap();

        let replace_flags: Vec<bool> = transport
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::CreateItem { replace, .. } => Some(replace),
                _ => None,
            })
            .collect();
        assert_eq!(replace_flags, vec![false, true]);
        assert_eq!(transport.items("login").len(), 1);
    }

    #[tokio::test]
    async fn test_set_does_not_clobber_label_twin() {
        let mut transport = MockTransport::new();
        transport.replace_matches_label = true;
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let a = registry.payload(b"from-a".to_vec(), "text/plain");
        let b = registry.payload(b"from-b".to_vec(), "text/plain");
        registry.set(&attrs("tool-a", "key"), "key", &a).await.unwrap();
        registry.set(&attrs("tool-b", "key"), "key", &b).await.unwrap();

        assert_eq!(transport.items("login").len(), 2);
        assert_eq!(registry.get(&attrs("tool-a", "key")).await.unwrap().value, b"from-a");
        assert_eq!(registry.get(&attrs("tool-b", "key")).await.unwrap().value, b"from-b");
    }

    #[tokio::test]
    async fn test_set_search_error_aborts() {
        let mut transport = MockTransport::new();
        transport.search_error = Some("bus hiccup".to_string());
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let secret = registry.payload(b"x".to_vec(), "text/plain");
        let result = registry.set(&attrs("app", "key"), "key", &secret).await;
        assert!(matches!(result, Err(SecretServiceError::Transport { .. })));
        assert!(transport.items("login").is_empty());
    }

    #[tokio::test]
    async fn test_set_create_prompt_is_pending() {
        let mut transport = MockTransport::new();
        transport.create_prompt = Some(PromptBehavior::Never);
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let secret = registry.payload(b"x".to_vec(), "text/plain");
        let outcome = registry.set(&attrs("app", "key"), "key", &secret).await.unwrap();
        assert!(matches!(outcome, SetOutcome::PromptPending(_)));
        // The prompt is not driven.
        assert!(!transport
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::Prompt(_))));
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_a_missing_secret() {
        let transport = MockTransport::new();
        let session = setup(&transport).await;
        let collection = ObjectPath::collection("missing");
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let secret = registry.payload(b"x".to_vec(), "text/plain");
        let result = registry.set(&attrs("app", "key"), "key", &secret).await;
        assert!(matches!(result, Err(SecretServiceError::Transport { .. })));
        assert!(!transport
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::CreateItem { .. })));

        assert!(matches!(
            registry.get(&attrs("app", "key")).await,
            Err(SecretServiceError::Transport { .. })
        ));
        assert!(matches!(
            registry.delete(&attrs("app", "key")).await,
            Err(SecretServiceError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn test_item_vanishing_after_search_is_not_found() {
        let mut transport = MockTransport::new();
        transport.vanish_after_search = true;
        transport.insert_item("login", "key", attrs("app", "key"), b"x");
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        assert!(matches!(
            registry.delete(&attrs("app", "key")).await,
            Err(SecretServiceError::NotFound)
        ));
        // The search found it; the delete call itself came back empty.
        assert!(transport
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::Delete(_))));

        transport.insert_item("login", "key", attrs("app", "key"), b"y");
        assert!(matches!(
            registry.get(&attrs("app", "key")).await,
            Err(SecretServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let transport = MockTransport::new();
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let secret = registry.payload(b"x".to_vec(), "text/plain");
        registry.set(&attrs("app", "key"), "key", &secret).await.unwrap();

        registry.delete(&attrs("app", "key")).await.unwrap();
        assert!(matches!(
            registry.delete(&attrs("app", "key")).await,
            Err(SecretServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_with_prompt() {
        let mut transport = MockTransport::new();
        transport.delete_prompt = Some(PromptBehavior::Complete);
        let path = transport.insert_item("login", "key", attrs("app", "key"), b"x");
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        registry.delete(&attrs("app", "key")).await.unwrap();
        assert!(transport.items("login").iter().all(|i| i.path != path));
        assert_eq!(transport.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_prompt_dismissed() {
        let mut transport = MockTransport::new();
        transport.delete_prompt = Some(PromptBehavior::Dismiss);
        transport.insert_item("login", "key", attrs("app", "key"), b"x");
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        let result = registry.delete(&attrs("app", "key")).await;
        assert!(matches!(result, Err(SecretServiceError::PromptDismissed(_))));
        assert_eq!(transport.items("login").len(), 1);
    }

    #[tokio::test]
    async fn test_get_is_scoped_to_collection() {
        let transport = MockTransport::new();
        transport.add_collection("work", false);
        transport.insert_item("work", "key", attrs("app", "key"), b"x");
        let session = setup(&transport).await;
        let collection = login();
        let registry = ItemRegistry::new(&transport, &collection, &session, None);

        assert!(matches!(
            registry.get(&attrs("app", "key")).await,
            Err(SecretServiceError::NotFound)
        ));
    }
}
