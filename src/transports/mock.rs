//! Mock transport for testing.
//!
//! This transport is a complete in-memory Secret Service daemon with error
//! injection, scripted prompts and a call log, for testing code that uses
//! lkru without a session bus.

use crate::transport::{PromptCompletion, PromptSubscription, Transport};
use crate::*;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// How the mock daemon answers a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptBehavior {
    /// Complete the prompt and report the affected collection.
    Complete,
    /// Complete the prompt but report these paths instead.
    CompleteWith(Vec<ObjectPath>),
    /// Report the prompt as dismissed.
    Dismiss,
    /// Never emit `Completed`.
    Never,
}

/// One call received by the mock daemon, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `Service.OpenSession`
    OpenSession,
    /// `Session.Close`
    CloseSession(ObjectPath),
    /// `Service.Unlock`
    Unlock(Vec<ObjectPath>),
    /// Signal subscription added for a prompt
    Subscribe(ObjectPath),
    /// Signal subscription removed for a prompt
    Unsubscribe(ObjectPath),
    /// `Prompt.Prompt`
    Prompt(ObjectPath),
    /// `Collection.SearchItems`
    SearchItems(ObjectPath),
    /// `Collection.CreateItem`
    CreateItem {
        /// Collection the call was made on
        collection: ObjectPath,
        /// Value of the replace flag
        replace: bool,
    },
    /// `Item.GetSecret`
    GetSecret(ObjectPath),
    /// `Item.Delete`
    Delete(ObjectPath),
}

#[derive(Debug, Clone)]
enum PromptAction {
    Unlock(Vec<ObjectPath>),
    Create { collection: ObjectPath, item: Item },
    Delete(ObjectPath),
}

#[derive(Debug)]
struct MockCollection {
    locked: bool,
    unlock_prompt: PromptBehavior,
    items: BTreeMap<ObjectPath, Item>,
}

#[derive(Debug, Default)]
struct DaemonState {
    next_id: u64,
    sessions: BTreeSet<ObjectPath>,
    aliases: HashMap<ObjectPath, ObjectPath>,
    collections: BTreeMap<ObjectPath, MockCollection>,
    prompts: HashMap<ObjectPath, (PromptAction, PromptBehavior)>,
    subscribers: HashMap<ObjectPath, mpsc::UnboundedSender<PromptCompletion>>,
    calls: Vec<MockCall>,
}

impl DaemonState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn resolve(&self, path: &ObjectPath) -> Option<ObjectPath> {
        if let Some(target) = self.aliases.get(path) {
            return Some(target.clone());
        }
        self.collections.contains_key(path).then(|| path.clone())
    }

    fn new_prompt(&mut self, action: PromptAction, behavior: PromptBehavior) -> ObjectPath {
        let path = ObjectPath::from(format!(
            "{}/prompt/p{}",
            crate::path::SERVICE_PATH,
            self.next_id()
        ));
        self.prompts.insert(path.clone(), (action, behavior));
        path
    }

    fn find_item(&self, item: &ObjectPath) -> Option<(&ObjectPath, &MockCollection)> {
        self.collections
            .iter()
            .find(|(_, c)| c.items.contains_key(item))
    }
}

/// Mock transport for testing.
///
/// Starts with an unlocked `login` collection that the `default` alias
/// points at. Error injection fields make the matching method fail with
/// [`SecretServiceError::Transport`].
///
/// # Example
///
/// ```
/// use lkru::transports::mock::MockTransport;
/// use lkru::{CollectionHandle, Config};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> lkru::Result<()> {
///     let transport = Arc::new(MockTransport::new());
///     let handle = CollectionHandle::open(Config::new("tool-a"), transport.clone()).await?;
///
///     handle.unlock().await?;
///     handle.set("api-key", b"sekret".to_vec()).await?;
///     assert_eq!(handle.get("api-key").await?, b"sekret");
///
///     handle.close().await?;
///     assert!(transport.open_sessions().is_empty());
///     Ok(())
/// }
/// ```
pub struct MockTransport {
    state: Arc<Mutex<DaemonState>>,

    /// Emulate daemons that match `replace=true` against the label only
    pub replace_matches_label: bool,
    /// Prompt returned by `Item.Delete`, if any
    pub delete_prompt: Option<PromptBehavior>,
    /// Prompt returned by `Collection.CreateItem` instead of creating, if any
    pub create_prompt: Option<PromptBehavior>,
    /// Remove matched items right after `SearchItems` returns them, as if
    /// another client deleted them in between
    pub vanish_after_search: bool,

    /// Error to return from `open_session()`
    pub open_session_error: Option<String>,
    /// Error to return from `close_session()`
    pub close_session_error: Option<String>,
    /// Error to return from `unlock()`
    pub unlock_error: Option<String>,
    /// Error to return from `prompt()`
    pub prompt_error: Option<String>,
    /// Error to return from `search_items()`
    pub search_error: Option<String>,
    /// Error to return from `create_item()`
    pub create_error: Option<String>,
    /// Error to return from `get_secret()`
    pub get_error: Option<String>,
    /// Error to return from `delete_item()`
    pub delete_error: Option<String>,
}

impl MockTransport {
    /// Creates a mock daemon with an unlocked `login` collection behind the
    /// `default` alias.
    pub fn new() -> Self {
        let transport = Self {
            state: Arc::new(Mutex::new(DaemonState::default())),
            replace_matches_label: false,
            delete_prompt: None,
            create_prompt: None,
            vanish_after_search: false,
            open_session_error: None,
            close_session_error: None,
            unlock_error: None,
            prompt_error: None,
            search_error: None,
            create_error: None,
            get_error: None,
            delete_error: None,
        };
        transport.add_collection("login", false);
        transport.set_alias("default", "login");
        transport
    }

    fn state(&self) -> MutexGuard<'_, DaemonState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected(method: &str, error: &Option<String>) -> Result<()> {
        match error {
            Some(message) => Err(SecretServiceError::transport(
                method,
                anyhow::anyhow!("{}", message),
            )),
            None => Ok(()),
        }
    }

    /// Adds an empty collection and returns its path.
    pub fn add_collection(&self, name: &str, locked: bool) -> ObjectPath {
        let path = ObjectPath::collection(name);
        self.state().collections.insert(
            path.clone(),
            MockCollection {
                locked,
                unlock_prompt: PromptBehavior::Complete,
                items: BTreeMap::new(),
            },
        );
        path
    }

    /// Points an alias at a collection.
    pub fn set_alias(&self, alias: &str, collection: &str) {
        self.state()
            .aliases
            .insert(ObjectPath::alias(alias), ObjectPath::collection(collection));
    }

    /// Locks a collection.
    pub fn lock(&self, collection: &str) {
        if let Some(c) = self.state().collections.get_mut(&ObjectPath::collection(collection)) {
            c.locked = true;
        }
    }

    /// True if the collection is locked.
    pub fn is_locked(&self, collection: &str) -> bool {
        self.state()
            .collections
            .get(&ObjectPath::collection(collection))
            .map(|c| c.locked)
            .unwrap_or(false)
    }

    /// Sets how the unlock prompt for a collection behaves.
    pub fn set_unlock_prompt(&self, collection: &str, behavior: PromptBehavior) {
        if let Some(c) = self.state().collections.get_mut(&ObjectPath::collection(collection)) {
            c.unlock_prompt = behavior;
        }
    }

    /// Stores an item directly, bypassing replace semantics.
    ///
    /// Useful for setting up fixtures such as two items with identical
    /// attributes.
    pub fn insert_item(
        &self,
        collection: &str,
        label: &str,
        attributes: Attributes,
        value: &[u8],
    ) -> ObjectPath {
        let collection_path = ObjectPath::collection(collection);
        let mut state = self.state();
        let path = ObjectPath::from(format!("{}/{}", collection_path, state.next_id()));
        let item = Item {
            path: path.clone(),
            label: label.to_string(),
            attributes,
            secret: Secret::new(ObjectPath::no_prompt(), value.to_vec(), "text/plain"),
        };
        if let Some(c) = state.collections.get_mut(&collection_path) {
            c.items.insert(path.clone(), item);
        }
        path
    }

    /// Returns the items of a collection.
    pub fn items(&self, collection: &str) -> Vec<Item> {
        self.state()
            .collections
            .get(&ObjectPath::collection(collection))
            .map(|c| c.items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the sessions that are open.
    pub fn open_sessions(&self) -> Vec<ObjectPath> {
        self.state().sessions.iter().cloned().collect()
    }

    /// Returns the number of live prompt subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription handed out by [`MockTransport::subscribe_prompt`].
struct MockSubscription {
    prompt: ObjectPath,
    rx: mpsc::UnboundedReceiver<PromptCompletion>,
    state: Arc<Mutex<DaemonState>>,
}

#[async_trait]
impl PromptSubscription for MockSubscription {
    async fn completed(&mut self) -> Result<PromptCompletion> {
        self.rx.recv().await.ok_or_else(|| {
            SecretServiceError::transport(
                "Prompt.Completed",
                anyhow::anyhow!("signal stream for {} closed", self.prompt),
            )
        })
    }
}

impl Drop for MockSubscription {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.subscribers.remove(&self.prompt);
        state.calls.push(MockCall::Unsubscribe(self.prompt.clone()));
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_session(&self, algorithm: &str) -> Result<ObjectPath> {
        Self::injected("OpenSession", &self.open_session_error)?;
        if algorithm != transport::ALGORITHM_PLAIN {
            return Err(SecretServiceError::transport(
                "OpenSession",
                anyhow::anyhow!("algorithm {} not supported", algorithm),
            ));
        }

        let mut state = self.state();
        state.calls.push(MockCall::OpenSession);
        let path = ObjectPath::from(format!(
            "{}/session/s{}",
            crate::path::SERVICE_PATH,
            state.next_id()
        ));
        state.sessions.insert(path.clone());
        Ok(path)
    }

    async fn unlock(&self, objects: &[ObjectPath]) -> Result<(Vec<ObjectPath>, ObjectPath)> {
        Self::injected("Unlock", &self.unlock_error)?;

        let mut state = self.state();
        state.calls.push(MockCall::Unlock(objects.to_vec()));

        let mut unlocked = Vec::new();
        let mut pending = Vec::new();
        let mut behavior = PromptBehavior::Complete;
        for object in objects {
            let Some(path) = state.resolve(object) else {
                continue;
            };
            if let Some(c) = state.collections.get(&path) {
                if c.locked {
                    behavior = c.unlock_prompt.clone();
                    pending.push(path);
                } else {
                    unlocked.push(path);
                }
            }
        }

        let prompt = if pending.is_empty() {
            ObjectPath::no_prompt()
        } else {
            state.new_prompt(PromptAction::Unlock(pending), behavior)
        };
        Ok((unlocked, prompt))
    }

    async fn close_session(&self, session: &ObjectPath) -> Result<()> {
        Self::injected("Session.Close", &self.close_session_error)?;

        let mut state = self.state();
        state.calls.push(MockCall::CloseSession(session.clone()));
        if !state.sessions.remove(session) {
            return Err(SecretServiceError::NotFound);
        }
        Ok(())
    }

    async fn subscribe_prompt(&self, prompt: &ObjectPath) -> Result<Box<dyn PromptSubscription>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        state.calls.push(MockCall::Subscribe(prompt.clone()));
        state.subscribers.insert(prompt.clone(), tx);
        Ok(Box::new(MockSubscription {
            prompt: prompt.clone(),
            rx,
            state: Arc::clone(&self.state),
        }))
    }

    async fn prompt(&self, prompt: &ObjectPath, _window_id: &str) -> Result<()> {
        Self::injected("Prompt", &self.prompt_error)?;

        let mut state = self.state();
        state.calls.push(MockCall::Prompt(prompt.clone()));
        let (action, behavior) = state.prompts.remove(prompt).ok_or_else(|| {
            SecretServiceError::transport("Prompt", anyhow::anyhow!("no such prompt {}", prompt))
        })?;

        let completion = match behavior {
            PromptBehavior::Never => {
                // Keep the subscriber's sender alive; nothing is ever sent.
                return Ok(());
            }
            PromptBehavior::Dismiss => PromptCompletion::Dismissed,
            PromptBehavior::Complete | PromptBehavior::CompleteWith(_) => {
                let affected = match action {
                    PromptAction::Unlock(paths) => {
                        for path in &paths {
                            if let Some(c) = state.collections.get_mut(path) {
                                c.locked = false;
                            }
                        }
                        paths
                    }
                    PromptAction::Create { collection, item } => {
                        let path = item.path.clone();
                        if let Some(c) = state.collections.get_mut(&collection) {
                            c.items.insert(path.clone(), item);
                        }
                        vec![path]
                    }
                    PromptAction::Delete(item) => {
                        for c in state.collections.values_mut() {
                            c.items.remove(&item);
                        }
                        Vec::new()
                    }
                };
                match behavior {
                    PromptBehavior::CompleteWith(paths) => PromptCompletion::Completed(paths),
                    _ => PromptCompletion::Completed(affected),
                }
            }
        };

        // A signal nobody is subscribed to is lost, as on a real bus.
        if let Some(tx) = state.subscribers.get(prompt) {
            let _ = tx.send(completion);
        }
        Ok(())
    }

    async fn search_items(
        &self,
        collection: &ObjectPath,
        attributes: &Attributes,
    ) -> Result<Vec<ObjectPath>> {
        Self::injected("SearchItems", &self.search_error)?;

        let mut state = self.state();
        state.calls.push(MockCall::SearchItems(collection.clone()));
        let path = state.resolve(collection).ok_or_else(|| {
            SecretServiceError::transport(
                "SearchItems",
                anyhow::anyhow!("no such collection {}", collection),
            )
        })?;

        let matches: Vec<ObjectPath> = state.collections[&path]
            .items
            .values()
            .filter(|item| attributes.is_subset_of(&item.attributes))
            .map(|item| item.path.clone())
            .collect();

        if self.vanish_after_search {
            if let Some(c) = state.collections.get_mut(&path) {
                for item in &matches {
                    c.items.remove(item);
                }
            }
        }
        Ok(matches)
    }

    async fn create_item(
        &self,
        collection: &ObjectPath,
        label: &str,
        attributes: &Attributes,
        secret: &Secret,
        replace: bool,
    ) -> Result<(ObjectPath, ObjectPath)> {
        Self::injected("CreateItem", &self.create_error)?;

        let mut state = self.state();
        state.calls.push(MockCall::CreateItem {
            collection: collection.clone(),
            replace,
        });
        let path = state.resolve(collection).ok_or_else(|| {
            SecretServiceError::transport(
                "CreateItem",
                anyhow::anyhow!("no such collection {}", collection),
            )
        })?;
        if !state.sessions.contains(&secret.session) {
            return Err(SecretServiceError::transport(
                "CreateItem",
                anyhow::anyhow!("no such session {}", secret.session),
            ));
        }
        if state.collections[&path].locked {
            return Err(SecretServiceError::transport(
                "CreateItem",
                anyhow::anyhow!("collection {} is locked", path),
            ));
        }
        let id = state.next_id();
        if let Some(behavior) = self.create_prompt.clone() {
            let item = Item {
                path: ObjectPath::from(format!("{}/{}", path, id)),
                label: label.to_string(),
                attributes: attributes.clone(),
                secret: secret.clone(),
            };
            let action = PromptAction::Create {
                collection: path,
                item,
            };
            let prompt = state.new_prompt(action, behavior);
            return Ok((ObjectPath::no_prompt(), prompt));
        }

        let replace_by_label = self.replace_matches_label;
        let c = state
            .collections
            .get_mut(&path)
            .ok_or(SecretServiceError::NotFound)?;

        let existing = if replace {
            c.items
                .values()
                .find(|item| {
                    if replace_by_label {
                        item.label == label
                    } else {
                        item.attributes == *attributes
                    }
                })
                .map(|item| item.path.clone())
        } else {
            None
        };

        let item_path = existing.unwrap_or_else(|| ObjectPath::from(format!("{}/{}", path, id)));
        c.items.insert(
            item_path.clone(),
            Item {
                path: item_path.clone(),
                label: label.to_string(),
                attributes: attributes.clone(),
                secret: secret.clone(),
            },
        );
        Ok((item_path, ObjectPath::no_prompt()))
    }

    async fn get_secret(&self, item: &ObjectPath, session: &ObjectPath) -> Result<Secret> {
        Self::injected("GetSecret", &self.get_error)?;

        let mut state = self.state();
        state.calls.push(MockCall::GetSecret(item.clone()));
        if !state.sessions.contains(session) {
            return Err(SecretServiceError::transport(
                "GetSecret",
                anyhow::anyhow!("no such session {}", session),
            ));
        }
        let (_, c) = state.find_item(item).ok_or(SecretServiceError::NotFound)?;
        if c.locked {
            return Err(SecretServiceError::transport(
                "GetSecret",
                anyhow::anyhow!("item {} is locked", item),
            ));
        }

        let stored = &c.items[item].secret;
        Ok(Secret {
            session: session.clone(),
            parameters: Vec::new(),
            value: stored.value.clone(),
            content_type: stored.content_type.clone(),
        })
    }

    async fn delete_item(&self, item: &ObjectPath) -> Result<ObjectPath> {
        Self::injected("Delete", &self.delete_error)?;

        let mut state = self.state();
        state.calls.push(MockCall::Delete(item.clone()));
        let collection = state
            .find_item(item)
            .map(|(path, _)| path.clone())
            .ok_or(SecretServiceError::NotFound)?;

        if let Some(behavior) = self.delete_prompt.clone() {
            return Ok(state.new_prompt(PromptAction::Delete(item.clone()), behavior));
        }
        if let Some(c) = state.collections.get_mut(&collection) {
            c.items.remove(item);
        }
        Ok(ObjectPath::no_prompt())
    }
}
