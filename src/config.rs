//! Configuration for opening a collection.

use crate::path::ObjectPath;
use crate::{Result, SecretServiceError};
use std::time::Duration;

/// Agent attribute value stamped on every item this crate creates.
pub const DEFAULT_AGENT: &str = "lkru (Linux Keyring Utility)";

/// Content type sent with every secret payload.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf8";

/// Configuration for a [`CollectionHandle`](crate::CollectionHandle).
///
/// Replaces process-wide defaults with an explicit value. Use the builder
/// methods for ergonomic configuration:
///
/// ```
/// use lkru::Config;
/// use std::time::Duration;
///
/// let config = Config::new("my-tool")
///     .with_collection("login")
///     .with_prompt_timeout(Some(Duration::from_secs(60)));
///
/// assert_eq!(config.application, "my-tool");
/// assert_eq!(
///     config.collection_path().unwrap().as_str(),
///     "/org/freedesktop/secrets/collection/login"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Application namespace (default: "lkru")
    pub application: String,

    /// Collection name (default: "default", meaning the default alias)
    pub collection: String,

    /// Name of the default collection alias (default: "default")
    pub default_alias: String,

    /// Agent attribute value
    pub agent: String,

    /// Content type of stored secrets
    pub content_type: String,

    /// How long to wait for a prompt to complete (default: 5 minutes).
    ///
    /// `None` waits forever.
    pub prompt_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            application: "lkru".to_string(),
            collection: "default".to_string(),
            default_alias: "default".to_string(),
            agent: DEFAULT_AGENT.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            prompt_timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl Config {
    /// Creates a configuration for the given application namespace.
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            ..Default::default()
        }
    }

    /// Builds a configuration from `LKRU_*` environment variables.
    ///
    /// - `LKRU_APPLICATION`: application namespace
    /// - `LKRU_COLLECTION`: collection name
    /// - `LKRU_PROMPT_TIMEOUT_SECS`: prompt timeout in seconds (`0` disables it)
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(application) = lookup("LKRU_APPLICATION") {
            config = config.with_application(application);
        }
        if let Some(collection) = lookup("LKRU_COLLECTION") {
            config = config.with_collection(collection);
        }
        if let Some(secs) = lookup("LKRU_PROMPT_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                SecretServiceError::Other(anyhow::anyhow!(
                    "invalid LKRU_PROMPT_TIMEOUT_SECS '{}': {}",
                    secs,
                    e
                ))
            })?;
            config.prompt_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Sets the application namespace.
    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }

    /// Sets the collection name.
    ///
    /// An empty name or the default alias name selects the default collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Sets the name of the default collection alias.
    pub fn with_default_alias(mut self, alias: impl Into<String>) -> Self {
        self.default_alias = alias.into();
        self
    }

    /// Sets the agent attribute value.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    /// Sets the content type of stored secrets.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Sets the prompt timeout. `None` waits forever.
    pub fn with_prompt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// True if the configured collection is the default alias.
    pub fn uses_default_alias(&self) -> bool {
        self.collection.is_empty() || self.collection == self.default_alias
    }

    /// Path of the default alias.
    pub fn default_alias_path(&self) -> ObjectPath {
        ObjectPath::alias(&self.default_alias)
    }

    /// Resolves the configured collection to its object path.
    ///
    /// No daemon call is made: the path is composed from the name.
    ///
    /// # Errors
    ///
    /// Returns [`SecretServiceError::InvalidName`] if the collection or alias
    /// name cannot be an object path element.
    pub fn collection_path(&self) -> Result<ObjectPath> {
        if self.uses_default_alias() {
            crate::validation::validate_collection_name(&self.default_alias)?;
            Ok(self.default_alias_path())
        } else {
            crate::validation::validate_collection_name(&self.collection)?;
            Ok(ObjectPath::collection(&self.collection))
        }
    }
}
