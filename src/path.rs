//! Object paths and the well-known paths of the Secret Service.

use std::fmt;

/// Bus name the keyring daemon owns on the session bus.
pub const SERVICE_NAME: &str = "org.freedesktop.secrets";

/// Object path of the service root.
pub const SERVICE_PATH: &str = "/org/freedesktop/secrets";

/// Path the daemon returns when no prompt is needed.
pub const NO_PROMPT: &str = "/";

/// An opaque object path naming a remote object exposed by the daemon.
///
/// The client never parses these beyond equality and composing the
/// well-known alias and collection paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Path of the service root object.
    pub fn service() -> Self {
        Self(SERVICE_PATH.to_string())
    }

    /// The "no prompt needed" sentinel.
    pub fn no_prompt() -> Self {
        Self(NO_PROMPT.to_string())
    }

    /// Path of a collection alias, e.g. `/org/freedesktop/secrets/aliases/default`.
    pub fn alias(name: &str) -> Self {
        Self(format!("{}/aliases/{}", SERVICE_PATH, name))
    }

    /// Path of a collection by name, e.g. `/org/freedesktop/secrets/collection/login`.
    pub fn collection(name: &str) -> Self {
        Self(format!("{}/collection/{}", SERVICE_PATH, name))
    }

    /// True for the `/` sentinel meaning "already satisfied".
    pub fn is_no_prompt(&self) -> bool {
        self.0 == NO_PROMPT
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for ObjectPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
