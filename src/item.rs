//! Item and secret payload data structures.

use crate::{Attributes, ObjectPath};
use std::fmt;

/// A secret payload as exchanged with the daemon.
///
/// Sessions are negotiated with the `plain` algorithm, so `parameters` is
/// always empty and `value` travels as opaque bytes. The value is never
/// interpreted by this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    /// Session the payload belongs to
    pub session: ObjectPath,
    /// Algorithm parameters (unused with `plain`)
    pub parameters: Vec<u8>,
    /// The secret bytes
    pub value: Vec<u8>,
    /// Content type of `value`
    pub content_type: String,
}

impl Secret {
    /// Creates a payload for the given session.
    ///
    /// # Example
    ///
    /// ```
    /// use lkru::{ObjectPath, Secret};
    ///
    /// let secret = Secret::new(
    ///     ObjectPath::from("/org/freedesktop/secrets/session/s1"),
    ///     b"sekret".to_vec(),
    ///     "text/plain; charset=utf8",
    /// );
    /// assert!(secret.parameters.is_empty());
    /// assert_eq!(secret.value, b"sekret");
    /// ```
    pub fn new(session: ObjectPath, value: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            session,
            parameters: Vec::new(),
            value,
            content_type: content_type.into(),
        }
    }
}

// Secret bytes stay out of logs and panic messages.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("session", &self.session)
            .field("parameters", &self.parameters)
            .field("value", &format_args!("<{} bytes>", self.value.len()))
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// A stored item as the daemon holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Object path of the item
    pub path: ObjectPath,
    /// Display label
    pub label: String,
    /// Searchable attributes
    pub attributes: Attributes,
    /// The stored payload
    pub secret: Secret,
}

/// Result of a create-or-replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The item was written at this path.
    Stored(ObjectPath),
    /// The daemon asked for a prompt before creating the item. The prompt is
    /// not driven; callers treat this as success.
    PromptPending(ObjectPath),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_value() {
        let secret = Secret::new(ObjectPath::from("/s"), b"hunter2".to_vec(), "text/plain");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<7 bytes>"));
        assert!(debug.contains("text/plain"));
    }
}
