//! Error types for Secret Service operations.

use crate::path::ObjectPath;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`SecretServiceError`].
pub type Result<T> = std::result::Result<T, SecretServiceError>;

/// Boxed error carried by [`SecretServiceError::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while talking to the keyring daemon.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
/// None of them are retried by this crate.
#[derive(Debug, Error)]
pub enum SecretServiceError {
    /// The bus could not be reached, the call could not be dispatched, or the
    /// daemon rejected it.
    #[error("{method} failed: {source}")]
    Transport {
        /// Protocol method (or bus operation) that failed
        method: String,
        /// Underlying transport error
        #[source]
        source: BoxError,
    },

    /// The daemon unlocked the wrong collection or none at all.
    #[error("unable to unlock collection '{collection}': {reason}")]
    UnlockVerification {
        /// Collection that was supposed to be unlocked
        collection: ObjectPath,
        /// What the daemon reported instead
        reason: UnlockFailure,
    },

    /// The user declined the daemon's prompt.
    #[error("prompt {0} was dismissed")]
    PromptDismissed(ObjectPath),

    /// The daemon never completed the prompt within the configured timeout.
    #[error("prompt {prompt} did not complete within {timeout:?}")]
    PromptTimeout {
        /// Prompt that was being awaited
        prompt: ObjectPath,
        /// Configured timeout
        timeout: Duration,
    },

    /// No item matched the search attributes.
    #[error("no such secret")]
    NotFound,

    /// More than one item matched the search attributes.
    #[error("search returned {0} items")]
    Ambiguous(usize),

    /// A collection, application or label name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A collection operation failed with context.
    #[error("unable to {operation} secret '{label}' for application '{application}' in collection '{collection}': {source}")]
    Operation {
        /// Operation name (get, set, delete)
        operation: String,
        /// Collection object path
        collection: ObjectPath,
        /// Application namespace
        application: String,
        /// Secret label
        label: String,
        /// Underlying error
        #[source]
        source: Box<SecretServiceError>,
    },

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why an unlock could not be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockFailure {
    /// The daemon reported no unlocked objects.
    NothingUnlocked,
    /// The daemon unlocked this many objects, none of them the target.
    OtherCollections(usize),
}

impl std::fmt::Display for UnlockFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingUnlocked => write!(f, "no collections were unlocked"),
            Self::OtherCollections(n) => {
                write!(f, "unlocked {} collections not including it", n)
            }
        }
    }
}

impl SecretServiceError {
    /// Creates a transport error for the given protocol method.
    pub fn transport(method: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            method: method.into(),
            source: source.into(),
        }
    }

    /// Wraps an error with the collection, application and label it concerns.
    ///
    /// # Example
    ///
    /// ```
    /// use lkru::{ObjectPath, SecretServiceError};
    ///
    /// let err = SecretServiceError::operation(
    ///     "get",
    ///     ObjectPath::from("/org/freedesktop/secrets/collection/login"),
    ///     "tool-a",
    ///     "api-key",
    ///     SecretServiceError::NotFound,
    /// );
    ///
    /// assert_eq!(
    ///     err.to_string(),
    ///     "unable to get secret 'api-key' for application 'tool-a' in collection \
    ///      '/org/freedesktop/secrets/collection/login': no such secret"
    /// );
    /// assert!(err.is_not_found());
    /// ```
    pub fn operation(
        operation: impl Into<String>,
        collection: ObjectPath,
        application: impl Into<String>,
        label: impl Into<String>,
        err: SecretServiceError,
    ) -> Self {
        Self::Operation {
            operation: operation.into(),
            collection,
            application: application.into(),
            label: label.into(),
            source: Box::new(err),
        }
    }

    /// Returns the innermost error, looking through [`Operation`](Self::Operation) wrappers.
    pub fn root(&self) -> &SecretServiceError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if the root cause is [`NotFound`](Self::NotFound).
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound)
    }

    /// True if the root cause is [`PromptDismissed`](Self::PromptDismissed).
    pub fn is_dismissed(&self) -> bool {
        matches!(self.root(), Self::PromptDismissed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        assert_eq!(SecretServiceError::NotFound.to_string(), "no such secret");
        assert_eq!(
            SecretServiceError::Ambiguous(3).to_string(),
            "search returned 3 items"
        );
    }

    #[test]
    fn test_operation_error() {
        let inner = SecretServiceError::Ambiguous(2);
        let err = SecretServiceError::operation(
            "set",
            ObjectPath::from("/org/freedesktop/secrets/aliases/default"),
            "tool-a",
            "api-key",
            inner,
        );

        let error_string = err.to_string();
        assert!(error_string.contains("set"));
        assert!(error_string.contains("tool-a"));
        assert!(error_string.contains("api-key"));
        assert!(error_string.contains("aliases/default"));
        assert!(matches!(err.root(), SecretServiceError::Ambiguous(2)));
    }

    #[test]
    fn test_error_source_chain() {
        let inner = SecretServiceError::NotFound;
        let outer = SecretServiceError::operation(
            "delete",
            ObjectPath::from("/c"),
            "app",
            "label",
            inner,
        );

        assert!(outer.source().is_some());
        assert!(outer.is_not_found());
        assert!(!outer.is_dismissed());
    }

    #[test]
    fn test_unlock_failure_display() {
        let err = SecretServiceError::UnlockVerification {
            collection: ObjectPath::from("/org/freedesktop/secrets/collection/work"),
            reason: UnlockFailure::OtherCollections(2),
        };
        assert_eq!(
            err.to_string(),
            "unable to unlock collection '/org/freedesktop/secrets/collection/work': \
             unlocked 2 collections not including it"
        );
        assert_eq!(
            UnlockFailure::NothingUnlocked.to_string(),
            "no collections were unlocked"
        );
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let err = SecretServiceError::transport("OpenSession", anyhow::anyhow!("bus gone"));
        assert_eq!(err.to_string(), "OpenSession failed: bus gone");
        assert!(err.source().is_some());
    }
}
