//! Attribute sets used to address items.
//!
//! Every item this crate creates carries three attributes:
//!
//! - `Agent`: a fixed marker naming the tool that wrote it
//! - `Application`: the caller's namespace
//! - `Id`: the caller's label
//!
//! Searches match the whole set exactly (case-sensitive, no wildcards), so
//! one (application, label) pair addresses at most one item.

use crate::validation::validate_attribute_value;
use crate::Result;
use std::collections::BTreeMap;

/// Attribute key of the agent marker.
pub const ATTR_AGENT: &str = "Agent";

/// Attribute key of the application namespace.
pub const ATTR_APPLICATION: &str = "Application";

/// Attribute key of the label.
pub const ATTR_ID: &str = "Id";

/// A string-to-string attribute mapping attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the attribute set for a secret.
    ///
    /// # Errors
    ///
    /// Returns [`SecretServiceError::InvalidName`](crate::SecretServiceError::InvalidName)
    /// if the application or label is empty or contains control characters.
    ///
    /// # Example
    ///
    /// ```
    /// use lkru::Attributes;
    ///
    /// let attrs = Attributes::for_secret("lkru", "tool-a", "api-key").unwrap();
    /// assert_eq!(attrs.get("Application"), Some("tool-a"));
    /// assert_eq!(attrs.get("Id"), Some("api-key"));
    /// assert_eq!(attrs.len(), 3);
    /// ```
    pub fn for_secret(agent: &str, application: &str, label: &str) -> Result<Self> {
        validate_attribute_value("application", application)?;
        validate_attribute_value("label", label)?;

        Ok(Self::new()
            .with(ATTR_AGENT, agent)
            .with(ATTR_APPLICATION, application)
            .with(ATTR_ID, label))
    }

    /// Adds or replaces an attribute.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Gets an attribute value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True if every attribute in `self` is present with the same value in `other`.
    ///
    /// This is the daemon's search rule: the query must be a subset of the
    /// item's attributes.
    pub fn is_subset_of(&self, other: &Attributes) -> bool {
        self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
