//! Caller-side encoding of stored values.
//!
//! The core stores and returns raw bytes. Tools that want to keep binary
//! values printable can store them base64-encoded and decode on read.

use crate::{Result, SecretServiceError};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// How a value is encoded in the keyring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Stored as given.
    #[default]
    Raw,
    /// Stored as standard base64 text.
    Base64,
}

impl Encoding {
    /// Selects base64 when `base64` is set.
    pub fn from_flag(base64: bool) -> Self {
        if base64 {
            Self::Base64
        } else {
            Self::Raw
        }
    }

    /// Encodes a value before storing it.
    ///
    /// # Example
    ///
    /// ```
    /// use lkru::Encoding;
    ///
    /// assert_eq!(Encoding::Base64.encode(b"sekret"), b"c2VrcmV0");
    /// assert_eq!(Encoding::Raw.encode(b"sekret"), b"sekret");
    /// ```
    pub fn encode(self, value: &[u8]) -> Vec<u8> {
        match self {
            Self::Raw => value.to_vec(),
            Self::Base64 => STANDARD.encode(value).into_bytes(),
        }
    }

    /// Decodes a value read from the keyring.
    ///
    /// # Errors
    ///
    /// Returns [`SecretServiceError::Other`] if the value is not valid base64.
    pub fn decode(self, value: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Raw => Ok(value.to_vec()),
            Self::Base64 => STANDARD.decode(value).map_err(|e| {
                SecretServiceError::Other(anyhow::anyhow!("value is not valid base64: {}", e))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_is_identity() {
        let value = [0u8, 159, 146, 150];
        assert_eq!(Encoding::Raw.encode(&value), value);
        assert_eq!(Encoding::Raw.decode(&value).unwrap(), value);
    }

    #[test]
    fn test_base64_binary_value() {
        let value = [0u8, 159, 146, 150];
        let stored = Encoding::Base64.encode(&value);
        assert_eq!(stored, b"AJ+Slg==");
        assert_eq!(Encoding::Base64.decode(&stored).unwrap(), value);
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let result = Encoding::Base64.decode(b"not base64!");
        assert!(matches!(result, Err(SecretServiceError::Other(_))));
    }

    #[test]
    fn test_from_flag() {
        assert_eq!(Encoding::from_flag(true), Encoding::Base64);
        assert_eq!(Encoding::from_flag(false), Encoding::Raw);
        assert_eq!(Encoding::default(), Encoding::Raw);
    }
}
