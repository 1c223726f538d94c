//! Session management.
//!
//! Every item operation is scoped to a session opened on the service root.
//! This crate negotiates the unauthenticated `plain` algorithm, so secret
//! payloads travel as opaque bytes. Sessions must be closed on every exit
//! path once opened; [`CollectionHandle`](crate::CollectionHandle) takes care
//! of that for callers.

use crate::transport::{Transport, ALGORITHM_PLAIN};
use crate::{ObjectPath, Result};
use tracing::debug;

/// An open session with the daemon.
#[derive(Debug, PartialEq, Eq)]
pub struct Session {
    path: ObjectPath,
}

impl Session {
    /// Opens a `plain` session.
    ///
    /// # Errors
    ///
    /// Returns [`SecretServiceError::Transport`](crate::SecretServiceError::Transport)
    /// if the call cannot be dispatched or the daemon rejects the negotiation.
    pub async fn open(transport: &dyn Transport) -> Result<Self> {
        let path = transport.open_session(ALGORITHM_PLAIN).await?;
        debug!(session = %path, transport = transport.name(), "session opened");
        Ok(Self { path })
    }

    /// Object path of the session.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Closes the session.
    ///
    /// Failing to close leaks the daemon-side session object but leaves the
    /// client consistent, so callers usually log the error and move on.
    pub async fn close(self, transport: &dyn Transport) -> Result<()> {
        transport.close_session(&self.path).await?;
        debug!(session = %self.path, "session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::mock::{MockCall, MockTransport};
    use crate::SecretServiceError;

    #[tokio::test]
    async fn test_open_and_close() {
        let transport = MockTransport::new();
        let session = Session::open(&transport).await.unwrap();
        assert_eq!(transport.open_sessions(), vec![session.path().clone()]);

        session.close(&transport).await.unwrap();
        assert!(transport.open_sessions().is_empty());
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(transport.calls()[0], MockCall::OpenSession);
    }

    #[tokio::test]
    async fn test_open_failure_is_transport_error() {
        let mut transport = MockTransport::new();
        transport.open_session_error = Some("daemon not running".to_string());

        let result = Session::open(&transport).await;
        match result {
            Err(SecretServiceError::Transport { method, .. }) => assert_eq!(method, "OpenSession"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
