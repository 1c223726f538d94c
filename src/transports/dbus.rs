//! D-Bus transport over the user's session bus.
//!
//! Talks to whichever daemon owns `org.freedesktop.secrets` (GNOME Keyring,
//! KeePassXC, KWallet's Secret Service bridge, ...). Calls are made through
//! untyped [`zbus::Proxy`] objects; replies are decoded into this crate's
//! types before they leave the module.

use crate::path::SERVICE_NAME;
use crate::transport::{PromptCompletion, PromptSubscription, Transport};
use crate::{Attributes, ObjectPath, Result, Secret, SecretServiceError};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};
use zbus::{Connection, MatchRule, MessageStream, Proxy};
use zvariant::{OwnedObjectPath, OwnedValue, Type, Value};

const SERVICE_INTERFACE: &str = "org.freedesktop.Secret.Service";
const SESSION_INTERFACE: &str = "org.freedesktop.Secret.Session";
const COLLECTION_INTERFACE: &str = "org.freedesktop.Secret.Collection";
const ITEM_INTERFACE: &str = "org.freedesktop.Secret.Item";
const PROMPT_INTERFACE: &str = "org.freedesktop.Secret.Prompt";

const ITEM_LABEL: &str = "org.freedesktop.Secret.Item.Label";
const ITEM_ATTRIBUTES: &str = "org.freedesktop.Secret.Item.Attributes";

/// Error names meaning the addressed object does not exist (any more).
const NO_SUCH_OBJECT: &[&str] = &[
    "org.freedesktop.Secret.Error.NoSuchObject",
    "org.freedesktop.DBus.Error.UnknownObject",
];

/// Wire form of a secret: `(oayays)`.
#[derive(Debug, Serialize, Deserialize, Type)]
struct WireSecret {
    session: OwnedObjectPath,
    parameters: Vec<u8>,
    value: Vec<u8>,
    content_type: String,
}

/// Transport backed by a zbus connection.
pub struct DbusTransport {
    conn: Connection,
}

impl DbusTransport {
    /// Connects to the user's session bus.
    ///
    /// # Errors
    ///
    /// Returns [`SecretServiceError::Transport`] if the bus is unreachable.
    pub async fn session_bus() -> Result<Self> {
        let conn = Connection::session()
            .await
            .map_err(|e| SecretServiceError::transport("connect to session bus", e))?;
        debug!(unique_name = ?conn.unique_name(), "connected to session bus");
        Ok(Self { conn })
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn proxy(
        &self,
        path: &ObjectPath,
        interface: &'static str,
        method: &str,
    ) -> Result<Proxy<'static>> {
        Proxy::new(&self.conn, SERVICE_NAME, path.as_str().to_owned(), interface)
            .await
            .map_err(|e| map_error(method, e))
    }
}

fn map_error(method: &str, err: zbus::Error) -> SecretServiceError {
    SecretServiceError::transport(method, err)
}

/// Maps errors of calls addressed to an item.
///
/// Only here does "no such object" mean the secret is gone: the item was
/// found by a search and deleted by someone else before this call. A missing
/// collection, session or service stays a transport error.
fn map_item_error(method: &str, err: zbus::Error) -> SecretServiceError {
    if is_no_such_object(&err) {
        SecretServiceError::NotFound
    } else {
        map_error(method, err)
    }
}

fn is_no_such_object(err: &zbus::Error) -> bool {
    match err {
        zbus::Error::MethodError(name, _, _) => NO_SUCH_OBJECT.contains(&name.as_str()),
        zbus::Error::FDO(fdo) => matches!(**fdo, zbus::fdo::Error::UnknownObject(_)),
        _ => false,
    }
}

fn wire_path<'a>(method: &str, path: &'a ObjectPath) -> Result<zvariant::ObjectPath<'a>> {
    zvariant::ObjectPath::try_from(path.as_str())
        .map_err(|e| SecretServiceError::transport(method, e))
}

fn from_wire(path: &OwnedObjectPath) -> ObjectPath {
    ObjectPath::from(path.as_str())
}

/// Collects every object path found in a prompt result.
///
/// Daemons report unlocked collections as `ao`, sometimes nested in another
/// variant; anything else carries no paths.
fn collect_paths(value: &Value<'_>, out: &mut Vec<ObjectPath>) {
    match value {
        Value::ObjectPath(path) => out.push(ObjectPath::from(path.as_str())),
        Value::Array(array) => {
            for element in array.iter() {
                collect_paths(element, out);
            }
        }
        Value::Value(inner) => collect_paths(inner, out),
        _ => {}
    }
}

fn decode_completion(dismissed: bool, result: &Value<'_>) -> PromptCompletion {
    if dismissed {
        return PromptCompletion::Dismissed;
    }
    let mut paths = Vec::new();
    collect_paths(result, &mut paths);
    PromptCompletion::Completed(paths)
}

/// Subscription to one prompt's `Completed` signal.
///
/// Dropping the stream removes the match rule from the bus.
struct DbusSubscription {
    prompt: ObjectPath,
    stream: MessageStream,
}

#[async_trait]
impl PromptSubscription for DbusSubscription {
    async fn completed(&mut self) -> Result<PromptCompletion> {
        let msg = self
            .stream
            .try_next()
            .await
            .map_err(|e| SecretServiceError::transport("Prompt.Completed", e))?
            .ok_or_else(|| {
                SecretServiceError::transport(
                    "Prompt.Completed",
                    anyhow::anyhow!("signal stream for {} closed", self.prompt),
                )
            })?;

        let body = msg.body();
        let (dismissed, result): (bool, OwnedValue) = body
            .deserialize()
            .map_err(|e| SecretServiceError::transport("Prompt.Completed", e))?;
        trace!(prompt = %self.prompt, dismissed, "prompt signal received");
        Ok(decode_completion(dismissed, &result))
    }
}

#[async_trait]
impl Transport for DbusTransport {
    fn name(&self) -> &str {
        "dbus"
    }

    async fn open_session(&self, algorithm: &str) -> Result<ObjectPath> {
        let proxy = self
            .proxy(&ObjectPath::service(), SERVICE_INTERFACE, "OpenSession")
            .await?;
        let (_output, path): (OwnedValue, OwnedObjectPath) = proxy
            .call("OpenSession", &(algorithm, Value::from("")))
            .await
            .map_err(|e| map_error("OpenSession", e))?;
        Ok(from_wire(&path))
    }

    async fn unlock(&self, objects: &[ObjectPath]) -> Result<(Vec<ObjectPath>, ObjectPath)> {
        let proxy = self
            .proxy(&ObjectPath::service(), SERVICE_INTERFACE, "Unlock")
            .await?;
        let objects = objects
            .iter()
            .map(|p| wire_path("Unlock", p))
            .collect::<Result<Vec<_>>>()?;
        let (unlocked, prompt): (Vec<OwnedObjectPath>, OwnedObjectPath) = proxy
            .call("Unlock", &(objects,))
            .await
            .map_err(|e| map_error("Unlock", e))?;
        Ok((unlocked.iter().map(from_wire).collect(), from_wire(&prompt)))
    }

    async fn close_session(&self, session: &ObjectPath) -> Result<()> {
        let proxy = self.proxy(session, SESSION_INTERFACE, "Session.Close").await?;
        proxy
            .call::<_, _, ()>("Close", &())
            .await
            .map_err(|e| map_error("Session.Close", e))
    }

    async fn subscribe_prompt(&self, prompt: &ObjectPath) -> Result<Box<dyn PromptSubscription>> {
        let subscribe_err = |e: zbus::Error| SecretServiceError::transport("AddMatch", e);
        let rule = MatchRule::builder()
            .msg_type(zbus::message::Type::Signal)
            .interface(PROMPT_INTERFACE)
            .map_err(subscribe_err)?
            .member("Completed")
            .map_err(subscribe_err)?
            .path(prompt.as_str())
            .map_err(subscribe_err)?
            .build();
        let stream = MessageStream::for_match_rule(rule, &self.conn, None)
            .await
            .map_err(subscribe_err)?;

        Ok(Box::new(DbusSubscription {
            prompt: prompt.clone(),
            stream,
        }))
    }

    async fn prompt(&self, prompt: &ObjectPath, window_id: &str) -> Result<()> {
        let proxy = self.proxy(prompt, PROMPT_INTERFACE, "Prompt").await?;
        proxy
            .call::<_, _, ()>("Prompt", &(window_id,))
            .await
            .map_err(|e| map_error("Prompt", e))
    }

    async fn search_items(
        &self,
        collection: &ObjectPath,
        attributes: &Attributes,
    ) -> Result<Vec<ObjectPath>> {
        let proxy = self
            .proxy(collection, COLLECTION_INTERFACE, "SearchItems")
            .await?;
        let attributes: HashMap<&str, &str> = attributes.iter().collect();
        let items: Vec<OwnedObjectPath> = proxy
            .call("SearchItems", &(attributes,))
            .await
            .map_err(|e| map_error("SearchItems", e))?;
        Ok(items.iter().map(from_wire).collect())
    }

    async fn create_item(
        &self,
        collection: &ObjectPath,
        label: &str,
        attributes: &Attributes,
        secret: &Secret,
        replace: bool,
    ) -> Result<(ObjectPath, ObjectPath)> {
        let proxy = self
            .proxy(collection, COLLECTION_INTERFACE, "CreateItem")
            .await?;

        let attributes: HashMap<&str, &str> = attributes.iter().collect();
        let mut properties: HashMap<&str, Value<'_>> = HashMap::new();
        properties.insert(ITEM_LABEL, Value::from(label));
        properties.insert(ITEM_ATTRIBUTES, Value::from(attributes));

        let wire = WireSecret {
            session: OwnedObjectPath::from(wire_path("CreateItem", &secret.session)?),
            parameters: secret.parameters.clone(),
            value: secret.value.clone(),
            content_type: secret.content_type.clone(),
        };

        let (item, prompt): (OwnedObjectPath, OwnedObjectPath) = proxy
            .call("CreateItem", &(properties, wire, replace))
            .await
            .map_err(|e| map_error("CreateItem", e))?;
        Ok((from_wire(&item), from_wire(&prompt)))
    }

    async fn get_secret(&self, item: &ObjectPath, session: &ObjectPath) -> Result<Secret> {
        let proxy = self.proxy(item, ITEM_INTERFACE, "GetSecret").await?;
        let session_path = wire_path("GetSecret", session)?;
        let wire: WireSecret = proxy
            .call("GetSecret", &(session_path,))
            .await
            .map_err(|e| map_item_error("GetSecret", e))?;

        Ok(Secret {
            session: from_wire(&wire.session),
            parameters: wire.parameters,
            value: wire.value,
            content_type: wire.content_type,
        })
    }

    async fn delete_item(&self, item: &ObjectPath) -> Result<ObjectPath> {
        let proxy = self.proxy(item, ITEM_INTERFACE, "Delete").await?;
        let prompt: OwnedObjectPath = proxy
            .call("Delete", &())
            .await
            .map_err(|e| map_item_error("Delete", e))?;
        Ok(from_wire(&prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_dismissed() {
        assert_eq!(
            decode_completion(true, &Value::from("")),
            PromptCompletion::Dismissed
        );
    }

    #[test]
    fn test_decode_path_array() {
        let paths = vec![
            zvariant::ObjectPath::try_from("/org/freedesktop/secrets/collection/login").unwrap(),
        ];
        let value = Value::from(paths);

        assert_eq!(
            decode_completion(false, &value),
            PromptCompletion::Completed(vec![ObjectPath::collection("login")])
        );
    }

    #[test]
    fn test_decode_nested_variant() {
        let inner = Value::from(
            zvariant::ObjectPath::try_from("/org/freedesktop/secrets/collection/work").unwrap(),
        );
        let value = Value::Value(Box::new(inner));

        assert_eq!(
            decode_completion(false, &value),
            PromptCompletion::Completed(vec![ObjectPath::collection("work")])
        );
    }

    #[test]
    fn test_decode_non_path_result() {
        assert_eq!(
            decode_completion(false, &Value::from("")),
            PromptCompletion::Completed(Vec::new())
        );
    }

    fn unknown_object() -> zbus::Error {
        zbus::Error::FDO(Box::new(zbus::fdo::Error::UnknownObject(
            "gone".to_string(),
        )))
    }

    #[test]
    fn test_vanished_item_maps_to_not_found() {
        for method in ["GetSecret", "Delete"] {
            assert!(matches!(
                map_item_error(method, unknown_object()),
                SecretServiceError::NotFound
            ));
        }

        let err = zbus::Error::Failure("boom".to_string());
        assert!(matches!(
            map_item_error("Delete", err),
            SecretServiceError::Transport { .. }
        ));
    }

    #[test]
    fn test_missing_collection_stays_transport_error() {
        for method in ["SearchItems", "CreateItem", "Unlock", "OpenSession", "Session.Close"] {
            match map_error(method, unknown_object()) {
                SecretServiceError::Transport { method: failed, .. } => assert_eq!(failed, method),
                other => panic!("{} mapped to {:?}", method, other),
            }
        }
    }

    #[test]
    fn test_wire_path_rejects_invalid() {
        assert!(wire_path("Unlock", &ObjectPath::from("not a path")).is_err());
        assert!(wire_path("Unlock", &ObjectPath::collection("login")).is_ok());
    }

    #[tokio::test]
    #[ignore] // Needs a session bus with a Secret Service daemon
    async fn test_open_and_close_session() {
        let transport = DbusTransport::session_bus().await.unwrap();
        let session = transport.open_session("plain").await.unwrap();
        transport.close_session(&session).await.unwrap();
    }
}
