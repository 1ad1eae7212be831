//! Document model shared by the whole crate.
//!
//! A document is a JSON object (`serde_json::Map`), identified by the fixed
//! `_id` field. `EntityId` wraps an arbitrary JSON identity value and makes
//! it usable as a map key.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed identity-field-name convention used by the compiler's correlation
/// stages and the identity lookups of the lazy runtime.
pub const ID_FIELD: &str = "_id";

/// A raw document as stored in (or returned by) the persistence layer.
pub type Document = serde_json::Map<String, Value>;

/// The identity value of an entity.
///
/// Identity values are opaque JSON values (strings, numbers, object ids
/// rendered by the driver layer); this newtype adds the `Hash` impl needed
/// for deduplication keyed by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Value);

impl EntityId {
    /// Wrap a raw JSON value as an identity.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consume the id, returning the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the canonical JSON representation for consistency across
        // value kinds; identity values are scalars in practice.
        serde_json::to_string(&self.0).unwrap_or_default().hash(state);
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

/// Extract the identity of a document, if it carries one.
pub fn doc_id(doc: &Document) -> Option<EntityId> {
    doc.get(ID_FIELD).cloned().map(EntityId::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_entity_id_equality_and_hashing() {
        let a = EntityId::from("W1");
        let b = EntityId::from("W1");
        let c = EntityId::from("W2");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        set.insert(c);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_entity_id_serde_transparent() {
        let id = EntityId::from(42i64);
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(42));

        let parsed: EntityId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(parsed, EntityId::from("abc"));
    }

    #[test]
    fn test_doc_id() {
        let doc = json!({"_id": "D1", "name": "front"});
        let doc = doc.as_object().unwrap().clone();
        assert_eq!(doc_id(&doc), Some(EntityId::from("D1")));

        let empty = Document::new();
        assert_eq!(doc_id(&empty), None);
    }
}
