use serde::{Deserialize, Serialize};

/// Serialized session state (AppState) that authenticates a connection
/// without an interactive login. The crate never looks inside it.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Credentials(pub serde_json::Value);

impl Credentials {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}
