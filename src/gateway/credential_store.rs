use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialStoreError {
    /// The store's network name does not resolve yet, typically because it is still starting
    #[error("credential store host {host} cannot be resolved")]
    DnsUnresolvable { host: String },

    #[error("credential store connection failed: {reason}")]
    Connection { reason: String },

    #[error("credential store authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("credential value has unsupported shape: {shape}")]
    UnsupportedValueShape { shape: String },

    #[error("credential store request for {key} failed: {reason}")]
    Request { key: String, reason: String },
}

/// Value shapes the secret store accepts
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialValue {
    Text(String),
    Json(serde_json::Map<String, Value>),
}

impl CredentialValue {
    /// Map a binding payload onto a storable shape. Only strings and objects are
    /// storable; anything else is rejected.
    pub fn from_json(value: &Value) -> Result<Self, CredentialStoreError> {
        match value {
            Value::String(text) => Ok(Self::Text(text.clone())),
            Value::Object(map) => Ok(Self::Json(map.clone())),
            other => Err(CredentialStoreError::UnsupportedValueShape {
                shape: json_shape(other).to_string(),
            }),
        }
    }
}

fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
pub trait CredentialStoreGateway: Send + Sync {
    async fn set(&self, key: &str, value: &Value) -> Result<(), CredentialStoreError>;

    async fn delete(&self, key: &str) -> Result<(), CredentialStoreError>;

    async fn authenticate(&self) -> Result<(), CredentialStoreError>;
}
