//! # Operation Token
//!
//! Opaque correlation record threading one logical operation across the
//! asynchronous boundary of the marketplace protocol.
//!
//! The token travels through the free-form `operation` query parameter, so it must
//! carry everything needed to resume polling from any broker process: no
//! server-side operation map exists. A token is only meaningful together with the
//! instance ID it was issued for.
//!
//! Wire form: URL-safe base64 (no padding) of the token's JSON encoding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Logical operation an asynchronous request was accepted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    Upgrade,
    Recreate,
    Bind,
    Unbind,
}

impl OperationType {
    /// Operations that end with a deployment running the plan's manifest
    pub fn deploys_manifest(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Upgrade)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Recreate => write!(f, "recreate"),
            Self::Bind => write!(f, "bind"),
            Self::Unbind => write!(f, "unbind"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("operation token is empty")]
    Empty,

    #[error("operation token is not valid base64: {0}")]
    Encoding(String),

    #[error("operation token payload is malformed: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationToken {
    pub operation_type: OperationType,

    /// Deployment-system task started when the operation was accepted
    pub backend_task_id: u64,

    /// Shared by every backend task belonging to this operation
    pub context_id: String,

    pub plan_id: String,

    /// Errand to run once the deploy task is done, if the plan declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_deploy_errand: Option<String>,
}

impl OperationToken {
    pub fn new(
        operation_type: OperationType,
        backend_task_id: u64,
        context_id: impl Into<String>,
        plan_id: impl Into<String>,
    ) -> Self {
        Self {
            operation_type,
            backend_task_id,
            context_id: context_id.into(),
            plan_id: plan_id.into(),
            post_deploy_errand: None,
        }
    }

    pub fn with_post_deploy_errand(mut self, errand: Option<String>) -> Self {
        self.post_deploy_errand = errand;
        self
    }

    /// Serialize to the opaque string handed to the marketplace
    pub fn encode(&self) -> Result<String, TokenError> {
        let payload =
            serde_json::to_vec(self).map_err(|e| TokenError::Payload(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    /// Parse the opaque string received on a LastOperation poll
    pub fn decode(raw: &str) -> Result<Self, TokenError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TokenError::Empty);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let token: OperationToken =
            serde_json::from_slice(&payload).map_err(|e| TokenError::Payload(e.to_string()))?;

        if token.context_id.is_empty() {
            return Err(TokenError::Payload("context_id is empty".to_string()));
        }

        Ok(token)
    }
}

impl FromStr for OperationToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
