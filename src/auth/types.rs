// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque bearer credential plus an optional expiry hint.
///
/// The client never inspects the token's structure; the expiry hint is
/// carried for collaborators (persistent stores, session UIs) and never
/// drives pipeline decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(expires_at),
        }
    }
}

/// Refresh request body sent to the dedicated refresh endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub token: String,
}

/// Refresh response data (the envelope's inner `data`).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_in: Option<u64>,
}
