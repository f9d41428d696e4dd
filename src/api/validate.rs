// src/api/validate.rs
//! API key probe: one cheap authenticated request, classified by status.

use super::client::NotionHttpClient;
use crate::types::ApiKey;
use serde::Serialize;
use std::fmt;

/// Outcome of [`validate_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Ok,
    Unauthorized,
    Internal,
}

impl TokenStatus {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => TokenStatus::Ok,
            401 => TokenStatus::Unauthorized,
            _ => TokenStatus::Internal,
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStatus::Ok => write!(f, "OK"),
            TokenStatus::Unauthorized => write!(f, "UNAUTHORIZED"),
            TokenStatus::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Hits `/users?page_size=1`; transport failures count as `Internal`.
pub async fn validate_token(api_key: &ApiKey) -> TokenStatus {
    let client = match NotionHttpClient::new(api_key) {
        Ok(client) => client,
        Err(e) => {
            log::warn!("cannot build Notion client: {}", e);
            return TokenStatus::Internal;
        }
    };
    match client.get("users", &[("page_size", "1".to_string())]).await {
        Ok(response) => {
            let status = TokenStatus::from_status(response.status().as_u16());
            log::debug!("token probe answered {}", response.status());
            status
        }
        Err(e) => {
            log::warn!("token probe failed: {}", e);
            TokenStatus::Internal
        }
    }
}
