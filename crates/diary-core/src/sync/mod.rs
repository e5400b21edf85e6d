//! Exchange of an auth access token for a short-lived replica sync token.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::db::SyncConfig;
use crate::util::{normalize_http_base_url, normalize_text_option, unix_timestamp_now};

#[derive(Clone, PartialEq, Eq)]
pub struct SyncToken {
    pub token: String,
    pub expires_at: i64,
    pub database_url: Option<String>,
}

impl SyncToken {
    /// Build a replica config, preferring the URL issued with the token.
    #[must_use]
    pub fn to_sync_config(&self, fallback_url: Option<&str>) -> Option<SyncConfig> {
        let url = self
            .database_url
            .clone()
            .or_else(|| normalize_text_option(fallback_url.map(str::to_string)))?;
        Some(SyncConfig::new(url, self.token.clone()))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now()
    }
}

impl std::fmt::Debug for SyncToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("database_url", &self.database_url)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SyncAuthError {
    #[error("Invalid sync auth configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync auth HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync auth API error: {0}")]
    Api(String),
    #[error("Invalid sync token payload: {0}")]
    InvalidPayload(String),
}

pub type SyncAuthResult<T> = Result<T, SyncAuthError>;

#[derive(Clone)]
pub struct SyncTokenClient {
    endpoint: String,
    client: reqwest::Client,
}

impl SyncTokenClient {
    pub fn new(endpoint: impl Into<String>) -> SyncAuthResult<Self> {
        let endpoint = normalize_http_base_url(&endpoint.into(), "Sync token endpoint")
            .map_err(SyncAuthError::InvalidConfiguration)?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder().build()?,
        })
    }

    pub async fn exchange_token(&self, access_token: &str) -> SyncAuthResult<SyncToken> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(SyncAuthError::InvalidConfiguration(
                "Access token must not be empty".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncAuthError::Api(parse_api_error(status, &body)));
        }

        let token: SyncToken = response.json::<SyncTokenResponse>().await?.try_into()?;
        tracing::debug!("Exchanged sync token expiring at {}", token.expires_at);
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct SyncTokenResponse {
    auth_token: Option<String>,
    token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    database_url: Option<String>,
}

impl TryFrom<SyncTokenResponse> for SyncToken {
    type Error = SyncAuthError;

    fn try_from(value: SyncTokenResponse) -> SyncAuthResult<Self> {
        let token = normalize_text_option(value.auth_token.or(value.token)).ok_or_else(|| {
            SyncAuthError::InvalidPayload("response did not include auth_token/token".to_string())
        })?;

        let expires_at = value
            .expires_at
            .or_else(|| {
                value
                    .expires_in
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            })
            .ok_or_else(|| {
                SyncAuthError::InvalidPayload(
                    "response did not include expires_at/expires_in".to_string(),
                )
            })?;

        Ok(Self {
            token,
            expires_at,
            database_url: normalize_text_option(value.database_url),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SyncAuthErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<SyncAuthErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(token: Option<&str>, expires_in: Option<i64>) -> SyncTokenResponse {
        SyncTokenResponse {
            auth_token: None,
            token: token.map(str::to_string),
            expires_at: None,
            expires_in,
            database_url: Some("  ".to_string()),
        }
    }

    #[test]
    fn client_rejects_invalid_endpoint() {
        assert!(SyncTokenClient::new("").is_err());
        assert!(SyncTokenClient::new("api.example.com").is_err());
        assert!(SyncTokenClient::new("https://api.example.com/v1/sync/token").is_ok());
    }

    #[test]
    fn payload_requires_token_and_expiry() {
        assert!(matches!(
            SyncToken::try_from(response(None, Some(60))),
            Err(SyncAuthError::InvalidPayload(_))
        ));
        assert!(matches!(
            SyncToken::try_from(response(Some("t"), None)),
            Err(SyncAuthError::InvalidPayload(_))
        ));

        let token = SyncToken::try_from(response(Some(" t "), Some(60))).unwrap();
        assert_eq!(token.token, "t");
        assert_eq!(token.database_url, None);
        assert!(!token.is_expired());
    }

    #[test]
    fn sync_config_prefers_issued_database_url() {
        let token = SyncToken {
            token: "secret".to_string(),
            expires_at: 123,
            database_url: Some("libsql://issued.turso.io".to_string()),
        };
        let config = token.to_sync_config(Some("libsql://fallback.turso.io")).unwrap();
        assert_eq!(config.url, "libsql://issued.turso.io");
        assert_eq!(config.auth_token, "secret");

        let bare = SyncToken {
            database_url: None,
            ..token
        };
        assert!(bare.to_sync_config(None).is_none());
        assert!(bare.to_sync_config(Some("libsql://fallback.turso.io")).is_some());
    }

    #[test]
    fn sync_token_debug_redacts_token() {
        let token = SyncToken {
            token: "secret".to_string(),
            expires_at: 123,
            database_url: Some("libsql://example.turso.io".to_string()),
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
