//! Keyring-based token provider (Read-Only)
//!
//! OAuth tokens are obtained and refreshed by an external auth flow, which
//! writes them to the system keyring. This server only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mailcal_orchestrator_provider::TokenProvider;
use serde::Deserialize;

const SERVICE_NAME: &str = "mailcal-orchestrator";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Token record stored under `token:<account id>`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    /// Empty means "unknown", which is accepted for any scope.
    #[serde(default)]
    scopes: Vec<String>,
}

/// Interpret a stored keyring value.
///
/// Accepts either a JSON token record or a bare access token string. Returns
/// `None` when the token is blank, expired, or missing a requested scope.
pub(crate) fn parse_stored_token(raw: &str, scopes: &[&str], now: DateTime<Utc>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let Ok(token) = serde_json::from_str::<StoredToken>(raw) else {
        // 非 JSON 时视为裸 access token
        return if raw.starts_with('{') {
            tracing::warn!("Ignoring malformed token record in keyring");
            None
        } else {
            Some(raw.to_string())
        };
    };

    if token.access_token.trim().is_empty() {
        return None;
    }
    if let Some(expires_at) = token.expires_at
        && expires_at - Duration::seconds(EXPIRY_SKEW_SECS) <= now
    {
        tracing::debug!("Stored token expired at {expires_at}");
        return None;
    }
    if !token.scopes.is_empty()
        && let Some(missing) = scopes
            .iter()
            .find(|s| !token.scopes.iter().any(|have| have == *s))
    {
        tracing::debug!("Stored token lacks scope {missing}");
        return None;
    }
    Some(token.access_token)
}

/// Token provider backed by the system keychain (Keychain on macOS,
/// Credential Manager on Windows, secret-service on Linux).
#[derive(Debug, Default)]
pub struct KeyringTokenProvider;

impl KeyringTokenProvider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Read the raw value for an account (synchronous).
    fn read_raw_sync(account_id: &str) -> Option<String> {
        let entry = match keyring::Entry::new(SERVICE_NAME, &format!("token:{account_id}")) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Keyring unavailable for account {account_id}: {e}");
                return None;
            }
        };

        match entry.get_password() {
            Ok(raw) => Some(raw),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::warn!("Failed to read token for account {account_id}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl TokenProvider for KeyringTokenProvider {
    async fn bearer_token(&self, account_id: &str, scopes: &[&str]) -> Option<String> {
        let id = account_id.to_string();
        let raw = match tokio::task::spawn_blocking(move || Self::read_raw_sync(&id)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Keyring task join error: {e}");
                return None;
            }
        };
        parse_stored_token(&raw, scopes, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default()
    }

    #[test]
    fn bare_string_is_a_token() {
        assert_eq!(
            parse_stored_token("  ya29.abc \n", &["mail"], now()).as_deref(),
            Some("ya29.abc")
        );
        assert_eq!(parse_stored_token("   ", &[], now()), None);
    }

    #[test]
    fn record_within_lifetime_and_scopes() {
        let raw = r#"{"accessToken":"t1","expiresAt":"2025-03-01T13:00:00Z","scopes":["Mail.Read","Calendars.Read"]}"#;
        assert_eq!(
            parse_stored_token(raw, &["Mail.Read"], now()).as_deref(),
            Some("t1")
        );
    }

    #[test]
    fn expired_or_about_to_expire_is_rejected() {
        let expired = r#"{"accessToken":"t1","expiresAt":"2025-03-01T11:00:00Z"}"#;
        assert_eq!(parse_stored_token(expired, &[], now()), None);

        let skewed = r#"{"accessToken":"t1","expiresAt":"2025-03-01T12:00:30Z"}"#;
        assert_eq!(parse_stored_token(skewed, &[], now()), None);
    }

    #[test]
    fn missing_scope_is_rejected() {
        let raw = r#"{"accessToken":"t1","scopes":["Mail.Read"]}"#;
        assert_eq!(parse_stored_token(raw, &["Mail.Send"], now()), None);
    }

    #[test]
    fn unknown_scopes_are_accepted() {
        let raw = r#"{"accessToken":"t1"}"#;
        assert_eq!(
            parse_stored_token(raw, &["Contacts.ReadWrite"], now()).as_deref(),
            Some("t1")
        );
    }

    #[test]
    fn malformed_record_is_rejected() {
        assert_eq!(parse_stored_token(r#"{"token":"#, &[], now()), None);
        assert_eq!(parse_stored_token(r#"{"accessToken":""}"#, &[], now()), None);
    }
}
