//! Signed-in user session.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use orebi_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Bearer token plus the user it belongs to.
///
/// The token is held as a [`SecretString`], so `Debug` never prints it.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SecretString,
    pub user: UserProfile,
    pub permissions: Vec<String>,
    /// Explicit expiry; when absent the token's own `exp` claim is used
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn new(token: SecretString, user: UserProfile) -> Self {
        Self {
            token,
            user,
            permissions: Vec::new(),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    /// When the session stops being valid, if known.
    #[must_use]
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .or_else(|| jwt_expiry(self.token.expose_secret()))
    }

    /// Whether the session is still usable at `now`.
    ///
    /// Sessions without a known expiry are assumed fresh; the backend will
    /// reject them if they are not.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_none_or(|expiry| expiry > now)
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying its signature.
///
/// Returns `None` for anything that is not a JWT with a numeric `exp`.
#[must_use]
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}
