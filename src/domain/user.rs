use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity the backend reports after authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
}

/// An authenticated session: tokens plus the user they belong to.
///
/// Persisted to the session cache between runs; the access token expires and
/// is renewed through the refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Seconds until the access token should be renewed. Renewal happens at
    /// three quarters of the remaining lifetime, never sooner than a minute.
    pub fn refresh_after_secs(&self) -> u64 {
        let remaining = (self.expires_at - Utc::now()).num_seconds().max(0) as u64;
        (remaining * 3 / 4).max(60)
    }
}
