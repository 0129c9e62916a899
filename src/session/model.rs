//! Session data model

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of an authenticated administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    Admin,
    ElectionOfficial,
    Observer,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Admin => "ADMIN",
            AdminRole::ElectionOfficial => "ELECTION_OFFICIAL",
            AdminRole::Observer => "OBSERVER",
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated administrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: AdminRole,
}

/// Tokens plus the user they were issued to
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    pub user: AdminUser,
    pub login_time: DateTime<Utc>,
}

impl Session {
    /// Instant after which the access token is expected to be rejected
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.login_time.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_access_token_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub(crate) fn profile(&self) -> SessionProfile {
        SessionProfile {
            user: self.user.clone(),
            token_type: self.token_type.clone(),
            expires_in: self.expires_in,
            login_time: self.login_time,
        }
    }

    pub(crate) fn from_parts(access_token: String, refresh_token: String, profile: SessionProfile) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: profile.token_type,
            expires_in: profile.expires_in,
            user: profile.user,
            login_time: profile.login_time,
        }
    }
}

/// Serialized authenticated-user record kept next to the tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionProfile {
    pub user: AdminUser,
    pub token_type: String,
    pub expires_in: u64,
    pub login_time: DateTime<Utc>,
}

/// Body of `/admin/auth/login` and `/admin/auth/refresh`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    admin_id: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
    role: Option<AdminRole>,
    login_time: Option<String>,
    message: Option<String>,
    success: Option<bool>,
}

impl AuthResponse {
    /// Build a session, or return the backend's message when the body reports a failure
    pub(crate) fn into_session(self) -> std::result::Result<Session, String> {
        let rejected = || {
            self.message
                .clone()
                .unwrap_or_else(|| "Authentication rejected".to_string())
        };

        if self.success == Some(false) {
            return Err(rejected());
        }

        let (Some(access_token), Some(refresh_token), Some(role)) =
            (self.access_token.clone(), self.refresh_token.clone(), self.role)
        else {
            return Err(rejected());
        };

        Ok(Session {
            access_token,
            refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: self.expires_in.unwrap_or_default(),
            user: AdminUser {
                id: self.admin_id.unwrap_or_default(),
                email: self.email.unwrap_or_default(),
                full_name: self.full_name.unwrap_or_default(),
                role,
            },
            login_time: self
                .login_time
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
        })
    }
}

/// Parse an RFC 3339 timestamp, or a zone-less one taken as UTC
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    value
        .parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc())
}
