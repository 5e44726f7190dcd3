use std::fmt;
use mongodb::bson;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::utils::{self, generate_id};

/// Audit metadata is cut to this many characters before it is stored.
pub const AUDIT_MAX_LEN: usize = 255;

///
/// The secret delivered to the user in the reset link. It is never persisted or logged, so
/// Debug is redacted and there is no Display or Serialize.
///
#[derive(Clone, PartialEq)]
pub struct RawToken(String);

impl RawToken {
    pub fn new(value: String) -> Self {
        RawToken(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawToken {
    fn from(value: &str) -> Self {
        RawToken(value.to_string())
    }
}

impl fmt::Debug for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawToken([REDACTED])")
    }
}

///
/// Lower-case hex SHA-256 of a raw token. The storage and lookup key.
///
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TokenDigest(String);

impl TokenDigest {
    pub fn new(hex: String) -> Self {
        TokenDigest(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenState {
    Live,
    Used,
    Expired,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResetToken {
    pub token_id: String,
    pub user_id: String,
    pub token_digest: TokenDigest,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub request_ip: Option<String>,
    pub request_agent: Option<String>,
}

impl ResetToken {
    pub fn new(
        user_id: &str,
        token_digest: TokenDigest,
        now: DateTime<Utc>,
        ttl: Duration,
        request_ip: Option<&str>,
        request_agent: Option<&str>) -> Self {

        ResetToken {
            token_id: generate_id(),
            user_id: user_id.to_string(),
            token_digest,
            created_at: now,
            expires_at: now + ttl,
            used_at: None,
            request_ip: request_ip.map(|ip| utils::truncate(ip, AUDIT_MAX_LEN)),
            request_agent: request_agent.map(|agent| utils::truncate(agent, AUDIT_MAX_LEN)),
        }
    }

    ///
    /// Used wins over expired - once redeemed a token stays Used however old it gets. A token is
    /// already expired at the instant now reaches expires_at.
    ///
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if self.used_at.is_some() {
            TokenState::Used
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Live
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == TokenState::Live
    }
}

///
/// The MongoDB representation of a ResetToken.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResetTokenDB {
    pub token_id: String,
    pub user_id: String,
    pub token_digest: String,
    pub created_at: bson::DateTime,
    pub expires_at: bson::DateTime,
    pub used_at: Option<bson::DateTime>,
    pub request_ip: Option<String>,
    pub request_agent: Option<String>,
}

impl From<&ResetToken> for ResetTokenDB {
    fn from(token: &ResetToken) -> Self {
        ResetTokenDB {
            token_id: token.token_id.clone(),
            user_id: token.user_id.clone(),
            token_digest: token.token_digest.as_str().to_string(),
            created_at: bson::DateTime::from_chrono(token.created_at),
            expires_at: bson::DateTime::from_chrono(token.expires_at),
            used_at: token.used_at.map(bson::DateTime::from_chrono),
            request_ip: token.request_ip.clone(),
            request_agent: token.request_agent.clone(),
        }
    }
}

impl From<ResetTokenDB> for ResetToken {
    fn from(token: ResetTokenDB) -> Self {
        ResetToken {
            token_id: token.token_id,
            user_id: token.user_id,
            token_digest: TokenDigest::new(token.token_digest),
            created_at: token.created_at.into(),
            expires_at: token.expires_at.into(),
            used_at: token.used_at.map(Into::into),
            request_ip: token.request_ip,
            request_agent: token.request_agent,
        }
    }
}
