use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

/// Claims carried by a short-lived access assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,

    /// User email
    pub email: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at (seconds since epoch)
    pub iat: i64,

    /// Expiration (seconds since epoch)
    pub exp: i64,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

/// Claims carried by a long-lived refresh assertion.
///
/// `sid` is the rotation lineage id: the chain linking successive refresh
/// assertions for one logical session. Every successful rotation retires the
/// old id and mints a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user id)
    pub sub: String,

    /// User email
    pub email: String,

    /// Rotation lineage id
    pub sid: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at (seconds since epoch)
    pub iat: i64,

    /// Expiration (seconds since epoch)
    pub exp: i64,
}

impl RefreshClaims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }

    pub fn lineage_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sid).map_err(|_| TokenError::Invalid)
    }
}
