use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::claims::{AccessClaims, RefreshClaims};
use crate::config::TokenConfig;
use crate::error::TokenError;

/// Issuer claim fixed for every assertion this service signs.
pub const ISSUER: &str = "workboard-auth";

/// Audience claim fixed for every assertion this service signs.
pub const AUDIENCE: &str = "workboard-api";

/// Issues and verifies access/refresh assertions.
///
/// Verification is stateless: signature, expiry, issuer, and audience only.
/// Revocation is the session store's concern.
pub struct TokenService {
    config: TokenConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let access_encoding = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding = DecodingKey::from_secret(config.refresh_secret.as_bytes());
        Self {
            config,
            access_encoding,
            access_decoding,
            refresh_encoding,
            refresh_decoding,
        }
    }

    /// Mint a signed access assertion for the given identity.
    pub fn issue_access(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.access_ttl_minutes)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|_| TokenError::Signing)
    }

    /// Mint a signed refresh assertion with a freshly generated rotation
    /// lineage id. Returns the raw token and the lineage id; the raw value is
    /// handed to the caller exactly once and only its fingerprint is stored.
    pub fn issue_refresh(&self, user_id: Uuid, email: &str) -> Result<(String, Uuid), TokenError> {
        let lineage_id = Uuid::new_v4();
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            sid: lineage_id.to_string(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.config.refresh_ttl_days)).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(|_| TokenError::Signing)?;
        Ok((token, lineage_id))
    }

    /// Validate an access assertion: signature, expiry, issuer, audience.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Missing);
        }
        decode::<AccessClaims>(token, &self.access_decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }

    /// Validate a refresh assertion against the refresh secret. The embedded
    /// rotation lineage id is available on the returned claims.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Missing);
        }
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }

    /// SHA-256 fingerprint of a refresh assertion, base64-encoded. The only
    /// server-side representation of the raw value.
    pub fn refresh_fingerprint(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        BASE64.encode(hasher.finalize())
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.config.access_ttl_minutes * 60
    }

    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.config.refresh_ttl_days * 24 * 60 * 60
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.validate_exp = true;
        validation
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    }
}
