use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::config::JwtConfig;

const ALGORITHM: Algorithm = Algorithm::HS256;
const MAX_USERNAME_CLAIM: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret is not configured")]
    MissingSecret,
    #[error("invalid token input: {0}")]
    InvalidInput(&'static str),
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("unexpected signing algorithm")]
    UnexpectedAlgorithm,
    #[error("invalid token issuer")]
    InvalidIssuer,
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token")]
    Signing,
}

/// Holds the HS256 signing and verification keys with the token settings.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, issuer: impl Into<String>, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl,
        })
    }

    pub fn from_config(cfg: &JwtConfig) -> Result<Self, TokenError> {
        let ttl = cfg
            .ttl_minutes
            .checked_mul(60)
            .map(Duration::seconds)
            .ok_or(TokenError::InvalidInput("ttl"))?;
        Self::new(&cfg.secret, cfg.issuer.clone(), ttl)
    }

    pub fn issue(&self, user_id: i64, username: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, username, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        username: &str,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        if user_id <= 0 {
            return Err(TokenError::InvalidInput("user id must be positive"));
        }
        let len = username.chars().count();
        if len == 0 || len > MAX_USERNAME_CLAIM {
            return Err(TokenError::InvalidInput("username"));
        }

        let exp = now
            .checked_add(self.ttl)
            .ok_or(TokenError::InvalidInput("ttl"))?;
        let iat = now.unix_timestamp();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            iss: self.issuer.clone(),
            iat,
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks algorithm, signature and issuer, then rejects the token once `now`
    /// has reached `exp`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => TokenError::UnexpectedAlgorithm,
                ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if now.unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}
