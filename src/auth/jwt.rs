use crate::error::AppError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub fn parse_algorithm(alg: &str) -> Result<Algorithm, AppError> {
    Algorithm::from_str(alg)
        .map_err(|_| AppError::BadRequest(format!("Unsupported JWT algorithm: {}", alg)))
}

/// Discriminates the two halves of a session token pair so one cannot
/// be presented in place of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by locally issued session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i32, // Database user ID
    pub jti: String,
    pub token_type: TokenKind,
    pub iat: usize,
    pub exp: usize,
}

impl SessionClaims {
    pub fn new(user_id: i32, token_type: TokenKind, expires_in_seconds: u64) -> Self {
        let now = Utc::now().timestamp() as usize;
        Self {
            sub: user_id,
            jti: Uuid::new_v4().to_string(),
            token_type,
            iat: now,
            exp: now + expires_in_seconds as usize,
        }
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as usize;
        self.exp <= now
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp as i64, 0).unwrap_or_else(Utc::now)
    }
}

/// JWT service trait for dependency injection and testing
pub trait JwtService: Send + Sync {
    /// Sign a session token from claims
    fn create_token(&self, claims: &SessionClaims) -> Result<String, AppError>;

    /// Validate a token's signature and expiry, and check it is of the
    /// expected kind
    fn validate_token(&self, token: &str, expected: TokenKind) -> Result<SessionClaims, AppError>;

    /// Validate signature and kind but tolerate an expired token.
    /// Logout uses this: revoking an already-expired refresh token is
    /// harmless and must not fail.
    fn decode_allow_expired(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<SessionClaims, AppError>;

    /// Get algorithm used by this service
    fn algorithm(&self) -> Algorithm;
}

#[derive(Clone)]
pub struct JwtServiceImpl {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtServiceImpl {
    pub fn new(secret: String, algorithm: Algorithm) -> Result<Self, AppError> {
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(Self {
                algorithm,
                encoding_key: EncodingKey::from_secret(secret.as_ref()),
                decoding_key: DecodingKey::from_secret(secret.as_ref()),
            }),
            _ => Err(AppError::BadRequest(format!(
                "Unsupported JWT algorithm for shared-secret keys: {:?}",
                algorithm
            ))),
        }
    }

    fn decode_with(
        &self,
        token: &str,
        expected: TokenKind,
        validate_exp: bool,
    ) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = validate_exp;
        validation.leeway = 0;
        if !validate_exp {
            validation.required_spec_claims.clear();
        }

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        if token_data.claims.token_type != expected {
            return Err(AppError::Unauthorized("Wrong token type".to_string()));
        }

        Ok(token_data.claims)
    }
}

impl JwtService for JwtServiceImpl {
    fn create_token(&self, claims: &SessionClaims) -> Result<String, AppError> {
        let header = Header::new(self.algorithm);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn validate_token(&self, token: &str, expected: TokenKind) -> Result<SessionClaims, AppError> {
        self.decode_with(token, expected, true)
    }

    fn decode_allow_expired(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<SessionClaims, AppError> {
        self.decode_with(token, expected, false)
    }

    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}
