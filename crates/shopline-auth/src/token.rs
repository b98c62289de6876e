//! JWT access and refresh tokens.
//!
//! Both kinds are HS256 tokens signed with the same secret. The `kind`
//! claim keeps them apart and `ver` ties them to the user's token version,
//! which logout bumps to revoke every outstanding refresh token.

use crate::user::UserAccount;
use crate::AuthError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shopline_commerce::ids::UserId;
use std::fmt;

/// Default access token lifetime (15 minutes).
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token sent on every request.
    Access,
    /// Long-lived token used to mint new access tokens.
    Refresh,
}

impl TokenKind {
    /// Get token kind as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Role name at issue time.
    pub role: String,
    pub kind: TokenKind,
    /// User token version at issue time.
    pub ver: i64,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    /// Unique token id.
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }
}

/// An access/refresh token pair returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Signs and verifies tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer. An empty secret is rejected.
    pub fn new(secret: &str, issuer: impl Into<String>) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Internal("JWT secret must not be empty".to_string()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            access_ttl: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl: DEFAULT_REFRESH_TTL_SECS,
        })
    }

    /// Override token lifetimes.
    pub fn with_ttls(mut self, access_ttl: i64, refresh_ttl: i64) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    /// Issue a fresh access/refresh pair.
    pub fn issue_pair(&self, user: &UserAccount) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenKind::Access)?,
            refresh_token: self.issue(user, TokenKind::Refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl,
        })
    }

    /// Issue a single token of the given kind.
    pub fn issue(&self, user: &UserAccount, kind: TokenKind) -> Result<String, AuthError> {
        let now = current_timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.clone(),
            kind,
            ver: user.token_version,
            iat: now,
            exp: now + ttl,
            iss: self.issuer.clone(),
            jti: generate_jti(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify a token's signature, issuer, expiry and kind.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        self.decode(token, kind, true)
    }

    /// Verify everything except expiry.
    ///
    /// Used to learn who an expired access token belonged to.
    pub fn verify_ignoring_expiry(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        self.decode(token, kind, false)
    }

    fn decode(&self, token: &str, kind: TokenKind, check_exp: bool) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;
        validation.validate_exp = check_exp;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;
        if data.claims.kind != kind {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}

/// Generate a random token id.
fn generate_jti() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;

    let bytes: [u8; 16] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
