//! JWT minting and verification
//!
//! Access and refresh tokens are signed with independent HS256 secrets,
//! so a leaked access secret never lets an attacker forge refresh tokens.
//! Both token kinds carry the same claim set and differ only in their
//! `token_type` claim and lifetime.

use chrono::{DateTime, Duration, Utc};
use comanda_core::config::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur during token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is past its expiry claim
    #[error("Token has expired")]
    Expired,

    /// Signature, structure, or claim validation failed
    #[error("Token validation failed")]
    Invalid,

    /// The token verified but its `token_type` claim does not match
    /// the kind expected at this point
    #[error("Unexpected token type")]
    WrongType,

    /// Token could not be encoded
    #[error("Token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// The two kinds of token the API issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived token presented on every authenticated request
    Access,
    /// Long-lived token exchanged for fresh access tokens
    Refresh,
}

impl TokenKind {
    /// Value carried in the `token_type` claim.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// This is the complete claim set. Both token kinds use it; nothing
/// else is embedded in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user ID
    pub user_id: Uuid,
    /// Subject email at mint time
    pub email: String,
    /// Either "access" or "refresh"
    pub token_type: String,
    /// Expiration timestamp (Unix seconds)
    pub exp: i64,
}

/// Identity extracted from a verified token.
///
/// Handlers and middleware work with this normalized form instead of
/// raw claims, so the claim layout stays private to this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: Uuid,
    pub email: String,
}

/// A freshly minted token together with its expiry instant.
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// Encoded JWT string
    pub token: String,
    /// Instant after which the token stops verifying
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies both token kinds.
///
/// Built once from [`AuthConfig`] at startup and shared through
/// application state. Cloning is cheap enough to hand a copy to each
/// request path that needs one.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenCodec {
    /// Build a codec from the auth section of the application config.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_lifetime: Duration::minutes(config.access_token_minutes),
            refresh_lifetime: Duration::days(config.refresh_token_days),
        }
    }

    /// Mint a token of the given kind for a user.
    ///
    /// # Arguments
    /// * `user_id` - Subject user ID
    /// * `email` - Subject email, embedded as a claim
    /// * `kind` - Which token kind to mint
    ///
    /// # Returns
    /// The encoded token and its expiry instant.
    pub fn mint(
        &self,
        user_id: Uuid,
        email: &str,
        kind: TokenKind,
    ) -> Result<MintedToken, TokenError> {
        let (key, lifetime) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_lifetime),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_lifetime),
        };
        let expires_at = Utc::now() + lifetime;
        let claims = Claims {
            user_id,
            email: email.to_string(),
            token_type: kind.as_str().to_string(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, key)?;
        Ok(MintedToken { token, expires_at })
    }

    /// Verify a token against the secret for the expected kind and
    /// return its claims.
    ///
    /// # Errors
    /// * `TokenError::Expired` - the token is past its `exp` claim
    /// * `TokenError::Invalid` - signature or structure is bad
    /// * `TokenError::WrongType` - the token verified under this
    ///   secret but carries the other kind's `token_type` claim
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let data = match decode::<Claims>(token, key, &Validation::new(Algorithm::HS256)) {
            Ok(data) => data,
            Err(err) => {
                return Err(match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                });
            }
        };
        if data.claims.token_type != expected.as_str() {
            return Err(TokenError::WrongType);
        }
        Ok(data.claims)
    }

    /// Verify a token and reduce it to the identity it asserts.
    pub fn identity(&self, token: &str, expected: TokenKind) -> Result<TokenIdentity, TokenError> {
        let claims = self.verify(token, expected)?;
        Ok(TokenIdentity {
            user_id: claims.user_id,
            email: claims.email,
        })
    }
}
