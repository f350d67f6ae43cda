use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// JWT Claims structure containing user information and token metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User email at the time of issue
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i32, email: String, expiration_hours: i64) -> Self {
        let now = jiff::Timestamp::now().as_second();
        Self {
            sub: user_id.to_string(),
            email,
            iat: now,
            exp: now + expiration_hours * 3600,
        }
    }

    /// Parses the subject back into a user id.
    pub fn user_id(&self) -> AppResult<i32> {
        self.sub
            .parse::<i32>()
            .map_err(|_| AppError::InvalidCredential {
                reason: "Invalid token subject".to_string(),
            })
    }
}

/// Issues and verifies HS256 bearer tokens with a shared secret.
///
/// Verification failures never echo token contents; the reason is one of a
/// few fixed strings.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration_hours: i64,
}

impl TokenVerifier {
    pub fn new(secret: &str, expiration_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiration_hours,
        }
    }

    /// Generates an access token for a user
    pub fn issue(&self, user_id: i32, email: &str) -> AppResult<String> {
        self.encode_claims(&Claims::new(user_id, email.to_string(), self.expiration_hours))
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            AppError::Internal {
                source: anyhow::anyhow!("Failed to generate JWT token: {}", e),
            }
        })
    }

    /// Validates and decodes a token
    ///
    /// # Errors
    /// `InvalidCredential` when the token is malformed, expired or signed with
    /// another key.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "Token has expired",
                    ErrorKind::InvalidSignature => "Invalid token signature",
                    _ => "Invalid token",
                };
                AppError::InvalidCredential {
                    reason: reason.to_string(),
                }
            })
    }

    pub fn expiration_hours(&self) -> i64 {
        self.expiration_hours
    }
}
