//! Resolves the caller behind a bearer token.

use crate::error::{AppError, AppResult};
use crate::models::UserRef;
use crate::repositories::DynUserRepository;
use crate::utils::jwt::TokenVerifier;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub email: String,
}

impl Principal {
    /// A principal may only act on its own account.
    pub fn authorize(&self, target: &UserRef) -> AppResult<()> {
        if target.matches(self.user_id, &self.email) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: "Cannot act on another user's account".to_string(),
            })
        }
    }
}

#[derive(Clone)]
pub struct AuthGate {
    users: DynUserRepository,
    verifier: TokenVerifier,
}

impl AuthGate {
    pub fn new(users: DynUserRepository, verifier: TokenVerifier) -> Self {
        Self { users, verifier }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Verifies the raw `Authorization` header value and loads its subject.
    ///
    /// # Errors
    /// * `MissingCredential` - no header
    /// * `InvalidCredential` - not a bearer token, bad signature, expired, or a
    ///   subject that is not a user id
    /// * `PrincipalNotFound` - the subject no longer exists
    pub async fn authenticate(&self, header: Option<&str>) -> AppResult<Principal> {
        let header = header.ok_or(AppError::MissingCredential)?;
        let token = bearer_token(header)?;
        let claims = self.verifier.verify(token)?;
        let user_id = claims.user_id()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::PrincipalNotFound)?;

        Ok(Principal {
            user_id: user.id,
            email: user.email,
        })
    }
}

fn bearer_token(header: &str) -> AppResult<&str> {
    let invalid = || AppError::InvalidCredential {
        reason: "Invalid authorization header format".to_string(),
    };
    let (scheme, token) = header.trim().split_once(' ').ok_or_else(invalid)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(invalid());
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(invalid());
    }
    Ok(token)
}
