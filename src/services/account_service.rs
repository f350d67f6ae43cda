//! Registration and login, issuing the bearer tokens the auth gate accepts.

use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User};
use crate::repositories::DynUserRepository;
use crate::utils::jwt::TokenVerifier;
use crate::utils::password::{hash_password, verify_against_dummy, verify_password};

/// A user together with a freshly issued access token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: DynUserRepository,
    verifier: TokenVerifier,
}

impl AccountService {
    pub fn new(users: DynUserRepository, verifier: TokenVerifier) -> Self {
        Self { users, verifier }
    }

    /// Creates an account and signs it in.
    ///
    /// # Errors
    /// `Duplicate` when the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let email = email.trim();
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Duplicate {
                entity: "users".to_string(),
                field: "email".to_string(),
                value: email.to_string(),
            });
        }

        let user = self
            .users
            .create(NewUser {
                email: email.to_string(),
                password_hash: hash_password(password)?,
            })
            .await?;
        tracing::info!(user_id = user.id, "Account registered");

        self.session_for(user)
    }

    /// Checks credentials and issues a token. Unknown email and wrong password
    /// produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let rejected = || AppError::Unauthorized {
            message: "Invalid email or password".to_string(),
        };

        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            verify_against_dummy(password);
            return Err(rejected());
        };
        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "Login rejected");
            return Err(rejected());
        }

        self.session_for(user)
    }

    fn session_for(&self, user: User) -> AppResult<AuthSession> {
        let access_token = self.verifier.issue(user.id, &user.email)?;
        Ok(AuthSession { user, access_token })
    }
}
