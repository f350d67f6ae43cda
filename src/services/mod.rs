//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between
//! repositories and handlers.

mod account_service;
mod auth_gate;
mod cart_service;
mod order_service;

pub use account_service::{AccountService, AuthSession};
pub use auth_gate::{AuthGate, Principal};
pub use cart_service::CartService;
pub use order_service::OrderService;

use crate::error::{AppError, AppResult};
use crate::models::{User, UserRef};
use crate::repositories::DynUserRepository;
use crate::utils::jwt::TokenVerifier;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap; every service shares the same repository handle.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthGate,
    pub accounts: AccountService,
    pub carts: CartService,
    pub orders: OrderService,
}

impl Services {
    pub fn new(
        users: DynUserRepository,
        verifier: TokenVerifier,
        utc_offset_minutes: i32,
    ) -> AppResult<Self> {
        Ok(Self {
            auth: AuthGate::new(users.clone(), verifier.clone()),
            accounts: AccountService::new(users.clone(), verifier),
            carts: CartService::new(users.clone()),
            orders: OrderService::new(users, utc_offset_minutes)?,
        })
    }
}

async fn resolve_user(users: &DynUserRepository, user_ref: &UserRef) -> AppResult<User> {
    users
        .resolve(user_ref)
        .await?
        .ok_or_else(|| AppError::UserNotFound {
            user_ref: user_ref.to_string(),
        })
}
