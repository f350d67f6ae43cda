//! Repository layer for data access operations.
//!
//! [`UserRepository`] is the only place where user aggregates (account, cart
//! and order history) are read or mutated. Every mutation is a single atomic
//! conditional write, so concurrent requests against the same user never lose
//! updates. Two backends implement it: PostgreSQL through diesel_async, and an
//! in-process store used for tests and the `memory` backend.

mod memory_user_repo;
mod pg_user_repo;

pub use memory_user_repo::MemoryUserRepository;
pub use pg_user_repo::PgUserRepository;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::models::{CartItem, NewCartItem, NewUser, Order, OrderSelection, User, UserRef};

/// Outcome of a conditional cart write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartWrite {
    /// The write went through; carries the cart as it stands afterwards
    Applied(Vec<CartItem>),
    /// A line with that product name is already in the cart
    Duplicate,
    /// No line with that product name is in the cart
    NotInCart,
    /// Decrement refused because the quantity is already 1
    AtMinimum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityAdjustment {
    Increment,
    Decrement,
}

/// Shared handle used by services and application state.
pub type DynUserRepository = Arc<dyn UserRepository>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new_user: NewUser) -> AppResult<User>;

    async fn find_by_id(&self, user_id: i32) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Looks a user up by id or email.
    async fn resolve(&self, user_ref: &UserRef) -> AppResult<Option<User>> {
        match user_ref {
            UserRef::Id(id) => self.find_by_id(*id).await,
            UserRef::Email(email) => self.find_by_email(email).await,
        }
    }

    /// Cart lines in insertion order.
    async fn load_cart(&self, user_id: i32) -> AppResult<Vec<CartItem>>;

    /// Orders in creation order.
    async fn load_orders(&self, user_id: i32) -> AppResult<Vec<Order>>;

    /// Appends `item` unless a line with the same product name exists.
    async fn insert_cart_item(&self, user_id: i32, item: &NewCartItem) -> AppResult<CartWrite>;

    /// Removes the line named `product_name` if present and returns the cart.
    async fn delete_cart_item(&self, user_id: i32, product_name: &str)
        -> AppResult<Vec<CartItem>>;

    /// Adds or subtracts one unit. A decrement never takes a line below 1.
    async fn adjust_cart_quantity(
        &self,
        user_id: i32,
        product_name: &str,
        adjustment: QuantityAdjustment,
    ) -> AppResult<CartWrite>;

    /// Moves every cart line whose name is in `selection` into a new order
    /// stamped `placed_at`. Removing the lines and appending the order happen
    /// together or not at all. The order is appended even when nothing
    /// matched, with an empty product list and the cart untouched.
    async fn finalize_order(
        &self,
        user_id: i32,
        selection: &OrderSelection,
        placed_at: &str,
    ) -> AppResult<Order>;
}

/// Runs a storage future under `limit`, mapping expiry to `StorageTimeout`.
///
/// Dropping the future on expiry drops any open transaction with it, which
/// rolls the transaction back.
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "Storage operation timed out"
            );
            Err(AppError::StorageTimeout {
                operation: operation.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let value = bounded("noop", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_reports_timeout() {
        let result: AppResult<()> = bounded("load cart", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(AppError::StorageTimeout { operation }) => assert_eq!(operation, "load cart"),
            other => panic!("Expected StorageTimeout, got {:?}", other),
        }
    }
}
