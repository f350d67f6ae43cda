//! Cart operations on a user's aggregate.

use crate::error::{AppError, AppResult};
use crate::models::{CartItem, NewCartItem, UserRef};
use crate::repositories::{CartWrite, DynUserRepository, QuantityAdjustment};

use super::resolve_user;

#[derive(Clone)]
pub struct CartService {
    users: DynUserRepository,
}

impl CartService {
    pub fn new(users: DynUserRepository) -> Self {
        Self { users }
    }

    /// Appends a product to the cart.
    ///
    /// # Errors
    /// `UserNotFound`, or `DuplicateItem` if a line with the same name exists.
    pub async fn add_item(
        &self,
        user_ref: &UserRef,
        item: NewCartItem,
    ) -> AppResult<Vec<CartItem>> {
        let user = resolve_user(&self.users, user_ref).await?;
        let write = self.users.insert_cart_item(user.id, &item).await?;
        let cart = settle(write, item.product_name())?;
        tracing::info!(
            user_id = user.id,
            product_name = item.product_name(),
            "Product added to cart"
        );
        Ok(cart)
    }

    /// Removes a product from the cart. Removing an absent product is not an
    /// error.
    pub async fn remove_item(
        &self,
        user_ref: &UserRef,
        product_name: &str,
    ) -> AppResult<Vec<CartItem>> {
        let user = resolve_user(&self.users, user_ref).await?;
        self.users.delete_cart_item(user.id, product_name).await
    }

    pub async fn increment_quantity(
        &self,
        user_ref: &UserRef,
        product_name: &str,
    ) -> AppResult<Vec<CartItem>> {
        self.adjust(user_ref, product_name, QuantityAdjustment::Increment)
            .await
    }

    /// Lowers the quantity by one. Refused with `MinimumQuantityReached`
    /// when the quantity is already 1.
    pub async fn decrement_quantity(
        &self,
        user_ref: &UserRef,
        product_name: &str,
    ) -> AppResult<Vec<CartItem>> {
        self.adjust(user_ref, product_name, QuantityAdjustment::Decrement)
            .await
    }

    pub async fn get_cart(&self, user_ref: &UserRef) -> AppResult<Vec<CartItem>> {
        let user = resolve_user(&self.users, user_ref).await?;
        self.users.load_cart(user.id).await
    }

    async fn adjust(
        &self,
        user_ref: &UserRef,
        product_name: &str,
        adjustment: QuantityAdjustment,
    ) -> AppResult<Vec<CartItem>> {
        let user = resolve_user(&self.users, user_ref).await?;
        let write = self
            .users
            .adjust_cart_quantity(user.id, product_name, adjustment)
            .await?;
        settle(write, product_name)
    }
}

fn settle(write: CartWrite, product_name: &str) -> AppResult<Vec<CartItem>> {
    match write {
        CartWrite::Applied(cart) => Ok(cart),
        CartWrite::Duplicate => Err(AppError::DuplicateItem {
            product_name: product_name.to_string(),
        }),
        CartWrite::NotInCart => Err(AppError::ProductNotInCart {
            product_name: product_name.to_string(),
        }),
        CartWrite::AtMinimum => Err(AppError::MinimumQuantityReached {
            product_name: product_name.to_string(),
        }),
    }
}
