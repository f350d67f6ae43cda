//! In-process [`UserRepository`] backed by `DashMap`.
//!
//! Each user aggregate sits behind its own shard lock. A mutation takes the
//! entry with `get_mut`, applies the conditional change and builds the result
//! before releasing it, so concurrent calls for one user serialize while
//! different users proceed in parallel. No guard is held across an `.await`.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use super::{CartWrite, QuantityAdjustment, UserRepository};
use crate::error::{AppError, AppResult};
use crate::models::{CartItem, NewCartItem, NewUser, Order, OrderSelection, User};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    cart: Vec<CartItem>,
    orders: Vec<Order>,
}

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    records: DashMap<i32, UserRecord>,
    emails: DashMap<String, i32>,
    next_user_id: AtomicI32,
    next_order_id: AtomicI64,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(user_id: i32) -> AppError {
        AppError::UserNotFound {
            user_ref: user_id.to_string(),
        }
    }

    fn with_record<T>(&self, user_id: i32, f: impl FnOnce(&mut UserRecord) -> T) -> AppResult<T> {
        let mut record = self
            .records
            .get_mut(&user_id)
            .ok_or_else(|| Self::missing(user_id))?;
        Ok(f(record.value_mut()))
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Duplicate {
                entity: "users".to_string(),
                field: "email".to_string(),
                value: new_user.email,
            }),
            Entry::Vacant(slot) => {
                let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
                let user = User {
                    id,
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                };
                self.records.insert(
                    id,
                    UserRecord {
                        user: user.clone(),
                        cart: Vec::new(),
                        orders: Vec::new(),
                    },
                );
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn find_by_id(&self, user_id: i32) -> AppResult<Option<User>> {
        Ok(self.records.get(&user_id).map(|r| r.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn load_cart(&self, user_id: i32) -> AppResult<Vec<CartItem>> {
        self.records
            .get(&user_id)
            .map(|r| r.cart.clone())
            .ok_or_else(|| Self::missing(user_id))
    }

    async fn load_orders(&self, user_id: i32) -> AppResult<Vec<Order>> {
        self.records
            .get(&user_id)
            .map(|r| r.orders.clone())
            .ok_or_else(|| Self::missing(user_id))
    }

    async fn insert_cart_item(&self, user_id: i32, item: &NewCartItem) -> AppResult<CartWrite> {
        self.with_record(user_id, |record| {
            if record
                .cart
                .iter()
                .any(|line| line.product_name == item.product_name())
            {
                return CartWrite::Duplicate;
            }
            record.cart.push(item.as_item().clone());
            CartWrite::Applied(record.cart.clone())
        })
    }

    async fn delete_cart_item(
        &self,
        user_id: i32,
        product_name: &str,
    ) -> AppResult<Vec<CartItem>> {
        self.with_record(user_id, |record| {
            record.cart.retain(|line| line.product_name != product_name);
            record.cart.clone()
        })
    }

    async fn adjust_cart_quantity(
        &self,
        user_id: i32,
        product_name: &str,
        adjustment: QuantityAdjustment,
    ) -> AppResult<CartWrite> {
        self.with_record(user_id, |record| {
            let Some(line) = record
                .cart
                .iter_mut()
                .find(|line| line.product_name == product_name)
            else {
                return CartWrite::NotInCart;
            };
            match adjustment {
                QuantityAdjustment::Increment => line.cart_quantity += 1,
                QuantityAdjustment::Decrement if line.cart_quantity <= 1 => {
                    return CartWrite::AtMinimum;
                }
                QuantityAdjustment::Decrement => line.cart_quantity -= 1,
            }
            CartWrite::Applied(record.cart.clone())
        })
    }

    async fn finalize_order(
        &self,
        user_id: i32,
        selection: &OrderSelection,
        placed_at: &str,
    ) -> AppResult<Order> {
        self.with_record(user_id, |record| {
            let (selected, retained) = selection.partition(std::mem::take(&mut record.cart));
            let order = Order {
                id: self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1,
                products: selected,
                placed_at: placed_at.to_string(),
            };
            record.cart = retained;
            record.orders.push(order.clone());
            order
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn new_item(name: &str) -> NewCartItem {
        NewCartItem::new(name, BigDecimal::from(10), "desc", "img.png", None).unwrap()
    }

    async fn seeded() -> (MemoryUserRepository, i32) {
        let repo = MemoryUserRepository::new();
        let user = repo
            .create(NewUser {
                email: "shopper@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (repo, user.id)
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let (repo, _) = seeded().await;
        let err = repo
            .create(NewUser {
                email: "shopper@example.com".to_string(),
                password_hash: "other".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_find_by_email_and_id() {
        let (repo, id) = seeded().await;
        let by_email = repo.find_by_email("shopper@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(id));
        assert!(repo.find_by_id(id + 100).await.unwrap().is_none());
        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_is_conditional_on_name() {
        let (repo, id) = seeded().await;
        assert!(matches!(
            repo.insert_cart_item(id, &new_item("Mug")).await.unwrap(),
            CartWrite::Applied(cart) if cart.len() == 1
        ));
        assert_eq!(
            repo.insert_cart_item(id, &new_item("Mug")).await.unwrap(),
            CartWrite::Duplicate
        );
        assert_eq!(repo.load_cart(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decrement_stops_at_one() {
        let (repo, id) = seeded().await;
        repo.insert_cart_item(id, &new_item("Mug")).await.unwrap();
        assert_eq!(
            repo.adjust_cart_quantity(id, "Mug", QuantityAdjustment::Decrement)
                .await
                .unwrap(),
            CartWrite::AtMinimum
        );
        assert_eq!(
            repo.adjust_cart_quantity(id, "Cup", QuantityAdjustment::Decrement)
                .await
                .unwrap(),
            CartWrite::NotInCart
        );
    }

    #[tokio::test]
    async fn test_finalize_without_match_records_empty_order() {
        let (repo, id) = seeded().await;
        repo.insert_cart_item(id, &new_item("Mug")).await.unwrap();
        let order = repo
            .finalize_order(id, &OrderSelection::parse("Cup"), "now")
            .await
            .unwrap();
        assert!(order.products.is_empty());
        assert_eq!(repo.load_cart(id).await.unwrap().len(), 1);
        assert_eq!(repo.load_orders(id).await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_unknown_user_is_reported() {
        let repo = MemoryUserRepository::new();
        let err = repo.insert_cart_item(9, &new_item("Mug")).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound { .. }));
    }
}
