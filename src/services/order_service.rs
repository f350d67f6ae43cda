//! Checkout: moving selected cart lines into the order history.

use jiff::Timestamp;
use jiff::tz::{Offset, TimeZone};

use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderSelection, UserRef};
use crate::repositories::DynUserRepository;

use super::resolve_user;

const PLACED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(Clone)]
pub struct OrderService {
    users: DynUserRepository,
    zone: TimeZone,
}

impl OrderService {
    /// `utc_offset_minutes` is the fixed offset `placed_at` is rendered in.
    pub fn new(users: DynUserRepository, utc_offset_minutes: i32) -> AppResult<Self> {
        let offset = Offset::from_seconds(utc_offset_minutes.saturating_mul(60)).map_err(|e| {
            AppError::Validation {
                field: "orders.utc_offset_minutes".to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            users,
            zone: TimeZone::fixed(offset),
        })
    }

    /// Moves every cart line named in `selection` into a new order.
    ///
    /// Lines not selected stay in the cart. The removal and the new order are
    /// written together. A selection that matches nothing still records an
    /// order, with no products, and leaves the cart as it was.
    ///
    /// # Errors
    /// * `MissingRequiredField` - the selection names no products
    /// * `UserNotFound`
    pub async fn finalize_order(
        &self,
        user_ref: &UserRef,
        selection: &OrderSelection,
    ) -> AppResult<Order> {
        if selection.is_empty() {
            return Err(AppError::MissingRequiredField {
                field: "selection".to_string(),
            });
        }
        let user = resolve_user(&self.users, user_ref).await?;
        let placed_at = self.render(Timestamp::now());

        let order = self
            .users
            .finalize_order(user.id, selection, &placed_at)
            .await?;
        tracing::info!(
            user_id = user.id,
            order_id = order.id,
            products = order.products.len(),
            "Order placed"
        );
        Ok(order)
    }

    /// Orders in the sequence they were placed.
    pub async fn get_orders(&self, user_ref: &UserRef) -> AppResult<Vec<Order>> {
        let user = resolve_user(&self.users, user_ref).await?;
        self.users.load_orders(user.id).await
    }

    fn render(&self, at: Timestamp) -> String {
        at.to_zoned(self.zone.clone())
            .strftime(PLACED_AT_FORMAT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CartItem, NewCartItem, NewUser};
    use crate::repositories::{MemoryUserRepository, UserRepository};
    use crate::services::CartService;
    use bigdecimal::BigDecimal;
    use std::sync::Arc;

    async fn services() -> (CartService, OrderService, UserRef) {
        let repo = Arc::new(MemoryUserRepository::new());
        repo.create(NewUser {
            email: "buyer@example.com".to_string(),
            password_hash: "x".to_string(),
        })
        .await
        .unwrap();
        let me = UserRef::Email("buyer@example.com".to_string());
        (
            CartService::new(repo.clone()),
            OrderService::new(repo, 330).unwrap(),
            me,
        )
    }

    async fn fill(carts: &CartService, me: &UserRef, names: &[&str]) {
        for name in names {
            let item = NewCartItem::new(*name, BigDecimal::from(3), "", "", None).unwrap();
            carts.add_item(me, item).await.unwrap();
        }
    }

    fn names(items: &[CartItem]) -> Vec<&str> {
        items.iter().map(|i| i.product_name.as_str()).collect()
    }

    #[test]
    fn test_render_uses_fixed_offset() {
        let repo = Arc::new(MemoryUserRepository::new());
        let service = OrderService::new(repo, 330).unwrap();
        assert_eq!(
            service.render(Timestamp::UNIX_EPOCH),
            "1970-01-01T05:30:00+05:30"
        );
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let repo = Arc::new(MemoryUserRepository::new());
        assert!(OrderService::new(repo, 60 * 48).is_err());
    }

    #[tokio::test]
    async fn test_finalize_partitions_cart() {
        let (carts, orders, me) = services().await;
        fill(&carts, &me, &["shirt", "tshirt", "mug"]).await;

        let order = orders
            .finalize_order(&me, &OrderSelection::parse("shirt,mug"))
            .await
            .unwrap();
        assert_eq!(names(&order.products), vec!["shirt", "mug"]);
        assert!(order.placed_at.ends_with("+05:30"));

        assert_eq!(names(&carts.get_cart(&me).await.unwrap()), vec!["tshirt"]);
        assert_eq!(orders.get_orders(&me).await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_finalize_keeps_orders_in_sequence() {
        let (carts, orders, me) = services().await;
        fill(&carts, &me, &["a", "b"]).await;
        let first = orders
            .finalize_order(&me, &OrderSelection::parse(r#"["a"]"#))
            .await
            .unwrap();
        let second = orders
            .finalize_order(&me, &OrderSelection::parse(r#"["b"]"#))
            .await
            .unwrap();

        let history = orders.get_orders(&me).await.unwrap();
        assert_eq!(history, vec![first, second]);
        assert!(carts.get_cart(&me).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finalize_nothing_matched_records_empty_order() {
        let (carts, orders, me) = services().await;
        fill(&carts, &me, &["mug"]).await;

        let order = orders
            .finalize_order(&me, &OrderSelection::parse("hat"))
            .await
            .unwrap();
        assert!(order.products.is_empty());
        assert_eq!(names(&carts.get_cart(&me).await.unwrap()), vec!["mug"]);
        assert_eq!(orders.get_orders(&me).await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_order_snapshot_survives_later_cart_changes() {
        let (carts, orders, me) = services().await;
        fill(&carts, &me, &["shirt"]).await;
        let placed = orders
            .finalize_order(&me, &OrderSelection::parse(r#"["shirt"]"#))
            .await
            .unwrap();

        fill(&carts, &me, &["shirt"]).await;
        carts.increment_quantity(&me, "shirt").await.unwrap();
        assert_eq!(carts.get_cart(&me).await.unwrap()[0].cart_quantity, 2);

        let history = orders.get_orders(&me).await.unwrap();
        assert_eq!(history, vec![placed]);
        assert_eq!(names(&history[0].products), vec!["shirt"]);
        assert_eq!(history[0].products[0].cart_quantity, 1);
    }

    #[tokio::test]
    async fn test_finalize_requires_a_selection() {
        let (_, orders, me) = services().await;
        let err = orders
            .finalize_order(&me, &OrderSelection::parse(" , "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredField { field } if field == "selection"));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (_, orders, _) = services().await;
        let ghost = UserRef::Id(404);
        assert!(matches!(
            orders.get_orders(&ghost).await,
            Err(AppError::UserNotFound { .. })
        ));
        assert!(matches!(
            orders.finalize_order(&ghost, &OrderSelection::parse("x")).await,
            Err(AppError::UserNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_finalize_never_duplicates_a_line() {
        let (carts, orders, me) = services().await;
        fill(&carts, &me, &["a", "b", "c"]).await;

        let tasks: Vec<_> = ["a,b", "b,c", "a,c"]
            .into_iter()
            .map(|raw| {
                let orders = orders.clone();
                let me = me.clone();
                tokio::spawn(async move {
                    orders
                        .finalize_order(&me, &OrderSelection::parse(raw))
                        .await
                })
            })
            .collect();
        futures::future::join_all(tasks).await;

        let history = orders.get_orders(&me).await.unwrap();
        let mut ordered: Vec<String> = history
            .iter()
            .flat_map(|o| o.products.iter().map(|p| p.product_name.clone()))
            .collect();
        let cart = carts.get_cart(&me).await.unwrap();
        ordered.extend(cart.iter().map(|p| p.product_name.clone()));
        ordered.sort();
        assert_eq!(ordered, vec!["a", "b", "c"]);
    }
}
