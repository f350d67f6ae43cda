//! PostgreSQL implementation of [`UserRepository`] using diesel_async.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{CartWrite, QuantityAdjustment, UserRepository, bounded};
use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult, DatabaseErrorConverter};
use crate::models::{CartItem, NewCartItem, NewUser, Order, OrderSelection, User};
use crate::schema::{cart_items, order_items, orders, users};

/// User repository holding an async connection pool.
///
/// Since `AsyncDbPool` (bb8::Pool) internally uses `Arc`, cloning is cheap.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: AsyncDbPool,
    query_timeout: Duration,
}

#[derive(Insertable)]
#[diesel(table_name = cart_items)]
struct CartItemRow<'a> {
    user_id: i32,
    product_name: &'a str,
    product_price: BigDecimal,
    product_description: &'a str,
    product_image: &'a str,
    cart_quantity: i32,
}

/// Cart line together with its row id, used to order lines removed by
/// `DELETE ... RETURNING`.
#[derive(Queryable, Selectable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct StoredCartItem {
    id: i64,
    #[diesel(embed)]
    item: CartItem,
}

#[derive(Insertable)]
#[diesel(table_name = orders)]
struct OrderRow<'a> {
    user_id: i32,
    placed_at: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = order_items)]
struct OrderItemInsert {
    order_id: i64,
    position: i32,
    product_name: String,
    product_price: BigDecimal,
    product_description: String,
    product_image: String,
    cart_quantity: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct OrderItemRow {
    order_id: i64,
    product_name: String,
    product_price: BigDecimal,
    product_description: String,
    product_image: String,
    cart_quantity: i32,
}

impl From<OrderItemRow> for CartItem {
    fn from(row: OrderItemRow) -> Self {
        CartItem {
            product_name: row.product_name,
            product_price: row.product_price,
            product_description: row.product_description,
            product_image: row.product_image,
            cart_quantity: row.cart_quantity,
        }
    }
}

async fn cart_of(conn: &mut AsyncPgConnection, owner: i32) -> QueryResult<Vec<CartItem>> {
    cart_items::table
        .filter(cart_items::user_id.eq(owner))
        .order(cart_items::id.asc())
        .select(CartItem::as_select())
        .load(conn)
        .await
}

impl PgUserRepository {
    pub fn new(pool: AsyncDbPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    fn storage_error(operation: &'static str) -> impl Fn(AppError) -> AppError {
        move |error| match error {
            AppError::StorageFailure { source, .. } => AppError::StorageFailure {
                operation: operation.to_string(),
                source,
            },
            other => other,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        bounded("insert user", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            diesel::insert_into(users::table)
                .values(&new_user)
                .returning(User::as_returning())
                .get_result(&mut conn)
                .await
                .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "insert user"))
        })
        .await
    }

    async fn find_by_id(&self, user_id: i32) -> AppResult<Option<User>> {
        bounded("find user by id", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            users::table
                .filter(users::id.eq(user_id))
                .select(User::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "find user by id"))
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        bounded("find user by email", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            users::table
                .filter(users::email.eq(email))
                .select(User::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(|e| {
                    DatabaseErrorConverter::convert_diesel_error(e, "find user by email")
                })
        })
        .await
    }

    async fn load_cart(&self, user_id: i32) -> AppResult<Vec<CartItem>> {
        bounded("load cart", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            cart_of(&mut conn, user_id)
                .await
                .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "load cart"))
        })
        .await
    }

    async fn load_orders(&self, user_id: i32) -> AppResult<Vec<Order>> {
        bounded("load orders", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            let (headers, rows) = conn
                .transaction::<_, diesel::result::Error, _>(|conn| {
                    async move {
                        let headers: Vec<(i64, String)> = orders::table
                            .filter(orders::user_id.eq(user_id))
                            .order(orders::id.asc())
                            .select((orders::id, orders::placed_at))
                            .load(conn)
                            .await?;
                        let ids: Vec<i64> = headers.iter().map(|(id, _)| *id).collect();
                        let rows: Vec<OrderItemRow> = order_items::table
                            .filter(order_items::order_id.eq_any(ids))
                            .order((order_items::order_id.asc(), order_items::position.asc()))
                            .select(OrderItemRow::as_select())
                            .load(conn)
                            .await?;
                        Ok((headers, rows))
                    }
                    .scope_boxed()
                })
                .await
                .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "load orders"))?;

            let mut products: BTreeMap<i64, Vec<CartItem>> = BTreeMap::new();
            for row in rows {
                products.entry(row.order_id).or_default().push(row.into());
            }

            Ok(headers
                .into_iter()
                .map(|(id, placed_at)| Order {
                    id,
                    products: products.remove(&id).unwrap_or_default(),
                    placed_at,
                })
                .collect())
        })
        .await
    }

    async fn insert_cart_item(&self, user_id: i32, item: &NewCartItem) -> AppResult<CartWrite> {
        bounded("insert cart item", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            let line = item.as_item();
            let row = CartItemRow {
                user_id,
                product_name: &line.product_name,
                product_price: line.product_price.clone(),
                product_description: &line.product_description,
                product_image: &line.product_image,
                cart_quantity: line.cart_quantity,
            };

            conn.transaction::<_, AppError, _>(|conn| {
                async move {
                    let inserted = diesel::insert_into(cart_items::table)
                        .values(&row)
                        .on_conflict((cart_items::user_id, cart_items::product_name))
                        .do_nothing()
                        .execute(conn)
                        .await?;
                    if inserted == 0 {
                        return Ok(CartWrite::Duplicate);
                    }
                    Ok(CartWrite::Applied(cart_of(conn, user_id).await?))
                }
                .scope_boxed()
            })
            .await
            .map_err(Self::storage_error("insert cart item"))
        })
        .await
    }

    async fn delete_cart_item(
        &self,
        user_id: i32,
        product_name: &str,
    ) -> AppResult<Vec<CartItem>> {
        bounded("delete cart item", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, AppError, _>(|conn| {
                async move {
                    diesel::delete(
                        cart_items::table
                            .filter(cart_items::user_id.eq(user_id))
                            .filter(cart_items::product_name.eq(product_name)),
                    )
                    .execute(conn)
                    .await?;
                    Ok(cart_of(conn, user_id).await?)
                }
                .scope_boxed()
            })
            .await
            .map_err(Self::storage_error("delete cart item"))
        })
        .await
    }

    async fn adjust_cart_quantity(
        &self,
        user_id: i32,
        product_name: &str,
        adjustment: QuantityAdjustment,
    ) -> AppResult<CartWrite> {
        bounded("adjust cart quantity", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, AppError, _>(|conn| {
                async move {
                    let line = cart_items::table
                        .filter(cart_items::user_id.eq(user_id))
                        .filter(cart_items::product_name.eq(product_name));

                    let updated = match adjustment {
                        QuantityAdjustment::Increment => {
                            diesel::update(line.clone())
                                .set(cart_items::cart_quantity.eq(cart_items::cart_quantity + 1))
                                .execute(conn)
                                .await?
                        }
                        QuantityAdjustment::Decrement => {
                            diesel::update(line.clone().filter(cart_items::cart_quantity.gt(1)))
                                .set(cart_items::cart_quantity.eq(cart_items::cart_quantity - 1))
                                .execute(conn)
                                .await?
                        }
                    };

                    if updated == 0 {
                        if adjustment == QuantityAdjustment::Increment {
                            return Ok(CartWrite::NotInCart);
                        }
                        let exists: bool = diesel::select(diesel::dsl::exists(line))
                            .get_result(conn)
                            .await?;
                        return Ok(if exists {
                            CartWrite::AtMinimum
                        } else {
                            CartWrite::NotInCart
                        });
                    }

                    Ok(CartWrite::Applied(cart_of(conn, user_id).await?))
                }
                .scope_boxed()
            })
            .await
            .map_err(Self::storage_error("adjust cart quantity"))
        })
        .await
    }

    async fn finalize_order(
        &self,
        user_id: i32,
        selection: &OrderSelection,
        placed_at: &str,
    ) -> AppResult<Order> {
        let names: Vec<String> = selection.iter().map(str::to_owned).collect();

        bounded("finalize order", self.query_timeout, async {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, AppError, _>(|conn| {
                async move {
                    let mut removed: Vec<StoredCartItem> = diesel::delete(
                        cart_items::table
                            .filter(cart_items::user_id.eq(user_id))
                            .filter(cart_items::product_name.eq_any(names)),
                    )
                    .returning(StoredCartItem::as_returning())
                    .get_results(conn)
                    .await?;

                    removed.sort_by_key(|stored| stored.id);

                    let order_id: i64 = diesel::insert_into(orders::table)
                        .values(&OrderRow { user_id, placed_at })
                        .returning(orders::id)
                        .get_result(conn)
                        .await?;

                    let products: Vec<CartItem> =
                        removed.into_iter().map(|stored| stored.item).collect();
                    let rows: Vec<OrderItemInsert> = products
                        .iter()
                        .enumerate()
                        .map(|(position, item)| OrderItemInsert {
                            order_id,
                            position: position as i32,
                            product_name: item.product_name.clone(),
                            product_price: item.product_price.clone(),
                            product_description: item.product_description.clone(),
                            product_image: item.product_image.clone(),
                            cart_quantity: item.cart_quantity,
                        })
                        .collect();
                    if !rows.is_empty() {
                        diesel::insert_into(order_items::table)
                            .values(&rows)
                            .execute(conn)
                            .await?;
                    }

                    Ok(Order {
                        id: order_id,
                        products,
                        placed_at: placed_at.to_string(),
                    })
                }
                .scope_boxed()
            })
            .await
            .map_err(Self::storage_error("finalize order"))
        })
        .await
    }
}
