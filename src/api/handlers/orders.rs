//! Order handlers.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::ORDER_TAG;
use crate::api::dto::{ErrorResponse, OrderPlacedResponse, OrdersResponse};
use crate::error::AppResult;
use crate::models::{OrderSelection, UserRef};
use crate::services::Principal;
use crate::state::AppState;

pub fn order_mutation_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(finalize_order))
}

pub fn order_read_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_orders))
}

/// Moves the selected cart lines into a new order.
///
/// `selection` is a JSON array (`["Mug","Classic Tee"]`) or a comma separated
/// list (`Mug,Classic Tee`) of exact product names. Names not in the cart
/// are ignored; if none match, an order with no products is still recorded.
#[utoipa::path(
    post,
    path = "/orderFinal/{selection}/{userRef}",
    tag = ORDER_TAG,
    params(
        ("selection" = String, Path, description = "Product names to check out"),
        ("userRef" = String, Path, description = "Account email or numeric user id")
    ),
    responses(
        (status = 200, description = "Order placed", body = OrderPlacedResponse),
        (status = 400, description = "Selection names no products", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the caller's cart", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
async fn finalize_order(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((selection, user_ref)): Path<(String, String)>,
) -> AppResult<Json<OrderPlacedResponse>> {
    let user_ref = UserRef::parse(&user_ref);
    principal.authorize(&user_ref)?;

    let order = state
        .services
        .orders
        .finalize_order(&user_ref, &OrderSelection::parse(&selection))
        .await?;
    Ok(Json(OrderPlacedResponse {
        message: "Order placed".to_string(),
        order,
    }))
}

#[utoipa::path(
    get,
    path = "/getorders/{userRef}",
    tag = ORDER_TAG,
    params(("userRef" = String, Path, description = "Account email or numeric user id")),
    responses(
        (status = 200, description = "Order history, oldest first", body = OrdersResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 403, description = "Not the caller's orders", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security((), ("bearerAuth" = []))
)]
async fn get_orders(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(user_ref): Path<String>,
) -> AppResult<Json<OrdersResponse>> {
    let user_ref = UserRef::parse(&user_ref);
    if let Some(Extension(principal)) = principal {
        principal.authorize(&user_ref)?;
    }

    let userorders = state.services.orders.get_orders(&user_ref).await?;
    Ok(Json(OrdersResponse {
        message: "orders".to_string(),
        userorders,
    }))
}
