//! Cart handlers.
//!
//! Mutating routes sit behind `auth_middleware`; `GET /getcart` behind
//! `optional_auth_middleware`. In both cases an authenticated caller may only
//! touch its own cart.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::CART_TAG;
use crate::api::dto::{AddToCartRequest, CartResponse, ErrorResponse};
use crate::error::AppResult;
use crate::models::UserRef;
use crate::services::Principal;
use crate::state::AppState;
use crate::utils::validate::ValidatedJson;

/// Routes that require a bearer token
pub fn cart_mutation_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(add_to_cart))
        .routes(routes!(remove_from_cart))
        .routes(routes!(increment_quantity))
        .routes(routes!(decrement_quantity))
}

pub fn cart_read_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_cart))
}

#[utoipa::path(
    post,
    path = "/addtocart/{userRef}",
    tag = CART_TAG,
    params(("userRef" = String, Path, description = "Account email or numeric user id")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Product added", body = CartResponse),
        (status = 400, description = "Duplicate product or invalid body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the caller's cart", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
async fn add_to_cart(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_ref): Path<String>,
    ValidatedJson(payload): ValidatedJson<AddToCartRequest>,
) -> AppResult<Json<CartResponse>> {
    let user_ref = UserRef::parse(&user_ref);
    principal.authorize(&user_ref)?;

    let cart = state
        .services
        .carts
        .add_item(&user_ref, payload.try_into()?)
        .await?;
    Ok(Json(CartResponse::new("Product added to cart", cart)))
}

/// Removing a product that is not in the cart succeeds and leaves the cart
/// unchanged.
#[utoipa::path(
    delete,
    path = "/removepcart/{productName}/{userRef}",
    tag = CART_TAG,
    params(
        ("productName" = String, Path, description = "Exact product name"),
        ("userRef" = String, Path, description = "Account email or numeric user id")
    ),
    responses(
        (status = 200, description = "Product removed", body = CartResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the caller's cart", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((product_name, user_ref)): Path<(String, String)>,
) -> AppResult<Json<CartResponse>> {
    let user_ref = UserRef::parse(&user_ref);
    principal.authorize(&user_ref)?;

    let cart = state
        .services
        .carts
        .remove_item(&user_ref, &product_name)
        .await?;
    Ok(Json(CartResponse::new("Product removed successfully.", cart)))
}

#[utoipa::path(
    put,
    path = "/cartplus/{productName}/{userRef}",
    tag = CART_TAG,
    params(
        ("productName" = String, Path, description = "Exact product name"),
        ("userRef" = String, Path, description = "Account email or numeric user id")
    ),
    responses(
        (status = 200, description = "Quantity increased", body = CartResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the caller's cart", body = ErrorResponse),
        (status = 404, description = "User or product not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
async fn increment_quantity(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((product_name, user_ref)): Path<(String, String)>,
) -> AppResult<Json<CartResponse>> {
    let user_ref = UserRef::parse(&user_ref);
    principal.authorize(&user_ref)?;

    let cart = state
        .services
        .carts
        .increment_quantity(&user_ref, &product_name)
        .await?;
    Ok(Json(CartResponse::new("Cart updated", cart)))
}

#[utoipa::path(
    put,
    path = "/cartminus/{productName}/{userRef}",
    tag = CART_TAG,
    params(
        ("productName" = String, Path, description = "Exact product name"),
        ("userRef" = String, Path, description = "Account email or numeric user id")
    ),
    responses(
        (status = 200, description = "Quantity decreased", body = CartResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the caller's cart", body = ErrorResponse),
        (status = 404, description = "User or product not found", body = ErrorResponse),
        (status = 409, description = "Quantity is already 1", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
async fn decrement_quantity(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((product_name, user_ref)): Path<(String, String)>,
) -> AppResult<Json<CartResponse>> {
    let user_ref = UserRef::parse(&user_ref);
    principal.authorize(&user_ref)?;

    let cart = state
        .services
        .carts
        .decrement_quantity(&user_ref, &product_name)
        .await?;
    Ok(Json(CartResponse::new("Cart updated", cart)))
}

#[utoipa::path(
    get,
    path = "/getcart/{userRef}",
    tag = CART_TAG,
    params(("userRef" = String, Path, description = "Account email or numeric user id")),
    responses(
        (status = 200, description = "Current cart in insertion order", body = CartResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 403, description = "Not the caller's cart", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security((), ("bearerAuth" = []))
)]
async fn get_cart(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(user_ref): Path<String>,
) -> AppResult<Json<CartResponse>> {
    let user_ref = UserRef::parse(&user_ref);
    if let Some(Extension(principal)) = principal {
        principal.authorize(&user_ref)?;
    }

    let cart = state.services.carts.get_cart(&user_ref).await?;
    Ok(Json(CartResponse::new("cart", cart)))
}
