use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub const AUTH_TAG: &str = "Auth";
pub const CART_TAG: &str = "Cart";
pub const ORDER_TAG: &str = "Orders";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront",
        description = "Per-user shopping carts and order placement",
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
            crate::models::CartItem,
            crate::models::Order,
        )
    ),
    tags(
        (name = AUTH_TAG, description = "Account registration and login"),
        (name = CART_TAG, description = "Cart operations"),
        (name = ORDER_TAG, description = "Checkout and order history"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer Token Authentication"))
                        .build(),
                ),
            )
        }
    }
}
