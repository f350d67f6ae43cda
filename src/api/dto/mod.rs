//! Data Transfer Objects for API requests and responses.

mod auth;
mod cart;
mod error;
mod order;

pub use auth::{AuthResponse, LoginRequest, RegisterRequest, UserInfo};
pub use cart::{AddToCartRequest, CartResponse, ProductPayload};
pub use error::ErrorResponse;
pub use order::{OrderPlacedResponse, OrdersResponse};
