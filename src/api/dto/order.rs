//! Order response DTOs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Order;

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPlacedResponse {
    #[schema(example = "Order placed")]
    pub message: String,
    pub order: Order,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrdersResponse {
    #[schema(example = "orders")]
    pub message: String,
    /// Oldest first
    pub userorders: Vec<Order>,
}
