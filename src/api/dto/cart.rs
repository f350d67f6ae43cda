//! Cart request and response DTOs

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::models::{CartItem, NewCartItem};

/// Body of `POST /addtocart/{userRef}`
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddToCartRequest {
    #[validate(nested)]
    pub product: ProductPayload,
}

/// The product to put in the cart
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, max = 200, message = "Product name must be between 1 and 200 characters"))]
    #[schema(example = "Classic Tee", min_length = 1, max_length = 200)]
    pub product_name: String,
    /// Decimal price, as a JSON number or string; at most two decimal places
    /// and below 10000000000
    #[schema(value_type = String, example = "19.99")]
    pub product_price: BigDecimal,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    #[validate(length(max = 1024, message = "Image reference must be at most 1024 characters"))]
    #[schema(example = "classic-tee.png", max_length = 1024)]
    pub product_image: String,
    /// Defaults to 1
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[schema(example = 1, minimum = 1)]
    pub cart_quantity: Option<i32>,
}

impl TryFrom<AddToCartRequest> for NewCartItem {
    type Error = AppError;

    fn try_from(request: AddToCartRequest) -> Result<Self, Self::Error> {
        let p = request.product;
        NewCartItem::new(
            p.product_name,
            p.product_price,
            p.product_description,
            p.product_image,
            p.cart_quantity,
        )
    }
}

/// A cart after a read or a mutation
#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    #[schema(example = "Product added to cart")]
    pub message: String,
    pub usercart: Vec<CartItem>,
}

impl CartResponse {
    pub fn new(message: &str, usercart: Vec<CartItem>) -> Self {
        Self {
            message: message.to_string(),
            usercart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_numeric_or_string_price() {
        for body in [
            r#"{"product":{"productName":"Mug","productPrice":4.5}}"#,
            r#"{"product":{"productName":"Mug","productPrice":"4.50"}}"#,
        ] {
            let request: AddToCartRequest = serde_json::from_str(body).unwrap();
            assert!(request.validate().is_ok());
            let item = NewCartItem::try_from(request).unwrap();
            assert_eq!(item.as_item().cart_quantity, 1);
            assert_eq!(item.as_item().product_price, "4.5".parse::<BigDecimal>().unwrap());
        }
    }

    #[test]
    fn test_nested_rules_are_checked() {
        let request: AddToCartRequest = serde_json::from_str(
            r#"{"product":{"productName":"","productPrice":"1","cartQuantity":0}}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.errors().contains_key("product"));
    }

    #[test]
    fn test_negative_price_is_rejected_on_conversion() {
        let request: AddToCartRequest = serde_json::from_str(
            r#"{"product":{"productName":"Mug","productPrice":"-1"}}"#,
        )
        .unwrap();
        assert!(matches!(
            NewCartItem::try_from(request),
            Err(AppError::Validation { field, .. }) if field == "productPrice"
        ));
    }

    #[test]
    fn test_sub_cent_price_is_rejected_on_conversion() {
        let request: AddToCartRequest = serde_json::from_str(
            r#"{"product":{"productName":"Mug","productPrice":"0.005"}}"#,
        )
        .unwrap();
        assert!(matches!(
            NewCartItem::try_from(request),
            Err(AppError::Validation { field, .. }) if field == "productPrice"
        ));
    }
}
