use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Column limits of `cart_items` and `order_items`.
pub const MAX_PRODUCT_NAME_CHARS: usize = 200;
pub const MAX_PRODUCT_IMAGE_CHARS: usize = 1024;
pub const MAX_PRICE_SCALE: i64 = 2;
/// `NUMERIC(12, 2)` holds at most ten integer digits.
const PRICE_CEILING: i64 = 10_000_000_000;

/// One line of a user's cart. Also used as the immutable snapshot stored in
/// an order.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, ToSchema,
)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[schema(example = "Classic Tee")]
    pub product_name: String,
    #[schema(value_type = String, example = "19.99")]
    pub product_price: BigDecimal,
    pub product_description: String,
    pub product_image: String,
    #[schema(example = 1, minimum = 1)]
    pub cart_quantity: i32,
}

/// A cart line that has passed validation and may be written to storage.
///
/// The only way to build one is [`NewCartItem::new`], so a value of this type
/// always has a non-blank name, a non-negative price and a quantity of at
/// least one, and fits the storage columns without rounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem(CartItem);

impl NewCartItem {
    pub fn new(
        product_name: impl Into<String>,
        product_price: BigDecimal,
        product_description: impl Into<String>,
        product_image: impl Into<String>,
        cart_quantity: Option<i32>,
    ) -> AppResult<Self> {
        let product_name: String = product_name.into();
        if product_name.trim().is_empty() {
            return Err(AppError::MissingRequiredField {
                field: "productName".to_string(),
            });
        }
        if product_name.chars().count() > MAX_PRODUCT_NAME_CHARS {
            return Err(invalid(
                "productName",
                format!("Product name is longer than {} characters", MAX_PRODUCT_NAME_CHARS),
            ));
        }
        if product_price < BigDecimal::from(0) {
            return Err(invalid("productPrice", "Price cannot be negative".to_string()));
        }
        if product_price.normalized().as_bigint_and_exponent().1 > MAX_PRICE_SCALE {
            return Err(invalid(
                "productPrice",
                format!("Price has more than {} decimal places", MAX_PRICE_SCALE),
            ));
        }
        if product_price >= BigDecimal::from(PRICE_CEILING) {
            return Err(invalid(
                "productPrice",
                format!("Price must be below {}", PRICE_CEILING),
            ));
        }
        let product_image: String = product_image.into();
        if product_image.chars().count() > MAX_PRODUCT_IMAGE_CHARS {
            return Err(invalid(
                "productImage",
                format!("Image reference is longer than {} characters", MAX_PRODUCT_IMAGE_CHARS),
            ));
        }
        let cart_quantity = cart_quantity.unwrap_or(1);
        if cart_quantity < 1 {
            return Err(AppError::Validation {
                field: "cartQuantity".to_string(),
                reason: "Quantity must be at least 1".to_string(),
            });
        }

        Ok(Self(CartItem {
            product_name,
            product_price,
            product_description: product_description.into(),
            product_image,
            cart_quantity,
        }))
    }

    pub fn product_name(&self) -> &str {
        &self.0.product_name
    }

    pub fn as_item(&self) -> &CartItem {
        &self.0
    }

    pub fn into_item(self) -> CartItem {
        self.0
    }
}

fn invalid(field: &str, reason: String) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn price(raw: &str) -> BigDecimal {
        BigDecimal::from_str(raw).unwrap()
    }

    #[test]
    fn test_new_cart_item_defaults_quantity_to_one() {
        let item = NewCartItem::new("Mug", price("8.50"), "Ceramic", "mug.png", None).unwrap();
        assert_eq!(item.as_item().cart_quantity, 1);
        assert_eq!(item.product_name(), "Mug");
    }

    #[test]
    fn test_new_cart_item_rejects_blank_name() {
        let err = NewCartItem::new("  ", price("1"), "", "", None).unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredField { field } if field == "productName"));
    }

    #[test]
    fn test_new_cart_item_rejects_zero_quantity() {
        let err = NewCartItem::new("Mug", price("1"), "", "", Some(0)).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "cartQuantity"));
    }

    #[test]
    fn test_new_cart_item_rejects_negative_price() {
        let err = NewCartItem::new("Mug", price("-0.01"), "", "", None).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "productPrice"));
    }

    #[test]
    fn test_price_scale_limit() {
        assert!(NewCartItem::new("Mug", price("0.01"), "", "", None).is_ok());
        assert!(NewCartItem::new("Mug", price("1.500"), "", "", None).is_ok());
        let err = NewCartItem::new("Mug", price("0.005"), "", "", None).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "productPrice"));
    }

    #[test]
    fn test_price_magnitude_limit() {
        assert!(NewCartItem::new("Mug", price("9999999999.99"), "", "", None).is_ok());
        let err = NewCartItem::new("Mug", price("10000000000"), "", "", None).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "productPrice"));
    }

    #[test]
    fn test_image_length_limit() {
        let longest = "i".repeat(MAX_PRODUCT_IMAGE_CHARS);
        assert!(NewCartItem::new("Mug", price("1"), "", longest.as_str(), None).is_ok());
        let too_long = "i".repeat(MAX_PRODUCT_IMAGE_CHARS + 1);
        let err = NewCartItem::new("Mug", price("1"), "", too_long, None).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "productImage"));
    }

    #[test]
    fn test_name_length_limit() {
        let longest = "n".repeat(MAX_PRODUCT_NAME_CHARS);
        assert!(NewCartItem::new(longest, price("1"), "", "", None).is_ok());
        let err = NewCartItem::new("n".repeat(MAX_PRODUCT_NAME_CHARS + 1), price("1"), "", "", None)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "productName"));
    }

    #[test]
    fn test_cart_item_serializes_camel_case() {
        let item = NewCartItem::new("Mug", price("8.50"), "Ceramic", "mug.png", Some(2))
            .unwrap()
            .into_item();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productName"], "Mug");
        assert_eq!(json["cartQuantity"], 2);
        assert_eq!(json["productImage"], "mug.png");
        assert!(json.get("product_name").is_none());
    }
}
