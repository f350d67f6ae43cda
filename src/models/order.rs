use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

use super::CartItem;

/// A finalized order. Orders are append-only: once written, neither the
/// product snapshots nor the timestamp change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub products: Vec<CartItem>,
    /// Local time of placement, e.g. `2025-03-01T18:04:11+05:30`
    pub placed_at: String,
}

/// The set of product names chosen for checkout.
///
/// Accepts either a JSON array (`["Mug","Classic Tee"]`) or a comma separated
/// list (`Mug,Classic Tee`). Names are trimmed and blank entries dropped.
/// Membership is exact: `Tee` does not select `Classic Tee`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderSelection(BTreeSet<String>);

impl OrderSelection {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with('[') {
            if let Ok(names) = serde_json::from_str::<Vec<String>>(raw) {
                return Self::from_names(names);
            }
        }
        Self::from_names(raw.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, product_name: &str) -> bool {
        self.0.contains(product_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Splits `cart` into `(selected, retained)`, keeping the original order
    /// within each half.
    pub fn partition(&self, cart: Vec<CartItem>) -> (Vec<CartItem>, Vec<CartItem>) {
        cart.into_iter()
            .partition(|item| self.contains(&item.product_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use proptest::prelude::*;

    fn item(name: &str) -> CartItem {
        CartItem {
            product_name: name.to_string(),
            product_price: BigDecimal::from(5),
            product_description: String::new(),
            product_image: String::new(),
            cart_quantity: 1,
        }
    }

    #[test]
    fn test_parse_json_array() {
        let selection = OrderSelection::parse(r#"["Mug", "Classic Tee"]"#);
        assert_eq!(selection.len(), 2);
        assert!(selection.contains("Mug"));
        assert!(selection.contains("Classic Tee"));
    }

    #[test]
    fn test_parse_comma_list() {
        let selection = OrderSelection::parse("Mug, Classic Tee,,");
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec!["Classic Tee", "Mug"]);
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert!(OrderSelection::parse("").is_empty());
        assert!(OrderSelection::parse(" , ").is_empty());
        assert!(OrderSelection::parse("[]").is_empty());
    }

    #[test]
    fn test_parse_malformed_json_falls_back_to_list() {
        let selection = OrderSelection::parse("[Mug");
        assert!(selection.contains("[Mug"));
    }

    #[test]
    fn test_membership_is_exact() {
        let selection = OrderSelection::parse("shirt");
        let (selected, retained) = selection.partition(vec![item("tshirt"), item("shirt")]);
        assert_eq!(selected, vec![item("shirt")]);
        assert_eq!(retained, vec![item("tshirt")]);
    }

    proptest! {
        #[test]
        fn prop_partition_is_exact(
            names in proptest::collection::btree_set("[a-e]{1,3}", 0..8),
            picks in proptest::collection::vec("[a-e]{1,3}", 0..8),
        ) {
            let cart: Vec<CartItem> = names.iter().map(|n| item(n)).collect();
            let selection = OrderSelection::from_names(&picks);
            let (selected, retained) = selection.partition(cart.clone());

            prop_assert_eq!(selected.len() + retained.len(), cart.len());
            prop_assert!(selected.iter().all(|i| selection.contains(&i.product_name)));
            prop_assert!(retained.iter().all(|i| !selection.contains(&i.product_name)));

            // relative order is preserved on both sides
            let mut merged: Vec<&CartItem> = Vec::new();
            let (mut s, mut r) = (selected.iter().peekable(), retained.iter().peekable());
            for original in &cart {
                if s.peek() == Some(&original) {
                    merged.push(s.next().unwrap());
                } else {
                    prop_assert_eq!(r.peek(), Some(&original));
                    merged.push(r.next().unwrap());
                }
            }
            prop_assert_eq!(merged.len(), cart.len());
        }
    }
}
