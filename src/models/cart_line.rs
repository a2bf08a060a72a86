//! Persisted cart line.

use serde::{Deserialize, Serialize};

use super::ProductId;

/// One product in the cart and how many of it.
///
/// Stored lines always have a quantity of at least one; the cart drops a
/// line as soon as its quantity reaches zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_stored_layout() {
        let json = r#"[{"productId": "p-1", "quantity": 2}]"#;
        let lines: Vec<CartLine> = serde_json::from_str(json).unwrap();
        assert_eq!(
            lines,
            vec![CartLine {
                product_id: ProductId::from("p-1"),
                quantity: 2,
            }]
        );
    }

    #[test]
    fn negative_quantity_is_rejected_on_load() {
        let json = r#"[{"productId": "p-1", "quantity": -3}]"#;
        assert!(serde_json::from_str::<Vec<CartLine>>(json).is_err());
    }
}
