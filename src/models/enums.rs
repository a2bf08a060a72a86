//! Enumeration types for constrained values.

use serde::{Deserialize, Serialize};

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CouponType {
    /// `discount_value` is a percentage of the subtotal (1-100).
    Percentage,
    /// `discount_value` is a flat amount off the subtotal.
    Fixed,
}

impl core::fmt::Display for CouponType {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::Percentage => f.write_str("percentage"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

/// Payment method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    /// PhonePe redirect flow.
    #[serde(rename = "phonepe")]
    PhonePe,
    /// Card payment.
    Card,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductSort {
    /// Cheapest first.
    #[serde(rename = "price-asc")]
    PriceAsc,
    /// Most expensive first.
    #[serde(rename = "price-desc")]
    PriceDesc,
    /// Highest rated first; unrated products last.
    #[serde(rename = "rating")]
    Rating,
    /// Alphabetical by name (case-insensitive).
    #[serde(rename = "name")]
    Name,
}

impl core::str::FromStr for ProductSort {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "rating" => Ok(Self::Rating),
            "name" => Ok(Self::Name),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_type_serde() {
        let json = serde_json::to_string(&CouponType::Percentage).unwrap();
        assert_eq!(json, r#""percentage""#);
        let fixed: CouponType = serde_json::from_str(r#""fixed""#).unwrap();
        assert_eq!(fixed, CouponType::Fixed);
    }

    #[test]
    fn payment_method_serde_phonepe() {
        let json = serde_json::to_string(&PaymentMethod::PhonePe).unwrap();
        assert_eq!(json, r#""phonepe""#);
    }

    #[test]
    fn product_sort_parses_known_values() {
        assert_eq!("price-asc".parse::<ProductSort>(), Ok(ProductSort::PriceAsc));
        assert_eq!("rating".parse::<ProductSort>(), Ok(ProductSort::Rating));
        assert!("newest".parse::<ProductSort>().is_err());
    }
}
