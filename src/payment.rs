//! Payment gateway collaborator.
//!
//! The storefront hands the payable amount to a [`PaymentGateway`] and only
//! looks at success, message and transaction id. [`MockPaymentGateway`]
//! simulates a gateway that approves everything unless told to decline.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Result;
use crate::models::{PaymentMethod, TransactionId};

/// Card fields collected by the card form.
#[derive(Debug)]
pub struct CardDetails {
    /// Name printed on the card.
    pub holder_name: String,
    /// Primary account number.
    pub number: SecretString,
    /// Expiry as `MM/YY`.
    pub expiry: String,
    /// Security code.
    pub cvc: SecretString,
}

impl CardDetails {
    /// Returns the card number with all but the last four digits hidden.
    #[inline]
    #[must_use]
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self
            .number
            .expose_secret()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        let tail: String = digits
            .iter()
            .skip(digits.len().saturating_sub(4))
            .collect();
        format!("**** {tail}")
    }
}

/// What the buyer chose to pay with.
#[derive(Debug)]
pub struct PaymentInfo {
    /// Payment method.
    pub method: PaymentMethod,
    /// Card fields, required for [`PaymentMethod::Card`].
    pub card: Option<CardDetails>,
    /// Applied coupon code, passed along as order metadata.
    pub coupon_code: Option<String>,
}

impl PaymentInfo {
    /// Pay through the PhonePe redirect flow.
    #[inline]
    #[must_use]
    pub const fn phonepe() -> Self {
        Self {
            method: PaymentMethod::PhonePe,
            card: None,
            coupon_code: None,
        }
    }

    /// Pay by card.
    #[inline]
    #[must_use]
    pub const fn card(details: CardDetails) -> Self {
        Self {
            method: PaymentMethod::Card,
            card: Some(details),
            coupon_code: None,
        }
    }

    /// Attaches the applied coupon code.
    #[inline]
    #[must_use]
    pub fn with_coupon<T: Into<String>>(mut self, code: T) -> Self {
        self.coupon_code = Some(code.into());
        self
    }
}

/// Gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    /// Whether the payment went through.
    pub success: bool,
    /// Human-readable detail from the gateway.
    pub message: Option<String>,
    /// Gateway transaction id, present on success.
    pub transaction_id: Option<TransactionId>,
}

/// Something that can take a payment.
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` using `info`.
    ///
    /// A declined payment is an `Ok` result with `success == false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway could not be reached at all.
    fn process_payment(
        &self,
        amount: Decimal,
        info: &PaymentInfo,
    ) -> impl Future<Output = Result<PaymentResult>> + Send;
}

/// Simulated gateway.
///
/// PhonePe payments get a `PHNPE_` transaction id, everything else `TXN_`.
/// A gateway built with [`declining`](Self::declining) refuses every
/// payment with the given message.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    /// Message to decline with, if declining.
    decline: Option<String>,
}

impl MockPaymentGateway {
    /// A gateway that approves every payment.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { decline: None }
    }

    /// A gateway that declines every payment with `message`.
    #[inline]
    #[must_use]
    pub fn declining<T: Into<String>>(message: T) -> Self {
        Self {
            decline: Some(message.into()),
        }
    }

    /// Decides the outcome of one payment.
    fn outcome(&self, amount: Decimal, info: &PaymentInfo) -> PaymentResult {
        if let Some(message) = self.decline.as_ref() {
            return declined(message.clone());
        }
        match info.method {
            PaymentMethod::PhonePe => approved(
                "PhonePe payment successful (simulation)",
                transaction_id("PHNPE_", 8),
            ),
            PaymentMethod::Card => {
                let Some(card) = info.card.as_ref() else {
                    return declined("Card details are required.".to_owned());
                };
                tracing::debug!(card = %card.masked_number(), %amount, "charging card");
                approved(
                    "Payment successful (simulation)",
                    transaction_id("TXN_", 10),
                )
            }
        }
    }
}

impl PaymentGateway for MockPaymentGateway {
    #[inline]
    fn process_payment(
        &self,
        amount: Decimal,
        info: &PaymentInfo,
    ) -> impl Future<Output = Result<PaymentResult>> + Send {
        tracing::info!(
            %amount,
            method = ?info.method,
            coupon = ?info.coupon_code,
            "processing payment"
        );
        core::future::ready(Ok(self.outcome(amount, info)))
    }
}

/// A successful result.
fn approved(message: &str, id: TransactionId) -> PaymentResult {
    PaymentResult {
        success: true,
        message: Some(message.to_owned()),
        transaction_id: Some(id),
    }
}

/// A declined result.
const fn declined(message: String) -> PaymentResult {
    PaymentResult {
        success: false,
        message: Some(message),
        transaction_id: None,
    }
}

/// `prefix` followed by the first `len` characters of a random UUID.
fn transaction_id(prefix: &str, len: usize) -> TransactionId {
    let random: String = uuid::Uuid::new_v4().to_string().chars().take(len).collect();
    TransactionId::new(format!("{prefix}{random}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CardDetails {
        CardDetails {
            holder_name: "Asha Rao".to_owned(),
            number: SecretString::from("4242 4242 4242 4242".to_owned()),
            expiry: "12/30".to_owned(),
            cvc: SecretString::from("123".to_owned()),
        }
    }

    #[tokio::test]
    async fn phonepe_gets_prefixed_id() {
        let result = MockPaymentGateway::new()
            .process_payment(Decimal::from(195), &PaymentInfo::phonepe())
            .await
            .unwrap();
        assert!(result.success);
        let id = result.transaction_id.unwrap().into_inner();
        assert!(id.starts_with("PHNPE_"));
        assert_eq!(id.chars().count(), 14);
    }

    #[tokio::test]
    async fn card_gets_txn_id() {
        let info = PaymentInfo::card(card()).with_coupon("SAVE10");
        let result = MockPaymentGateway::new()
            .process_payment(Decimal::from(10), &info)
            .await
            .unwrap();
        assert!(result.success);
        let id = result.transaction_id.unwrap().into_inner();
        assert!(id.starts_with("TXN_"));
        assert_eq!(id.chars().count(), 14);
    }

    #[tokio::test]
    async fn card_without_details_is_declined() {
        let info = PaymentInfo {
            method: PaymentMethod::Card,
            card: None,
            coupon_code: None,
        };
        let result = MockPaymentGateway::new()
            .process_payment(Decimal::from(10), &info)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.transaction_id.is_none());
    }

    #[tokio::test]
    async fn declining_gateway() {
        let result = MockPaymentGateway::declining("Insufficient funds")
            .process_payment(Decimal::from(10), &PaymentInfo::phonepe())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("Insufficient funds"));
    }

    #[test]
    fn card_number_is_masked_and_redacted() {
        let details = card();
        assert_eq!(details.masked_number(), "**** 4242");
        assert!(!format!("{details:?}").contains("4242"));
    }
}
