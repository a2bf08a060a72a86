//! Shipping address models.

use serde::{Deserialize, Serialize};

use super::AddressId;
use crate::error::{Result, StorefrontError};

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Unique identifier (UUID).
    pub id: AddressId,
    /// Recipient name.
    pub full_name: String,
    /// Street and house number.
    pub street_address: String,
    /// Apartment, suite, unit.
    pub apartment_suite: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub zip_code: String,
    /// Country name.
    pub country: String,
    /// Contact phone number including country code.
    pub phone_number: String,
    /// Whether this is the address preselected at checkout.
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Returns the user-editable fields of this address as a draft.
    #[inline]
    #[must_use]
    pub fn to_draft(&self) -> AddressDraft {
        AddressDraft {
            full_name: self.full_name.clone(),
            street_address: self.street_address.clone(),
            apartment_suite: self.apartment_suite.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
            country: self.country.clone(),
            phone_number: self.phone_number.clone(),
            is_default: Some(self.is_default),
        }
    }

    /// Formats the address on a single line.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.street_address.as_str()];
        if let Some(apt) = self.apartment_suite.as_deref().filter(|apt| !apt.is_empty()) {
            parts.push(apt);
        }
        parts.extend([
            self.city.as_str(),
            self.state.as_str(),
            self.zip_code.as_str(),
            self.country.as_str(),
        ]);
        parts.join(", ")
    }
}

/// User-supplied address fields, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDraft {
    /// Recipient name.
    pub full_name: String,
    /// Street and house number.
    pub street_address: String,
    /// Apartment, suite, unit.
    pub apartment_suite: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub zip_code: String,
    /// Country name.
    pub country: String,
    /// Contact phone number including country code.
    pub phone_number: String,
    /// Requested default flag; `None` lets the address book decide.
    pub is_default: Option<bool>,
}

impl AddressDraft {
    /// Checks the draft against the address form rules.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        require_min_chars(&self.full_name, 2, "Full name must be at least 2 characters.")?;
        require_min_chars(&self.street_address, 5, "Street address is required.")?;
        require_min_chars(&self.city, 2, "City is required.")?;
        require_min_chars(&self.state, 2, "State/Province is required.")?;
        validate_zip(&self.zip_code)?;
        require_min_chars(&self.country, 2, "Country is required.")?;
        validate_phone(&self.phone_number)
    }

    /// Builds a stored address from this draft.
    #[inline]
    #[must_use]
    pub(crate) fn into_address(self, id: AddressId, is_default: bool) -> Address {
        Address {
            id,
            full_name: self.full_name,
            street_address: self.street_address,
            apartment_suite: self.apartment_suite,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country.trim().to_owned(),
            phone_number: self.phone_number,
            is_default,
        }
    }
}

/// Fails with `message` unless `value` (trimmed) has at least `min` chars.
fn require_min_chars(value: &str, min: usize, message: &str) -> Result<()> {
    if value.trim().chars().count() < min {
        return Err(StorefrontError::validation(message));
    }
    Ok(())
}

/// Zip codes: 3-20 letters, digits, spaces or hyphens.
fn validate_zip(zip: &str) -> Result<()> {
    let len = zip.chars().count();
    if len < 3 {
        return Err(StorefrontError::validation("Zip code must be at least 3 characters."));
    }
    if len > 20 {
        return Err(StorefrontError::validation("Zip code cannot exceed 20 characters."));
    }
    if !zip
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == ' ' || ch == '-')
    {
        return Err(StorefrontError::validation("Invalid characters in zip code."));
    }
    Ok(())
}

/// Country codes recognised without a separating space.
const KNOWN_COUNTRY_CODES: [&str; 10] = [
    "+91", "+1", "+44", "+61", "+49", "+81", "+33", "+86", "+55", "+27",
];

/// Splits `+<code><local>` or `+<code> <local>` into its two parts.
///
/// Without a space, a known country code wins; otherwise the code takes
/// up to four digits and leaves at least one for the local number.
fn split_phone(phone: &str) -> (&str, String) {
    if let Some((code, local)) = phone.split_once(char::is_whitespace) {
        let digits = local.split_whitespace().collect();
        return (code, digits);
    }
    if let Some(code) = KNOWN_COUNTRY_CODES
        .iter()
        .find(|code| phone.starts_with(*code))
    {
        return (*code, phone.get(code.len()..).unwrap_or_default().to_owned());
    }
    if !phone.starts_with('+') {
        return ("", phone.to_owned());
    }
    let code_digits = phone
        .bytes()
        .skip(1)
        .take_while(u8::is_ascii_digit)
        .count()
        .min(4)
        .min(phone.len().saturating_sub(2));
    let split = code_digits + 1;
    (
        phone.get(..split).unwrap_or_default(),
        phone.get(split..).unwrap_or_default().to_owned(),
    )
}

/// Phone numbers: a `+` country code of 2-5 characters followed by a
/// local number of 5-15 digits, optionally separated by spaces.
fn validate_phone(phone: &str) -> Result<()> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(StorefrontError::validation("Phone number is required."));
    }
    let (code, local) = split_phone(trimmed);
    if code.len() < 2 {
        return Err(StorefrontError::validation("Please select a country code."));
    }
    let code_is_numeric = code.bytes().skip(1).all(|byte| byte.is_ascii_digit());
    if code.len() > 5 || !code.starts_with('+') || !code_is_numeric {
        return Err(StorefrontError::validation("Invalid country code."));
    }
    let len = local.chars().count();
    if len < 5 {
        return Err(StorefrontError::validation("Phone number must be at least 5 digits."));
    }
    if len > 15 {
        return Err(StorefrontError::validation("Phone number is too long."));
    }
    if !local.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(StorefrontError::validation("Phone number must contain only digits."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AddressDraft {
        AddressDraft {
            full_name: "Asha Rao".to_owned(),
            street_address: "12 MG Road".to_owned(),
            apartment_suite: Some("Flat 4B".to_owned()),
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
            zip_code: "411001".to_owned(),
            country: "India".to_owned(),
            phone_number: "+91 9876543210".to_owned(),
            is_default: None,
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn short_street_is_rejected() {
        let mut bad = draft();
        bad.street_address = "MG".to_owned();
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("Street address is required."));
    }

    #[test]
    fn zip_with_symbols_is_rejected() {
        let mut bad = draft();
        bad.zip_code = "41#001".to_owned();
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid characters in zip code."));
    }

    #[test]
    fn blank_country_is_rejected() {
        let mut bad = draft();
        bad.country = "   ".to_owned();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn missing_phone_is_rejected() {
        let mut bad = draft();
        bad.phone_number = String::new();
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("Phone number is required."));
    }

    fn phone_error(phone: &str) -> String {
        let mut bad = draft();
        bad.phone_number = phone.to_owned();
        bad.validate().unwrap_err().to_string()
    }

    #[test]
    fn phone_accepts_spaced_and_joined_forms() {
        for phone in ["+91 9876543210", "+919876543210", "+1 555 0100 22", "+3725551234"] {
            let mut ok = draft();
            ok.phone_number = phone.to_owned();
            assert!(ok.validate().is_ok(), "{phone}");
        }
    }

    #[test]
    fn phone_rules_follow_the_form() {
        assert!(phone_error("9876543210").contains("Please select a country code."));
        assert!(phone_error("+123456 98765").contains("Invalid country code."));
        assert!(phone_error("+91 1234").contains("at least 5 digits"));
        assert!(phone_error("+91 1234567890123456").contains("too long"));
        assert!(phone_error("+91 98765-4321").contains("only digits"));
    }

    #[test]
    fn one_line_skips_empty_apartment() {
        let mut plain = draft();
        plain.apartment_suite = Some(String::new());
        let address = plain.into_address(AddressId::from("a-1"), true);
        assert_eq!(address.one_line(), "12 MG Road, Pune, Maharashtra, 411001, India");
    }

    #[test]
    fn stored_layout_defaults_missing_flag() {
        let json = r#"{
            "id": "a-1",
            "fullName": "Asha Rao",
            "streetAddress": "12 MG Road",
            "city": "Pune",
            "state": "MH",
            "zipCode": "411001",
            "country": "India",
            "phoneNumber": "+91 98765"
        }"#;
        let address: Address = serde_json::from_str(json).unwrap();
        assert!(!address.is_default);
        assert!(address.apartment_suite.is_none());
    }
}
