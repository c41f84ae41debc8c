//! Payment & Contact Validation
//!
//! Pure field validators used before any payment attempt. Every validator
//! returns a typed [`ValidationError`] whose [`Display`](std::fmt::Display)
//! output is the user-facing message shown by the storefront.

use thiserror::Error;

mod card;
mod contact;
mod expiry;

pub use card::{validate_card_number, validate_cvv, validate_luhn};
pub use contact::{
    collapse_whitespace, validate_phone, validate_postal_code, validate_street_name,
    validate_street_number,
};
pub use expiry::{validate_expiry_date, validate_expiry_month, validate_expiry_year};

/// A rejected payment or contact field.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Card number is not 13 to 19 digits.
    #[error("Le numéro de carte doit contenir uniquement des chiffres (13 à 19).")]
    CardNumberFormat,

    /// Card number fails the Luhn checksum or repeats a single digit.
    #[error("Le numéro de carte est invalide.")]
    CardNumberInvalid,

    /// CVV is not 3 or 4 digits.
    #[error("Le CVV doit contenir uniquement des chiffres (3 ou 4).")]
    Cvv,

    /// Expiry month outside 1..=12.
    #[error("Le mois doit être entre 01 et 12.")]
    ExpiryMonth,

    /// Expiry year outside 2000..=2100.
    #[error("L'année doit être au format YYYY (entre 2000 et 2100).")]
    ExpiryYear,

    /// Expiry month lies in the past.
    #[error("Date d'expiration invalide.")]
    ExpiryDate,

    /// Postal code is not 5 digits.
    #[error("Code postal invalide — 5 chiffres.")]
    PostalCode,

    /// Phone number is not 10 digits.
    #[error("Numéro de téléphone invalide — 10 chiffres.")]
    PhoneLength,

    /// Phone number does not start with 01 to 09.
    #[error("Le numéro de téléphone doit commencer par 01 à 09.")]
    PhonePrefix,

    /// Street number is empty or contains non-digits.
    #[error("Numéro de rue : chiffres uniquement.")]
    StreetNumber,

    /// Street name is missing.
    #[error("Nom de rue requis.")]
    StreetNameRequired,

    /// Street name shorter than 3 characters.
    #[error("Nom de rue trop court (minimum 3 caractères).")]
    StreetNameTooShort,

    /// Street name longer than 100 characters.
    #[error("Nom de rue trop long (maximum 100 caractères).")]
    StreetNameTooLong,

    /// Street name contains characters outside the allowed set.
    #[error(
        "Nom de rue invalide : lettres, chiffres, espaces, apostrophes et tirets uniquement."
    )]
    StreetNameCharacters,

    /// Street name has fewer than 2 letters.
    #[error("Nom de rue invalide : au moins 2 lettres requises.")]
    StreetNameLetters,

    /// Quantity below one.
    #[error("Quantité invalide.")]
    Quantity,
}

/// Strips every non-digit character.
pub fn sanitize_numeric(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Validates an item quantity (integer ≥ 1).
///
/// # Errors
///
/// Returns [`ValidationError::Quantity`] when `quantity` is below one.
pub fn validate_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity < 1 {
        return Err(ValidationError::Quantity);
    }

    Ok(())
}

fn is_digits(value: &str, lengths: impl IntoIterator<Item = usize>) -> bool {
    let len = value.len();

    value.bytes().all(|b| b.is_ascii_digit()) && lengths.into_iter().any(|l| l == len)
}
