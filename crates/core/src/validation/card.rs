//! Card fields

use super::{ValidationError, is_digits, sanitize_numeric};

/// Luhn checksum over the digits of `card_number`.
///
/// Non-digit separators are ignored. Empty input and numbers made of a single
/// repeated digit are rejected even when the checksum holds.
pub fn validate_luhn(card_number: &str) -> bool {
    let digits: Vec<u32> = card_number.chars().filter_map(|c| c.to_digit(10)).collect();

    let Some(first) = digits.first() else {
        return false;
    };

    if digits.iter().all(|d| d == first) {
        return false;
    }

    let total: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(position, &digit)| {
            if position % 2 == 1 {
                let doubled = digit * 2;

                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();

    total % 10 == 0
}

/// Validates a card number: 13 to 19 digits once sanitized, and Luhn-valid.
///
/// # Errors
///
/// - [`ValidationError::CardNumberFormat`]: wrong length after sanitizing.
/// - [`ValidationError::CardNumberInvalid`]: checksum failure or a single
///   repeated digit.
pub fn validate_card_number(card_number: &str) -> Result<(), ValidationError> {
    let sanitized = sanitize_numeric(card_number);

    if !is_digits(&sanitized, 13..=19) {
        return Err(ValidationError::CardNumberFormat);
    }

    if !validate_luhn(&sanitized) {
        return Err(ValidationError::CardNumberInvalid);
    }

    Ok(())
}

/// Validates a CVV/CVC: 3 or 4 digits once sanitized.
///
/// # Errors
///
/// Returns [`ValidationError::Cvv`] otherwise.
pub fn validate_cvv(cvv: &str) -> Result<(), ValidationError> {
    if !is_digits(&sanitize_numeric(cvv), [3, 4]) {
        return Err(ValidationError::Cvv);
    }

    Ok(())
}
