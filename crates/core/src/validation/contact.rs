//! Contact fields

use super::{ValidationError, is_digits, sanitize_numeric};

const STREET_NAME_MIN_CHARS: usize = 3;
const STREET_NAME_MAX_CHARS: usize = 100;
const STREET_NAME_MIN_LETTERS: usize = 2;

/// Validates a French postal code: exactly 5 digits once sanitized.
///
/// # Errors
///
/// Returns [`ValidationError::PostalCode`] otherwise.
pub fn validate_postal_code(postal_code: &str) -> Result<(), ValidationError> {
    if !is_digits(&sanitize_numeric(postal_code), [5]) {
        return Err(ValidationError::PostalCode);
    }

    Ok(())
}

/// Validates a French phone number: 10 digits once sanitized, starting with
/// `0` followed by `1` to `9`.
///
/// # Errors
///
/// - [`ValidationError::PhoneLength`]: not 10 digits.
/// - [`ValidationError::PhonePrefix`]: prefix outside 01 to 09.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let sanitized = sanitize_numeric(phone);

    if !is_digits(&sanitized, [10]) {
        return Err(ValidationError::PhoneLength);
    }

    let mut digits = sanitized.chars();

    if !matches!(
        (digits.next(), digits.next()),
        (Some('0'), Some('1'..='9'))
    ) {
        return Err(ValidationError::PhonePrefix);
    }

    Ok(())
}

/// Validates a street number: one or more digits, nothing else.
///
/// The value is not sanitized first; `"12 bis"` is rejected.
///
/// # Errors
///
/// Returns [`ValidationError::StreetNumber`] otherwise.
pub fn validate_street_number(street_number: &str) -> Result<(), ValidationError> {
    if street_number.is_empty() || !street_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::StreetNumber);
    }

    Ok(())
}

/// Trims `value` and collapses every run of whitespace into one space.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validates a street name.
///
/// After whitespace collapsing the name must be 3 to 100 characters long,
/// use only letters (accented Latin-1 letters included), digits, spaces,
/// apostrophes, hyphens and periods, and contain at least two letters.
///
/// # Errors
///
/// Returns the first failing rule, checked in the order listed above.
pub fn validate_street_name(street_name: &str) -> Result<(), ValidationError> {
    if street_name.is_empty() {
        return Err(ValidationError::StreetNameRequired);
    }

    let cleaned = collapse_whitespace(street_name);
    let chars = cleaned.chars().count();

    if chars < STREET_NAME_MIN_CHARS {
        return Err(ValidationError::StreetNameTooShort);
    }

    if chars > STREET_NAME_MAX_CHARS {
        return Err(ValidationError::StreetNameTooLong);
    }

    if !cleaned
        .chars()
        .all(|c| is_street_letter(c) || c.is_ascii_digit() || matches!(c, ' ' | '\'' | '-' | '.'))
    {
        return Err(ValidationError::StreetNameCharacters);
    }

    if cleaned.chars().filter(|&c| is_street_letter(c)).count() < STREET_NAME_MIN_LETTERS {
        return Err(ValidationError::StreetNameLetters);
    }

    Ok(())
}

/// ASCII letters plus the Latin-1 range `À`..=`ÿ`.
fn is_street_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || ('\u{C0}'..='\u{FF}').contains(&c)
}
