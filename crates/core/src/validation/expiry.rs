//! Card expiry

use jiff::civil::Date;

use super::ValidationError;

/// Validates an expiry month (1 to 12).
///
/// # Errors
///
/// Returns [`ValidationError::ExpiryMonth`] otherwise.
pub fn validate_expiry_month(month: i64) -> Result<(), ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::ExpiryMonth);
    }

    Ok(())
}

/// Validates a four-digit expiry year (2000 to 2100).
///
/// # Errors
///
/// Returns [`ValidationError::ExpiryYear`] otherwise.
pub fn validate_expiry_year(year: i64) -> Result<(), ValidationError> {
    if !(2000..=2100).contains(&year) {
        return Err(ValidationError::ExpiryYear);
    }

    Ok(())
}

/// Validates a full expiry date against `today`.
///
/// The card stays valid through its expiry month, so only a `(year, month)`
/// strictly before the current one is rejected.
///
/// # Errors
///
/// Returns the month or year error first, then
/// [`ValidationError::ExpiryDate`] for an expired card.
pub fn validate_expiry_date(month: i64, year: i64, today: Date) -> Result<(), ValidationError> {
    validate_expiry_month(month)?;
    validate_expiry_year(year)?;

    if (year, month) < (i64::from(today.year()), i64::from(today.month())) {
        return Err(ValidationError::ExpiryDate);
    }

    Ok(())
}
