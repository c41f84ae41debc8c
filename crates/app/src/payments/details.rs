//! Card and contact fields submitted with a payment.

use std::fmt;

use fulfil::validation::{
    ValidationError, collapse_whitespace, sanitize_numeric, validate_card_number, validate_cvv,
    validate_expiry_date, validate_phone, validate_postal_code, validate_street_name,
    validate_street_number,
};
use jiff::civil::Date;
use zeroize::Zeroizing;

use crate::domain::payments::records::PaymentContact;

/// Raw payment form, as typed by the customer.
///
/// Card fields are wiped from memory on drop and never printed.
#[derive(Clone, Default)]
pub struct PaymentDetails {
    pub card_number: Zeroizing<String>,
    pub cvv: Zeroizing<String>,
    pub expiry_month: i64,
    pub expiry_year: i64,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub street_number: Option<String>,
    pub street_name: Option<String>,
}

impl PaymentDetails {
    /// Card-only details, without contact fields.
    #[must_use]
    pub fn card(card_number: &str, cvv: &str, expiry_month: i64, expiry_year: i64) -> Self {
        Self {
            card_number: Zeroizing::new(card_number.to_string()),
            cvv: Zeroizing::new(cvv.to_string()),
            expiry_month,
            expiry_year,
            ..Self::default()
        }
    }

    /// Runs every field validator, card first, and normalises what is kept.
    ///
    /// Contact fields are optional; blank ones are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self, today: Date) -> Result<ValidatedPayment, ValidationError> {
        validate_card_number(&self.card_number)?;
        validate_cvv(&self.cvv)?;
        validate_expiry_date(self.expiry_month, self.expiry_year, today)?;

        let contact = PaymentContact {
            postal_code: normalise(
                self.postal_code.as_deref(),
                validate_postal_code,
                sanitize_numeric,
            )?,
            phone: normalise(self.phone.as_deref(), validate_phone, sanitize_numeric)?,
            street_number: normalise(
                self.street_number.as_deref().map(str::trim),
                validate_street_number,
                str::to_string,
            )?,
            street_name: normalise(
                self.street_name.as_deref(),
                validate_street_name,
                collapse_whitespace,
            )?,
        };

        let card_number = Zeroizing::new(sanitize_numeric(&self.card_number));
        let card_last4 = last4(&card_number);

        Ok(ValidatedPayment {
            card_number,
            card_last4,
            contact,
        })
    }
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card_number", &"**redacted**")
            .field("cvv", &"**redacted**")
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .finish_non_exhaustive()
    }
}

/// Payment fields that passed validation.
pub struct ValidatedPayment {
    /// Digits only.
    pub card_number: Zeroizing<String>,
    pub card_last4: String,
    pub contact: PaymentContact,
}

impl fmt::Debug for ValidatedPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedPayment")
            .field("card_last4", &self.card_last4)
            .field("contact", &self.contact)
            .finish_non_exhaustive()
    }
}

/// Validates an optional field and returns its stored form. Blank values
/// count as absent.
fn normalise(
    value: Option<&str>,
    validate: fn(&str) -> Result<(), ValidationError>,
    keep: fn(&str) -> String,
) -> Result<Option<String>, ValidationError> {
    match value.filter(|value| !value.trim().is_empty()) {
        Some(value) => {
            validate(value)?;

            Ok(Some(keep(value)))
        }
        None => Ok(None),
    }
}

fn last4(card_number: &str) -> String {
    let start = card_number.len().saturating_sub(4);

    card_number.get(start..).unwrap_or_default().to_string()
}
