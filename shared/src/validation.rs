//! Validation utilities for the Drinks Shop platform
//!
//! Includes Bolivia-specific checks for phone numbers and identity documents.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }
    Ok(())
}

// ============================================================================
// Bolivia-Specific Validations
// ============================================================================

/// Validate Bolivian phone number format
/// Accepts: 71234567, 7123-4567, +591 71234567, 22441122 (La Paz landline)
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    let local = match digits.len() {
        8 => digits.as_str(),
        11 if digits.starts_with("591") => &digits[3..],
        _ => return Err("Invalid phone number format"),
    };

    // Mobile numbers start with 6 or 7, landlines with 2, 3 or 4
    match local.chars().next() {
        Some('2' | '3' | '4' | '6' | '7') => Ok(()),
        _ => Err("Invalid phone number format"),
    }
}

/// Validate Bolivian identity card (CI) number
/// 5 to 10 digits, optionally followed by a department extension (e.g. "4587123 LP")
pub fn validate_document_number(document: &str) -> Result<(), &'static str> {
    const EXTENSIONS: [&str; 9] = ["LP", "CB", "SC", "OR", "PT", "TJ", "CH", "BE", "PD"];

    let mut parts = document.split_whitespace();
    let number = parts.next().ok_or("Document number is required")?;
    let number = number.split('-').next().unwrap_or(number);

    if number.len() < 5 || number.len() > 10 || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err("Document number must have 5 to 10 digits");
    }

    match parts.next() {
        None => Ok(()),
        Some(ext) if EXTENSIONS.contains(&ext.to_ascii_uppercase().as_str()) => Ok(()),
        Some(_) => Err("Unknown department extension"),
    }
}

// ============================================================================
// Card Validations
// ============================================================================

/// Card details collected in the payment details step. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CardDetails {
    #[validate(length(min = 2, max = 80))]
    pub holder_name: String,
    pub number: String,
    #[validate(range(min = 1, max = 12))]
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub cvv: String,
}

impl CardDetails {
    /// Digits of the card number, ignoring spaces and dashes
    pub fn digits(&self) -> String {
        self.number.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    pub fn last4(&self) -> String {
        let digits = self.digits();
        digits[digits.len().saturating_sub(4)..].to_string()
    }
}

/// Luhn checksum over a string of digits
pub fn luhn_check(digits: &str) -> bool {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Validate card details as of `today`
pub fn validate_card(card: &CardDetails, today: NaiveDate) -> Result<(), &'static str> {
    if card.validate().is_err() {
        return Err("Card holder or expiry month is invalid");
    }

    let digits = card.digits();
    if digits.len() < 13 || digits.len() > 19 {
        return Err("Card number must have 13 to 19 digits");
    }
    if !luhn_check(&digits) {
        return Err("Card number is invalid");
    }

    // Cards are valid through the last day of the expiry month
    let expiry = (card.expiry_year, card.expiry_month);
    let current = (today.year(), today.month());
    if expiry < current {
        return Err("Card has expired");
    }

    if !(3..=4).contains(&card.cvv.len()) || !card.cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err("CVV must have 3 or 4 digits");
    }

    Ok(())
}
