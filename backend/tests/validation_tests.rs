//! Input validation tests
//!
//! Card checks, Bolivian phone and identity numbers, product fields,
//! pagination bounds and role permissions.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    default_role_permissions, format_address, luhn_check, permission_key,
    validate_document_number, validate_email, validate_phone, validate_product_fields,
    validate_card, Action, CardDetails, Pagination, Resource, MAX_PER_PAGE, ROLE_ADMIN,
    ROLE_CUSTOMER, ROLE_SELLER,
};

// ============================================================================
// Helpers
// ============================================================================

/// Append the Luhn check digit to a payload of digits
fn with_check_digit(payload: &[u32]) -> String {
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                *d
            }
        })
        .sum();
    let check = (10 - sum % 10) % 10;

    payload
        .iter()
        .chain(std::iter::once(&check))
        .map(|d| char::from_digit(*d, 10).unwrap())
        .collect()
}

fn card(number: &str, month: u32, year: i32) -> CardDetails {
    CardDetails {
        holder_name: "Juan Mamani".to_string(),
        number: number.to_string(),
        expiry_month: month,
        expiry_year: year,
        cvv: "321".to_string(),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Numbers built with a correct check digit pass the Luhn check
    #[test]
    fn prop_luhn_accepts_valid_numbers(payload in proptest::collection::vec(0u32..10, 12..18)) {
        prop_assert!(luhn_check(&with_check_digit(&payload)));
    }

    /// Changing any single digit breaks the checksum
    #[test]
    fn prop_luhn_detects_single_digit_errors(
        payload in proptest::collection::vec(0u32..10, 12..18),
        position in any::<proptest::sample::Index>(),
        bump in 1u32..10,
    ) {
        let number = with_check_digit(&payload);
        let mut digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
        let i = position.index(digits.len());
        digits[i] = (digits[i] + bump) % 10;
        let altered: String = digits.iter().filter_map(|d| char::from_digit(*d, 10)).collect();

        prop_assert!(!luhn_check(&altered));
    }

    /// Valid cards expiring this month or later pass, earlier ones do not
    #[test]
    fn prop_card_expiry(
        payload in proptest::collection::vec(0u32..10, 15..16),
        month in 1u32..=12,
        year in 2023i32..2030,
    ) {
        let number = with_check_digit(&payload);
        let result = validate_card(&card(&number, month, year), today());
        if (year, month) >= (2025, 3) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err("Card has expired"));
        }
    }

    /// Any 8-digit mobile number starting with 6 or 7 is accepted, with or without prefix
    #[test]
    fn prop_mobile_numbers(first in prop_oneof![Just('6'), Just('7')], rest in "[0-9]{7}") {
        let local = format!("{}{}", first, rest);
        prop_assert!(validate_phone(&local).is_ok());
        let prefixed = format!("+591 {}", local);
        prop_assert!(validate_phone(&prefixed).is_ok());
    }

    /// Pagination always lands within bounds
    #[test]
    fn prop_pagination_bounds(page in proptest::option::of(0u32..1_000), per_page in proptest::option::of(0u32..1_000)) {
        let p = Pagination::from_query(page, per_page);
        prop_assert!(p.page >= 1);
        prop_assert!(p.per_page >= 1 && p.per_page <= MAX_PER_PAGE);
        prop_assert!(p.offset() >= 0);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_card_last4_ignores_separators() {
        assert_eq!(card("5555-5555-5555-4444", 1, 2030).last4(), "4444");
    }

    #[test]
    fn test_card_number_length() {
        assert_eq!(
            validate_card(&card("4242", 12, 2030), today()),
            Err("Card number must have 13 to 19 digits")
        );
    }

    #[test]
    fn test_card_holder_required() {
        let mut details = card("4242424242424242", 12, 2030);
        details.holder_name = String::new();
        assert!(validate_card(&details, today()).is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("ventas@licoreria.com.bo").is_ok());
        assert!(validate_email("ventas@").is_err());
        assert!(validate_email("ventas@.bo").is_err());
    }

    #[test]
    fn test_landline_and_invalid_phones() {
        assert!(validate_phone("3 3445566").is_ok());
        assert!(validate_phone("5123456").is_err());
        assert!(validate_phone("51234567").is_err());
    }

    #[test]
    fn test_document_extensions() {
        assert!(validate_document_number("6543210 CB").is_ok());
        assert!(validate_document_number("6543210 cb").is_ok());
        assert!(validate_document_number("6543210 NY").is_err());
        assert!(validate_document_number("12345678901").is_err());
    }

    #[test]
    fn test_product_fields() {
        assert!(validate_product_fields(
            750,
            Decimal::new(400, 1),
            Decimal::new(18000, 2),
            Decimal::new(12000, 2)
        )
        .is_ok());
        assert!(validate_product_fields(750, Decimal::ZERO, Decimal::ONE, Decimal::NEGATIVE_ONE)
            .is_err());
        assert!(validate_product_fields(-1, Decimal::ZERO, Decimal::ONE, Decimal::ONE).is_err());
    }

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("Calle Sucre 123", "Santa Cruz", None),
            "Calle Sucre 123, Santa Cruz"
        );
    }

    #[test]
    fn test_role_permissions() {
        let admin = default_role_permissions(ROLE_ADMIN);
        for resource in Resource::ALL {
            for action in Action::ALL {
                assert!(admin.contains(&permission_key(resource, action)));
            }
        }

        let seller = default_role_permissions(ROLE_SELLER);
        assert!(seller.contains(&permission_key(Resource::Stock, Action::Edit)));
        assert!(!seller.contains(&permission_key(Resource::Category, Action::Create)));
        assert!(default_role_permissions(ROLE_CUSTOMER).is_empty());
    }
}
