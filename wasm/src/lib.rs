//! WebAssembly module for the Drinks Shop storefront
//!
//! Runs the same rules as the backend in the browser so the storefront can
//! give immediate feedback:
//! - Cart line and total calculations
//! - Stock availability checks
//! - Card, phone and identity document validation
//! - Checkout wizard navigation

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Minimal cart line as held by the storefront
#[derive(Debug, Deserialize)]
struct LineInput {
    quantity: i32,
    unit_price: Decimal,
}

#[derive(Debug, Serialize)]
struct CartSummary {
    subtotals: Vec<Decimal>,
    total: Decimal,
    item_count: i32,
}

fn js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

fn summarize(lines: &[LineInput]) -> Result<CartSummary, &'static str> {
    const OUT_OF_RANGE: &str = "Cart quantities or prices are out of range";

    let mut subtotals = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    let mut item_count = 0i32;
    for line in lines {
        let subtotal = Decimal::from(line.quantity)
            .checked_mul(line.unit_price)
            .ok_or(OUT_OF_RANGE)?;
        total = total.checked_add(subtotal).ok_or(OUT_OF_RANGE)?;
        item_count = item_count.checked_add(line.quantity).ok_or(OUT_OF_RANGE)?;
        subtotals.push(subtotal);
    }

    Ok(CartSummary {
        subtotals,
        total,
        item_count,
    })
}

/// Compute line subtotals and the cart total from `[{quantity, unit_price}]`
#[wasm_bindgen]
pub fn summarize_cart(lines_json: &str) -> Result<String, JsValue> {
    let lines: Vec<LineInput> = serde_json::from_str(lines_json)
        .map_err(|e| js_error(format!("Invalid cart JSON: {}", e)))?;
    let summary = summarize(&lines).map_err(|m| js_error(m.to_string()))?;

    serde_json::to_string(&summary).map_err(|e| js_error(e.to_string()))
}

/// Error message for a quantity the stock cannot serve, or `None` when it can
#[wasm_bindgen]
pub fn check_availability(requested: i32, available: i32) -> Option<String> {
    ensure_available(requested, available)
        .err()
        .map(|e| e.to_string())
}

/// Total units across warehouses from `[{warehouse_id, warehouse_name, quantity}]`
#[wasm_bindgen]
pub fn total_stock(stock_json: &str) -> Result<i32, JsValue> {
    let stock: Vec<WarehouseAvailability> = serde_json::from_str(stock_json)
        .map_err(|e| js_error(format!("Invalid stock JSON: {}", e)))?;
    Ok(total_available(&stock))
}

/// Warehouse able to serve `quantity` of a product, from `[{warehouse_id, warehouse_name, quantity}]`
#[wasm_bindgen]
pub fn pick_stock_warehouse(stock_json: &str, quantity: i32) -> Result<Option<String>, JsValue> {
    let stock: Vec<WarehouseAvailability> = serde_json::from_str(stock_json)
        .map_err(|e| js_error(format!("Invalid stock JSON: {}", e)))?;
    Ok(pick_warehouse(&stock, quantity).map(|id| id.to_string()))
}

/// Validate card details as of the given date; returns the last four digits
#[wasm_bindgen]
pub fn validate_card_on(card_json: &str, year: i32, month: u32, day: u32) -> Result<String, JsValue> {
    let card: CardDetails = serde_json::from_str(card_json)
        .map_err(|e| js_error(format!("Invalid card JSON: {}", e)))?;
    let today = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| js_error(format!("Invalid date {}-{}-{}", year, month, day)))?;

    validate_card(&card, today).map_err(|e| JsValue::from_str(e))?;
    Ok(card.last4())
}

/// Validate card details against the browser's current date
#[wasm_bindgen]
pub fn validate_card_today(card_json: &str) -> Result<String, JsValue> {
    let now = js_sys::Date::new_0();
    validate_card_on(
        card_json,
        now.get_full_year() as i32,
        now.get_month() + 1,
        now.get_date(),
    )
}

#[wasm_bindgen]
pub fn is_valid_phone(phone: &str) -> bool {
    validate_phone(phone).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_document(document: &str) -> bool {
    validate_document_number(document).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_email(email: &str) -> bool {
    validate_email(email).is_ok()
}

/// Next wizard step after `current`, if any
#[wasm_bindgen]
pub fn next_checkout_step(current: &str) -> Option<String> {
    current
        .parse::<CheckoutStep>()
        .ok()
        .and_then(|step| step.next())
        .map(|step| step.to_string())
}

/// Whether the wizard may jump from one step to another
#[wasm_bindgen]
pub fn can_move_checkout(from: &str, to: &str) -> bool {
    match (from.parse::<CheckoutStep>(), to.parse::<CheckoutStep>()) {
        (Ok(from), Ok(to)) => from.can_move_to(to),
        _ => false,
    }
}

#[wasm_bindgen]
pub fn delivery_address(street: &str, city: &str, reference: Option<String>) -> String {
    format_address(street, city, reference.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_cart() {
        let json = r#"[{"quantity": 2, "unit_price": "12.50"}, {"quantity": 1, "unit_price": "85.00"}]"#;
        let summary: serde_json::Value = serde_json::from_str(&summarize_cart(json).unwrap()).unwrap();

        assert_eq!(summary["total"], "110.00");
        assert_eq!(summary["item_count"], 3);
        assert_eq!(summary["subtotals"][0], "25.00");
    }

    #[test]
    fn test_summarize_cart_keeps_line_subtotals() {
        let json = r#"[{"quantity": 3, "unit_price": "7.25"}]"#;
        let summary: serde_json::Value = serde_json::from_str(&summarize_cart(json).unwrap()).unwrap();
        assert_eq!(summary["subtotals"][0], "21.75");
        assert_eq!(summary["total"], "21.75");
    }

    #[test]
    fn test_summarize_rejects_overflowing_counts() {
        let lines = [
            LineInput {
                quantity: i32::MAX,
                unit_price: Decimal::ONE,
            },
            LineInput {
                quantity: 1,
                unit_price: Decimal::ONE,
            },
        ];
        assert!(summarize(&lines).is_err());

        let pricey = [
            LineInput {
                quantity: 2,
                unit_price: Decimal::MAX,
            },
        ];
        assert!(summarize(&pricey).is_err());
    }

    #[test]
    fn test_pick_stock_warehouse() {
        let json = r#"[
            {"warehouse_id": "6f1c2a9e-8d4b-4c3a-9b1e-2f5d7a8c9e01", "warehouse_name": "Central", "quantity": 4},
            {"warehouse_id": "0b7e4d2c-1a3f-4e5b-8c6d-9f0a1b2c3d4e", "warehouse_name": "Norte", "quantity": 30}
        ]"#;
        assert_eq!(
            pick_stock_warehouse(json, 5).unwrap().as_deref(),
            Some("0b7e4d2c-1a3f-4e5b-8c6d-9f0a1b2c3d4e")
        );
        assert_eq!(pick_stock_warehouse(json, 31).unwrap(), None);
    }

    #[test]
    fn test_check_availability() {
        assert_eq!(check_availability(2, 5), None);
        assert!(check_availability(6, 5).unwrap().contains("Insufficient stock"));
        assert!(check_availability(0, 5).is_some());
    }

    #[test]
    fn test_validate_card_on() {
        let json = r#"{"holder_name": "Ana Quispe", "number": "4242 4242 4242 4242", "expiry_month": 8, "expiry_year": 2027, "cvv": "123"}"#;
        assert_eq!(validate_card_on(json, 2026, 10, 18).unwrap(), "4242");
    }

    #[test]
    fn test_checkout_navigation() {
        assert_eq!(next_checkout_step("summary").as_deref(), Some("address"));
        assert_eq!(next_checkout_step("processed"), None);
        assert!(can_move_checkout("confirm", "address"));
        assert!(!can_move_checkout("address", "confirm"));
        assert!(!can_move_checkout("address", "shipping"));
    }

    #[test]
    fn test_contact_checks() {
        assert!(is_valid_phone("+591 71234567"));
        assert!(!is_valid_phone("12345"));
        assert!(is_valid_document("4587123 LP"));
        assert!(is_valid_email("cliente@tienda.bo"));
        assert_eq!(
            delivery_address("Av. Busch 410", "Santa Cruz", Some("Casa azul".to_string())),
            "Av. Busch 410, Santa Cruz (Casa azul)"
        );
    }
}
