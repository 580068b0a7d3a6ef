//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the client.

use uuid::Uuid;

/// Generate a new idempotency key
pub fn generate_idempotency_key() -> String {
    Uuid::new_v4().to_string()
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a fee for display, e.g. `25.00 USD`
pub fn format_amount(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency.to_uppercase())
}

/// Compare two money amounts to the cent
pub fn amounts_match(a: f64, b: f64) -> bool {
    (a * 100.0).round() == (b * 100.0).round()
}

/// Mask all but the last four digits of a card number
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    let visible = digits.len().min(4);
    let last: String = digits[digits.len() - visible..].iter().collect();
    format!("**** {}", last)
}
