//! WhatsApp share links for estimates and invoices.

use crate::calc::{Totals, format_amount};
use crate::document::Document;
use crate::model::Shop;

const WHATSAPP_BASE: &str = "https://wa.me/";
const COUNTRY_CODE: &str = "91";

/// Digits-only number with the Indian country code, or `None` when the input
/// has no usable digits.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0 => None,
        10 => Some(format!("{}{}", COUNTRY_CODE, digits)),
        11 if digits.starts_with('0') => Some(format!("{}{}", COUNTRY_CODE, &digits[1..])),
        _ => Some(digits),
    }
}

pub fn whatsapp_message(doc: &Document, totals: &Totals, shop: &Shop) -> String {
    let customer = doc.meta.customer.name.trim();
    let greeting = if customer.is_empty() {
        "Hello".to_string()
    } else {
        format!("Hello {}", customer)
    };
    format!(
        "{}, please find your {} {} dated {} for ₹{} from {}. Thank you!",
        greeting,
        doc.kind().title(),
        doc.number(),
        doc.date().format("%d/%m/%Y"),
        format_amount(totals.total),
        shop.name
    )
}

/// Without a phone number the link opens WhatsApp's contact picker.
pub fn whatsapp_link(phone: Option<&str>, message: &str) -> String {
    let target = phone.and_then(normalize_phone).unwrap_or_default();
    format!("{}{}?text={}", WHATSAPP_BASE, target, urlencoding::encode(message))
}
