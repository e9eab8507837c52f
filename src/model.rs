use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::calc::Rates;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Customer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>, // tax id
}

/// Customer record saved on the backend under a shop.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Lead {
    pub id: i64,
    #[serde(default)]
    pub shop_id: i64,
    #[serde(flatten)]
    pub customer: Customer,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewLead {
    pub shop_id: i64,
    #[serde(flatten)]
    pub customer: Customer,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogItem {
    pub id: i64,
    #[serde(default)]
    pub shop_id: i64,
    pub title: String,
    pub price: f64,
    pub unit: Option<String>,
    pub sku: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewCatalogItem {
    pub shop_id: i64,
    pub title: String,
    pub price: f64,
    pub unit: Option<String>,
    pub sku: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct CatalogItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gstin: Option<String>,
    pub bank_info: Option<String>,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct ShopUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<String>,
}

/// Backend record holding either an estimate or an invoice.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Booking {
    pub id: i64,
    #[serde(default)]
    pub shop_id: i64,
    #[serde(default)]
    pub created_at: i64, // epoch millis
    #[serde(default)]
    pub total: f64,
    #[serde(default, alias = "_booking_item")]
    pub items: Vec<BookingItem>,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewBooking {
    pub shop_id: i64,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingItem {
    pub id: i64,
    pub booking_id: i64,
    pub item_id: Option<i64>,
    pub title: String,
    pub quantity: f64,
    pub price: f64,
    pub unit: Option<String>,
    #[serde(default)]
    pub meta: Option<Value>,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewBookingItem {
    pub booking_id: i64,
    pub item_id: Option<i64>,
    pub title: String,
    pub quantity: f64,
    pub price: f64,
    pub unit: Option<String>,
}

/// A line on an estimate or invoice.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Line {
    pub item_id: Option<i64>,
    pub title: String,
    pub quantity: f64,
    pub price: f64,
    pub unit: Option<String>,
}

impl From<&BookingItem> for Line {
    fn from(item: &BookingItem) -> Self {
        Line {
            item_id: item.item_id,
            title: item.title.clone(),
            quantity: item.quantity,
            price: item.price,
            unit: item.unit.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Estimate,
    Invoice,
}

impl DocumentType {
    pub fn title(self) -> &'static str {
        match self {
            DocumentType::Estimate => "Estimate",
            DocumentType::Invoice => "Tax Invoice",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Estimate => write!(f, "estimate"),
            DocumentType::Invoice => write!(f, "invoice"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Void,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "UNPAID"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Void => write!(f, "VOID"),
        }
    }
}

/// Document-level data. On the backend it lives in the `meta` field of the
/// booking's first item.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DocumentMeta {
    pub document_type: DocumentType,
    pub estimate_number: Option<String>,
    pub invoice_number: Option<String>,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub customer: Customer,
    #[serde(flatten)]
    pub rates: Rates,
    #[serde(default)]
    pub status: PaymentStatus,
    pub notes: Option<String>,
}

impl DocumentMeta {
    /// Number the document is known by: the invoice number for invoices,
    /// the estimate number otherwise.
    pub fn number(&self) -> &str {
        let number = match self.document_type {
            DocumentType::Estimate => self.estimate_number.as_deref(),
            DocumentType::Invoice => self.invoice_number.as_deref(),
        };
        number.unwrap_or("-")
    }
}
