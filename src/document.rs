//! Estimates and invoices on top of backend bookings.
//!
//! A booking is a document when its first item (lowest id) carries a
//! `DocumentMeta` in `meta`. That location is what the backend already
//! stores; inside the app the metadata is always the typed struct.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::Backend;
use crate::calc::{self, Rates, Totals};
use crate::error::{ApiError, CalcError, CreateStep, DocumentError};
use crate::model::{
    Booking, Customer, DocumentMeta, DocumentType, Line, NewBooking, NewBookingItem, NewLead,
    PaymentStatus,
};
use crate::search::Searchable;

#[derive(Debug, Clone)]
pub struct Document {
    pub booking_id: i64,
    pub created_at: i64,
    /// Booking item that carries the metadata.
    pub meta_item_id: i64,
    pub meta: DocumentMeta,
    pub lines: Vec<Line>,
}

impl Document {
    pub fn from_booking(booking: &Booking) -> Result<Self, DocumentError> {
        let mut items: Vec<_> = booking.items.iter().collect();
        items.sort_by_key(|i| i.id);

        let first = items
            .first()
            .ok_or(DocumentError::MissingMeta(booking.id))?;
        let raw = match &first.meta {
            Some(Value::Null) | None => return Err(DocumentError::MissingMeta(booking.id)),
            Some(raw) => raw,
        };
        let meta = decode_meta(raw).map_err(|source| DocumentError::InvalidMeta {
            booking_id: booking.id,
            source,
        })?;

        Ok(Document {
            booking_id: booking.id,
            created_at: booking.created_at,
            meta_item_id: first.id,
            meta,
            lines: items.iter().map(|i| Line::from(*i)).collect(),
        })
    }

    pub fn number(&self) -> &str {
        self.meta.number()
    }

    pub fn kind(&self) -> DocumentType {
        self.meta.document_type
    }

    pub fn is_invoice(&self) -> bool {
        self.kind() == DocumentType::Invoice
    }

    pub fn status(&self) -> PaymentStatus {
        self.meta.status
    }

    pub fn date(&self) -> NaiveDate {
        self.meta.date
    }

    pub fn totals(&self) -> Result<Totals, CalcError> {
        calc::compute(&self.lines, &self.meta.rates)
    }
}

impl Searchable for Document {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.meta.customer.name.as_str()];
        fields.extend(self.meta.estimate_number.as_deref());
        fields.extend(self.meta.invoice_number.as_deref());
        fields.extend(self.meta.customer.phone.as_deref());
        fields
    }
}

pub fn encode_meta(meta: &DocumentMeta) -> Result<Value, DocumentError> {
    serde_json::to_value(meta).map_err(DocumentError::Encode)
}

pub fn decode_meta(raw: &Value) -> Result<DocumentMeta, serde_json::Error> {
    // Some backends hand the JSON column back as a string.
    match raw {
        Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    }
}

/// Next number in the `<prefix>-NNNN` sequence, one past the highest in use.
pub fn next_number<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let pattern = format!(r"^{}-(\d+)$", regex::escape(prefix));
    let highest = Regex::new(&pattern)
        .map(|re| {
            existing
                .into_iter()
                .filter_map(|n| re.captures(n.trim()))
                .filter_map(|caps| caps[1].parse::<u64>().ok())
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    format!("{}-{:04}", prefix, highest.saturating_add(1))
}

#[derive(Debug, Clone)]
pub struct Numbering {
    pub estimate_prefix: String,
    pub invoice_prefix: String,
}

/// Everything needed to create an estimate or invoice.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub document_type: DocumentType,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub customer: Customer,
    /// Save the customer as a new lead once the document exists.
    pub save_lead: bool,
    pub lines: Vec<Line>,
    pub rates: Rates,
    pub notes: Option<String>,
    /// Estimate this invoice was converted from.
    pub estimate_number: Option<String>,
}

pub struct DocumentService<'a, B: Backend> {
    backend: &'a B,
    shop_id: i64,
    numbering: Numbering,
}

impl<'a, B: Backend> DocumentService<'a, B> {
    pub fn new(backend: &'a B, shop_id: i64, numbering: Numbering) -> Self {
        Self {
            backend,
            shop_id,
            numbering,
        }
    }

    /// All documents of the shop, newest first: by document date, then by
    /// when the booking was created. Bookings without readable metadata are
    /// skipped.
    pub fn list(&self) -> Result<Vec<Document>, DocumentError> {
        let bookings = self.backend.list_bookings(self.shop_id)?;
        let mut docs: Vec<Document> = bookings
            .iter()
            .filter_map(|b| match Document::from_booking(b) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(booking_id = b.id, error = %e, "Skipping booking");
                    None
                }
            })
            .collect();
        docs.sort_by(|a, b| {
            b.date()
                .cmp(&a.date())
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.booking_id.cmp(&a.booking_id))
        });
        Ok(docs)
    }

    pub fn list_of(&self, kind: DocumentType) -> Result<Vec<Document>, DocumentError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|d| d.kind() == kind)
            .collect())
    }

    pub fn get(&self, booking_id: i64) -> Result<Document, DocumentError> {
        let booking = self.backend.get_booking(booking_id)?;
        Document::from_booking(&booking)
    }

    fn allocate_number(&self, kind: DocumentType) -> Result<String, DocumentError> {
        let docs = self.list()?;
        let (prefix, numbers): (&str, Vec<&str>) = match kind {
            DocumentType::Estimate => (
                self.numbering.estimate_prefix.as_str(),
                docs.iter()
                    .filter_map(|d| d.meta.estimate_number.as_deref())
                    .collect(),
            ),
            DocumentType::Invoice => (
                self.numbering.invoice_prefix.as_str(),
                docs.iter()
                    .filter_map(|d| d.meta.invoice_number.as_deref())
                    .collect(),
            ),
        };
        Ok(next_number(prefix, numbers))
    }

    /// Create booking, add its items, write the metadata, save the lead.
    ///
    /// Runs serially without rollback: once the booking exists a failing
    /// step is reported as `DocumentError::Partial` and the booking is left
    /// on the backend. A failed lead save only logs a warning.
    pub fn create(&self, draft: DocumentDraft) -> Result<Document, DocumentError> {
        if draft.lines.is_empty() {
            return Err(DocumentError::Empty);
        }
        let totals = calc::compute(&draft.lines, &draft.rates)?;

        let number = self.allocate_number(draft.document_type)?;
        let (estimate_number, invoice_number) = match draft.document_type {
            DocumentType::Estimate => (Some(number), None),
            DocumentType::Invoice => (draft.estimate_number.clone(), Some(number)),
        };
        let meta = DocumentMeta {
            document_type: draft.document_type,
            estimate_number,
            invoice_number,
            date: draft.date,
            due_date: draft.due_date,
            customer: draft.customer.clone(),
            rates: draft.rates,
            status: PaymentStatus::Unpaid,
            notes: draft.notes.clone(),
        };
        let encoded = encode_meta(&meta)?;

        // 1. Booking
        let booking = self.backend.create_booking(&NewBooking {
            shop_id: self.shop_id,
            total: calc::to_f64(totals.total),
        })?;
        info!(booking_id = booking.id, number = meta.number(), "Booking created");

        let partial = |step: CreateStep, source: ApiError| {
            error!(booking_id = booking.id, %step, error = %source, "Document left incomplete");
            DocumentError::Partial {
                booking_id: booking.id,
                step,
                source,
            }
        };

        // 2. Line items
        let mut first_item_id = None;
        for line in &draft.lines {
            let item = self
                .backend
                .add_booking_item(&NewBookingItem {
                    booking_id: booking.id,
                    item_id: line.item_id,
                    title: line.title.clone(),
                    quantity: line.quantity,
                    price: line.price,
                    unit: line.unit.clone(),
                })
                .map_err(|e| partial(CreateStep::AddItems, e))?;
            if first_item_id.is_none() {
                first_item_id = Some(item.id);
            }
        }
        let Some(meta_item_id) = first_item_id else {
            return Err(DocumentError::Empty);
        };

        // 3. Metadata on the first item
        self.backend
            .update_booking_item_meta(meta_item_id, &encoded)
            .map_err(|e| partial(CreateStep::WriteMeta, e))?;

        // 4. Lead
        if draft.save_lead && !draft.customer.name.trim().is_empty() {
            let lead = NewLead {
                shop_id: self.shop_id,
                customer: draft.customer.clone(),
            };
            match self.backend.create_lead(&lead) {
                Ok(saved) => info!(lead_id = saved.id, "Lead saved"),
                Err(e) => warn!(booking_id = booking.id, error = %e, "Failed to save lead"),
            }
        }

        Ok(Document {
            booking_id: booking.id,
            created_at: booking.created_at,
            meta_item_id,
            meta,
            lines: draft.lines,
        })
    }

    /// New invoice with the lines and customer of an estimate.
    pub fn convert(&self, estimate_id: i64, date: NaiveDate) -> Result<Document, DocumentError> {
        let estimate = self.get(estimate_id)?;
        if estimate.kind() != DocumentType::Estimate {
            return Err(DocumentError::NotAnEstimate(estimate.number().to_string()));
        }

        let draft = DocumentDraft {
            document_type: DocumentType::Invoice,
            date,
            due_date: None,
            customer: estimate.meta.customer.clone(),
            save_lead: false,
            lines: estimate.lines.clone(),
            rates: estimate.meta.rates,
            notes: estimate.meta.notes.clone(),
            estimate_number: estimate.meta.estimate_number.clone(),
        };
        self.create(draft)
    }

    /// Move an invoice to `target`. Void invoices stay void and paid
    /// invoices cannot be voided.
    pub fn set_status(
        &self,
        booking_id: i64,
        target: PaymentStatus,
    ) -> Result<Document, DocumentError> {
        let mut doc = self.get(booking_id)?;
        if !doc.is_invoice() {
            return Err(DocumentError::NotAnInvoice(doc.number().to_string()));
        }

        let from = doc.status();
        let allowed = matches!(
            (from, target),
            (PaymentStatus::Unpaid, PaymentStatus::Paid)
                | (PaymentStatus::Paid, PaymentStatus::Unpaid)
                | (PaymentStatus::Unpaid, PaymentStatus::Void)
        );
        if !allowed {
            return Err(DocumentError::InvalidTransition {
                number: doc.number().to_string(),
                from,
                to: target,
            });
        }

        doc.meta.status = target;
        self.backend
            .update_booking_item_meta(doc.meta_item_id, &encode_meta(&doc.meta)?)?;
        info!(booking_id, number = doc.number(), status = %target, "Status changed");
        Ok(doc)
    }

    pub fn delete(&self, booking_id: i64) -> Result<(), DocumentError> {
        self.backend.delete_booking(booking_id)?;
        info!(booking_id, "Booking deleted");
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::api::memory::MemoryBackend;
    use crate::model::BookingItem;
    use crate::search;
    use serde_json::json;
    use std::str::FromStr;

    pub fn numbering() -> Numbering {
        Numbering {
            estimate_prefix: "EST".to_string(),
            invoice_prefix: "INV".to_string(),
        }
    }

    pub fn draft(kind: DocumentType, customer: &str) -> DocumentDraft {
        DocumentDraft {
            document_type: kind,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            due_date: None,
            customer: Customer {
                name: customer.to_string(),
                phone: Some("9876543210".to_string()),
                ..Customer::default()
            },
            save_lead: true,
            lines: vec![
                Line {
                    item_id: Some(1),
                    title: "Tiles".to_string(),
                    quantity: 10.0,
                    price: 50.0,
                    unit: Some("box".to_string()),
                },
                Line {
                    item_id: None,
                    title: "Labour".to_string(),
                    quantity: 1.0,
                    price: 500.0,
                    unit: None,
                },
            ],
            rates: Rates {
                discount_percent: 10.0,
                cgst_percent: 9.0,
                sgst_percent: 9.0,
                igst_percent: 0.0,
            },
            notes: None,
            estimate_number: None,
        }
    }

    #[test]
    fn test_next_number() {
        assert_eq!(next_number("INV", Vec::<&str>::new()), "INV-0001");
        assert_eq!(next_number("INV", ["INV-0001", "INV-0009", "INV-0003"]), "INV-0010");
        assert_eq!(next_number("INV", ["EST-0040", "INV-12", "junk"]), "INV-0013");
        assert_eq!(next_number("A.B", ["AxB-0005"]), "A.B-0001");
    }

    #[test]
    fn test_next_number_past_u32() {
        assert_eq!(next_number("INV", ["INV-4294967295"]), "INV-4294967296");
        assert_eq!(
            next_number("INV", ["INV-18446744073709551615"]),
            "INV-18446744073709551615"
        );
    }

    #[test]
    fn test_create_runs_full_sequence() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());

        let doc = service.create(draft(DocumentType::Invoice, "Asha Traders")).unwrap();
        assert_eq!(doc.number(), "INV-0001");
        assert_eq!(doc.totals().unwrap().total, rust_decimal::Decimal::from(1062));

        let bookings = backend.bookings.borrow();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].total, 1062.0);
        assert_eq!(bookings[0].items.len(), 2);
        assert!(bookings[0].items[0].meta.is_some());
        assert!(bookings[0].items[1].meta.is_none());
        assert_eq!(backend.leads.borrow().len(), 1);
    }

    #[test]
    fn test_created_document_reads_back() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        let created = service.create(draft(DocumentType::Estimate, "Ravi")).unwrap();

        let loaded = service.get(created.booking_id).unwrap();
        assert_eq!(loaded.meta, created.meta);
        assert_eq!(loaded.lines, created.lines);
        assert_eq!(loaded.number(), "EST-0001");
    }

    #[test]
    fn test_numbers_are_per_document_type() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        service.create(draft(DocumentType::Estimate, "A")).unwrap();
        service.create(draft(DocumentType::Estimate, "B")).unwrap();
        let invoice = service.create(draft(DocumentType::Invoice, "C")).unwrap();
        let estimate = service.create(draft(DocumentType::Estimate, "D")).unwrap();

        assert_eq!(invoice.number(), "INV-0001");
        assert_eq!(estimate.number(), "EST-0003");
        assert_eq!(service.list_of(DocumentType::Estimate).unwrap().len(), 3);
    }

    #[test]
    fn test_failed_item_is_partial_and_not_rolled_back() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        *backend.fail_on.borrow_mut() = Some("add_booking_item");

        let err = service.create(draft(DocumentType::Invoice, "Asha")).unwrap_err();
        match err {
            DocumentError::Partial { booking_id, step, .. } => {
                assert_eq!(step, CreateStep::AddItems);
                assert!(backend.bookings.borrow().iter().any(|b| b.id == booking_id));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(backend.leads.borrow().is_empty());
    }

    #[test]
    fn test_failed_meta_write_is_partial() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        *backend.fail_on.borrow_mut() = Some("update_booking_item_meta");

        let err = service.create(draft(DocumentType::Estimate, "Asha")).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Partial { step: CreateStep::WriteMeta, .. }
        ));

        // The half-written booking is not a document and is skipped.
        *backend.fail_on.borrow_mut() = None;
        assert_eq!(backend.bookings.borrow().len(), 1);
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn test_failed_lead_still_returns_document() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        *backend.fail_on.borrow_mut() = Some("create_lead");

        let doc = service.create(draft(DocumentType::Invoice, "Asha")).unwrap();
        assert_eq!(doc.number(), "INV-0001");
    }

    #[test]
    fn test_failed_booking_creates_nothing() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        *backend.fail_on.borrow_mut() = Some("create_booking");

        let err = service.create(draft(DocumentType::Invoice, "Asha")).unwrap_err();
        assert!(matches!(err, DocumentError::Api(_)));
        assert!(backend.bookings.borrow().is_empty());
    }

    #[test]
    fn test_empty_draft_rejected() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        let mut empty = draft(DocumentType::Invoice, "Asha");
        empty.lines.clear();
        assert!(matches!(service.create(empty), Err(DocumentError::Empty)));
    }

    #[test]
    fn test_convert_estimate_to_invoice() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        let estimate = service.create(draft(DocumentType::Estimate, "Ravi")).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();

        let invoice = service.convert(estimate.booking_id, today).unwrap();
        assert_eq!(invoice.kind(), DocumentType::Invoice);
        assert_eq!(invoice.number(), "INV-0001");
        assert_eq!(invoice.meta.estimate_number.as_deref(), Some("EST-0001"));
        assert_eq!(invoice.date(), today);
        assert_eq!(invoice.lines, estimate.lines);
        // Customer already saved by the estimate.
        assert_eq!(backend.leads.borrow().len(), 1);

        let again = service.convert(invoice.booking_id, today).unwrap_err();
        assert!(matches!(again, DocumentError::NotAnEstimate(n) if n == "INV-0001"));
    }

    #[test]
    fn test_status_transitions() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        let invoice = service.create(draft(DocumentType::Invoice, "Asha")).unwrap();
        let id = invoice.booking_id;

        assert_eq!(service.set_status(id, PaymentStatus::Paid).unwrap().status(), PaymentStatus::Paid);
        assert_eq!(service.get(id).unwrap().status(), PaymentStatus::Paid);
        assert!(matches!(
            service.set_status(id, PaymentStatus::Void),
            Err(DocumentError::InvalidTransition { .. })
        ));
        service.set_status(id, PaymentStatus::Unpaid).unwrap();
        service.set_status(id, PaymentStatus::Void).unwrap();
        assert!(matches!(
            service.set_status(id, PaymentStatus::Paid),
            Err(DocumentError::InvalidTransition { from: PaymentStatus::Void, .. })
        ));
    }

    #[test]
    fn test_estimates_have_no_payment_status() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        let estimate = service.create(draft(DocumentType::Estimate, "Asha")).unwrap();
        assert!(matches!(
            service.set_status(estimate.booking_id, PaymentStatus::Paid),
            Err(DocumentError::NotAnInvoice(_))
        ));
    }

    #[test]
    fn test_list_orders_same_day_documents_by_creation_time() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        let first = service.create(draft(DocumentType::Estimate, "Early")).unwrap();
        let second = service.create(draft(DocumentType::Estimate, "Late")).unwrap();

        // Backdated entry: created after the other one but with a lower id.
        for booking in backend.bookings.borrow_mut().iter_mut() {
            booking.created_at = if booking.id == first.booking_id { 2_000 } else { 1_000 };
        }

        let listed: Vec<i64> = service.list().unwrap().iter().map(|d| d.booking_id).collect();
        assert_eq!(listed, vec![first.booking_id, second.booking_id]);
    }

    #[test]
    fn test_search_documents() {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());
        let estimate = service.create(draft(DocumentType::Estimate, "Asha Traders")).unwrap();
        service.create(draft(DocumentType::Invoice, "Ravi Electricals")).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        service.convert(estimate.booking_id, today).unwrap();

        let docs = service.list().unwrap();
        let numbers = |query: &str| -> Vec<String> {
            let mut found: Vec<String> = search::filter(&docs, query)
                .iter()
                .map(|d| d.number().to_string())
                .collect();
            found.sort();
            found
        };

        assert_eq!(numbers("rAVI elec"), vec!["INV-0001"]);
        assert_eq!(numbers("inv-0002"), vec!["INV-0002"]);
        // The converted invoice still matches its estimate number.
        assert_eq!(numbers("EST-0001"), vec!["EST-0001", "INV-0002"]);
        assert_eq!(numbers("  "), vec!["EST-0001", "INV-0001", "INV-0002"]);
        assert!(numbers("nobody").is_empty());
    }

    #[test]
    fn test_meta_read_from_lowest_item_id_and_string_json() {
        let meta = json!({
            "document_type": "invoice",
            "estimate_number": null,
            "invoice_number": "INV-0042",
            "date": "2026-01-05",
            "due_date": null,
            "customer": { "name": "Meera", "phone": null, "email": null, "address": null, "gstin": "27ABCDE1234F1Z5" },
            "discount_percent": 0,
            "cgst_percent": 2.5,
            "sgst_percent": 2.5,
            "notes": null
        });
        let item = |id: i64, meta: Option<Value>| BookingItem {
            id,
            booking_id: 9,
            item_id: None,
            title: format!("item {id}"),
            quantity: 1.0,
            price: 100.0,
            unit: None,
            meta,
        };
        let booking = Booking {
            id: 9,
            shop_id: 1,
            created_at: 0,
            total: 105.0,
            items: vec![item(31, None), item(30, Some(Value::String(meta.to_string())))],
        };

        let doc = Document::from_booking(&booking).unwrap();
        assert_eq!(doc.meta_item_id, 30);
        assert_eq!(doc.number(), "INV-0042");
        assert_eq!(doc.status(), PaymentStatus::Unpaid);
        assert_eq!(doc.meta.rates.igst_percent, 0.0);
        assert_eq!(doc.lines[0].title, "item 30");
        assert_eq!(
            doc.totals().unwrap().total,
            rust_decimal::Decimal::from_str("210").unwrap()
        );
    }

    #[test]
    fn test_booking_without_meta_is_not_a_document() {
        let booking = Booking {
            id: 3,
            shop_id: 1,
            created_at: 0,
            total: 0.0,
            items: vec![],
        };
        assert!(matches!(
            Document::from_booking(&booking),
            Err(DocumentError::MissingMeta(3))
        ));
    }
}
