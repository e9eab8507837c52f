//! Sales aggregation for the dashboard and the yearly report.
//!
//! Only invoices count as sales. Void invoices are left out entirely and
//! estimates are counted but never summed.

use chrono::{Datelike, NaiveDate};
use comfy_table::{Attribute, Cell, Color, Table};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

use crate::calc::{Totals, format_amount};
use crate::document::Document;
use crate::model::{DocumentType, PaymentStatus};

const PAID_COLOR: Color = Color::Rgb { r: 4, g: 120, b: 87 };
const UNPAID_COLOR: Color = Color::Rgb { r: 185, g: 28, b: 28 };

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesSummary {
    pub estimate_count: usize,
    pub invoice_count: usize,
    pub void_count: usize,
    pub invoiced: Decimal,
    pub paid: Decimal,
    pub unpaid: Decimal,
    pub tax: Decimal,
    pub today: Decimal,
    pub this_month: Decimal,
}

/// Paid and unpaid amounts for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Split {
    pub paid: Decimal,
    pub unpaid: Decimal,
}

impl Split {
    pub fn total(&self) -> Decimal {
        self.paid + self.unpaid
    }

    fn add(&mut self, status: PaymentStatus, amount: Decimal) {
        match status {
            PaymentStatus::Paid => self.paid += amount,
            PaymentStatus::Unpaid => self.unpaid += amount,
            PaymentStatus::Void => {}
        }
    }
}

/// Non-void invoices with their totals. Documents whose totals cannot be
/// computed are skipped.
fn sales(docs: &[Document]) -> impl Iterator<Item = (&Document, Totals)> {
    docs.iter()
        .filter(|d| d.is_invoice() && d.status() != PaymentStatus::Void)
        .filter_map(|d| match d.totals() {
            Ok(totals) => Some((d, totals)),
            Err(e) => {
                warn!(number = d.number(), error = %e, "Skipping invoice with bad amounts");
                None
            }
        })
}

pub fn summarize(docs: &[Document], today: NaiveDate) -> SalesSummary {
    let mut summary = SalesSummary {
        estimate_count: docs.iter().filter(|d| d.kind() == DocumentType::Estimate).count(),
        void_count: docs
            .iter()
            .filter(|d| d.is_invoice() && d.status() == PaymentStatus::Void)
            .count(),
        ..SalesSummary::default()
    };

    for (doc, totals) in sales(docs) {
        summary.invoice_count += 1;
        summary.invoiced += totals.total;
        summary.tax += totals.tax();
        match doc.status() {
            PaymentStatus::Paid => summary.paid += totals.total,
            _ => summary.unpaid += totals.total,
        }
        let date = doc.date();
        if date == today {
            summary.today += totals.total;
        }
        if date.year() == today.year() && date.month() == today.month() {
            summary.this_month += totals.total;
        }
    }
    summary
}

/// Sales per month of `year`, keyed by (year, month).
pub fn monthly(docs: &[Document], year: i32) -> BTreeMap<(i32, u32), Split> {
    let mut months: BTreeMap<(i32, u32), Split> = BTreeMap::new();
    for (doc, totals) in sales(docs).filter(|(d, _)| d.date().year() == year) {
        let date = doc.date();
        months
            .entry((date.year(), date.month()))
            .or_default()
            .add(doc.status(), totals.total);
    }
    months
}

/// Sales per customer for `year`, largest first.
pub fn by_customer(docs: &[Document], year: i32) -> Vec<(String, Split)> {
    let mut customers: BTreeMap<String, Split> = BTreeMap::new();
    for (doc, totals) in sales(docs).filter(|(d, _)| d.date().year() == year) {
        let name = doc.meta.customer.name.trim();
        let name = if name.is_empty() { "Walk-in Customer" } else { name };
        customers
            .entry(name.to_string())
            .or_default()
            .add(doc.status(), totals.total);
    }

    let mut ranked: Vec<_> = customers.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total().cmp(&a.1.total()));
    ranked
}

fn money(value: Decimal) -> String {
    format!("₹{}", format_amount(value))
}

fn colored(value: Decimal, color: Color) -> Cell {
    if value > Decimal::ZERO {
        Cell::new(money(value)).fg(color)
    } else {
        Cell::new(money(value))
    }
}

fn split_row(label: String, split: &Split) -> Vec<Cell> {
    vec![
        Cell::new(label),
        colored(split.paid, PAID_COLOR),
        colored(split.unpaid, UNPAID_COLOR),
        Cell::new(money(split.total())),
    ]
}

/// Table of documents for the list pages.
pub fn document_table(docs: &[&Document]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Number"),
        Cell::new("Type"),
        Cell::new("Date"),
        Cell::new("Customer"),
        Cell::new("Total"),
        Cell::new("Status"),
    ]);

    for doc in docs {
        let total = doc
            .totals()
            .map(|t| money(t.total))
            .unwrap_or_else(|_| "?".to_string());
        let status = if doc.is_invoice() {
            let cell = Cell::new(doc.status().to_string());
            match doc.status() {
                PaymentStatus::Paid => cell.fg(PAID_COLOR),
                PaymentStatus::Unpaid => cell.fg(UNPAID_COLOR),
                PaymentStatus::Void => cell.add_attribute(Attribute::CrossedOut),
            }
        } else {
            Cell::new("-")
        };
        table.add_row(vec![
            Cell::new(doc.booking_id),
            Cell::new(doc.number()),
            Cell::new(doc.kind().title()),
            Cell::new(doc.date().format("%d/%m/%Y")),
            Cell::new(&doc.meta.customer.name),
            Cell::new(total),
            status,
        ]);
    }
    table
}

pub fn print_dashboard(summary: &SalesSummary, recent: &[&Document]) {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Sales"), Cell::new("Amount")]);
    table.add_row(vec![Cell::new("Today"), Cell::new(money(summary.today))]);
    table.add_row(vec![Cell::new("This month"), Cell::new(money(summary.this_month))]);
    table.add_row(vec![
        Cell::new("Invoiced (all time)").add_attribute(Attribute::Bold),
        Cell::new(money(summary.invoiced)).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("Received"), colored(summary.paid, PAID_COLOR)]);
    table.add_row(vec![Cell::new("Outstanding"), colored(summary.unpaid, UNPAID_COLOR)]);
    table.add_row(vec![Cell::new("GST collected"), Cell::new(money(summary.tax))]);

    println!("\n--- Dashboard ---");
    println!(
        "🧾 {} invoices · 📝 {} estimates · 🚫 {} void",
        summary.invoice_count, summary.estimate_count, summary.void_count
    );
    println!("{table}");

    if !recent.is_empty() {
        println!("\n--- Recent Documents ---");
        println!("{}", document_table(recent));
    }
}

pub fn print_year_report(docs: &[Document], year: i32) {
    let months = monthly(docs, year);
    if months.is_empty() {
        println!("No invoices found for {}.", year);
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Month"),
        Cell::new("Paid"),
        Cell::new("Unpaid"),
        Cell::new("Total"),
    ]);

    let mut year_total = Split::default();
    for ((y, m), split) in months.iter().rev() {
        let month_str = NaiveDate::from_ymd_opt(*y, *m, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", y, m));
        table.add_row(split_row(month_str, split));
        year_total.paid += split.paid;
        year_total.unpaid += split.unpaid;
    }

    let total_row: Vec<Cell> = split_row(format!("Total ({})", year), &year_total)
        .into_iter()
        .map(|c| c.add_attribute(Attribute::Bold))
        .collect();
    table.add_row(total_row);

    println!("\n--- Monthly Sales Summary ({}) ---", year);
    println!("{table}");

    let mut client_table = Table::new();
    client_table.set_header(vec![
        Cell::new("Customer"),
        Cell::new("Paid"),
        Cell::new("Unpaid"),
        Cell::new("Total"),
    ]);
    for (customer, split) in by_customer(docs, year) {
        client_table.add_row(split_row(customer, &split));
    }

    println!("\n--- Customer Summary ({}) ---", year);
    println!("{client_table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryBackend;
    use crate::document::DocumentService;
    use crate::document::tests::{draft, numbering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Invoices of 1062 each unless noted.
    fn fixture() -> Vec<Document> {
        let backend = MemoryBackend::new();
        let service = DocumentService::new(&backend, 1, numbering());

        let mut paid = draft(DocumentType::Invoice, "Asha");
        paid.date = date(2026, 3, 14);
        let paid = service.create(paid).unwrap();
        service.set_status(paid.booking_id, PaymentStatus::Paid).unwrap();

        let mut unpaid = draft(DocumentType::Invoice, "Ravi");
        unpaid.date = date(2026, 3, 2);
        service.create(unpaid).unwrap();

        let mut older = draft(DocumentType::Invoice, "Asha");
        older.date = date(2026, 1, 20);
        service.create(older).unwrap();

        let mut void = draft(DocumentType::Invoice, "Ravi");
        void.date = date(2026, 3, 14);
        let void = service.create(void).unwrap();
        service.set_status(void.booking_id, PaymentStatus::Void).unwrap();

        let mut last_year = draft(DocumentType::Invoice, "Meera");
        last_year.date = date(2025, 12, 31);
        service.create(last_year).unwrap();

        let mut estimate = draft(DocumentType::Estimate, "Asha");
        estimate.date = date(2026, 3, 14);
        service.create(estimate).unwrap();

        service.list().unwrap()
    }

    #[test]
    fn test_summary_counts_and_totals() {
        let docs = fixture();
        let summary = summarize(&docs, date(2026, 3, 14));

        assert_eq!(summary.invoice_count, 4);
        assert_eq!(summary.estimate_count, 1);
        assert_eq!(summary.void_count, 1);
        assert_eq!(summary.invoiced, Decimal::from(4 * 1062));
        assert_eq!(summary.paid, Decimal::from(1062));
        assert_eq!(summary.unpaid, Decimal::from(3 * 1062));
        assert_eq!(summary.tax, Decimal::from(4 * 162));
        assert_eq!(summary.today, Decimal::from(1062));
        assert_eq!(summary.this_month, Decimal::from(2 * 1062));
    }

    #[test]
    fn test_monthly_buckets() {
        let docs = fixture();
        let months = monthly(&docs, 2026);

        assert_eq!(months.len(), 2);
        let march = months[&(2026, 3)];
        assert_eq!(march.paid, Decimal::from(1062));
        assert_eq!(march.unpaid, Decimal::from(1062));
        assert_eq!(months[&(2026, 1)].total(), Decimal::from(1062));
        assert!(monthly(&docs, 2024).is_empty());
    }

    #[test]
    fn test_customers_ranked_by_total() {
        let docs = fixture();
        let customers = by_customer(&docs, 2026);

        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].0, "Asha");
        assert_eq!(customers[0].1.total(), Decimal::from(2 * 1062));
        assert_eq!(customers[1].0, "Ravi");
        assert_eq!(customers[1].1.unpaid, Decimal::from(1062));
    }

    #[test]
    fn test_document_table_lists_every_row() {
        let docs = fixture();
        let refs: Vec<&Document> = docs.iter().collect();
        let rendered = document_table(&refs).to_string();
        assert!(rendered.contains("INV-0001"));
        assert!(rendered.contains("EST-0001"));
        assert!(rendered.contains("₹1,062.00"));
    }
}
