//! Print preview (HTML) and PDF (Typst) output for documents.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use slug::slugify;
use tera::{Context, Tera};
use tracing::info;

use crate::calc::{format_amount, line_amount, to_decimal};
use crate::document::Document;
use crate::error::RenderError;
use crate::model::{Customer, PaymentStatus, Shop};
use crate::words::amount_in_words;

// Embed templates at compile time to ensure availability
const HTML_TEMPLATE: &str = include_str!("../templates/document.html");
const TYPST_TEMPLATE: &str = include_str!("../templates/document.typ");

#[derive(Serialize)]
pub struct LineRow {
    pub index: usize,
    pub title: String,
    pub quantity: String,
    pub unit: String,
    pub price: String,
    pub amount: String,
}

#[derive(Serialize)]
pub struct DocumentContext {
    pub title: String,
    pub number: String,
    pub estimate_reference: Option<String>,
    pub date: String,
    pub due_date: Option<String>,
    pub shop: Shop,
    pub customer: Customer,
    pub lines: Vec<LineRow>,
    pub subtotal: String,
    pub discount_percent: String,
    pub discount: String,
    pub taxable: String,
    pub cgst_percent: String,
    pub cgst: String,
    pub sgst_percent: String,
    pub sgst: String,
    pub igst_percent: String,
    pub igst: String,
    pub total: String,
    pub amount_in_words: String,
    pub notes: Option<String>,
    pub is_invoice: bool,
    pub is_paid: bool,
    pub is_void: bool,
}

/// `9` rather than `9.0`, `2.5` stays as is.
fn plain_number(value: f64) -> String {
    format!("{}", value)
}

impl DocumentContext {
    pub fn new(doc: &Document, shop: &Shop) -> Result<Self, RenderError> {
        let totals = doc.totals()?;
        let meta = &doc.meta;

        let mut lines = Vec::with_capacity(doc.lines.len());
        for (i, line) in doc.lines.iter().enumerate() {
            lines.push(LineRow {
                index: i + 1,
                title: line.title.clone(),
                quantity: plain_number(line.quantity),
                unit: line.unit.clone().unwrap_or_default(),
                price: format_amount(to_decimal(line.price)),
                amount: format_amount(line_amount(line)?),
            });
        }

        // Converted invoices point back at their estimate.
        let estimate_reference = if doc.is_invoice() {
            meta.estimate_number.clone()
        } else {
            None
        };

        Ok(Self {
            title: meta.document_type.title().to_string(),
            number: doc.number().to_string(),
            estimate_reference,
            date: meta.date.format("%d/%m/%Y").to_string(),
            due_date: meta.due_date.map(|d| d.format("%d/%m/%Y").to_string()),
            shop: shop.clone(),
            customer: meta.customer.clone(),
            lines,
            subtotal: format_amount(totals.subtotal),
            discount_percent: plain_number(meta.rates.discount_percent),
            discount: format_amount(totals.discount),
            taxable: format_amount(totals.taxable),
            cgst_percent: plain_number(meta.rates.cgst_percent),
            cgst: format_amount(totals.cgst),
            sgst_percent: plain_number(meta.rates.sgst_percent),
            sgst: format_amount(totals.sgst),
            igst_percent: plain_number(meta.rates.igst_percent),
            igst: format_amount(totals.igst),
            total: format_amount(totals.total),
            amount_in_words: amount_in_words(totals.total),
            notes: meta.notes.clone(),
            is_invoice: doc.is_invoice(),
            is_paid: doc.status() == PaymentStatus::Paid,
            is_void: doc.status() == PaymentStatus::Void,
        })
    }
}

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Built-in templates only.
    pub fn embedded() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("document.html", HTML_TEMPLATE),
            ("document.typ", TYPST_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    /// Templates from `template_dir`, seeded with the built-in ones on first
    /// use so they can be customised.
    pub fn from_dir(template_dir: &Path) -> Result<Self, RenderError> {
        fs::create_dir_all(template_dir).map_err(|e| RenderError::io(template_dir, e))?;
        let mut files = Vec::with_capacity(2);
        for (name, body) in [("document.html", HTML_TEMPLATE), ("document.typ", TYPST_TEMPLATE)] {
            let path = template_dir.join(name);
            if !path.exists() {
                println!("✨ Initializing default template {}...", name);
                fs::write(&path, body).map_err(|e| RenderError::io(&path, e))?;
            }
            files.push((path, Some(name)));
        }

        let mut tera = Tera::default();
        tera.add_template_files(files)?;
        Ok(Self { tera })
    }

    pub fn html(&self, ctx: &DocumentContext) -> Result<String, RenderError> {
        Ok(self.tera.render("document.html", &Context::from_serialize(ctx)?)?)
    }

    pub fn typst(&self, ctx: &DocumentContext) -> Result<String, RenderError> {
        Ok(self.tera.render("document.typ", &Context::from_serialize(ctx)?)?)
    }
}

/// `<root>/output/<year>/<customer-slug>`
pub fn output_dir(root: &Path, doc: &Document) -> PathBuf {
    let customer = slugify(&doc.meta.customer.name);
    let customer = if customer.is_empty() { "walk-in".to_string() } else { customer };
    root.join("output")
        .join(doc.date().format("%Y").to_string())
        .join(customer)
}

fn file_base(doc: &Document) -> String {
    let base = slugify(doc.number());
    if base.is_empty() { format!("booking-{}", doc.booking_id) } else { base }
}

fn write_file(path: &Path, content: &str) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RenderError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| RenderError::io(path, e))
}

/// Write the HTML print preview and return its path.
pub fn write_preview(
    root: &Path,
    renderer: &Renderer,
    doc: &Document,
    ctx: &DocumentContext,
) -> Result<PathBuf, RenderError> {
    let path = output_dir(root, doc).join(format!("{}.html", file_base(doc)));
    write_file(&path, &renderer.html(ctx)?)?;
    info!(path = %path.display(), "Preview written");
    Ok(path)
}

/// Render Typst source next to the preview and compile it to PDF.
pub fn write_pdf(
    root: &Path,
    renderer: &Renderer,
    doc: &Document,
    ctx: &DocumentContext,
) -> Result<PathBuf, RenderError> {
    let dir = output_dir(root, doc);
    let typ_path = dir.join(format!("{}.typ", file_base(doc)));
    let pdf_path = dir.join(format!("{}.pdf", file_base(doc)));

    write_file(&typ_path, &renderer.typst(ctx)?)?;
    compile_pdf(&typ_path, &pdf_path)?;
    info!(path = %pdf_path.display(), "PDF written");
    Ok(pdf_path)
}

pub fn compile_pdf(typ_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
    if Command::new("typst").arg("--version").output().is_err() {
        return Err(RenderError::TypstMissing);
    }

    println!("\n🔨 Compiling PDF...");
    match Command::new("typst")
        .arg("compile")
        .arg(typ_path)
        .arg(pdf_path)
        .status()
    {
        Ok(s) if s.success() => Ok(()),
        _ => Err(RenderError::CompileFailed(typ_path.to_path_buf())),
    }
}

/// Open file and reveal it in Finder/Explorer
pub fn open_and_reveal(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg("-R").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer")
        .arg(format!("/select,{}", path.to_string_lossy()))
        .spawn()
        .ok();

    open_path(path);
}

/// Hand a file, folder or URL to the desktop.
pub fn open_path(target: impl AsRef<std::ffi::OsStr>) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg(target.as_ref()).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(target.as_ref()).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(target.as_ref()).spawn().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::Rates;
    use crate::model::{DocumentMeta, DocumentType, Line};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn shop() -> Shop {
        Shop {
            id: 1,
            name: "Sharma & Sons Hardware".to_string(),
            address: Some("12 MG Road, Pune".to_string()),
            phone: Some("020-5550100".to_string()),
            email: None,
            gstin: Some("27AAAPS1234C1Z9".to_string()),
            bank_info: Some("HDFC 0001 IFSC HDFC0000001".to_string()),
        }
    }

    fn document(kind: DocumentType, status: PaymentStatus) -> Document {
        Document {
            booking_id: 7,
            created_at: 0,
            meta_item_id: 70,
            meta: DocumentMeta {
                document_type: kind,
                estimate_number: Some("EST-0004".to_string()),
                invoice_number: Some("INV-0011".to_string()),
                date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
                due_date: None,
                customer: Customer {
                    name: "Asha <Traders>".to_string(),
                    phone: Some("9876543210".to_string()),
                    ..Customer::default()
                },
                rates: Rates {
                    discount_percent: 0.0,
                    cgst_percent: 9.0,
                    sgst_percent: 9.0,
                    igst_percent: 0.0,
                },
                status,
                notes: Some("Delivery within 3 days".to_string()),
            },
            lines: vec![Line {
                item_id: None,
                title: "Door \"Premium\" hinge".to_string(),
                quantity: 4.0,
                price: 250.0,
                unit: Some("pcs".to_string()),
            }],
        }
    }

    #[test]
    fn test_context_values() {
        let doc = document(DocumentType::Invoice, PaymentStatus::Paid);
        let ctx = DocumentContext::new(&doc, &shop()).unwrap();

        assert_eq!(ctx.title, "Tax Invoice");
        assert_eq!(ctx.number, "INV-0011");
        assert_eq!(ctx.estimate_reference.as_deref(), Some("EST-0004"));
        assert_eq!(ctx.date, "03/02/2026");
        assert_eq!(ctx.lines[0].quantity, "4");
        assert_eq!(ctx.lines[0].amount, "1,000.00");
        assert_eq!(ctx.cgst, "90.00");
        assert_eq!(ctx.cgst_percent, "9");
        assert_eq!(ctx.total, "1,180.00");
        assert_eq!(ctx.amount_in_words, "Rupees One Thousand One Hundred Eighty Only");
        assert!(ctx.is_paid);
        assert!(!ctx.is_void);
    }

    #[test]
    fn test_estimate_has_no_reference() {
        let doc = document(DocumentType::Estimate, PaymentStatus::Unpaid);
        let ctx = DocumentContext::new(&doc, &shop()).unwrap();
        assert_eq!(ctx.title, "Estimate");
        assert_eq!(ctx.number, "EST-0004");
        assert!(ctx.estimate_reference.is_none());
    }

    #[test]
    fn test_html_escapes_and_contains_totals() {
        let renderer = Renderer::embedded().unwrap();
        let doc = document(DocumentType::Invoice, PaymentStatus::Unpaid);
        let html = renderer.html(&DocumentContext::new(&doc, &shop()).unwrap()).unwrap();

        assert!(html.contains("Tax Invoice"));
        assert!(html.contains("INV-0011"));
        assert!(html.contains("1,180.00"));
        assert!(html.contains("Asha &lt;Traders&gt;"));
        assert!(html.contains("Rupees One Thousand One Hundred Eighty Only"));
        assert!(html.contains("CGST (9%)"));
        assert!(!html.contains("9.0%"));
        assert!(!html.contains("Discount ("));
        assert!(!html.contains("PAID"));
    }

    #[test]
    fn test_typst_quotes_strings() {
        let renderer = Renderer::embedded().unwrap();
        let doc = document(DocumentType::Invoice, PaymentStatus::Void);
        let typ = renderer.typst(&DocumentContext::new(&doc, &shop()).unwrap()).unwrap();

        assert!(typ.contains(r#""Door \"Premium\" hinge""#));
        assert!(typ.contains("is_void: true"));
        assert!(typ.contains("cgst_percent: 9,"));
        assert!(typ.contains("igst_percent: 0,"));
        assert!(typ.contains(r#""1,180.00""#));
    }

    #[test]
    fn test_from_dir_seeds_templates_and_writes_preview() {
        let dir = tempdir().unwrap();
        let renderer = Renderer::from_dir(&dir.path().join("templates")).unwrap();
        assert!(dir.path().join("templates/document.html").exists());
        assert!(dir.path().join("templates/document.typ").exists());

        let doc = document(DocumentType::Estimate, PaymentStatus::Unpaid);
        let ctx = DocumentContext::new(&doc, &shop()).unwrap();
        let path = write_preview(dir.path(), &renderer, &doc, &ctx).unwrap();

        assert_eq!(
            path,
            dir.path().join("output/2026/asha-traders/est-0004.html")
        );
        assert!(fs::read_to_string(path).unwrap().contains("Estimate"));
    }

    #[test]
    fn test_from_dir_uses_customised_templates() {
        let dir = tempdir().unwrap();
        let template_dir = dir.path().join("templates");
        fs::create_dir_all(&template_dir).unwrap();
        fs::write(
            template_dir.join("document.html"),
            "<h1>{{ shop.name }} / {{ number }} / {{ total }}</h1>",
        )
        .unwrap();

        let renderer = Renderer::from_dir(&template_dir).unwrap();
        let doc = document(DocumentType::Invoice, PaymentStatus::Unpaid);
        let ctx = DocumentContext::new(&doc, &shop()).unwrap();

        let html = renderer.html(&ctx).unwrap();
        assert!(html.starts_with("<h1>"));
        assert!(html.contains("INV-0011 / 1,180.00"));
        // The missing Typst template is seeded and loaded alongside.
        assert!(template_dir.join("document.typ").exists());
        assert!(renderer.typst(&ctx).unwrap().contains(r#"number: "INV-0011""#));
    }
}
