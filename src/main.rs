mod api;
mod calc;
mod config;
mod document;
mod error;
mod logging;
mod model;
mod render;
mod report;
mod search;
mod share;
mod wizard;
mod words;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local};
use clap::{CommandFactory, Parser, Subcommand};
use comfy_table::{Cell, Table};
use inquire::{Confirm, CustomType, InquireError, Password, PasswordDisplayMode};
use std::fs;
use tracing::{info, warn};

use crate::api::{Backend, HttpBackend};
use crate::calc::{format_amount, to_decimal};
use crate::config::{AppSettings, Session};
use crate::document::{Document, DocumentDraft, DocumentService, Numbering};
use crate::model::{DocumentType, NewLead, PaymentStatus};
use crate::render::{DocumentContext, Renderer};

#[derive(Parser)]
#[command(name = "gst-desk", about = "GST estimates and invoices for a small shop")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sales at a glance and the latest documents
    Dashboard,
    /// List estimates and invoices together
    Transactions {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List estimates
    Estimates {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List invoices
    Invoices {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Create a new estimate
    NewEstimate,
    /// Create a new tax invoice
    NewInvoice,
    /// Turn an estimate into an invoice
    Convert { id: Option<i64> },
    /// Mark an invoice as PAID
    Pay { id: Option<i64> },
    /// Revert an invoice to UNPAID
    Unpay { id: Option<i64> },
    /// Void an unpaid invoice
    Void { id: Option<i64> },
    /// Delete an estimate or invoice
    Delete { id: Option<i64> },
    /// Monthly and per-customer sales for a year
    Report {
        /// Year to summarize (defaults to current year)
        year: Option<i32>,
    },
    /// Write the HTML print preview and open it
    Preview { id: Option<i64> },
    /// Render and compile the PDF
    Pdf { id: Option<i64> },
    /// Share a document on WhatsApp
    Share { id: Option<i64> },
    /// Open output folder
    Open,
    /// List catalog items
    Items {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add a catalog item
    AddItem,
    /// Edit a catalog item
    EditItem { id: i64 },
    /// Remove a catalog item
    RemoveItem { id: i64 },
    /// List saved customers
    Customers {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Save a new customer
    AddCustomer,
    /// Show the shop profile
    Shop,
    /// Edit the shop profile
    EditShop,
    /// Configure backend URL, data directory and defaults
    Config,
    /// Store the access token and shop for this machine
    Login {
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        shop_id: Option<i64>,
    },
    /// Forget the stored session
    Logout,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    let cli = Cli::parse();

    let guard = match logging::init_logging(&config::log_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("⚠️  File logging disabled: {:#}", e);
            None
        }
    };

    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        return;
    };

    if let Err(e) = run(command) {
        if is_cancelled(&e) {
            println!("Cancelled");
            return;
        }
        eprintln!("❌ Error: {:#}", e);
        drop(guard);
        std::process::exit(1);
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

fn run(command: Commands) -> Result<()> {
    let settings_path = config::settings_path();

    if let Commands::Config = command {
        let current = config::load_settings(&settings_path)?;
        let settings = wizard::setup_config_wizard(current)?;
        config::save_settings(&settings_path, &settings)?;
        info!(path = %settings_path.display(), "Settings saved");
        println!("✅ Configuration saved to: {}", settings_path.display());
        return Ok(());
    }

    let mut settings = match config::load_settings(&settings_path)? {
        Some(settings) => settings,
        None => {
            println!("👋 No configuration found. Let's set things up first.");
            let settings = wizard::setup_config_wizard(None)?;
            config::save_settings(&settings_path, &settings)?;
            settings
        }
    };
    settings.apply_env_overrides();

    let command = match command {
        Commands::Login { token, shop_id } => return login(&settings, token, shop_id),
        Commands::Logout => return logout(),
        Commands::Open => return open_output(&settings),
        other => other,
    };

    let app = App::connect(settings)?;
    match command {
        Commands::Dashboard => app.dashboard(),
        Commands::Transactions { search } => app.list_documents(None, search),
        Commands::Estimates { search } => app.list_documents(Some(DocumentType::Estimate), search),
        Commands::Invoices { search } => app.list_documents(Some(DocumentType::Invoice), search),
        Commands::NewEstimate => app.new_document(DocumentType::Estimate),
        Commands::NewInvoice => app.new_document(DocumentType::Invoice),
        Commands::Convert { id } => app.convert(id),
        Commands::Pay { id } => app.change_status(id, PaymentStatus::Paid),
        Commands::Unpay { id } => app.change_status(id, PaymentStatus::Unpaid),
        Commands::Void { id } => app.change_status(id, PaymentStatus::Void),
        Commands::Delete { id } => app.delete(id),
        Commands::Report { year } => app.report(year),
        Commands::Preview { id } => app.preview(id),
        Commands::Pdf { id } => app.pdf(id),
        Commands::Share { id } => app.share(id),
        Commands::Items { search } => app.list_items(search),
        Commands::AddItem => app.add_item(),
        Commands::EditItem { id } => app.edit_item(id),
        Commands::RemoveItem { id } => app.remove_item(id),
        Commands::Customers { search } => app.list_customers(search),
        Commands::AddCustomer => app.add_customer(),
        Commands::Shop => app.show_shop(),
        Commands::EditShop => app.edit_shop(),
        Commands::Config | Commands::Login { .. } | Commands::Logout | Commands::Open => Ok(()),
    }
}

// ==========================================
// Session & Local Commands
// ==========================================

fn login(settings: &AppSettings, token: Option<String>, shop_id: Option<i64>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => Password::new("Access Token:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()?,
    };
    let shop_id = match shop_id {
        Some(id) => id,
        None => CustomType::<i64>::new("Shop ID:")
            .with_error_message("Please enter a number")
            .prompt()?,
    };

    let backend = HttpBackend::new(&settings.api_url, Some(token.clone()), settings.timeout_secs)?;
    let shop = backend
        .get_shop(shop_id)
        .context("Could not verify the token against the backend")?;

    let session = Session {
        token: Some(token),
        shop_id: Some(shop_id),
    };
    config::save_session(&config::session_path(), &session)?;
    info!(shop_id, "Logged in");
    println!("✅ Logged in to {} (shop #{})", shop.name, shop_id);
    Ok(())
}

fn logout() -> Result<()> {
    config::clear_session(&config::session_path())?;
    info!("Logged out");
    println!("👋 Logged out.");
    Ok(())
}

fn open_output(settings: &AppSettings) -> Result<()> {
    let output_dir = settings.root().join("output");
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    println!("📂 Opening {}", output_dir.display());
    render::open_path(&output_dir);
    Ok(())
}

fn money(value: f64) -> String {
    format!("₹{}", format_amount(to_decimal(value)))
}

// ==========================================
// Backend Commands
// ==========================================

struct App {
    settings: AppSettings,
    backend: HttpBackend,
    shop_id: i64,
}

impl App {
    fn connect(settings: AppSettings) -> Result<Self> {
        let mut session = config::load_session(&config::session_path())?;
        session.apply_env_overrides();
        let (Some(token), Some(shop_id)) = (session.token, session.shop_id) else {
            bail!("Not logged in. Run `gst-desk login` first.");
        };
        let backend = HttpBackend::new(&settings.api_url, Some(token), settings.timeout_secs)?;
        Ok(Self {
            settings,
            backend,
            shop_id,
        })
    }

    fn documents(&self) -> DocumentService<'_, HttpBackend> {
        DocumentService::new(
            &self.backend,
            self.shop_id,
            Numbering {
                estimate_prefix: self.settings.estimate_prefix.clone(),
                invoice_prefix: self.settings.invoice_prefix.clone(),
            },
        )
    }

    /// Use `id` when given, otherwise let the user pick from `candidates`.
    fn pick_document(
        &self,
        id: Option<i64>,
        message: &str,
        candidates: impl Fn(&Document) -> bool,
    ) -> Result<Document> {
        let service = self.documents();
        if let Some(id) = id {
            return Ok(service.get(id)?);
        }
        println!("🔍 Loading documents...");
        let docs = service.list()?;
        let matching: Vec<&Document> = docs.iter().filter(|&d| candidates(d)).collect();
        let booking_id = wizard::select_document(&matching, message)?;
        match docs.into_iter().find(|d| d.booking_id == booking_id) {
            Some(doc) => Ok(doc),
            None => bail!("Document #{} not found", booking_id),
        }
    }

    fn renderer(&self) -> Result<Renderer> {
        let template_dir = self.settings.root().join("templates");
        match Renderer::from_dir(&template_dir) {
            Ok(renderer) => Ok(renderer),
            Err(e) => {
                warn!(dir = %template_dir.display(), error = %e, "Using built-in templates");
                println!("⚠️  Could not load templates from {}, using built-in ones.", template_dir.display());
                Ok(Renderer::embedded()?)
            }
        }
    }

    // --- Dashboard & lists ---

    fn dashboard(&self) -> Result<()> {
        let docs = self.documents().list()?;
        let summary = report::summarize(&docs, Local::now().date_naive());
        let recent: Vec<&Document> = docs.iter().take(5).collect();
        report::print_dashboard(&summary, &recent);
        Ok(())
    }

    fn list_documents(&self, kind: Option<DocumentType>, query: Option<String>) -> Result<()> {
        let service = self.documents();
        let docs = match kind {
            Some(kind) => service.list_of(kind)?,
            None => service.list()?,
        };
        let shown = search::filter(&docs, query.as_deref().unwrap_or(""));

        let heading = match kind {
            Some(DocumentType::Estimate) => "Estimates",
            Some(DocumentType::Invoice) => "Invoices",
            None => "Transactions",
        };
        println!("\n--- {} ({}) ---", heading, shown.len());
        if shown.is_empty() {
            println!("No documents found.");
        } else {
            println!("{}", report::document_table(&shown));
        }
        Ok(())
    }

    fn report(&self, year: Option<i32>) -> Result<()> {
        let year = year.unwrap_or_else(|| Local::now().year());
        let docs = self.documents().list()?;
        report::print_year_report(&docs, year);
        Ok(())
    }

    // --- Creating documents ---

    fn new_document(&self, kind: DocumentType) -> Result<()> {
        let leads = self
            .backend
            .list_leads(self.shop_id)
            .context("Failed to load customers")?;
        let (customer, save_lead) = wizard::select_or_create_customer(&leads)?;
        if customer.name.is_empty() {
            println!("✅ Selected Customer: Walk-in");
        } else {
            println!("✅ Selected Customer: {}", customer.name);
        }

        let catalog = self
            .backend
            .list_items(self.shop_id)
            .context("Failed to load catalog")?;
        let lines = wizard::enter_line_items(&catalog)?;
        if lines.is_empty() {
            println!("❌ No items entered. Aborting.");
            return Ok(());
        }

        let date = wizard::ask_for_date(&format!("{} Date:", kind.title()))?;
        let due_date = match kind {
            DocumentType::Invoice => wizard::ask_for_due_date(date)?,
            DocumentType::Estimate => None,
        };
        let rates = wizard::ask_for_rates(self.settings.default_rates())?;
        let notes = wizard::ask_for_notes()?;

        let totals = calc::compute(&lines, &rates)?;
        println!("\n🧮 Total: ₹{} ({})", format_amount(totals.total), words::amount_in_words(totals.total));
        if !Confirm::new("Save this document?").with_default(true).prompt()? {
            println!("❌ Discarded.");
            return Ok(());
        }

        let draft = DocumentDraft {
            document_type: kind,
            date,
            due_date,
            customer,
            save_lead,
            lines,
            rates,
            notes,
            estimate_number: None,
        };
        let doc = self
            .documents()
            .create(draft)
            .with_context(|| format!("Failed to create {}", kind))?;
        println!("✅ Created {} {} (#{})", kind.title(), doc.number(), doc.booking_id);

        self.offer_pdf(&doc)
    }

    fn offer_pdf(&self, doc: &Document) -> Result<()> {
        if Confirm::new("Generate PDF now?").with_default(true).prompt()? {
            self.write_pdf(doc)?;
        }
        Ok(())
    }

    fn convert(&self, id: Option<i64>) -> Result<()> {
        let estimate = self.pick_document(id, "Select estimate to convert:", |d| {
            d.kind() == DocumentType::Estimate
        })?;
        let date = wizard::ask_for_date("Invoice Date:")?;
        let invoice = self
            .documents()
            .convert(estimate.booking_id, date)
            .with_context(|| format!("Failed to convert {}", estimate.number()))?;
        println!(
            "✅ {} converted to {} (#{})",
            estimate.number(),
            invoice.number(),
            invoice.booking_id
        );
        self.offer_pdf(&invoice)
    }

    // --- Status ---

    fn change_status(&self, id: Option<i64>, target: PaymentStatus) -> Result<()> {
        let from = match target {
            PaymentStatus::Paid | PaymentStatus::Void => PaymentStatus::Unpaid,
            PaymentStatus::Unpaid => PaymentStatus::Paid,
        };
        let prompt = format!("Select invoice to mark as {}:", target);
        let doc = self.pick_document(id, &prompt, |d| d.is_invoice() && d.status() == from)?;

        if target == PaymentStatus::Void {
            let ans = Confirm::new(&format!(
                "Are you sure you want to VOID {}? This cannot be undone.",
                doc.number()
            ))
            .with_default(false)
            .prompt()?;
            if !ans {
                println!("Cancelled");
                return Ok(());
            }
        }

        let updated = self.documents().set_status(doc.booking_id, target)?;
        println!("✅ {} marked as {}", updated.number(), updated.status());

        if Confirm::new("Update the PDF?").with_default(true).prompt()? {
            self.write_pdf(&updated)?;
        }
        Ok(())
    }

    /// With an id the booking is deleted even when it has no readable
    /// metadata, so leftovers of a failed create can be removed.
    fn delete(&self, id: Option<i64>) -> Result<()> {
        let (booking_id, label) = match id {
            Some(id) => (id, format!("booking #{}", id)),
            None => {
                let doc = self.pick_document(None, "Select document to delete:", |_| true)?;
                let label = format!(
                    "{} {} for {}",
                    doc.kind().title(),
                    doc.number(),
                    doc.meta.customer.name
                );
                (doc.booking_id, label)
            }
        };

        let ans = Confirm::new(&format!("Delete {}? This cannot be undone.", label))
            .with_default(false)
            .prompt()?;
        if !ans {
            println!("Cancelled");
            return Ok(());
        }
        self.documents().delete(booking_id)?;
        println!("🗑️  Deleted {}", label);
        Ok(())
    }

    // --- Output ---

    fn context_for(&self, doc: &Document) -> Result<DocumentContext> {
        let shop = self
            .backend
            .get_shop(self.shop_id)
            .context("Failed to load shop profile")?;
        Ok(DocumentContext::new(doc, &shop)?)
    }

    fn write_pdf(&self, doc: &Document) -> Result<()> {
        let ctx = self.context_for(doc)?;
        let pdf_path = render::write_pdf(&self.settings.root(), &self.renderer()?, doc, &ctx)?;
        println!("✅ PDF Generated: {}", pdf_path.display());
        render::open_and_reveal(&pdf_path);
        Ok(())
    }

    fn preview(&self, id: Option<i64>) -> Result<()> {
        let doc = self.pick_document(id, "Select document to preview:", |_| true)?;
        let ctx = self.context_for(&doc)?;
        let path = render::write_preview(&self.settings.root(), &self.renderer()?, &doc, &ctx)?;
        println!("✅ Preview saved: {}", path.display());
        render::open_path(&path);
        Ok(())
    }

    fn pdf(&self, id: Option<i64>) -> Result<()> {
        let doc = self.pick_document(id, "Select document for PDF:", |_| true)?;
        self.write_pdf(&doc)
    }

    fn share(&self, id: Option<i64>) -> Result<()> {
        let doc = self.pick_document(id, "Select document to share:", |_| true)?;
        let shop = self
            .backend
            .get_shop(self.shop_id)
            .context("Failed to load shop profile")?;
        let totals = doc.totals()?;
        let message = share::whatsapp_message(&doc, &totals, &shop);
        let link = share::whatsapp_link(doc.meta.customer.phone.as_deref(), &message);
        if doc.meta.customer.phone.is_none() {
            println!("ℹ️  No phone number saved, WhatsApp will ask for a contact.");
        }
        println!("💬 {}", link);
        render::open_path(&link);
        Ok(())
    }

    // --- Catalog ---

    fn list_items(&self, query: Option<String>) -> Result<()> {
        let items = self.backend.list_items(self.shop_id)?;
        let shown = search::filter(&items, query.as_deref().unwrap_or(""));

        println!("\n--- Catalog ({}) ---", shown.len());
        if shown.is_empty() {
            println!("No items found.");
            return Ok(());
        }
        let mut table = Table::new();
        table.set_header(vec!["ID", "Title", "Price", "Unit", "SKU"]);
        for item in shown {
            table.add_row(vec![
                Cell::new(item.id),
                Cell::new(&item.title),
                Cell::new(money(item.price)),
                Cell::new(item.unit.as_deref().unwrap_or("-")),
                Cell::new(item.sku.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    fn add_item(&self) -> Result<()> {
        let new_item = wizard::new_item_wizard(self.shop_id)?;
        let item = self.backend.create_item(&new_item)?;
        info!(item_id = item.id, "Catalog item created");
        println!("✅ Added {} (#{}) at {}", item.title, item.id, money(item.price));
        Ok(())
    }

    fn edit_item(&self, id: i64) -> Result<()> {
        let items = self.backend.list_items(self.shop_id)?;
        let Some(item) = items.iter().find(|i| i.id == id) else {
            bail!("Catalog item #{} not found", id);
        };
        let update = wizard::edit_item_wizard(item)?;
        let saved = self.backend.update_item(id, &update)?;
        info!(item_id = id, "Catalog item updated");
        println!("✅ Updated {} ({})", saved.title, money(saved.price));
        Ok(())
    }

    fn remove_item(&self, id: i64) -> Result<()> {
        let ans = Confirm::new(&format!("Remove catalog item #{}?", id))
            .with_default(false)
            .prompt()?;
        if !ans {
            println!("Cancelled");
            return Ok(());
        }
        self.backend.delete_item(id)?;
        info!(item_id = id, "Catalog item removed");
        println!("🗑️  Removed item #{}", id);
        Ok(())
    }

    // --- Customers & shop ---

    fn list_customers(&self, query: Option<String>) -> Result<()> {
        let leads = self.backend.list_leads(self.shop_id)?;
        let shown = search::filter(&leads, query.as_deref().unwrap_or(""));

        println!("\n--- Customers ({}) ---", shown.len());
        if shown.is_empty() {
            println!("No customers found.");
            return Ok(());
        }
        let mut table = Table::new();
        table.set_header(vec!["Name", "Phone", "Email", "GSTIN"]);
        for lead in shown {
            let c = &lead.customer;
            table.add_row(vec![
                Cell::new(&c.name),
                Cell::new(c.phone.as_deref().unwrap_or("-")),
                Cell::new(c.email.as_deref().unwrap_or("-")),
                Cell::new(c.gstin.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    fn add_customer(&self) -> Result<()> {
        let customer = wizard::create_customer_wizard()?;
        let lead = self.backend.create_lead(&NewLead {
            shop_id: self.shop_id,
            customer,
        })?;
        info!(lead_id = lead.id, "Customer saved");
        println!("✅ Saved customer {}", lead.customer.name);
        Ok(())
    }

    fn show_shop(&self) -> Result<()> {
        let shop = self.backend.get_shop(self.shop_id)?;
        let mut table = Table::new();
        table.add_row(vec!["Name", shop.name.as_str()]);
        for (label, value) in [
            ("Address", &shop.address),
            ("Phone", &shop.phone),
            ("Email", &shop.email),
            ("GSTIN", &shop.gstin),
            ("Bank Details", &shop.bank_info),
        ] {
            table.add_row(vec![label, value.as_deref().unwrap_or("-")]);
        }
        println!("\n--- Shop #{} ---", shop.id);
        println!("{table}");
        Ok(())
    }

    fn edit_shop(&self) -> Result<()> {
        let shop = self.backend.get_shop(self.shop_id)?;
        let update = wizard::shop_wizard(&shop)?;
        let saved = self.backend.update_shop(self.shop_id, &update)?;
        info!(shop_id = self.shop_id, "Shop profile updated");
        println!("✅ Shop profile saved for {}", saved.name);
        Ok(())
    }
}
