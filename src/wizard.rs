//! Interactive prompts.

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use inquire::{Confirm, CustomType, DateSelect, Select, Text};

use crate::calc::{Rates, format_amount, to_decimal};
use crate::config::AppSettings;
use crate::document::Document;
use crate::model::{CatalogItem, CatalogItemUpdate, Customer, Lead, Line, NewCatalogItem, Shop, ShopUpdate};
use crate::search;

const NEW_CUSTOMER_OPT: &str = "➕ Add New Customer";
const WALK_IN_OPT: &str = "🚶 Walk-in Customer";
const CUSTOM_LINE_OPT: &str = "✏️  Custom Line";
const DONE_OPT: &str = "✅ Done";

fn optional(input: String) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn amount_prompt(message: &str, default: Option<f64>) -> Result<f64> {
    let mut prompt = CustomType::<f64>::new(message)
        .with_error_message("Please enter a number")
        .with_validator(|v: &f64| {
            if v.is_finite() && *v >= 0.0 {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid(
                    "Must not be negative".into(),
                ))
            }
        });
    if let Some(d) = default {
        prompt = prompt.with_default(d);
    }
    Ok(prompt.prompt()?)
}

// ==========================================
// Settings
// ==========================================

pub fn setup_config_wizard(current: Option<AppSettings>) -> Result<AppSettings> {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = current.unwrap_or_default();

    let api_url = Text::new("Backend API URL:")
        .with_default(&current.api_url)
        .prompt()?;

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Root Data Directory")
        .pick_folder();

    let data_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        Text::new("Enter Root Data Directory:")
            .with_default(&current.data_root)
            .prompt()?
    };

    let default_cgst = amount_prompt("Default CGST %:", Some(current.default_cgst))?;
    let default_sgst = amount_prompt("Default SGST %:", Some(current.default_sgst))?;
    let estimate_prefix = Text::new("Estimate number prefix:")
        .with_default(&current.estimate_prefix)
        .prompt()?;
    let invoice_prefix = Text::new("Invoice number prefix:")
        .with_default(&current.invoice_prefix)
        .prompt()?;

    Ok(AppSettings {
        api_url: api_url.trim().to_string(),
        data_root,
        default_cgst,
        default_sgst,
        estimate_prefix: estimate_prefix.trim().to_string(),
        invoice_prefix: invoice_prefix.trim().to_string(),
        ..current
    })
}

pub fn shop_wizard(shop: &Shop) -> Result<ShopUpdate> {
    println!("\n--- Edit Shop Profile (Enter keeps the current value) ---");
    let ask = |label: &str, current: Option<&str>| -> Result<Option<String>> {
        let answer = Text::new(label)
            .with_default(current.unwrap_or(""))
            .prompt()?;
        let answer = optional(answer);
        Ok(if answer.as_deref() == current { None } else { answer })
    };

    Ok(ShopUpdate {
        name: ask("Shop Name:", Some(shop.name.as_str()))?,
        address: ask("Address:", shop.address.as_deref())?,
        phone: ask("Phone:", shop.phone.as_deref())?,
        email: ask("Email:", shop.email.as_deref())?,
        gstin: ask("GSTIN:", shop.gstin.as_deref())?,
        bank_info: ask("Bank Details:", shop.bank_info.as_deref())?,
    })
}

// ==========================================
// Customers
// ==========================================

/// Returns the customer and whether it still has to be saved as a lead.
pub fn select_or_create_customer(leads: &[Lead]) -> Result<(Customer, bool)> {
    let mut options = vec![NEW_CUSTOMER_OPT.to_string(), WALK_IN_OPT.to_string()];
    for lead in leads {
        options.push(lead_label(lead));
    }

    let choice = Select::new("Please Select Customer (Type to Filter):", options).prompt()?;
    if choice == NEW_CUSTOMER_OPT {
        return Ok((create_customer_wizard()?, true));
    }
    if choice == WALK_IN_OPT {
        let name = Text::new("Customer Name (Optional):").prompt()?;
        let phone = Text::new("Phone (Optional):").prompt()?;
        let customer = Customer {
            name: name.trim().to_string(),
            phone: optional(phone),
            ..Customer::default()
        };
        return Ok((customer, false));
    }

    match leads.iter().find(|l| lead_label(l) == choice) {
        Some(lead) => Ok((lead.customer.clone(), false)),
        None => bail!("Selected customer not found"),
    }
}

fn lead_label(lead: &Lead) -> String {
    match &lead.customer.phone {
        Some(phone) => format!("{} | {}", lead.customer.name, phone),
        None => lead.customer.name.clone(),
    }
}

pub fn create_customer_wizard() -> Result<Customer> {
    println!("\n--- Creating New Customer ---");
    let name = Text::new("Customer / Company Name:").prompt()?;
    if name.trim().is_empty() {
        bail!("Customer name is required");
    }
    let phone = Text::new("Phone (Optional):").prompt()?;
    let email = Text::new("Email (Optional):").prompt()?;
    let address = Text::new("Address (Optional):").prompt()?;
    let gstin = Text::new("GSTIN (Optional):").prompt()?;

    Ok(Customer {
        name: name.trim().to_string(),
        phone: optional(phone),
        email: optional(email),
        address: optional(address),
        gstin: optional(gstin).map(|g| g.to_uppercase()),
    })
}

// ==========================================
// Line items, tax and dates
// ==========================================

fn catalog_label(item: &CatalogItem) -> String {
    let unit = item.unit.as_deref().unwrap_or("unit");
    format!("{} | ₹{} / {}", item.title, format_amount(to_decimal(item.price)), unit)
}

/// Keeps the listed order for every option that contains the typed text.
fn option_score(input: &str, option: &str) -> Option<i64> {
    search::matches(input, &[option]).then_some(0)
}

pub fn enter_line_items(catalog: &[CatalogItem]) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    println!("\n--- Enter Line Items ---");

    loop {
        let mut options = vec![DONE_OPT.to_string(), CUSTOM_LINE_OPT.to_string()];
        options.extend(catalog.iter().map(catalog_label));

        let prompt = format!("Add item #{} (Type to Filter):", lines.len() + 1);
        let choice = Select::new(&prompt, options)
            .with_scorer(&|input: &str, _: &String, option: &str, _: usize| {
                option_score(input, option)
            })
            .prompt()?;

        if choice == DONE_OPT {
            break;
        }

        let line = if choice == CUSTOM_LINE_OPT {
            let title = Text::new("Description:").prompt()?;
            if title.trim().is_empty() {
                continue;
            }
            let unit = Text::new("Unit (Optional):").prompt()?;
            Line {
                item_id: None,
                title: title.trim().to_string(),
                quantity: amount_prompt("Quantity:", Some(1.0))?,
                price: amount_prompt("Rate (₹):", None)?,
                unit: optional(unit),
            }
        } else {
            let Some(item) = catalog.iter().find(|i| catalog_label(i) == choice) else {
                continue;
            };
            Line {
                item_id: Some(item.id),
                title: item.title.clone(),
                quantity: amount_prompt("Quantity:", Some(1.0))?,
                price: amount_prompt("Rate (₹):", Some(item.price))?,
                unit: item.unit.clone(),
            }
        };
        println!(
            "   + {} x {} = ₹{}",
            line.quantity,
            line.title,
            format_amount(to_decimal(line.quantity) * to_decimal(line.price))
        );
        lines.push(line);
    }
    Ok(lines)
}

pub fn ask_for_rates(defaults: Rates) -> Result<Rates> {
    let discount_percent = amount_prompt("Discount %:", Some(0.0))?;

    let apply_tax = Confirm::new("Add GST to Total?").with_default(true).prompt()?;
    if !apply_tax {
        return Ok(Rates {
            discount_percent,
            ..Rates::default()
        });
    }

    let supply = Select::new(
        "Place of Supply:",
        vec!["Within state (CGST + SGST)", "Other state (IGST)"],
    )
    .prompt()?;

    if supply.starts_with("Within") {
        Ok(Rates {
            discount_percent,
            cgst_percent: amount_prompt("CGST %:", Some(defaults.cgst_percent))?,
            sgst_percent: amount_prompt("SGST %:", Some(defaults.sgst_percent))?,
            igst_percent: 0.0,
        })
    } else {
        let igst_default = defaults.cgst_percent + defaults.sgst_percent;
        Ok(Rates {
            discount_percent,
            cgst_percent: 0.0,
            sgst_percent: 0.0,
            igst_percent: amount_prompt("IGST %:", Some(igst_default))?,
        })
    }
}

pub fn ask_for_date(message: &str) -> Result<NaiveDate> {
    Ok(DateSelect::new(message)
        .with_default(Local::now().date_naive())
        .prompt()?)
}

pub fn ask_for_due_date(date: NaiveDate) -> Result<Option<NaiveDate>> {
    if !Confirm::new("Set a due date?").with_default(false).prompt()? {
        return Ok(None);
    }
    let due = DateSelect::new("Due Date:")
        .with_default(date + chrono::Days::new(15))
        .with_min_date(date)
        .prompt()?;
    Ok(Some(due))
}

pub fn ask_for_notes() -> Result<Option<String>> {
    Ok(optional(Text::new("Notes (Optional):").prompt()?))
}

pub fn select_document(docs: &[&Document], message: &str) -> Result<i64> {
    if docs.is_empty() {
        bail!("No matching documents found");
    }
    let options: Vec<String> = docs
        .iter()
        .map(|d| {
            format!(
                "{} | {} | {} | #{}",
                d.number(),
                d.date().format("%d/%m/%Y"),
                d.meta.customer.name,
                d.booking_id
            )
        })
        .collect();

    let choice = Select::new(message, options.clone())
        .with_page_size(10)
        .prompt()?;
    let index = options.iter().position(|o| *o == choice).unwrap_or(0);
    Ok(docs[index].booking_id)
}

// ==========================================
// Catalog
// ==========================================

fn ask_images(current: &[String]) -> Result<Vec<String>> {
    let answer = Text::new("Image URLs (comma separated, Optional):")
        .with_default(&current.join(", "))
        .prompt()?;
    Ok(answer
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn new_item_wizard(shop_id: i64) -> Result<NewCatalogItem> {
    println!("\n--- Adding Catalog Item ---");
    let title = Text::new("Title:").prompt()?;
    if title.trim().is_empty() {
        bail!("Item title is required");
    }
    let price = amount_prompt("Price (₹):", None)?;
    let unit = Text::new("Unit (e.g. pcs, kg, box):").prompt()?;
    let sku = Text::new("SKU (Optional):").prompt()?;
    let images = ask_images(&[])?;

    Ok(NewCatalogItem {
        shop_id,
        title: title.trim().to_string(),
        price,
        unit: optional(unit),
        sku: optional(sku),
        images,
    })
}

pub fn edit_item_wizard(item: &CatalogItem) -> Result<CatalogItemUpdate> {
    println!("\n--- Editing {} (Enter keeps the current value) ---", item.title);
    let title = Text::new("Title:").with_default(&item.title).prompt()?;
    let price = amount_prompt("Price (₹):", Some(item.price))?;
    let unit = Text::new("Unit:")
        .with_default(item.unit.as_deref().unwrap_or(""))
        .prompt()?;
    let sku = Text::new("SKU:")
        .with_default(item.sku.as_deref().unwrap_or(""))
        .prompt()?;
    let images = ask_images(&item.images)?;

    let title = optional(title).filter(|t| *t != item.title);
    let unit = optional(unit).filter(|u| Some(u) != item.unit.as_ref());
    let sku = optional(sku).filter(|s| Some(s) != item.sku.as_ref());
    Ok(CatalogItemUpdate {
        title,
        price: if price != item.price { Some(price) } else { None },
        unit,
        sku,
        images: if images != item.images { Some(images) } else { None },
    })
}
