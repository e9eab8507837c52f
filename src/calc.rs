//! GST totals for estimates and invoices.
//!
//! Amounts travel as `f64` on the wire. Everything here is computed in
//! `Decimal` and only rounded to paise when stored or displayed.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CalcError;
use crate::model::Line;

const DECIMAL_PLACES: u32 = 2;

/// Upper bounds for a single line (₹100 crore unit price, 10 lakh units).
const MAX_PRICE: f64 = 1_000_000_000.0;
const MAX_QUANTITY: f64 = 1_000_000.0;
/// GST slabs never exceed this.
const MAX_TAX_PERCENT: f64 = 100.0;

/// Discount and tax percentages applied to a document.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Rates {
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub cgst_percent: f64,
    #[serde(default)]
    pub sgst_percent: f64,
    #[serde(default)]
    pub igst_percent: f64,
}

impl Rates {
    pub fn validate(&self) -> Result<(), CalcError> {
        require_amount(self.discount_percent, "discount")?;
        require_bounded(self.cgst_percent, "CGST", MAX_TAX_PERCENT)?;
        require_bounded(self.sgst_percent, "SGST", MAX_TAX_PERCENT)?;
        require_bounded(self.igst_percent, "IGST", MAX_TAX_PERCENT)?;
        if self.discount_percent > 100.0 {
            return Err(CalcError::DiscountTooLarge(self.discount_percent));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub taxable: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub fn tax(&self) -> Decimal {
        self.cgst + self.sgst + self.igst
    }
}

#[inline]
fn require_amount(value: f64, field: &'static str) -> Result<(), CalcError> {
    if !value.is_finite() {
        return Err(CalcError::NotFinite { field, value });
    }
    if value < 0.0 {
        return Err(CalcError::Negative { field, value });
    }
    Ok(())
}

#[inline]
fn require_bounded(value: f64, field: &'static str, max: f64) -> Result<(), CalcError> {
    require_amount(value, field)?;
    if value > max {
        return Err(CalcError::OutOfRange { field, value, max });
    }
    Ok(())
}

fn checked_mul(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, CalcError> {
    a.checked_mul(b).ok_or(CalcError::Overflow(what))
}

fn checked_add(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, CalcError> {
    a.checked_add(b).ok_or(CalcError::Overflow(what))
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn line_amount(line: &Line) -> Result<Decimal, CalcError> {
    require_bounded(line.quantity, "quantity", MAX_QUANTITY)?;
    require_bounded(line.price, "price", MAX_PRICE)?;
    checked_mul(to_decimal(line.quantity), to_decimal(line.price), "line amount")
}

/// Subtotal, discount, CGST/SGST/IGST and grand total for a set of lines.
pub fn compute(lines: &[Line], rates: &Rates) -> Result<Totals, CalcError> {
    rates.validate()?;

    let mut subtotal = Decimal::ZERO;
    for line in lines {
        subtotal = checked_add(subtotal, line_amount(line)?, "subtotal")?;
    }

    let percent = |p: f64| to_decimal(p) / Decimal::ONE_HUNDRED;

    let discount = checked_mul(subtotal, percent(rates.discount_percent), "discount")?;
    let taxable = subtotal - discount;
    let cgst = checked_mul(taxable, percent(rates.cgst_percent), "CGST")?;
    let sgst = checked_mul(taxable, percent(rates.sgst_percent), "SGST")?;
    let igst = checked_mul(taxable, percent(rates.igst_percent), "IGST")?;

    let mut total = taxable;
    for tax in [cgst, sgst, igst] {
        total = checked_add(total, tax, "total")?;
    }

    Ok(Totals {
        subtotal,
        discount,
        taxable,
        cgst,
        sgst,
        igst,
        total,
    })
}

/// Format an amount with Indian digit grouping, e.g. `12,34,567.80`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = round_money(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let grouped = if whole.len() > 3 {
        let (head, last_three) = whole.split_at(whole.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (left, pair) = rest.split_at(rest.len() - 2);
            groups.push(pair);
            rest = left;
        }
        groups.push(rest);
        groups.reverse();
        format!("{},{}", groups.join(","), last_three)
    } else {
        whole.to_string()
    };

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, fraction)
}
