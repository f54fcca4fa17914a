use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::BillingError;

/// Fixed wastage deduction applied to the unit count before pricing (2.2%).
static WASTE_RATE: Lazy<Decimal> = Lazy::new(|| Decimal::new(22, 3));

/// Transaction tax applied to gross proceeds (1%).
static TAX_RATE: Lazy<Decimal> = Lazy::new(|| Decimal::new(1, 2));

/// Default labor (grader) rate when the caller does not override it.
pub fn default_labor_percent() -> Decimal {
    Decimal::from(11)
}

/// Validated input for one billing slip. Numeric fields are already parsed
/// by the calling boundary; the engine never receives free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub invoice_no: String,
    pub client_no: u32,
    pub client_name: String,
    pub total_nuts: i64,
    pub price_each: Decimal,
    pub date: NaiveDate,
    pub labor_percent: Decimal,
}

impl CalculationInput {
    /// Builds an input with the default labor percent.
    pub fn new(
        invoice_no: impl Into<String>,
        client_no: u32,
        client_name: impl Into<String>,
        total_nuts: i64,
        price_each: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            invoice_no: invoice_no.into(),
            client_no,
            client_name: client_name.into(),
            total_nuts,
            price_each,
            date,
            labor_percent: default_labor_percent(),
        }
    }

    pub fn with_labor_percent(mut self, labor_percent: Decimal) -> Self {
        self.labor_percent = labor_percent;
        self
    }
}

/// Fully derived slip figures. Constructed once by [`calculate`], never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub invoice_no: String,
    pub client_no: u32,
    pub client_name: String,
    pub date: NaiveDate,

    pub total_nuts: i64,
    pub price_each: Decimal,
    pub labor_percent: Decimal,

    pub waste_nuts: i64,
    pub remaining_nuts: i64,

    pub gross_amount: Decimal,
    pub tax_amount: Decimal,
    pub labor_charges: Decimal,
    pub final_amount: Decimal,
}

/// Derives every billing figure from a validated input.
///
/// Steps, in order:
/// - waste = 2.2% of total nuts, rounded to the nearest integer with
///   banker's rounding (an exact midpoint goes to the even neighbor)
/// - remaining = total - waste
/// - gross = remaining * price_each
/// - tax = 1% of gross
/// - labor = total_nuts * (labor_percent / 100), charged in rupees 1:1
/// - final = gross - tax - labor (may be negative, not clamped)
///
/// All monetary outputs are quantized to two decimal places with the same
/// half-even rule; unit counts stay plain integers.
pub fn calculate(input: &CalculationInput) -> Result<CalculationResult, BillingError> {
    if input.total_nuts <= 0 {
        return Err(BillingError::Validation(
            "total coconuts must be a positive integer".into(),
        ));
    }
    if input.price_each <= Decimal::ZERO {
        return Err(BillingError::Validation(
            "price per coconut must be a positive number".into(),
        ));
    }
    if input.invoice_no.is_empty() {
        return Err(BillingError::Validation(
            "V.No. (invoice number) must be a non-empty string".into(),
        ));
    }

    let waste_nuts = round_waste_half_even(input.total_nuts)?;
    let remaining_nuts = input.total_nuts - waste_nuts;

    let gross_amount = Decimal::from(remaining_nuts) * input.price_each;
    let tax_amount = gross_amount * *TAX_RATE;
    let labor_charges = Decimal::from(input.total_nuts) * (input.labor_percent / Decimal::ONE_HUNDRED);
    let final_amount = gross_amount - tax_amount - labor_charges;

    Ok(CalculationResult {
        invoice_no: input.invoice_no.clone(),
        client_no: input.client_no,
        client_name: input.client_name.clone(),
        date: input.date,
        total_nuts: input.total_nuts,
        price_each: quantize_money(input.price_each),
        labor_percent: input.labor_percent,
        waste_nuts,
        remaining_nuts,
        gross_amount: quantize_money(gross_amount),
        tax_amount: quantize_money(tax_amount),
        labor_charges: quantize_money(labor_charges),
        final_amount: quantize_money(final_amount),
    })
}

/// 2.2% of the unit count, rounded to the nearest integer with banker's
/// rounding. The half-even tie-break cancels rounding bias over many slips
/// instead of systematically favoring one party.
fn round_waste_half_even(total_nuts: i64) -> Result<i64, BillingError> {
    let raw = Decimal::from(total_nuts) * *WASTE_RATE;
    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .ok_or_else(|| BillingError::Validation("total coconut count out of range".into()))
}

/// Quantizes a monetary value to two decimal places, half-even.
pub fn quantize_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}
