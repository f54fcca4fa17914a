use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::engine::CalculationResult;

/// Printable slip width in characters, matching the thermal roll.
const SLIP_WIDTH: usize = 40;
const LABEL_WIDTH: usize = 24;
const VALUE_WIDTH: usize = SLIP_WIDTH - LABEL_WIDTH;

/// Formats currency with western thousands separators and 2 decimals.
pub fn format_currency(value: Decimal) -> String {
    let unsigned = format!("{:.2}", value.abs());
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some(parts) => parts,
        None => (unsigned.as_str(), "00"),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < Decimal::ZERO { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Formats a date as DD-MMM-YYYY for the printed slip.
pub fn format_date_slip(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Formats a date as ISO YYYY-MM-DD for storage.
pub fn format_date_csv(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Renders the fixed-width pay slip: centered title, right-aligned date,
/// voucher and client rows, then labeled figure rows between separators and
/// a signature block at the bottom.
pub fn render_slip(title: &str, signature: &str, result: &CalculationResult) -> String {
    let separator = "-".repeat(SLIP_WIDTH);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("{:^width$}", title, width = SLIP_WIDTH));
    lines.push(format!(
        "{:>width$}",
        format_date_slip(result.date),
        width = SLIP_WIDTH - 1
    ));
    lines.push(" ".repeat(SLIP_WIDTH));
    lines.push(format!("V.No.: {}", result.invoice_no));
    lines.push(format!("Name: {}", result.client_name));
    lines.push(separator.clone());

    push_row(&mut lines, "Total Coconuts:", &result.total_nuts.to_string());
    push_row(&mut lines, "Less (2.2%):", &result.waste_nuts.to_string());
    push_row(&mut lines, "Remaining Nuts:", &result.remaining_nuts.to_string());
    push_row(
        &mut lines,
        "Price Each:",
        &format!("₹{}", format_currency(result.price_each)),
    );
    lines.push(separator.clone());

    push_row(
        &mut lines,
        "Gross Amt:",
        &format!("₹{}", format_currency(result.gross_amount)),
    );
    push_row(
        &mut lines,
        "Tax (1%):",
        &format!("₹{}", format_currency(result.tax_amount)),
    );
    push_row(
        &mut lines,
        "Grader Chg:",
        &format!("₹{}", format_currency(result.labor_charges)),
    );
    lines.push(separator.clone());

    push_row(
        &mut lines,
        "Final Pay:",
        &format!("₹{}", format_currency(result.final_amount)),
    );
    lines.push(separator);

    lines.push(String::new());
    lines.push(format!("{:>width$}", "Signature", width = SLIP_WIDTH));
    lines.push(format!("{:>width$}", signature, width = SLIP_WIDTH));

    lines.join("\n")
}

fn push_row(lines: &mut Vec<String>, label: &str, value: &str) {
    let label: String = label.chars().take(LABEL_WIDTH - 1).collect();
    lines.push(format!(
        "{:<lw$}{:>vw$}",
        label,
        value,
        lw = LABEL_WIDTH,
        vw = VALUE_WIDTH
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{calculate, CalculationInput};

    fn sample_result() -> CalculationResult {
        calculate(&CalculationInput::new(
            "001",
            1,
            "Client 01",
            5670,
            Decimal::from(22),
            NaiveDate::from_ymd_opt(2025, 8, 10).unwrap(),
        ))
        .unwrap()
    }

    #[test]
    fn currency_formatting_groups_thousands() {
        assert_eq!(format_currency(Decimal::new(12199000, 2)), "121,990.00");
        assert_eq!(format_currency(Decimal::new(62370, 2)), "623.70");
        assert_eq!(format_currency(Decimal::ZERO), "0.00");
        assert_eq!(format_currency(Decimal::new(-123456, 2)), "-1,234.56");
    }

    #[test]
    fn date_formats() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 10).unwrap();
        assert_eq!(format_date_slip(date), "10-Aug-2025");
        assert_eq!(format_date_csv(date), "2025-08-10");
    }

    #[test]
    fn slip_carries_every_labeled_row() {
        let slip = render_slip("COCONUT TRADERS", "(Owner)", &sample_result());
        for label in [
            "Total Coconuts:",
            "Less (2.2%):",
            "Remaining Nuts:",
            "Price Each:",
            "Gross Amt:",
            "Tax (1%):",
            "Grader Chg:",
            "Final Pay:",
        ] {
            assert!(slip.contains(label), "missing row {label}");
        }
        assert!(slip.contains("V.No.: 001"));
        assert!(slip.contains("Name: Client 01"));
        assert!(slip.contains("₹120,146.40"));
        assert!(slip.contains("10-Aug-2025"));
    }

    #[test]
    fn figure_rows_are_forty_columns() {
        let slip = render_slip("COCONUT TRADERS", "(Owner)", &sample_result());
        for line in slip.lines().filter(|l| l.contains('₹')) {
            assert_eq!(line.chars().count(), SLIP_WIDTH, "bad width: {line:?}");
        }
    }
}
