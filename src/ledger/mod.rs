use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::engine::CalculationResult;

/// Marker returned when a voucher window matches no history rows.
pub const NO_VOUCHERS_FOUND: &str = "No vouchers found in this range";

/// Column order of the history ledger. `party_name` is the newest column and
/// is filled with an empty default when reading legacy files.
pub const HISTORY_HEADER: [&str; 14] = [
    "date",
    "v_no",
    "client_no",
    "client_name",
    "total_nuts",
    "waste",
    "remaining",
    "price_each",
    "gross",
    "tax",
    "labor",
    "final_amount",
    "created_at",
    "party_name",
];

/// One persisted history row in canonical shape. Every field is text: the
/// ledger is a field-name to text-value mapping, and deduplication keys on
/// the textual rendering of amounts, not their numeric value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: String,
    pub v_no: String,
    pub client_no: String,
    pub client_name: String,
    pub total_nuts: String,
    pub waste: String,
    pub remaining: String,
    pub price_each: String,
    pub gross: String,
    pub tax: String,
    pub labor: String,
    pub final_amount: String,
    pub created_at: String,
    #[serde(default)]
    pub party_name: String,
}

impl HistoryRecord {
    /// Flattens a calculation result into the text projection stored on disk.
    pub fn from_result(
        result: &CalculationResult,
        party_name: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            date: result.date.format("%Y-%m-%d").to_string(),
            v_no: result.invoice_no.clone(),
            client_no: result.client_no.to_string(),
            client_name: result.client_name.clone(),
            total_nuts: result.total_nuts.to_string(),
            waste: result.waste_nuts.to_string(),
            remaining: result.remaining_nuts.to_string(),
            price_each: format!("{:.2}", result.price_each),
            gross: format!("{:.2}", result.gross_amount),
            tax: format!("{:.2}", result.tax_amount),
            labor: format!("{:.2}", result.labor_charges),
            final_amount: format!("{:.2}", result.final_amount),
            created_at: created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            party_name: party_name.trim().to_string(),
        }
    }

    /// Row values in [`HISTORY_HEADER`] order.
    pub fn as_row(&self) -> [&str; 14] {
        [
            &self.date,
            &self.v_no,
            &self.client_no,
            &self.client_name,
            &self.total_nuts,
            &self.waste,
            &self.remaining,
            &self.price_each,
            &self.gross,
            &self.tax,
            &self.labor,
            &self.final_amount,
            &self.created_at,
            &self.party_name,
        ]
    }

    fn dedup_key(&self) -> (String, String, String) {
        (
            self.client_name.trim().to_lowercase(),
            self.v_no.trim().to_string(),
            self.final_amount.trim().to_string(),
        )
    }
}

/// Drops history rows whose (client name, voucher number, final amount text)
/// key was already seen. The first occurrence in insertion order wins and the
/// relative order of kept rows is preserved.
///
/// The final amount is compared as trimmed text, so "100.0" and "100.00" are
/// distinct keys. Existing stored data relies on this.
pub fn deduplicate(records: Vec<HistoryRecord>) -> (Vec<HistoryRecord>, usize) {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    let mut removed = 0;
    for record in records {
        if seen.insert(record.dedup_key()) {
            kept.push(record);
        } else {
            removed += 1;
        }
    }
    (kept, removed)
}

/// Builds the aligned voucher-range report over the given history snapshot.
///
/// The window is normalized so from <= to; rows whose voucher number is not
/// an integer are silently skipped; matches are sorted ascending by voucher
/// number (stable, so equal numbers keep ledger order). Returns
/// [`NO_VOUCHERS_FOUND`] when nothing matches.
pub fn build_range_report(records: &[HistoryRecord], from_vno: i64, to_vno: i64) -> String {
    let (lo, hi) = if from_vno <= to_vno {
        (from_vno, to_vno)
    } else {
        (to_vno, from_vno)
    };

    let mut matches: Vec<(i64, &HistoryRecord)> = records
        .iter()
        .filter_map(|record| {
            record
                .v_no
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|v| (lo..=hi).contains(v))
                .map(|v| (v, record))
        })
        .collect();
    matches.sort_by_key(|(v_no, _)| *v_no);

    if matches.is_empty() {
        return NO_VOUCHERS_FOUND.to_string();
    }

    let entries: Vec<(String, String)> = matches
        .iter()
        .map(|(v_no, record)| {
            let label = format!("{} ({})", record.client_name.trim(), v_no);
            (label, format_report_amount(&record.final_amount))
        })
        .collect();

    let name_width = entries.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let amount_width = entries.iter().map(|(_, amount)| amount.len()).max().unwrap_or(0);
    let index_width = entries.len().to_string().len();

    entries
        .iter()
        .enumerate()
        .map(|(i, (label, amount))| {
            format!(
                "{:>iw$}. {:<nw$}  =  {:>aw$}",
                i + 1,
                label,
                amount,
                iw = index_width,
                nw = name_width,
                aw = amount_width,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a stored amount for the range report: Indian-grouped whole rupees
/// with the paise suffix only when non-zero. Unparseable amounts render as 0.
fn format_report_amount(raw: &str) -> String {
    let amount = raw.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO);
    let rupees = amount.trunc();
    let paise = ((amount - rupees) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(0)
        .abs();

    let mut text = format_indian_grouping(rupees.to_i64().unwrap_or(0));
    if paise != 0 {
        text.push_str(&format!(".{:02}", paise));
    }
    text
}

/// Indian numbering system: the last three digits form one group, the rest
/// split into groups of two (1545468 -> "15,45,468").
pub fn format_indian_grouping(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (mut rest, last3) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    while rest.len() > 2 {
        let (head, tail) = rest.split_at(rest.len() - 2);
        groups.insert(0, tail);
        rest = head;
    }
    if !rest.is_empty() {
        groups.insert(0, rest);
    }
    groups.push(last3);
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, v_no: &str, final_amount: &str) -> HistoryRecord {
        HistoryRecord {
            date: "2025-08-10".into(),
            v_no: v_no.into(),
            client_name: name.into(),
            final_amount: final_amount.into(),
            ..HistoryRecord::default()
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let records = vec![
            record("Client 01", "7", "100.00"),
            record(" client 01 ", "7", "100.00"),
            record("Client 01", "8", "100.00"),
        ];
        let (kept, removed) = deduplicate(records);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].client_name, "Client 01");
        assert_eq!(kept[0].v_no, "7");
        assert_eq!(kept[1].v_no, "8");
    }

    #[test]
    fn dedup_compares_amounts_as_text() {
        // "100.0" and "100.00" are numerically equal but textually distinct.
        let records = vec![
            record("Client 01", "7", "100.00"),
            record("Client 01", "7", "100.0"),
        ];
        let (kept, removed) = deduplicate(records);
        assert_eq!(removed, 0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn range_report_filters_and_sorts_by_voucher() {
        let records = vec![
            record("A", "5", "10.00"),
            record("B", "3", "20.00"),
            record("C", "9", "30.00"),
            record("D", "1", "40.00"),
        ];
        let report = build_range_report(&records, 2, 6);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("B (3)"));
        assert!(lines[1].contains("A (5)"));
    }

    #[test]
    fn range_report_normalizes_a_reversed_window() {
        let records = vec![record("A", "5", "10.00")];
        assert_eq!(
            build_range_report(&records, 6, 2),
            build_range_report(&records, 2, 6)
        );
    }

    #[test]
    fn range_report_skips_non_numeric_vouchers() {
        let records = vec![
            record("A", "abc", "10.00"),
            record("B", "4", "20.00"),
        ];
        let report = build_range_report(&records, 1, 10);
        assert_eq!(report.lines().count(), 1);
        assert!(report.contains("B (4)"));
    }

    #[test]
    fn empty_window_yields_marker() {
        let records = vec![record("A", "5", "10.00")];
        assert_eq!(build_range_report(&records, 100, 200), NO_VOUCHERS_FOUND);
        assert_eq!(build_range_report(&[], 1, 10), NO_VOUCHERS_FOUND);
    }

    #[test]
    fn report_columns_are_aligned() {
        let records = vec![
            record("Short", "1", "1545468.00"),
            record("A Much Longer Name", "2", "5.25"),
        ];
        let report = build_range_report(&records, 1, 2);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0].len(), lines[1].len());
        assert!(lines[0].starts_with("1. Short"));
        assert!(lines[0].ends_with("15,45,468"));
        assert!(lines[1].ends_with("5.25"));
        for line in &lines {
            assert!(line.contains("  =  "));
        }
    }

    #[test]
    fn equal_vouchers_keep_ledger_order() {
        let records = vec![
            record("First", "4", "1.00"),
            record("Second", "4", "2.00"),
        ];
        let report = build_range_report(&records, 4, 4);
        let lines: Vec<&str> = report.lines().collect();
        assert!(lines[0].contains("First"));
        assert!(lines[1].contains("Second"));
    }

    #[test]
    fn indian_grouping_examples() {
        assert_eq!(format_indian_grouping(0), "0");
        assert_eq!(format_indian_grouping(999), "999");
        assert_eq!(format_indian_grouping(1_000), "1,000");
        assert_eq!(format_indian_grouping(100_000), "1,00,000");
        assert_eq!(format_indian_grouping(1_545_468), "15,45,468");
        assert_eq!(format_indian_grouping(123_456_789), "12,34,56,789");
    }

    #[test]
    fn whole_rupee_amounts_omit_the_paise_suffix() {
        let records = vec![
            record("A", "1", "120146.40"),
            record("B", "2", "5000.00"),
        ];
        let report = build_range_report(&records, 1, 2);
        assert!(report.contains("1,20,146.40"));
        assert!(report.contains("5,000"));
        assert!(!report.contains("5,000.00"));
    }
}
