pub mod paths;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, Utc};

use crate::{
    engine::CalculationResult,
    errors::BillingError,
    ledger::{self, HistoryRecord, HISTORY_HEADER},
};

const TMP_SUFFIX: &str = "tmp";

/// File-backed store for the history ledger, the clients and parties
/// registries, and the slip / range-report artifacts. Single writer assumed;
/// reads take a full snapshot of the ledger at call time.
pub struct HistoryStore {
    history_path: PathBuf,
    clients_json: PathBuf,
    clients_csv: PathBuf,
    parties_path: PathBuf,
    slips_dir: PathBuf,
    range_dir: PathBuf,
}

impl HistoryStore {
    /// Opens the store under the default application data directory.
    pub fn open_default() -> Result<Self, BillingError> {
        Self::open(paths::app_data_dir())
    }

    /// Opens the store rooted at an explicit base directory, creating the
    /// directory layout and seed files when absent.
    pub fn open(base: PathBuf) -> Result<Self, BillingError> {
        let store = Self {
            history_path: paths::history_file_in(&base),
            clients_json: paths::clients_json_in(&base),
            clients_csv: paths::clients_csv_in(&base),
            parties_path: paths::parties_csv_in(&base),
            slips_dir: paths::slips_dir_in(&base),
            range_dir: paths::range_reports_dir_in(&base),
        };
        fs::create_dir_all(&base)?;
        fs::create_dir_all(&store.slips_dir)?;
        fs::create_dir_all(&store.range_dir)?;
        store.ensure_seed_files()?;
        Ok(store)
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    fn ensure_seed_files(&self) -> Result<(), BillingError> {
        if !self.clients_json.exists() && !self.clients_csv.exists() {
            // First run: seed 20 placeholder clients.
            let defaults: BTreeMap<String, String> = (1..=20)
                .map(|i| (i.to_string(), format!("Client {:02}", i)))
                .collect();
            fs::write(&self.clients_json, serde_json::to_string_pretty(&defaults)?)?;
        }
        if !self.clients_csv.exists() {
            fs::write(&self.clients_csv, "client_no,client_name\n")?;
        }
        if !self.parties_path.exists() {
            fs::write(&self.parties_path, "party_name\n")?;
        }
        if !self.history_path.exists() {
            let mut writer = csv::Writer::from_path(&self.history_path)?;
            writer.write_record(HISTORY_HEADER)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Appends one finalized result to the history ledger, upgrading a
    /// legacy header first so the column set stays append-stable.
    pub fn append(&self, result: &CalculationResult, party_name: &str) -> Result<(), BillingError> {
        self.upgrade_legacy_header()?;
        let record = HistoryRecord::from_result(result, party_name, Utc::now());

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(HISTORY_HEADER)?;
        }
        writer.write_record(record.as_row())?;
        writer.flush()?;
        tracing::debug!(v_no = %record.v_no, "appended history row");
        Ok(())
    }

    /// Reads the whole ledger into canonical records. Historical header
    /// aliases are resolved once here, and rows predating the `party_name`
    /// column get an empty value for it.
    pub fn read_all(&self) -> Result<Vec<HistoryRecord>, BillingError> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.history_path)?;
        let headers = reader.headers()?.clone();
        let index = FieldIndex::new(&headers);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(index.canonical_record(&row));
        }
        Ok(records)
    }

    /// Removes duplicate rows in place and returns how many were dropped.
    /// The rewritten file always carries the canonical header.
    pub fn deduplicate(&self) -> Result<usize, BillingError> {
        let records = self.read_all()?;
        if records.is_empty() {
            return Ok(0);
        }
        let (kept, removed) = ledger::deduplicate(records);
        if removed == 0 {
            return Ok(0);
        }
        self.rewrite_history(&kept)?;
        tracing::info!(removed, "removed duplicate history rows");
        Ok(removed)
    }

    fn rewrite_history(&self, records: &[HistoryRecord]) -> Result<(), BillingError> {
        let tmp = tmp_path(&self.history_path);
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(HISTORY_HEADER)?;
            for record in records {
                writer.write_record(record.as_row())?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.history_path)?;
        Ok(())
    }

    /// Rewrites a pre-`party_name` history file with the new trailing
    /// column. Runs at most once per file; rows keep their values verbatim.
    fn upgrade_legacy_header(&self) -> Result<(), BillingError> {
        if !self.history_path.exists() || fs::metadata(&self.history_path)?.len() == 0 {
            return Ok(());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.history_path)?;
        let headers = reader.headers()?.clone();
        if headers.iter().any(|name| name == "party_name") {
            return Ok(());
        }

        let mut upgraded_header = headers.clone();
        upgraded_header.push_field("party_name");

        let tmp = tmp_path(&self.history_path);
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(&upgraded_header)?;
            for row in reader.records() {
                let mut row = row?;
                row.push_field("");
                writer.write_record(&row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.history_path)?;
        tracing::info!("upgraded history header with party_name column");
        Ok(())
    }

    /// Loads the client number to name map, preferring the JSON registry
    /// and falling back to CSV when JSON is absent or unreadable.
    pub fn load_clients(&self) -> Result<BTreeMap<u32, String>, BillingError> {
        let mut mapping = BTreeMap::new();
        if self.clients_json.exists() {
            if let Ok(data) = fs::read_to_string(&self.clients_json) {
                if let Ok(parsed) = serde_json::from_str::<BTreeMap<String, String>>(&data) {
                    for (number, name) in parsed {
                        let Ok(number) = number.trim().parse::<u32>() else {
                            continue;
                        };
                        let name = name.trim();
                        if number > 0 && !name.is_empty() {
                            mapping.insert(number, name.to_string());
                        }
                    }
                }
            }
        }
        if mapping.is_empty() && self.clients_csv.exists() {
            let mut reader = csv::Reader::from_path(&self.clients_csv)?;
            for row in reader.records() {
                let row = row?;
                let Some(number) = row.get(0).and_then(|s| s.trim().parse::<u32>().ok()) else {
                    continue;
                };
                let name = row.get(1).unwrap_or("").trim();
                if number > 0 && !name.is_empty() {
                    mapping.insert(number, name.to_string());
                }
            }
        }
        Ok(mapping)
    }

    /// Loads party names, unique case-insensitively, preserving file order.
    pub fn load_parties(&self) -> Result<Vec<String>, BillingError> {
        let mut parties = Vec::new();
        let mut seen = HashSet::new();
        if self.parties_path.exists() {
            let mut reader = csv::Reader::from_path(&self.parties_path)?;
            for row in reader.records() {
                let row = row?;
                let name = row.get(0).unwrap_or("").trim();
                if name.is_empty() || !seen.insert(name.to_lowercase()) {
                    continue;
                }
                parties.push(name.to_string());
            }
        }
        Ok(parties)
    }

    /// Appends a party name unless an equal name (ignoring case) exists.
    /// Returns whether a row was written.
    pub fn append_party_if_new(&self, name: &str) -> Result<bool, BillingError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let existing: HashSet<String> = self
            .load_parties()?
            .into_iter()
            .map(|p| p.to_lowercase())
            .collect();
        if existing.contains(&name.to_lowercase()) {
            return Ok(false);
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.parties_path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(["party_name"])?;
        }
        writer.write_record([name])?;
        writer.flush()?;
        Ok(true)
    }

    /// Deterministic artifact name for a slip, keyed by voucher number,
    /// date, and the abbreviated client name.
    pub fn slip_filename(result: &CalculationResult) -> String {
        format!(
            "VNo{}_{}_{}.txt",
            result.invoice_no,
            result.date.format("%Y%m%d"),
            shorten_client_name(&result.client_name).replace(' ', "")
        )
    }

    /// Saves the rendered slip unless an artifact with the same identity
    /// exists. Returns the path and whether a file was created.
    pub fn save_slip_if_new(
        &self,
        result: &CalculationResult,
        content: &str,
    ) -> Result<(PathBuf, bool), BillingError> {
        let path = self.slips_dir.join(Self::slip_filename(result));
        if path.exists() {
            return Ok((path, false));
        }
        fs::write(&path, content)?;
        Ok((path, true))
    }

    /// Deterministic artifact path for a voucher-range report.
    pub fn range_report_path(
        &self,
        party_name: &str,
        from_vno: i64,
        to_vno: i64,
        on_date: NaiveDate,
    ) -> PathBuf {
        self.range_dir.join(format!(
            "{}_V{}-{}_{}.txt",
            on_date.format("%Y%m%d"),
            from_vno,
            to_vno,
            sanitize_filename_component(party_name)
        ))
    }

    /// Saves a range report unless one with the same (party, window, date)
    /// identity exists. The body is prefixed with a provenance header.
    pub fn save_range_report_if_new(
        &self,
        party_name: &str,
        from_vno: i64,
        to_vno: i64,
        report_text: &str,
        on_date: NaiveDate,
    ) -> Result<(PathBuf, bool), BillingError> {
        let (lo, hi) = (from_vno.min(to_vno), from_vno.max(to_vno));
        let path = self.range_report_path(party_name, lo, hi, on_date);
        if path.exists() {
            return Ok((path, false));
        }
        let header = format!(
            "Party: {}\nRange: {}..{}\nSaved At (UTC): {}\n\n",
            party_name,
            lo,
            hi,
            Utc::now().format("%Y-%m-%dT%H:%M:%S")
        );
        fs::write(&path, format!("{header}{report_text}"))?;
        Ok((path, true))
    }
}

/// Maps canonical history field names to column positions, resolving the
/// header names older exports used.
struct FieldIndex {
    positions: HashMap<&'static str, usize>,
}

impl FieldIndex {
    fn new(headers: &csv::StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (position, name) in headers.iter().enumerate() {
            let canonical = canonical_field_name(name.trim());
            for field in HISTORY_HEADER {
                if field == canonical {
                    positions.entry(field).or_insert(position);
                }
            }
        }
        Self { positions }
    }

    fn value<'a>(&self, row: &'a csv::StringRecord, field: &str) -> &'a str {
        self.positions
            .get(field)
            .and_then(|&position| row.get(position))
            .unwrap_or("")
    }

    fn canonical_record(&self, row: &csv::StringRecord) -> HistoryRecord {
        HistoryRecord {
            date: self.value(row, "date").to_string(),
            v_no: self.value(row, "v_no").to_string(),
            client_no: self.value(row, "client_no").to_string(),
            client_name: self.value(row, "client_name").to_string(),
            total_nuts: self.value(row, "total_nuts").to_string(),
            waste: self.value(row, "waste").to_string(),
            remaining: self.value(row, "remaining").to_string(),
            price_each: self.value(row, "price_each").to_string(),
            gross: self.value(row, "gross").to_string(),
            tax: self.value(row, "tax").to_string(),
            labor: self.value(row, "labor").to_string(),
            final_amount: self.value(row, "final_amount").to_string(),
            created_at: self.value(row, "created_at").to_string(),
            party_name: self.value(row, "party_name").to_string(),
        }
    }
}

fn canonical_field_name(name: &str) -> &str {
    match name {
        "Name" => "client_name",
        "V.No." => "v_no",
        "Amount" => "final_amount",
        "Total" => "total_nuts",
        "Price" => "price_each",
        "Date" => "date",
        other => other,
    }
}

/// Abbreviates a client name for slip filenames: a single word is truncated
/// to 16 characters, otherwise first and last words are joined and truncated
/// to 24.
fn shorten_client_name(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => "Client".to_string(),
        [only] => only.chars().take(16).collect(),
        [first, .., last] => format!("{first}{last}").chars().take(24).collect(),
    }
}

/// Restricts a filename component to alphanumerics, `-` and `_`, collapsing
/// runs of `_` and trimming stray `.`/`_`. Empty input becomes "NA".
fn sanitize_filename_component(text: &str) -> String {
    let mut safe = String::new();
    for ch in text.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            safe.push(ch);
        } else {
            safe.push('_');
        }
    }
    while safe.contains("__") {
        safe = safe.replace("__", "_");
    }
    let trimmed = safe.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "NA".to_string()
    } else {
        trimmed.to_string()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_name_abbreviation() {
        assert_eq!(shorten_client_name(""), "Client");
        assert_eq!(shorten_client_name("Raghavendra"), "Raghavendra");
        assert_eq!(
            shorten_client_name("Venkataramanasubramanian"),
            "Venkataramanasub"
        );
        assert_eq!(shorten_client_name("Suresh Kumar"), "SureshKumar");
        assert_eq!(shorten_client_name("A B C"), "AC");
    }

    #[test]
    fn filename_components_are_sanitized() {
        assert_eq!(sanitize_filename_component("Sri Traders & Co."), "Sri_Traders_Co");
        assert_eq!(sanitize_filename_component("  "), "NA");
        assert_eq!(sanitize_filename_component("plain-name_1"), "plain-name_1");
    }

    #[test]
    fn alias_headers_resolve_to_canonical_fields() {
        let headers = csv::StringRecord::from(vec!["Date", "V.No.", "Name", "Amount"]);
        let index = FieldIndex::new(&headers);
        let row = csv::StringRecord::from(vec!["2025-08-10", "7", "Client 01", "100.00"]);
        let record = index.canonical_record(&row);
        assert_eq!(record.date, "2025-08-10");
        assert_eq!(record.v_no, "7");
        assert_eq!(record.client_name, "Client 01");
        assert_eq!(record.final_amount, "100.00");
        assert_eq!(record.party_name, "");
    }
}
