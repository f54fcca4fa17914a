use dirs::home_dir;
use std::{env, path::PathBuf};

const DEFAULT_DIR_NAME: &str = ".billing_core";
const HISTORY_FILE: &str = "history.csv";
const CLIENTS_JSON: &str = "clients.json";
const CLIENTS_CSV: &str = "clients.csv";
const PARTIES_CSV: &str = "parties.csv";
const CONFIG_FILE: &str = "config.json";
const SLIPS_DIR: &str = "slips";
const RANGE_DIR: &str = "range_reports";

/// Returns the application data directory, defaulting to `~/.billing_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("BILLING_CORE_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn history_file_in(base: &std::path::Path) -> PathBuf {
    base.join(HISTORY_FILE)
}

pub fn clients_json_in(base: &std::path::Path) -> PathBuf {
    base.join(CLIENTS_JSON)
}

pub fn clients_csv_in(base: &std::path::Path) -> PathBuf {
    base.join(CLIENTS_CSV)
}

pub fn parties_csv_in(base: &std::path::Path) -> PathBuf {
    base.join(PARTIES_CSV)
}

pub fn config_file_in(base: &std::path::Path) -> PathBuf {
    base.join(CONFIG_FILE)
}

pub fn slips_dir_in(base: &std::path::Path) -> PathBuf {
    base.join(SLIPS_DIR)
}

pub fn range_reports_dir_in(base: &std::path::Path) -> PathBuf {
    base.join(RANGE_DIR)
}
