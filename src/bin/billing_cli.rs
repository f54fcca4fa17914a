use std::{env, process};

use billing_core::{
    config::ConfigManager,
    engine::{calculate, CalculationInput},
    errors::BillingError,
    init, ledger, render,
    storage::HistoryStore,
};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        print_usage();
        process::exit(1);
    };

    match command.as_str() {
        "slip" => cmd_slip(rest, SlipMode::Append)?,
        "save-slip" => cmd_slip(rest, SlipMode::SaveArtifact)?,
        "report" => cmd_report(rest)?,
        "dedup" => cmd_dedup()?,
        _ => {
            print_usage();
            process::exit(1);
        }
    }

    Ok(())
}

enum SlipMode {
    Append,
    SaveArtifact,
}

struct SlipArgs {
    v_no: String,
    client_no: u32,
    total_nuts: i64,
    price_each: Decimal,
    date: NaiveDate,
    labor_percent: Option<Decimal>,
    party_name: Option<String>,
    preview: bool,
}

fn cmd_slip(args: &[String], mode: SlipMode) -> Result<(), BillingError> {
    let parsed = parse_slip_args(args)?;

    let store = HistoryStore::open_default()?;
    let config = ConfigManager::new()?.load()?;

    let clients = store.load_clients()?;
    let client_name = clients.get(&parsed.client_no).cloned().ok_or_else(|| {
        BillingError::Lookup(format!(
            "client number {} not found in the clients registry",
            parsed.client_no
        ))
    })?;

    let input = CalculationInput {
        invoice_no: parsed.v_no,
        client_no: parsed.client_no,
        client_name,
        total_nuts: parsed.total_nuts,
        price_each: parsed.price_each,
        date: parsed.date,
        labor_percent: parsed
            .labor_percent
            .unwrap_or(config.labor_percent_default),
    };
    let result = calculate(&input)?;
    let slip = render::render_slip(&config.title, &config.signature, &result);
    println!("{slip}");

    match mode {
        SlipMode::SaveArtifact => {
            let (path, created) = store.save_slip_if_new(&result, &slip)?;
            if created {
                println!("Saved slip to {}", path.display());
            } else {
                println!("Already saved: {}", file_name(&path));
            }
        }
        SlipMode::Append => {
            if !parsed.preview {
                let party = parsed.party_name.as_deref().unwrap_or("");
                store.append(&result, party)?;
                if !party.is_empty() {
                    store.append_party_if_new(party)?;
                }
            }
        }
    }

    Ok(())
}

fn cmd_report(args: &[String]) -> Result<(), BillingError> {
    let (positional, flags) = split_flags(args)?;
    if positional.len() != 2 {
        return Err(BillingError::Format(
            "report expects <from_vno> <to_vno>".into(),
        ));
    }
    let from_vno = parse_integer(&positional[0], "From voucher number")?;
    let to_vno = parse_integer(&positional[1], "To voucher number")?;
    let party_name = flags.value("--party").map(str::to_string);
    let on_date = match flags.value("--date") {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let save = flags.is_set("--save");

    let store = HistoryStore::open_default()?;
    store.deduplicate()?;
    let records = store.read_all()?;
    let report = ledger::build_range_report(&records, from_vno, to_vno);
    println!("{report}");

    if save {
        let (path, created) = store.save_range_report_if_new(
            party_name.as_deref().unwrap_or(""),
            from_vno,
            to_vno,
            &report,
            on_date,
        )?;
        if created {
            println!("Saved report to {}", path.display());
        } else {
            println!("Already saved: {}", file_name(&path));
        }
    }

    Ok(())
}

fn cmd_dedup() -> Result<(), BillingError> {
    let store = HistoryStore::open_default()?;
    let removed = store.deduplicate()?;
    println!("Removed {removed} duplicate history rows");
    Ok(())
}

fn parse_slip_args(args: &[String]) -> Result<SlipArgs, BillingError> {
    let (positional, flags) = split_flags(args)?;
    if positional.len() != 4 {
        return Err(BillingError::Format(
            "slip expects <v_no> <client_no> <total_nuts> <price_each>".into(),
        ));
    }

    let v_no = positional[0].clone();
    let client_no = positional[1]
        .trim()
        .parse::<u32>()
        .map_err(|_| BillingError::Format("Client No. must be a non-negative integer".into()))?;
    let total_nuts = parse_positive_integer(&positional[2], "Total coconuts")?;
    let price_each = parse_positive_decimal(&positional[3], "Price each")?;
    let date = match flags.value("--date") {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let labor_percent = match flags.value("--labor") {
        Some(raw) => Some(parse_positive_decimal(raw, "Labor percent")?),
        None => None,
    };

    Ok(SlipArgs {
        v_no,
        client_no,
        total_nuts,
        price_each,
        date,
        labor_percent,
        party_name: flags.value("--party").map(str::to_string),
        preview: flags.is_set("--preview"),
    })
}

/// Splits arguments into positionals and `--flag [value]` pairs.
fn split_flags(args: &[String]) -> Result<(Vec<String>, Flags), BillingError> {
    const VALUE_FLAGS: [&str; 3] = ["--date", "--labor", "--party"];
    let mut positional = Vec::new();
    let mut flags = Flags::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if !arg.starts_with("--") {
            positional.push(arg.clone());
            continue;
        }
        if !VALUE_FLAGS.contains(&arg.as_str()) && !BOOL_FLAGS.contains(&arg.as_str()) {
            return Err(BillingError::Format(format!("unknown flag {arg}")));
        }
        if BOOL_FLAGS.contains(&arg.as_str()) {
            flags.set(arg.clone());
            continue;
        }
        let value = iter
            .next()
            .ok_or_else(|| BillingError::Format(format!("{arg} expects a value")))?;
        flags.insert(arg.clone(), value.clone());
    }
    Ok((positional, flags))
}

const BOOL_FLAGS: [&str; 2] = ["--preview", "--save"];

#[derive(Default)]
struct Flags {
    values: Vec<(String, String)>,
    switches: Vec<String>,
}

impl Flags {
    fn insert(&mut self, flag: String, value: String) {
        self.values.push((flag, value));
    }

    fn set(&mut self, flag: String) {
        self.switches.push(flag);
    }

    fn value(&self, flag: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == flag)
            .map(|(_, value)| value.as_str())
    }

    fn is_set(&self, flag: &str) -> bool {
        self.switches.iter().any(|name| name == flag)
    }
}

fn parse_positive_integer(value: &str, field_name: &str) -> Result<i64, BillingError> {
    let number = value
        .trim()
        .parse::<i64>()
        .map_err(|_| BillingError::Format(format!("{field_name} must be an integer")))?;
    if number <= 0 {
        return Err(BillingError::Format(format!("{field_name} must be > 0")));
    }
    Ok(number)
}

fn parse_integer(value: &str, field_name: &str) -> Result<i64, BillingError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| BillingError::Format(format!("{field_name} must be an integer")))
}

fn parse_positive_decimal(value: &str, field_name: &str) -> Result<Decimal, BillingError> {
    let number = value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| BillingError::Format(format!("{field_name} must be a number")))?;
    if number <= Decimal::ZERO {
        return Err(BillingError::Format(format!("{field_name} must be > 0")));
    }
    Ok(number)
}

/// Accepts the date formats the old slips were issued with.
fn parse_date(value: &str) -> Result<NaiveDate, BillingError> {
    for format in ["%Y-%m-%d", "%d-%m-%Y", "%d-%b-%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value.trim(), format) {
            return Ok(date);
        }
    }
    Err(BillingError::Format(
        "Invalid date. Use YYYY-MM-DD or DD-MM-YYYY (or DD-MMM-YYYY).".into(),
    ))
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

fn print_usage() {
    eprintln!(
        "Usage: billing_cli <command>\n\
         Commands:\n  \
         slip <v_no> <client_no> <total_nuts> <price_each> [--date D] [--labor P] [--party NAME] [--preview]\n  \
         save-slip <v_no> <client_no> <total_nuts> <price_each> [--date D] [--labor P]\n  \
         report <from_vno> <to_vno> [--party NAME] [--date D] [--save]\n  \
         dedup"
    );
}
