//! CLI tool for sheetsync - loads a sheet range, applies edits, saves the diff
//!
//! Usage:
//!   sheetsync_cli <spreadsheet-id> <range>                     # Print the range as JSON
//!   sheetsync_cli <spreadsheet-id> <range> --set A6=hello      # Edit one cell and save
//!   sheetsync_cli --create <title>                             # Create a spreadsheet
//!
//! Credentials come from `SHEETSYNC_ACCESS_TOKEN` or `GOOGLE_SERVICE_ACCOUNT`
//! (raw or base64 service account JSON). A `.env` file is read first.

#![allow(clippy::exit)]

use std::env;
use std::io::{self, Write};

use log::{LevelFilter, Metadata, Record};
use sheetsync::cell_ref::parse_cell_ref;
use sheetsync::config::{ACCESS_TOKEN_ENV, CREDENTIAL_ENV};
use sheetsync::{
    CellValue, ClientConfig, ServiceAccountAuth, ServiceAccountKey, SheetsClient, StaticToken,
    TokenProvider, SPREADSHEETS_SCOPE,
};

const USAGE: &str = "Usage: sheetsync_cli <spreadsheet-id> <range> [--set CELL=VALUE]... [--quiet]\n       sheetsync_cli --create <title>";

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

fn log_level_from_env() -> LevelFilter {
    match env::var("SHEETSYNC_LOG").as_deref() {
        Ok("error") => LevelFilter::Error,
        Ok("info") => LevelFilter::Info,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        Ok("off") => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}

enum Command {
    Create {
        title: String,
    },
    Sync {
        spreadsheet_id: String,
        range: String,
        edits: Vec<(usize, usize, CellValue)>,
        quiet: bool,
    },
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut positional = Vec::new();
    let mut edits = Vec::new();
    let mut quiet = false;
    let mut create = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--quiet" | "-q" => quiet = true,
            "--create" => {
                let title = iter.next().ok_or("--create needs a title")?;
                create = Some(title.clone());
            }
            "--set" => {
                let edit = iter.next().ok_or("--set needs CELL=VALUE")?;
                let (cell, value) = edit
                    .split_once('=')
                    .ok_or_else(|| format!("expected CELL=VALUE, got {edit:?}"))?;
                let (row, col) =
                    parse_cell_ref(cell).ok_or_else(|| format!("bad cell reference {cell:?}"))?;
                edits.push((row, col, CellValue::parse_input(value)));
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            _ => positional.push(arg.clone()),
        }
    }

    if let Some(title) = create {
        return Ok(Command::Create { title });
    }
    let mut positional = positional.into_iter();
    match (positional.next(), positional.next(), positional.next()) {
        (Some(spreadsheet_id), Some(range), None) => Ok(Command::Sync {
            spreadsheet_id,
            range,
            edits,
            quiet,
        }),
        _ => Err(USAGE.to_string()),
    }
}

fn token_provider(config: &ClientConfig) -> sheetsync::Result<Box<dyn TokenProvider>> {
    if let Some(token) = env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.is_empty()) {
        return Ok(Box::new(StaticToken::new(token)));
    }
    let raw = env::var(CREDENTIAL_ENV).map_err(|_| {
        sheetsync::SheetSyncError::MalformedCredential(format!(
            "set {CREDENTIAL_ENV} or {ACCESS_TOKEN_ENV}"
        ))
    })?;
    let key = ServiceAccountKey::from_env_value(&raw)?;
    let auth = ServiceAccountAuth::new(key, vec![SPREADSHEETS_SCOPE.to_string()], config)?;
    Ok(Box::new(auth))
}

fn run(command: Command) -> sheetsync::Result<()> {
    let config = ClientConfig::from_env()?;
    let client = SheetsClient::new(token_provider(&config)?, &config)?;

    match command {
        Command::Create { title } => {
            let id = client.create_spreadsheet(&title)?;
            println!("{id}");
        }
        Command::Sync {
            spreadsheet_id,
            range,
            edits,
            quiet,
        } => {
            let mut sheet = client.open(&spreadsheet_id, &range)?;
            for (row, col, value) in edits {
                sheet.values_mut().set(row, col, value);
            }
            match sheet.save()? {
                Some(rect) => eprintln!(
                    "Saved {}x{} cells at ({}, {})",
                    rect.height(),
                    rect.width(),
                    rect.min_row(),
                    rect.min_col()
                ),
                None => eprintln!("No changes"),
            }
            if !quiet {
                let json = serde_json::to_string_pretty(sheet.values())?;
                let mut stdout = io::stdout();
                stdout.write_all(json.as_bytes())?;
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}

fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log_level_from_env());
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
