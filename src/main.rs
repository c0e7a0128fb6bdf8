// src/main.rs
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod balance;
mod balance_tests;
mod export;
mod layout;
mod records;

use balance::{parse_movements, reconcile, BalanceResult, EventCodeTable};
use export::generate_export;
use records::{load_launches, load_layout};

#[derive(Parser)]
#[command(
    name = "folha-core",
    about = "Fixed-width payroll export and time balance reconciliation",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render event launches into a fixed-width payroll file
    Export {
        /// Export layout definition (JSON)
        #[arg(long)]
        layout: PathBuf,
        /// Event launches joined with employee/event data (CSV)
        #[arg(long)]
        launches: PathBuf,
        /// First launch date included (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last launch date included (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Write the document here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse a legacy movement file and reconcile hour balances
    Reconcile {
        /// Fixed-offset movement file (.txt)
        #[arg(long)]
        input: PathBuf,
        /// Event-code table override (JSON)
        #[arg(long)]
        codes: Option<PathBuf>,
        /// Use the 2900-range overtime codes instead of the standard table
        #[arg(long, conflicts_with = "codes")]
        codes_2900: bool,
        /// Write the result rows as CSV instead of a plain table
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    match cli.command {
        Command::Export {
            layout,
            launches,
            start,
            end,
            output,
        } => run_export(layout, launches, start, end, output),
        Command::Reconcile {
            input,
            codes,
            codes_2900,
            output,
        } => run_reconcile(input, codes, codes_2900, output),
    }
}

fn run_export(
    layout_path: PathBuf,
    launches_path: PathBuf,
    start: NaiveDate,
    end: NaiveDate,
    output: Option<PathBuf>,
) -> Result<()> {
    let layout = load_layout(&layout_path)?;
    let launches = load_launches(&launches_path)?;

    info!(
        "Rendering layout '{}' over {} launches between {} and {}",
        layout.name,
        launches.len(),
        start,
        end
    );
    let document = generate_export(&layout, &launches, start, end)?;
    for warning in &document.warnings {
        warn!("{warning}");
    }

    match output {
        Some(path) => {
            fs::write(&path, &document.text)
                .with_context(|| format!("writing export file {}", path.display()))?;
            info!(
                "Wrote {} lines to {}",
                document.text.lines().count(),
                path.display()
            );
        }
        None => println!("{}", document.text),
    }
    Ok(())
}

fn load_code_table(codes: Option<PathBuf>, codes_2900: bool) -> Result<EventCodeTable> {
    if let Some(path) = codes {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading event-code table {}", path.display()))?;
        let table = serde_json::from_str(&text)
            .with_context(|| format!("parsing event-code table {}", path.display()))?;
        return Ok(table);
    }
    if codes_2900 {
        return Ok(EventCodeTable::range_2900());
    }
    Ok(EventCodeTable::standard())
}

fn write_results_csv(path: &PathBuf, results: &[BalanceResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating results file {}", path.display()))?;
    for result in results {
        writer
            .serialize(result)
            .context("writing reconciliation row")?;
    }
    writer.flush().context("flushing results file")?;
    Ok(())
}

fn run_reconcile(
    input: PathBuf,
    codes: Option<PathBuf>,
    codes_2900: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes =
        fs::read(&input).with_context(|| format!("reading movement file {}", input.display()))?;
    // Legacy files arrive in Latin-1 as often as UTF-8; decode lossily.
    let content = String::from_utf8_lossy(&bytes);

    let table = load_code_table(codes, codes_2900)?;
    let parsed = parse_movements(&content);
    for warning in &parsed.warnings {
        warn!("{warning}");
    }

    let companies: BTreeSet<&str> = parsed.events.iter().map(|e| e.company.as_str()).collect();
    let periods: BTreeSet<(i32, u32)> = parsed.events.iter().map(|e| (e.year, e.month)).collect();
    let results = reconcile(&parsed.events, &table);
    info!(
        "Reconciled {} events across {} registrations ({} companies, {} periods)",
        parsed.events.len(),
        results.len(),
        companies.len(),
        periods.len()
    );

    match output {
        Some(path) => {
            write_results_csv(&path, &results)?;
            info!("Wrote {} result rows to {}", results.len(), path.display());
        }
        None => {
            println!(
                "{:<10} {:>12} {:>12} {:>14} {:>12}",
                "Matricula", "Extras (h)", "Faltas (h)", "Faltas Just.", "Atestados"
            );
            for result in &results {
                println!(
                    "{:<10} {:>12.2} {:>12.2} {:>14.2} {:>12.2}",
                    result.registration,
                    result.overtime_remaining_hours,
                    result.absence_remaining_hours,
                    result.justified_absence_hours,
                    result.medical_certificate_hours
                );
            }
        }
    }
    Ok(())
}
