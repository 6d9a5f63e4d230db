use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::error::{InvoiceError, Result};
use crate::fmt::grouped;
use crate::generator::{generate_invoice, GenerationOutcome, GenerationRequest, LogLevel};
use crate::models::OutputFormat;
use crate::opener::open_all;
use crate::reports::{MarketSummary, Period};

pub struct GenerateArgs {
    pub file: PathBuf,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub format: OutputFormat,
    pub number: Option<String>,
    pub payment_date: Option<String>,
    pub open: bool,
}

/// Year and month to invoice: explicit values, falling back to last month.
fn resolve_period(year: Option<i32>, month: Option<u32>) -> (i32, u32) {
    let previous = Period::previous_month(chrono::Local::now().date_naive());
    (year.unwrap_or(previous.year), month.unwrap_or(previous.month))
}

fn print_log(outcome: &GenerationOutcome) {
    for line in &outcome.log {
        match line.level {
            LogLevel::Info => println!("{}", line.message),
            LogLevel::Success => println!("{}", line.message.green()),
            LogLevel::Error => eprintln!("{}", line.message.red()),
        }
    }
}

fn summary_table(summary: &MarketSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Marché", "Devise", "Total devise", "Taux", "Total EUR"]);
    for m in &summary.markets {
        let rate = m.conversion_rate();
        table.add_row(vec![
            Cell::new(&m.market),
            Cell::new(&m.origin_currency),
            Cell::new(grouped(m.total_origine)).set_alignment(CellAlignment::Right),
            Cell::new(if rate == 1.0 { String::new() } else { format!("{rate}") })
                .set_alignment(CellAlignment::Right),
            Cell::new(grouped(m.total_eur)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(grouped(summary.total_eur()).bold()).set_alignment(CellAlignment::Right),
    ]);
    table
}

pub fn run(args: GenerateArgs, config_path: &Path) -> Result<()> {
    let (year, month) = resolve_period(args.year, args.month);
    let request = GenerationRequest {
        invoice_number: args.number,
        payment_date: args.payment_date,
        ..GenerationRequest::new(args.file, year, month, args.format, config_path)
    };
    tracing::info!(source = %request.source.display(), year, month, "generating invoice");

    let outcome = generate_invoice(&request);
    print_log(&outcome);

    if !outcome.success {
        return Err(InvoiceError::Other("la génération a échoué".into()));
    }

    if let Some(summary) = &outcome.summary {
        println!("\n{}", summary_table(summary));
    }

    if args.open {
        for f in &outcome.files {
            println!("Ouverture : {}", f.display());
        }
        for problem in open_all(&outcome.files) {
            eprintln!("{}", problem.red());
        }
    }
    Ok(())
}
