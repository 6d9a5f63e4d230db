use std::collections::HashMap;
use std::path::Path;

use calamine::{Data, Range, Reader};

use crate::error::{InvoiceError, Result};
use crate::models::{CellValue, ReportRow, ReportTable};

pub const COL_PERIOD_START: &str = "Période de vente - Date de début";
pub const COL_MARKET: &str = "Marché";
pub const COL_PAYMENT_NUMBER: &str = "Numéro de paiement";
pub const COL_CURRENCY: &str = "Devise";
pub const COL_ROYALTY: &str = "Redevance accumulée";
pub const COL_PAYMENT_AMOUNT: &str = "Montant du paiement";
pub const COL_EXCHANGE_RATE: &str = "Taux de change";
pub const COL_DETAIL: &str = "Détail";
pub const COL_SOURCE: &str = "Source";

pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_PERIOD_START,
    COL_MARKET,
    COL_PAYMENT_NUMBER,
    COL_CURRENCY,
    COL_ROYALTY,
    COL_PAYMENT_AMOUNT,
];

/// Sheet names tried in order.
const SHEET_NAMES: &[&str] = &["Paiements", "Payments"];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Numeric value of a text cell. Only plain numbers (sign, digits, a dot,
/// an exponent) count; anything else, decimal commas and currency signs
/// included, is 0.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn cell_value(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Bool(b) => Some(CellValue::Text(b.to_string())),
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| CellValue::Text(s.to_string()))
        }
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(CellValue::Text),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    cell_value(cell).map(|v| v.as_text())
}

/// Sale-period dates come through as real dates, Excel serials, or text.
fn cell_date(cell: &Data) -> Option<String> {
    match cell {
        Data::Float(f) => excel_serial_to_date(*f),
        Data::Int(i) => excel_serial_to_date(*i as f64),
        Data::DateTimeIso(s) => Some(s.chars().take(10).collect()),
        other => cell_text(other),
    }
}

fn cell_rate(cell: &Data) -> Option<f64> {
    match cell_value(cell)? {
        CellValue::Number(n) => n.is_finite().then_some(n),
        CellValue::Text(s) => s.replace(',', ".").parse::<f64>().ok(),
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Load the payments sheet of a royalty report and check its columns.
pub fn read_report(file_path: &Path) -> Result<ReportTable> {
    if !file_path.is_file() {
        return Err(InvoiceError::SourceNotFound(file_path.display().to_string()));
    }

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| InvoiceError::Workbook(e.to_string()))?;

    let available = workbook.sheet_names();
    let sheet = SHEET_NAMES
        .iter()
        .find(|name| available.iter().any(|s| s == *name))
        .ok_or_else(|| InvoiceError::SheetNotFound(SHEET_NAMES[0].to_string()))?;

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| InvoiceError::Workbook(e.to_string()))?;

    let table = parse_range(&range)?;
    tracing::debug!(sheet = %sheet, rows = table.len(), "report loaded");
    Ok(table)
}

/// Convert a sheet range (header row first) into typed report rows.
pub fn parse_range(range: &Range<Data>) -> Result<ReportTable> {
    let mut rows_iter = range.rows();
    let header: HashMap<String, usize> = rows_iter
        .next()
        .map(|cells| {
            cells
                .iter()
                .enumerate()
                .filter_map(|(i, c)| cell_text(c).map(|name| (name.trim().to_string(), i)))
                .collect()
        })
        .unwrap_or_default();

    for col in REQUIRED_COLUMNS {
        if !header.contains_key(col) {
            return Err(InvoiceError::MissingColumn(col.to_string()));
        }
    }
    let idx = |name: &str| header.get(name).copied();
    let (i_period, i_market, i_payment, i_currency, i_royalty, i_amount) = (
        header[COL_PERIOD_START],
        header[COL_MARKET],
        header[COL_PAYMENT_NUMBER],
        header[COL_CURRENCY],
        header[COL_ROYALTY],
        header[COL_PAYMENT_AMOUNT],
    );
    let i_rate = idx(COL_EXCHANGE_RATE);
    let i_detail = idx(COL_DETAIL);
    let i_source = idx(COL_SOURCE);

    let mut rows = Vec::new();
    for cells in rows_iter {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let get = |i: usize| cells.get(i).unwrap_or(&Data::Empty);
        let opt = |i: Option<usize>| i.map(get).unwrap_or(&Data::Empty);

        rows.push(ReportRow {
            index: rows.len(),
            period_start: cell_date(get(i_period)),
            market: cell_text(get(i_market)).unwrap_or_default(),
            payment_number: cell_text(get(i_payment)),
            currency: cell_text(get(i_currency)),
            royalty: cell_value(get(i_royalty)),
            payment_amount: cell_value(get(i_amount)),
            exchange_rate: cell_rate(opt(i_rate)),
            detail: cell_text(opt(i_detail)),
            source: cell_text(opt(i_source)),
        });
    }

    Ok(ReportTable {
        rows,
        has_source_column: i_source.is_some(),
    })
}
