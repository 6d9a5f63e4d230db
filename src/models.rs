use crate::importer::parse_amount;

/// A non-empty spreadsheet cell, reduced to what the aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric value; text that does not parse as a number counts as zero.
    pub fn to_amount(&self) -> f64 {
        match self {
            Self::Number(n) if n.is_finite() => *n,
            Self::Number(_) => 0.0,
            Self::Text(s) => parse_amount(s),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => format!("{n}"),
            Self::Text(s) => s.clone(),
        }
    }
}

/// One record of the payments sheet, in original row order.
///
/// Rows carrying a payment number are market summaries; rows without one are
/// detail lines that belong to the nearest summary row above them.
#[derive(Debug, Clone, Default)]
pub struct ReportRow {
    /// Zero-based position among the data rows of the sheet.
    pub index: usize,
    pub period_start: Option<String>,
    pub market: String,
    pub payment_number: Option<String>,
    pub currency: Option<String>,
    pub royalty: Option<CellValue>,
    pub payment_amount: Option<CellValue>,
    pub exchange_rate: Option<f64>,
    pub detail: Option<String>,
    pub source: Option<String>,
}

impl ReportRow {
    pub fn is_summary(&self) -> bool {
        self.payment_number.is_some()
    }
}

/// The rows read from a report, plus which optional columns were present.
#[derive(Debug, Clone, Default)]
pub struct ReportTable {
    pub rows: Vec<ReportRow>,
    pub has_source_column: bool,
}

impl ReportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Docx,
    Pdf,
    Both,
}

impl OutputFormat {
    pub fn wants_docx(&self) -> bool {
        matches!(self, Self::Docx | Self::Both)
    }

    pub fn wants_pdf(&self) -> bool {
        matches!(self, Self::Pdf | Self::Both)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Docx => "DOCX",
            Self::Pdf => "PDF",
            Self::Both => "Les deux",
        }
    }

    pub const ALL: [OutputFormat; 3] = [Self::Docx, Self::Pdf, Self::Both];
}
