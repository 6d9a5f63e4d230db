use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{InvoiceError, Result};
use crate::fmt::month_name;
use crate::models::{ReportRow, ReportTable};

/// Currency every market total is reported in.
pub const REPORTING_CURRENCY: &str = "EUR";

/// Designation used when a detail row names neither a source nor a detail.
pub const DEFAULT_DESIGNATION: &str = "Redevance KDP";

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(InvoiceError::InvalidPeriod(format!(
                "mois {month} hors de 1..12"
            )));
        }
        if !(1000..=9999).contains(&year) {
            return Err(InvoiceError::InvalidPeriod(format!("année {year}")));
        }
        Ok(Self { year, month })
    }

    /// The calendar month before `today`.
    pub fn previous_month(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        let prev = first.checked_sub_months(Months::new(1)).unwrap_or(first);
        Self {
            year: prev.year(),
            month: prev.month(),
        }
    }

    /// `YYYY-MM`
    pub fn prefix(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// `YYYY-MM-01`
    pub fn first_day(&self) -> String {
        format!("{}-01", self.prefix())
    }

    pub fn month_name(&self) -> &'static str {
        month_name(self.month)
    }

    /// A row belongs to the period when its sale-period start is the first of
    /// the month, or when its detail text starts with `YYYY-MM`. The second
    /// rule attaches detail rows that carry no date of their own.
    pub fn contains(&self, row: &ReportRow) -> bool {
        let first_day = self.first_day();
        let prefix = self.prefix();
        row.period_start.as_deref() == Some(first_day.as_str())
            || row
                .detail
                .as_deref()
                .is_some_and(|d| d.starts_with(&prefix))
    }
}

/// Keep the rows belonging to `period`, in their original order.
pub fn extract_period(table: &ReportTable, period: Period) -> Result<ReportTable> {
    let rows: Vec<ReportRow> = table
        .rows
        .iter()
        .filter(|r| period.contains(r))
        .cloned()
        .collect();

    if rows.is_empty() {
        return Err(InvoiceError::NoDataForPeriod {
            month_name: period.month_name().to_string(),
            year: period.year,
        });
    }

    tracing::debug!(period = %period.prefix(), rows = rows.len(), "period extracted");
    Ok(ReportTable {
        rows,
        has_source_column: table.has_source_column,
    })
}

// ---------------------------------------------------------------------------
// Market aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DetailLine {
    pub designation: String,
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketAggregate {
    pub market: String,
    pub origin_currency: String,
    pub exchange_rate: Option<f64>,
    pub total_origine: f64,
    pub total_eur: f64,
    pub details: Vec<DetailLine>,
}

impl MarketAggregate {
    /// Rate applied to detail amounts. A market already in the reporting
    /// currency converts at 1 whatever rate the report carries.
    pub fn conversion_rate(&self) -> f64 {
        if self.origin_currency == REPORTING_CURRENCY {
            return 1.0;
        }
        match self.exchange_rate {
            Some(r) if r.is_finite() && r != 0.0 => r,
            _ => 1.0,
        }
    }

    pub fn convert(&self, amount: f64) -> f64 {
        amount * self.conversion_rate()
    }
}

/// Markets in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct MarketSummary {
    pub markets: Vec<MarketAggregate>,
}

impl MarketSummary {
    pub fn get(&self, market: &str) -> Option<&MarketAggregate> {
        self.markets.iter().find(|m| m.market == market)
    }

    pub fn names(&self) -> Vec<&str> {
        self.markets.iter().map(|m| m.market.as_str()).collect()
    }

    pub fn total_eur(&self) -> f64 {
        self.markets.iter().map(|m| m.total_eur).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

/// Group period rows by market.
///
/// Summary rows (those with a payment number) build each market's totals.
/// Every other row with a royalty value becomes a detail line of the market
/// of the nearest summary row above it, so the input must stay in sheet
/// order. Detail rows above the first summary row are dropped.
pub fn group_by_market(table: &ReportTable) -> Result<MarketSummary> {
    let mut summary = MarketSummary::default();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut market_by_row: HashMap<usize, usize> = HashMap::new();

    // Pass 1: market totals from summary rows
    for row in table.rows.iter().filter(|r| r.is_summary()) {
        let slot = *position.entry(row.market.clone()).or_insert_with(|| {
            summary.markets.push(MarketAggregate {
                market: row.market.clone(),
                origin_currency: row.currency.clone().unwrap_or_default(),
                exchange_rate: row.exchange_rate,
                total_origine: 0.0,
                total_eur: 0.0,
                details: Vec::new(),
            });
            summary.markets.len() - 1
        });
        let agg = &mut summary.markets[slot];
        agg.total_origine += row.royalty.as_ref().map_or(0.0, |v| v.to_amount());
        agg.total_eur += row.payment_amount.as_ref().map_or(0.0, |v| v.to_amount());
        market_by_row.insert(row.index, slot);
    }

    if summary.is_empty() {
        return Err(InvoiceError::NoMarkets);
    }

    // Pass 2: attach detail rows to the nearest preceding summary row
    let mut current: Option<usize> = None;
    for row in &table.rows {
        if let Some(&slot) = market_by_row.get(&row.index) {
            current = Some(slot);
            continue;
        }
        let (Some(slot), Some(royalty)) = (current, row.royalty.as_ref()) else {
            continue;
        };
        let agg = &mut summary.markets[slot];
        let designation = if table.has_source_column {
            row.source.clone()
        } else {
            row.detail.clone()
        }
        .unwrap_or_else(|| DEFAULT_DESIGNATION.to_string());
        let currency = row
            .currency
            .clone()
            .unwrap_or_else(|| agg.origin_currency.clone());
        agg.details.push(DetailLine {
            designation,
            currency,
            amount: royalty.to_amount(),
        });
    }

    tracing::debug!(markets = ?summary.names(), "markets grouped");
    Ok(summary)
}
