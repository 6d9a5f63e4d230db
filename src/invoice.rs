use std::path::PathBuf;

use crate::error::Result;
use crate::fmt;
use crate::reports::{MarketSummary, Period};
use crate::settings::{shellexpand_path, Config};

const DEFAULT_NUMBER_FORMAT: &str = "{annee}-{mois:02d}-01";
const DEFAULT_NUMBER_PREFIX: &str = "FACT";
const DEFAULT_PAYMENT_DATE: &str = "Non spécifiée";
const DEFAULT_FILE_FORMAT: &str = "Facture_KDP_{annee}_{mois:02d}";
/// Widest zero padding a template may ask for.
const MAX_PAD_WIDTH: usize = 4;

/// Fill `{annee}` and `{mois}` placeholders. `{mois:02d}` (or `{mois:02}`)
/// pads the month to two digits. Unknown placeholders are left as written.
pub fn render_template(template: &str, period: Period) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let placeholder = &tail[1..end];
        let (name, spec) = placeholder.split_once(':').unwrap_or((placeholder, ""));
        let value = match name {
            "annee" => Some(i64::from(period.year)),
            "mois" => Some(i64::from(period.month)),
            _ => None,
        };
        match (value, spec.trim_end_matches('d')) {
            (Some(v), "") => out.push_str(&v.to_string()),
            (Some(v), width) if width.starts_with('0') => {
                let w = width.parse::<usize>().unwrap_or(0).min(MAX_PAD_WIDTH);
                out.push_str(&format!("{v:0w$}"));
            }
            _ => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Invoice number: an explicit override wins; otherwise the configured
/// format, prefixed with `prefixe_numero-` unless that prefix is blank.
pub fn invoice_number(config: &Config, period: Period, custom: Option<&str>) -> String {
    if let Some(n) = custom.map(str::trim).filter(|n| !n.is_empty()) {
        return n.to_string();
    }
    let format = config.get_or("facture", "format_numero", DEFAULT_NUMBER_FORMAT);
    let number = render_template(format, period);
    let prefix = match config.get("facture", "prefixe_numero") {
        Some(p) => p.trim(),
        None => DEFAULT_NUMBER_PREFIX,
    };
    if prefix.is_empty() {
        number
    } else {
        format!("{prefix}-{number}")
    }
}

pub fn payment_date(config: &Config, custom: Option<&str>) -> String {
    custom
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| config.get_or("facture", "date_paiement_defaut", DEFAULT_PAYMENT_DATE))
        .to_string()
}

/// Output file for one format: `<dossier_sortie>/<format_nom_sortie>.<ext>`.
/// Creates the output directory.
pub fn output_path(config: &Config, period: Period, extension: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(shellexpand_path(config.get_or("fichiers", "dossier_sortie", ".")));
    let format = config.get_or("fichiers", "format_nom_sortie", DEFAULT_FILE_FORMAT);
    let name = PathBuf::from(render_template(format, period)).with_extension(extension);
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(name))
}

// ---------------------------------------------------------------------------
// Invoice model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Party {
    pub name: String,
    pub address_lines: Vec<String>,
    /// Label/value lines printed under the address (SIRET, TVA, ...).
    pub identifiers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub market: String,
    pub designation: String,
    pub currency: String,
    pub amount: f64,
    /// Shown only when a conversion actually applies.
    pub rate: Option<f64>,
    pub amount_eur: f64,
}

#[derive(Debug, Clone)]
pub struct MarketTable {
    pub market: String,
    pub lines: Vec<InvoiceLine>,
    pub total_currency: String,
    pub total_origine: f64,
    pub total_rate: Option<f64>,
    pub total_eur: f64,
}

/// Everything a renderer needs, with all amounts already computed.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub number: String,
    pub issue_date: String,
    pub period: Period,
    pub payment_date: String,
    pub payment_method: String,
    pub iban: String,
    pub bic: String,
    pub seller: Party,
    pub client: Party,
    pub markets: Vec<MarketTable>,
    pub total_ht: f64,
    pub reverse_charge_notice: String,
}

fn address_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

impl Invoice {
    pub fn build(
        config: &Config,
        summary: &MarketSummary,
        period: Period,
        custom_number: Option<&str>,
        custom_payment_date: Option<&str>,
    ) -> Self {
        let get = |section: &str, field: &str| config.get(section, field).unwrap_or("").trim().to_string();

        let mut seller_ids = vec![
            ("SIRET".to_string(), get("entreprise", "siret")),
            ("TVA intracommunautaire".to_string(), get("entreprise", "tva_intra")),
        ];
        for (label, field) in [("Code APE", "code_ape"), ("Forme juridique", "forme_juridique")] {
            let value = get("entreprise", field);
            if !value.is_empty() {
                seller_ids.push((label.to_string(), value));
            }
        }
        let seller = Party {
            name: get("entreprise", "nom"),
            address_lines: address_lines(&get("entreprise", "adresse")),
            identifiers: seller_ids,
        };

        let client_vat = get("client", "tva_intra");
        let client = Party {
            name: get("client", "nom"),
            address_lines: address_lines(&get("client", "adresse")),
            identifiers: if client_vat.is_empty() {
                Vec::new()
            } else {
                vec![("TVA intracommunautaire".to_string(), client_vat)]
            },
        };

        let markets: Vec<MarketTable> = summary
            .markets
            .iter()
            .map(|m| {
                let rate = m.conversion_rate();
                let lines = m
                    .details
                    .iter()
                    .map(|d| InvoiceLine {
                        market: m.market.clone(),
                        designation: d.designation.clone(),
                        currency: d.currency.clone(),
                        amount: d.amount,
                        rate: (rate != 1.0).then_some(rate),
                        amount_eur: m.convert(d.amount),
                    })
                    .collect();
                MarketTable {
                    market: m.market.clone(),
                    lines,
                    total_currency: m.origin_currency.clone(),
                    total_origine: m.total_origine,
                    total_rate: m.exchange_rate.filter(|r| *r != 0.0 && r.is_finite()),
                    total_eur: m.total_eur,
                }
            })
            .collect();

        Self {
            number: invoice_number(config, period, custom_number),
            issue_date: chrono::Local::now().format("%d/%m/%Y").to_string(),
            period,
            payment_date: payment_date(config, custom_payment_date),
            payment_method: get("facture", "mode_reglement"),
            iban: get("entreprise", "iban"),
            bic: get("entreprise", "bic"),
            seller,
            client,
            total_ht: summary.total_eur(),
            markets,
            reverse_charge_notice: get("messages", "autoliquidation"),
        }
    }

    /// "Revenus de mars 2024"
    pub fn period_label(&self) -> String {
        format!("Revenus de {} {}", fmt::month_name(self.period.month), self.period.year)
    }

    /// No VAT is charged: the client self-assesses it.
    pub fn total_ttc(&self) -> f64 {
        self.total_ht
    }
}

/// Header cells shared by both renderers.
pub const TABLE_HEADERS: [&str; 6] = [
    "Marché",
    "Désignation",
    "Devise",
    "Montant net",
    "Taux",
    "Montant EUR",
];

impl InvoiceLine {
    pub fn cells(&self) -> [String; 6] {
        [
            self.market.clone(),
            self.designation.clone(),
            self.currency.clone(),
            fmt::amount(self.amount),
            self.rate.map(fmt::rate).unwrap_or_default(),
            fmt::euro(self.amount_eur),
        ]
    }
}

impl MarketTable {
    pub fn total_cells(&self) -> [String; 6] {
        [
            self.market.clone(),
            "TOTAL".to_string(),
            self.total_currency.clone(),
            fmt::amount(self.total_origine),
            self.total_rate.map(fmt::stored_rate).unwrap_or_default(),
            fmt::euro(self.total_eur),
        ]
    }
}
