use std::path::{Path, PathBuf};

use crate::error::{InvoiceError, Result};
use crate::fmt;
use crate::importer::read_report;
use crate::invoice::{output_path, Invoice};
use crate::models::OutputFormat;
use crate::reports::{extract_period, group_by_market, MarketSummary, Period};
use crate::settings::{load_config, Config};

/// Everything one generation run needs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source: PathBuf,
    pub year: i32,
    pub month: u32,
    pub format: OutputFormat,
    pub config_path: PathBuf,
    pub invoice_number: Option<String>,
    pub payment_date: Option<String>,
}

impl GenerationRequest {
    /// A request using the configured numbering and payment date.
    pub fn new(source: PathBuf, year: i32, month: u32, format: OutputFormat, config_path: &Path) -> Self {
        Self {
            source,
            year,
            month,
            format,
            config_path: config_path.to_path_buf(),
            invoice_number: None,
            payment_date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub success: bool,
    pub log: Vec<LogLine>,
    pub files: Vec<PathBuf>,
    pub total: f64,
    /// Per-market aggregate; only set once grouping succeeded.
    pub summary: Option<MarketSummary>,
}

impl GenerationOutcome {
    fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    fn success_line(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Success, message);
    }

    fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log.push(LogLine {
            level,
            message: message.into(),
        });
    }

    /// Stop the run: log the failure and drop any partial results.
    fn fail(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(%message, "generation failed");
        self.error(message);
        self.success = false;
        self.files.clear();
        self.summary = None;
        self
    }

    /// The log as plain text, one line per entry.
    pub fn log_text(&self) -> String {
        self.log
            .iter()
            .map(|l| l.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Market names as logged: `['US', 'UK']`.
fn quoted_list(names: &[&str]) -> String {
    let inner: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    format!("[{}]", inner.join(", "))
}

fn render(format: &str, invoice: &Invoice) -> Result<Vec<u8>> {
    match format {
        #[cfg(feature = "docx")]
        "docx" => crate::docx::render_invoice(invoice),
        #[cfg(feature = "pdf")]
        "pdf" => crate::pdf::render_invoice(invoice),
        other => {
            let _ = invoice;
            Err(InvoiceError::Other(format!(
                "Format {} non disponible dans cette version.",
                other.to_uppercase()
            )))
        }
    }
}

fn write_document(config: &Config, invoice: &Invoice, extension: &str) -> Result<PathBuf> {
    let bytes = render(extension, invoice)?;
    let path = output_path(config, invoice.period, extension)?;
    std::fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), "invoice written");
    Ok(path)
}

/// Run one generation: config, report, period, markets, then each requested
/// document. Never panics on bad input; every failure ends up in the log.
pub fn generate_invoice(request: &GenerationRequest) -> GenerationOutcome {
    let mut out = GenerationOutcome::default();

    let config = match load_config(&request.config_path) {
        Ok(c) => c,
        Err(e) => return out.fail(format!("ERREUR: {e}")),
    };
    out.info("Configuration chargée.");

    let period = match Period::new(request.year, request.month) {
        Ok(p) => p,
        Err(e) => return out.fail(format!("ERREUR: {e}")),
    };

    generate_with_config(&config, request, period, out)
}

fn generate_with_config(
    config: &Config,
    request: &GenerationRequest,
    period: Period,
    mut out: GenerationOutcome,
) -> GenerationOutcome {
    let table = match read_report(&request.source) {
        Ok(t) => t,
        Err(e) => return out.fail(format!("ERREUR: {e}")),
    };
    out.info(format!("Fichier lu avec succès: {} lignes.", table.len()));

    let rows = match extract_period(&table, period) {
        Ok(r) => r,
        Err(e) => return out.fail(e.to_string()),
    };
    out.info(format!("Données trouvées : {} lignes.", rows.len()));

    let summary = match group_by_market(&rows) {
        Ok(s) => s,
        Err(e) => return out.fail(e.to_string()),
    };
    out.info(format!("Marchés trouvés: {}", quoted_list(&summary.names())));

    let invoice = Invoice::build(
        config,
        &summary,
        period,
        request.invoice_number.as_deref(),
        request.payment_date.as_deref(),
    );

    let mut targets = Vec::new();
    if request.format.wants_docx() {
        targets.push(("docx", "DOCX"));
    }
    if request.format.wants_pdf() {
        targets.push(("pdf", "PDF"));
    }
    for (extension, label) in targets {
        match write_document(config, &invoice, extension) {
            Ok(path) => {
                out.success_line(format!("✅ {label} : {}", path.display()));
                out.files.push(path);
            }
            Err(e) => return out.fail(format!("❌ Erreur : {e}")),
        }
    }

    out.total = invoice.total_ht;
    out.info("-".repeat(50));
    out.info(format!("Montant total : {}", fmt::euro(out.total)));
    let listed: Vec<String> = out.files.iter().map(|p| p.display().to_string()).collect();
    out.success_line(format!("🎉 Terminé ! Fichiers : {}", listed.join(", ")));
    out.summary = Some(summary);
    out.success = true;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::save_config;

    struct Fixture {
        dir: tempfile::TempDir,
        config_path: PathBuf,
        report: PathBuf,
    }

    impl Fixture {
        fn out_dir(&self) -> PathBuf {
            self.dir.path().join("out")
        }
    }

    fn write_config(dir: &Path) -> PathBuf {
        let mut c = Config::template();
        c.set("entreprise", "nom", "Jeanne Auteur");
        c.set("entreprise", "adresse", "1 rue des Livres\n75001 Paris");
        c.set("entreprise", "siret", "12345678900012");
        c.set("entreprise", "tva_intra", "FR12345678901");
        c.set("entreprise", "iban", "FR7630006000011234567890189");
        c.set("entreprise", "bic", "AGRIFRPP");
        c.set("fichiers", "dossier_sortie", dir.join("out").to_string_lossy());
        let path = dir.join("config.json");
        save_config(&c, &path).unwrap();
        path
    }

    /// A US market for March 2024: one summary row and one detail row.
    fn write_report(dir: &Path, headers: &[&str]) -> PathBuf {
        let path = dir.join("kdp.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Paiements").unwrap();
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string(0, c as u16, *h).unwrap();
        }
        let col = |name: &str| headers.iter().position(|h| *h == name).map(|c| c as u16);
        let mut put_str = |row: u32, name: &str, v: &str| {
            if let Some(c) = col(name) {
                sheet.write_string(row, c, v).unwrap();
            }
        };
        put_str(1, "Période de vente - Date de début", "2024-03-01");
        put_str(1, "Marché", "US");
        put_str(1, "Numéro de paiement", "P-1");
        put_str(1, "Devise", "USD");
        put_str(2, "Marché", "US");
        put_str(2, "Devise", "USD");
        put_str(2, "Détail", "2024-03 Kindle");
        let mut put_num = |row: u32, name: &str, v: f64| {
            if let Some(c) = col(name) {
                sheet.write_number(row, c, v).unwrap();
            }
        };
        put_num(1, "Redevance accumulée", 100.0);
        put_num(1, "Montant du paiement", 92.5);
        put_num(1, "Taux de change", 0.925);
        put_num(2, "Redevance accumulée", 100.0);
        workbook.save(&path).unwrap();
        path
    }

    const FULL_HEADERS: [&str; 8] = [
        "Période de vente - Date de début",
        "Marché",
        "Numéro de paiement",
        "Devise",
        "Redevance accumulée",
        "Montant du paiement",
        "Taux de change",
        "Détail",
    ];

    fn fixture(headers: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path());
        let report = write_report(dir.path(), headers);
        Fixture {
            dir,
            config_path,
            report,
        }
    }

    fn request(f: &Fixture, year: i32, month: u32, format: OutputFormat) -> GenerationRequest {
        GenerationRequest::new(f.report.clone(), year, month, format, &f.config_path)
    }

    #[test]
    fn test_generate_both_formats() {
        let f = fixture(&FULL_HEADERS);
        let out = generate_invoice(&request(&f, 2024, 3, OutputFormat::Both));
        assert!(out.success, "{}", out.log_text());
        assert_eq!(out.files.len(), 2);
        assert!(out.files[0].extension().is_some_and(|e| e == "docx"));
        assert!(out.files[1].extension().is_some_and(|e| e == "pdf"));
        for file in &out.files {
            assert!(file.starts_with(f.out_dir()));
            assert!(file.is_file());
        }
        assert!((out.total - 92.5).abs() < 1e-9);

        let summary = out.summary.as_ref().unwrap();
        let us = summary.get("US").unwrap();
        assert_eq!(us.details.len(), 1);
        assert_eq!(us.details[0].currency, "USD");

        let text = out.log_text();
        assert!(text.contains("Fichier lu avec succès: 2 lignes."));
        assert!(text.contains("Données trouvées : 2 lignes."));
        assert!(text.contains("Marchés trouvés: ['US']"));
        assert!(text.contains("Montant total : 92.50 €"));
        assert_eq!(out.log.last().unwrap().level, LogLevel::Success);
    }

    #[test]
    fn test_empty_period_fails_without_files() {
        let f = fixture(&FULL_HEADERS);
        let out = generate_invoice(&request(&f, 2023, 1, OutputFormat::Both));
        assert!(!out.success);
        assert!(out.files.is_empty());
        assert!(out.summary.is_none());
        assert!(out
            .log_text()
            .contains("Aucune donnée trouvée pour janvier 2023"));
        assert!(!f.out_dir().exists());
    }

    #[test]
    fn test_missing_column_is_named_in_log() {
        let headers: Vec<&str> = FULL_HEADERS
            .iter()
            .copied()
            .filter(|h| *h != "Montant du paiement")
            .collect();
        let f = fixture(&headers);
        let out = generate_invoice(&request(&f, 2024, 3, OutputFormat::Pdf));
        assert!(!out.success);
        assert!(out.files.is_empty());
        let last = out.log.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.contains("Montant du paiement"));
    }

    #[test]
    fn test_unconfigured_config_stops_first() {
        let f = fixture(&FULL_HEADERS);
        save_config(&Config::template(), &f.config_path).unwrap();
        let out = generate_invoice(&request(&f, 2024, 3, OutputFormat::Docx));
        assert!(!out.success);
        assert_eq!(out.log.len(), 1);
        assert!(out.log[0].message.contains("entreprise.nom"));
    }

    #[test]
    fn test_invalid_month_fails() {
        let f = fixture(&FULL_HEADERS);
        let out = generate_invoice(&request(&f, 2024, 13, OutputFormat::Docx));
        assert!(!out.success);
        assert!(out.log_text().contains("13"));
    }

    #[test]
    fn test_custom_number_used_in_output() {
        let f = fixture(&FULL_HEADERS);
        let mut req = request(&f, 2024, 3, OutputFormat::Docx);
        req.invoice_number = Some("F-2024-042".into());
        let out = generate_invoice(&req);
        assert!(out.success, "{}", out.log_text());
        let bytes = std::fs::read(&out.files[0]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_quoted_list() {
        assert_eq!(quoted_list(&["US", "UK"]), "['US', 'UK']");
        assert_eq!(quoted_list(&[]), "[]");
    }
}
