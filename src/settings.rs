use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{InvoiceError, Result};

pub type Section = BTreeMap<String, String>;

/// Fields that must be filled in before an invoice can be generated.
pub const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("entreprise", "nom"),
    ("entreprise", "adresse"),
    ("entreprise", "siret"),
    ("entreprise", "tva_intra"),
    ("entreprise", "iban"),
    ("entreprise", "bic"),
];

/// Field names edited as multi-line text.
const MULTILINE_KEYS: &[&str] = &["adresse", "autoliquidation", "message", "format", "texte"];

/// Business configuration: section name -> field name -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub sections: BTreeMap<String, Section>,
}

impl Config {
    pub fn get(&self, section: &str, field: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(field))
            .map(String::as_str)
    }

    /// Value of a field, or `default` when missing or blank.
    pub fn get_or<'a>(&'a self, section: &str, field: &str, default: &'a str) -> &'a str {
        match self.get(section, field) {
            Some(v) if !v.trim().is_empty() => v,
            _ => default,
        }
    }

    pub fn set(&mut self, section: &str, field: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }

    /// Check the fields generation cannot do without. Stops at the first
    /// missing one, naming it.
    pub fn ensure_required(&self, path: &Path) -> Result<()> {
        for (section, field) in REQUIRED_FIELDS {
            let value = self.get(section, field).unwrap_or("");
            if value.trim().is_empty() || value.contains('[') {
                return Err(InvoiceError::ConfigField {
                    section: section.to_string(),
                    field: field.to_string(),
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// A starter configuration with placeholder values to be replaced.
    pub fn template() -> Self {
        let mut c = Self::default();
        c.set("entreprise", "nom", "[VOTRE NOM OU RAISON SOCIALE]");
        c.set("entreprise", "adresse", "[ADRESSE]\n[CODE POSTAL] [VILLE]");
        c.set("entreprise", "siret", "[SIRET]");
        c.set("entreprise", "tva_intra", "[FRXX999999999]");
        c.set("entreprise", "iban", "[IBAN]");
        c.set("entreprise", "bic", "[BIC]");
        c.set("entreprise", "code_ape", "5811Z");
        c.set("entreprise", "forme_juridique", "Entreprise individuelle");
        c.set("client", "nom", "Amazon Media EU S.à r.l.");
        c.set("client", "adresse", "38 avenue John F. Kennedy\nL-1855 Luxembourg");
        c.set("client", "tva_intra", "LU20260743");
        c.set("facture", "prefixe_numero", "FACT");
        c.set("facture", "format_numero", "{annee}-{mois:02d}-01");
        c.set("facture", "mode_reglement", "Virement bancaire");
        c.set("facture", "date_paiement_defaut", "Non spécifiée");
        c.set("fichiers", "dossier_sortie", "factures");
        c.set("fichiers", "format_nom_sortie", "Facture_KDP_{annee}_{mois:02d}");
        c.set(
            "messages",
            "autoliquidation",
            "Autoliquidation - TVA due par le preneur (article 196 de la directive 2006/112/CE).",
        );
        c
    }
}

pub fn is_multiline(field: &str) -> bool {
    let key = field.to_lowercase();
    MULTILINE_KEYS.iter().any(|k| key.contains(k))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub section: String,
    pub field: String,
    pub problem: String,
}

impl std::fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.section, self.field, self.problem)
    }
}

struct Patterns {
    siret: Regex,
    tva_intra: Regex,
    iban: Regex,
    bic: Regex,
    code_ape: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        siret: Regex::new(r"^[0-9 ]*[0-9][0-9 ]*$").expect("siret regex"),
        tva_intra: Regex::new(r"^[A-Za-z]{2}[A-Za-z0-9 ]*[A-Za-z0-9][A-Za-z0-9 ]*$").expect("tva regex"),
        iban: Regex::new(r"^[A-Za-z]{2}[0-9 ]*[0-9][0-9 ]*$").expect("iban regex"),
        bic: Regex::new(r"^(?:[A-Za-z0-9]{8}|[A-Za-z0-9]{11})$").expect("bic regex"),
        code_ape: Regex::new(r"^[0-9]{4}[A-Za-z]").expect("ape regex"),
    })
}

/// Problem with a single field value, keyed on the field name whatever the
/// section it sits in.
pub fn check_field(field: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return Some("le champ est vide".to_string());
    }
    let p = patterns();
    match field.to_lowercase().as_str() {
        "siret" if !p.siret.is_match(value) => Some("le SIRET doit être numérique".into()),
        "tva_intra" if !p.tva_intra.is_match(value) => Some("TVA intra invalide".into()),
        "iban" if !p.iban.is_match(value) => Some("IBAN invalide".into()),
        "bic" if !p.bic.is_match(value) => Some("BIC invalide".into()),
        "code_ape" if !p.code_ape.is_match(value) => Some("code APE invalide".into()),
        "format_nom_sortie" if !(value.contains("{annee}") && value.contains("{mois")) => {
            Some("doit contenir '{annee}' et '{mois}'".into())
        }
        _ => None,
    }
}

/// Validate every field, collecting all problems.
pub fn validate(config: &Config) -> Vec<FieldProblem> {
    let mut problems = Vec::new();
    for (section, fields) in &config.sections {
        for (field, value) in fields {
            if let Some(problem) = check_field(field, value) {
                problems.push(FieldProblem {
                    section: section.clone(),
                    field: field.clone(),
                    problem,
                });
            }
        }
    }
    problems
}

/// Trim every value, validate, and only then save. Returns the saved
/// configuration, or every problem found.
pub fn validate_and_save(
    config: Config,
    path: &Path,
) -> std::result::Result<Config, SaveError> {
    let mut cleaned = config;
    for fields in cleaned.sections.values_mut() {
        for value in fields.values_mut() {
            *value = value.trim().to_string();
        }
    }
    let problems = validate(&cleaned);
    if !problems.is_empty() {
        return Err(SaveError::Invalid(problems));
    }
    save_config(&cleaned, path).map_err(SaveError::Write)?;
    Ok(cleaned)
}

#[derive(Debug)]
pub enum SaveError {
    Invalid(Vec<FieldProblem>),
    Write(InvoiceError),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(problems) => {
                let lines: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", lines.join("\n"))
            }
            Self::Write(e) => write!(f, "{e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("kdp-invoice")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Resolve the config path: explicit flag, else the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
}

/// Read the configuration file without checking required fields.
pub fn read_config(path: &Path) -> Result<Config> {
    if !path.is_file() {
        return Err(InvoiceError::ConfigNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read the configuration and check the fields generation needs.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = read_config(path)?;
    config.ensure_required(path)?;
    Ok(config)
}

/// Read the configuration for editing: a missing file gives an empty one.
/// A file that exists but cannot be read or parsed is an error, so it is
/// never overwritten with a partial configuration.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    match read_config(path) {
        Err(InvoiceError::ConfigNotFound(_)) => Ok(Config::default()),
        other => other,
    }
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut c = Config::template();
        c.set("entreprise", "nom", "Jeanne Auteur");
        c.set("entreprise", "adresse", "1 rue des Livres\n75001 Paris");
        c.set("entreprise", "siret", "123 456 789 00012");
        c.set("entreprise", "tva_intra", "FR12345678901");
        c.set("entreprise", "iban", "FR76 3000 6000 0112 3456 7890 189");
        c.set("entreprise", "bic", "AGRIFRPP");
        c
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = valid_config();
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.get("entreprise", "bic"), Some("AGRIFRPP"));
    }

    #[test]
    fn test_config_file_shape_is_nested_object() {
        let json = r#"{"entreprise": {"nom": "A"}, "fichiers": {"dossier_sortie": "out"}}"#;
        let c: Config = serde_json::from_str(json).unwrap();
        assert_eq!(c.get("entreprise", "nom"), Some("A"));
        assert_eq!(c.get("fichiers", "dossier_sortie"), Some("out"));
        assert_eq!(c.get("client", "nom"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, InvoiceError::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_rejects_placeholder_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config(&Config::template(), &path).unwrap();
        let err = load_config(&path).unwrap_err();
        match err {
            InvoiceError::ConfigField { section, field, .. } => {
                assert_eq!(section, "entreprise");
                assert_eq!(field, "nom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_rejects_empty_required_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut c = valid_config();
        c.set("entreprise", "iban", "  ");
        save_config(&c, &path).unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("entreprise.iban"));
    }

    #[test]
    fn test_load_or_default_only_defaults_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(load_config_or_default(&path).unwrap(), Config::default());

        std::fs::write(&path, r#"{"entreprise": {"nom": "Jeanne",}}"#).unwrap();
        let err = load_config_or_default(&path).unwrap_err();
        assert!(matches!(err, InvoiceError::Json(_)));
    }

    #[test]
    fn test_get_or_falls_back_on_blank() {
        let mut c = Config::default();
        c.set("facture", "prefixe_numero", "");
        assert_eq!(c.get_or("facture", "prefixe_numero", "FACT"), "FACT");
        assert_eq!(c.get_or("facture", "absent", "x"), "x");
    }

    #[test]
    fn test_check_field_patterns() {
        assert_eq!(check_field("siret", "123 456 789 00012"), None);
        assert!(check_field("siret", "12A").is_some());
        assert_eq!(check_field("tva_intra", "FR12345678901"), None);
        assert!(check_field("tva_intra", "1234").is_some());
        assert!(check_field("tva_intra", "FR").is_some());
        assert_eq!(check_field("iban", "FR76 3000 6000"), None);
        assert!(check_field("iban", "FR76-3000").is_some());
        assert_eq!(check_field("bic", "AGRIFRPP"), None);
        assert_eq!(check_field("bic", "AGRIFRPPXXX"), None);
        assert!(check_field("bic", "AGRI").is_some());
        assert_eq!(check_field("code_ape", "5811Z"), None);
        assert!(check_field("code_ape", "58A1Z").is_some());
        assert_eq!(check_field("format_nom_sortie", "F_{annee}_{mois:02d}"), None);
        assert!(check_field("format_nom_sortie", "F_{annee}").is_some());
        assert!(check_field("nom", "   ").is_some());
        assert_eq!(check_field("mode_reglement", "Virement"), None);
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut c = valid_config();
        c.set("entreprise", "siret", "abc");
        c.set("entreprise", "bic", "XX");
        c.set("client", "nom", "");
        let problems = validate(&c);
        let keys: Vec<(&str, &str)> = problems
            .iter()
            .map(|p| (p.section.as_str(), p.field.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("client", "nom"), ("entreprise", "bic"), ("entreprise", "siret")]
        );
    }

    #[test]
    fn test_validate_and_save_writes_only_when_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut bad = valid_config();
        bad.set("entreprise", "iban", "not an iban");
        match validate_and_save(bad, &path) {
            Err(SaveError::Invalid(problems)) => assert_eq!(problems.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!path.exists());

        let mut good = valid_config();
        good.set("entreprise", "nom", "  Jeanne Auteur  ");
        let saved = validate_and_save(good, &path).unwrap();
        assert_eq!(saved.get("entreprise", "nom"), Some("Jeanne Auteur"));
        assert_eq!(read_config(&path).unwrap(), saved);
    }

    #[test]
    fn test_multiline_keys() {
        assert!(is_multiline("adresse"));
        assert!(is_multiline("autoliquidation"));
        assert!(is_multiline("format_nom_sortie"));
        assert!(!is_multiline("siret"));
    }
}
