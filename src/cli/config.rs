use std::path::Path;

use colored::Colorize;

use crate::error::{InvoiceError, Result};
use crate::settings::{
    check_field, load_config_or_default, read_config, save_config, validate, Config,
};

pub fn show(path: &Path) -> Result<()> {
    let config = read_config(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn path(path: &Path) -> Result<()> {
    println!("{}", path.display());
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(InvoiceError::Other(format!(
            "{} existe déjà (utilisez --force pour l'écraser)",
            path.display()
        )));
    }
    save_config(&Config::template(), path)?;
    println!("Configuration créée : {}", path.display());
    println!("Remplacez les valeurs entre crochets avant de générer une facture.");
    Ok(())
}

/// Report every field problem, then whether generation can run.
pub fn check(path: &Path) -> Result<()> {
    let config = read_config(path)?;
    let problems = validate(&config);
    for p in &problems {
        println!("{} {p}", "✗".red());
    }
    let ready = config.ensure_required(path);
    if let Err(e) = &ready {
        println!("{} {e}", "✗".red());
    }
    if problems.is_empty() && ready.is_ok() {
        println!("{} Configuration valide.", "✓".green());
        return Ok(());
    }
    let count = problems.len() + usize::from(ready.is_err());
    Err(InvoiceError::Other(format!("{count} problème(s) dans {}", path.display())))
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.split_once('.')
        .filter(|(s, f)| !s.is_empty() && !f.is_empty())
        .ok_or_else(|| InvoiceError::Other(format!("clé '{key}' invalide, attendu section.champ")))
}

pub fn set(path: &Path, key: &str, value: &str) -> Result<()> {
    let (section, field) = split_key(key)?;
    if let Some(problem) = check_field(field, value) {
        return Err(InvoiceError::Other(format!("[{section}] {field}: {problem}")));
    }
    let mut config = load_config_or_default(path)?;
    config.set(section, field, value.trim());
    save_config(&config, path)?;
    tracing::info!(%section, %field, "config field updated");
    println!("{section}.{field} = {}", value.trim());
    Ok(())
}
