use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fichier de configuration '{0}' non trouvé.")]
    ConfigNotFound(String),

    #[error("Le champ '{section}.{field}' n'est pas configuré dans {path}")]
    ConfigField {
        section: String,
        field: String,
        path: String,
    },

    #[error("Le fichier Excel '{0}' est introuvable.")]
    SourceNotFound(String),

    #[error("Lecture du classeur impossible: {0}")]
    Workbook(String),

    #[error("Feuille '{0}' introuvable dans le classeur.")]
    SheetNotFound(String),

    #[error("La colonne '{0}' est manquante.")]
    MissingColumn(String),

    #[error("Aucune donnée trouvée pour {month_name} {year}")]
    NoDataForPeriod { month_name: String, year: i32 },

    #[error("Aucune donnée de revenus regroupée.")]
    NoMarkets,

    #[error("Période invalide: {0}")]
    InvalidPeriod(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("Une génération est déjà en cours.")]
    Busy,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
