use std::path::PathBuf;

use thiserror::Error;

use crate::harvest::HarvestError;

#[derive(Debug, Error)]
pub enum InvoicerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Harvest error: {0}")]
    Harvest(#[from] HarvestError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures reading or writing the durable record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("cannot open spreadsheet {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("spreadsheet {0} has no sheets")]
    MissingSheet(PathBuf),

    #[error("cannot write spreadsheet {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Template problems found before an invoice is generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("The xlsx template was not found at {0}")]
    MissingTemplate(PathBuf),

    #[error("The xlsx template could not be read: {0}")]
    Unreadable(String),

    #[error("The following variables are missing in the xlsx template:\n {}", format_missing(.0))]
    MissingVariables(Vec<String>),
}

fn format_missing(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("{{{{{name}}}}}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("no contract type selected")]
    MissingContract,

    #[error("no {0} entered")]
    MissingAmount(&'static str),

    #[error("no hours tracked, cannot derive an hourly rate")]
    NoHours,

    #[error("'{0}' is not a valid amount")]
    InvalidRate(String),
}
