use std::collections::BTreeSet;

use thiserror::Error;

/// Structural problem with an upload. Halts the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Missing columns: {}", format_columns(.missing))]
    MissingColumns { missing: BTreeSet<String> },
}

impl SchemaError {
    pub fn missing(&self) -> &BTreeSet<String> {
        match self {
            SchemaError::MissingColumns { missing } => missing,
        }
    }
}

fn format_columns(columns: &BTreeSet<String>) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| format!("'{c}'")).collect();
    format!("{{{}}}", quoted.join(", "))
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse delimited data: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("upload {0} has no header row or worksheet")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV writer flush failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("exported CSV is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
