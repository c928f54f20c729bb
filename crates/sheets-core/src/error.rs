//! Error types for sheets core.

use thiserror::Error;

/// Errors returned when the workbook API is used outside its contract.
///
/// Problems inside formulas are not errors here: they become cell values.
#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid sheet name: {0:?}")]
    InvalidSheetName(String),

    #[error("Sheet name already in use: {0}")]
    DuplicateSheetName(String),

    #[error("Invalid cell location: {0}")]
    InvalidLocation(String),

    #[error("Sheet index {index} out of range for {len} sheets")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid sort columns: {0}")]
    InvalidSortColumns(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SheetsError>;
