use thiserror::Error;

use crate::models::Field;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid filename format: {filename:?}; expected {{site}}-{{assessment}}-*.xlsx")]
    FilenameFormat { filename: String },

    #[error("unsupported spreadsheet format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read spreadsheet: {0}")]
    Read(String),

    #[error("spreadsheet has no sheets or no header row")]
    EmptySheet,

    #[error("required column {field} is missing from the spreadsheet")]
    MissingColumn { field: Field },

    #[error("failed to build workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

impl PipelineError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PipelineError::Workbook(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
