use thiserror::Error;

#[derive(Error, Debug)]
pub enum RittenError {
    /// Missing or unacceptable upload
    #[error("{0}")]
    BadRequest(String),

    #[error("XML parsing error: {0}")]
    Parse(String),

    /// Unknown session id (kept for logging; the message stays generic)
    #[error("Sessie niet gevonden")]
    NotFound(String),

    #[error("Error processing XML: {0}")]
    Processing(String),

    #[error("Fout bij genereren Excel bestand: {0}")]
    Export(String),

    /// Failure outside the XML and workbook code, e.g. a crashed worker task
    #[error("Onverwachte fout: {0}")]
    Unexpected(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rust_xlsxwriter::XlsxError> for RittenError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        RittenError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RittenError>;
