use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("end_date cannot be earlier than start_date")]
    DateOrder,

    #[error("Failed to parse date: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("forestMask expects [buffer, start_date, end_date], got {0} fields")]
    ForestMaskArity(usize),

    #[error("invalid forestMask entry: {0}")]
    ForestMaskValue(String),

    #[error("Invalid region: {0}")]
    Region(String),
}
