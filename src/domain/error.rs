//! Domain error types.

/// Top-level error type for portdex.
#[derive(Debug, thiserror::Error)]
pub enum PortdexError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no snapshot with positive value and zero cash flow to anchor the index")]
    NoBaseSnapshot,

    #[error("snapshot at {datetime} cannot anchor the index: {reason}")]
    InvalidBaseSnapshot { datetime: String, reason: String },

    #[error("trade parse error at line {line}: {reason}")]
    TradeParse { line: u64, reason: String },

    #[error("market data error for {ticker}: {reason}")]
    MarketData { ticker: String, reason: String },

    #[error("cancelled after {completed} steps")]
    Cancelled { completed: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PortdexError> for std::process::ExitCode {
    fn from(err: &PortdexError) -> Self {
        let code: u8 = match err {
            PortdexError::Io(_) => 1,
            PortdexError::ConfigParse { .. }
            | PortdexError::ConfigMissing { .. }
            | PortdexError::ConfigInvalid { .. } => 2,
            PortdexError::Database { .. } | PortdexError::DatabaseQuery { .. } => 3,
            PortdexError::TradeParse { .. } | PortdexError::MarketData { .. } => 4,
            PortdexError::NoBaseSnapshot | PortdexError::InvalidBaseSnapshot { .. } => 5,
            PortdexError::Cancelled { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
