//! Domain error types.

/// Why a single data row was rejected during stream building.
///
/// Row failures are data, not errors: they are accumulated and returned
/// alongside the successfully parsed executions, never aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowReason {
    #[error("missing symbol")]
    MissingSymbol,

    #[error("invalid side \"{0}\"")]
    InvalidSide(String),

    #[error("invalid quantity \"{0}\"")]
    InvalidQuantity(String),

    #[error("invalid price \"{0}\"")]
    InvalidPrice(String),

    #[error("invalid commission \"{0}\"")]
    InvalidCommission(String),

    #[error("invalid timestamp \"{0}\"")]
    InvalidTimestamp(String),
}

impl RowReason {
    /// True for the missing-symbol case, which the parse summary counts
    /// separately from other invalid fields.
    pub fn is_missing_symbol(&self) -> bool {
        matches!(self, RowReason::MissingSymbol)
    }
}

/// Top-level error type for tradebook.
#[derive(Debug, thiserror::Error)]
pub enum TradebookError {
    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("failed to read {file}: {reason}")]
    Read { file: String, reason: String },

    #[error("no header row or data rows found in {file}")]
    EmptyInput { file: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no valid executions found")]
    NoExecutions,

    #[error("no trades could be built from the parsed executions")]
    NoTrades,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradebookError> for std::process::ExitCode {
    fn from(err: &TradebookError) -> Self {
        let code: u8 = match err {
            TradebookError::Io(_) => 1,
            TradebookError::ConfigParse { .. } | TradebookError::ConfigInvalid { .. } => 2,
            TradebookError::Read { .. } | TradebookError::EmptyInput { .. } => 3,
            TradebookError::MissingColumns { .. } => 4,
            TradebookError::NoExecutions | TradebookError::NoTrades => 5,
        };
        std::process::ExitCode::from(code)
    }
}
