//! Domain error types.

use crate::domain::money::Cents;

/// Top-level error type for papertrade.
///
/// The business variants (validation through not-owned) are definitive
/// rejections surfaced to the user with a readable message; none warrant a
/// retry. `Storage` aborts the current operation without partial effect.
#[derive(Debug, thiserror::Error)]
pub enum PapertradeError {
    #[error("{reason}")]
    Validation { reason: String },

    #[error("username {username} is already taken")]
    Conflict { username: String },

    #[error("{reason}")]
    Auth { reason: String },

    #[error("no quote available for {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Cents, available: Cents },

    #[error("cannot sell {requested} shares of {symbol}: only {held} held")]
    InsufficientShares {
        symbol: String,
        requested: u32,
        held: u32,
    },

    #[error("no position held in {symbol}")]
    NotOwned { symbol: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PapertradeError {
    pub fn validation(reason: impl Into<String>) -> Self {
        PapertradeError::Validation {
            reason: reason.into(),
        }
    }

    pub fn auth(reason: impl Into<String>) -> Self {
        PapertradeError::Auth {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl ToString) -> Self {
        PapertradeError::Storage {
            reason: reason.to_string(),
        }
    }
}

impl From<&PapertradeError> for std::process::ExitCode {
    fn from(err: &PapertradeError) -> Self {
        let code: u8 = match err {
            PapertradeError::Io(_) => 1,
            PapertradeError::ConfigParse { .. }
            | PapertradeError::ConfigMissing { .. }
            | PapertradeError::ConfigInvalid { .. } => 2,
            PapertradeError::Storage { .. } => 3,
            PapertradeError::Validation { .. }
            | PapertradeError::Conflict { .. }
            | PapertradeError::Auth { .. } => 4,
            PapertradeError::UnknownSymbol { .. }
            | PapertradeError::InsufficientFunds { .. }
            | PapertradeError::InsufficientShares { .. }
            | PapertradeError::NotOwned { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
