use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Column '{0}' does not exist.")]
    UnknownColumn(String),

    #[error("{0}")]
    Validation(String),

    /// A destructive command needs an explicit confirmation token.
    #[error("Warning: {message}")]
    ConfirmationRequired { rows: usize, message: String },

    #[error("Unknown command: '{0}'. Type 'help' for available commands.")]
    UnknownCommand(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CommandError>;
