//! Error types for parsing and converting the fundamental types.

use thiserror::Error;

/// Why a display amount could not be converted into base units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount: {0}")]
    Invalid(String),

    #[error("amount is smaller than one base unit")]
    Zero,

    #[error("amount does not fit in a token account")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown burn method: {0}")]
    BurnMethod(String),

    #[error("unknown burn status: {0}")]
    BurnStatus(String),
}
