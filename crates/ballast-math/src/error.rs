//! error types for fixed-point arithmetic

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("signed delta out of range")]
    SignedOverflow,

    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),
}

pub type Result<T> = std::result::Result<T, MathError>;
