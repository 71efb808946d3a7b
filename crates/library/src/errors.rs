use thiserror::Error;

pub type LibraryResult<T = ()> = std::result::Result<T, LibraryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("LIBRARY_MATH_ERROR")]
    MathOverflow,

    #[error("LIBRARY_CASTING_ERROR")]
    CastingFailure,

    #[error("LIBRARY_DIVISION_BY_ZERO")]
    DivisionByZero,

    #[error("malformed buffer: need {needed} bytes at offset {offset}, {available} available")]
    MalformedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("discriminator mismatch: expected {expected:?}, found {found:?}")]
    DiscriminatorMismatch { expected: [u8; 8], found: [u8; 8] },

    #[error("ring buffer capacity must be non-zero")]
    ZeroCapacity,

    #[error("ring cursor {cursor} points past the {rows} written rows")]
    CursorOutOfRange { cursor: usize, rows: usize },

    #[error("invalid decimal literal: {0}")]
    InvalidDecimal(String),
}
