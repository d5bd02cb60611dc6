//! Error types for dynbwt

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised by index construction and persistence
#[derive(Error, Debug)]
pub enum IndexError {
    /// Inserted text does not end with the endmarker
    #[error("the text must end with an endmarker")]
    MissingEndmarker,

    /// Alphabet window with a real offset not below the alphabet size
    #[error("cannot set offset {offset} with alphabet size {alphabet_size}")]
    InvalidAlphabet { offset: usize, alphabet_size: usize },

    /// Persisted index could not be decoded
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// Encoded records do not fit the sparse positional index
    #[error("encoded records too large for the node index: {0} bytes")]
    StreamTooLarge(usize),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
