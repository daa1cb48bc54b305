use thiserror::Error;

/// Errors that can occur when building filter expressions.
///
/// Malformed syntax is never an error: the lexer ignores what it cannot
/// place. Only the hard size ceiling is reported.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Filter text is too long: {len} bytes (maximum {max})")]
    TooLong { len: usize, max: usize },
}
