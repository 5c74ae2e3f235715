//! Error types for zkgen.

use std::fmt;

use crate::query::{LexerError, ParseError, PlanError};

/// The main error type for zkgen operations.
#[derive(Debug)]
pub enum Error {
    /// Configuration rejected at construction or load time
    InvalidConfiguration(String),

    /// I/O error
    Io(std::io::Error),

    /// Config file or circuit input could not be (de)serialized
    Serialization(String),

    /// Query text could not be parsed
    Parse(ParseError),

    /// Parsed query could not be lowered into a circuit
    Plan(PlanError),

    /// Circuit input does not fit the configuration
    InvalidInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Parse(e) => write!(f, "Query parse error: {}", e),
            Error::Plan(e) => write!(f, "Query plan error: {}", e),
            Error::InvalidInput(msg) => write!(f, "Invalid circuit input: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Parse(e) => Some(e),
            Error::Plan(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<LexerError> for Error {
    fn from(err: LexerError) -> Self {
        Error::Parse(ParseError::LexerError(err))
    }
}

impl From<PlanError> for Error {
    fn from(err: PlanError) -> Self {
        Error::Plan(err)
    }
}

/// A specialized `Result` type for zkgen operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_includes_message() {
        let err = Error::InvalidConfiguration("num_cols must be non-negative, got -1".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: num_cols must be non-negative, got -1"
        );
    }

    #[test]
    fn test_parse_error_is_source() {
        let err: Error = ParseError::EmptySelectList.into();
        assert!(err.source().is_some());
        assert!(matches!(err, Error::Parse(ParseError::EmptySelectList)));
    }

    #[test]
    fn test_lexer_error_wraps_into_parse() {
        let err: Error = LexerError::InvalidNumber("99999999999999999999".into()).into();
        assert!(matches!(err, Error::Parse(ParseError::LexerError(_))));
    }
}
