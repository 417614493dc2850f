//! Formula error types

use thiserror::Error;

/// Result type for parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while parsing a formula
///
/// Parse errors never cross the engine boundary as Rust errors: the evaluator
/// turns them into `Value::Error` carrying the display message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Tokens were left over after a complete expression
    #[error("Couldn't parse: `{0}`")]
    UnconsumedTokens(String),

    /// No prefix parse function exists for the token
    #[error("Prefix expression for: `{0}` not implemented")]
    MissingPrefix(String),

    /// A parenthesized group was not closed
    #[error("expected: `)`, got: `{0}`")]
    UnclosedGroup(String),

    /// A function argument list was not closed
    #[error("Parsing arguments error, Expected: `)`, Got: `{0}`")]
    UnclosedArguments(String),

    /// Integer literal does not fit the int type
    #[error("Couldn't parse: `{0}` to int")]
    InvalidInt(String),

    /// Float literal could not be read
    #[error("Couldn't parse: `{0}` to float")]
    InvalidFloat(String),

    /// Range encloses more cells than a formula may read
    #[error("Cell range too large: `{0}`")]
    RangeTooLarge(String),

    /// Expression nests deeper than the parser follows
    #[error("Formula nested too deeply")]
    TooDeep,

    /// Cell identifier names a position outside the sheet bounds
    #[error("Invalid cell: {0}")]
    InvalidCell(#[from] tabula_core::Error),
}
