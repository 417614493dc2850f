//! Token vocabulary shared by the lexer and the parser

use std::fmt;

/// Kind of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Character sequence the lexer does not recognize
    Illegal,
    /// Terminal sentinel appended to every token run
    EndOfCell,

    // Literal classes
    Identifier,
    CellIdentifier,
    Bool,
    Int,
    Float,
    String,

    // Structural
    Assign,
    Comma,
    Colon,
    LParen,
    RParen,

    // Operators
    Bang,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Eq,
    NotEq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl TokenKind {
    /// Name used in debug renderings of token runs
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Illegal => "Illegal",
            TokenKind::EndOfCell => "EndOfCell",
            TokenKind::Identifier => "Identifier",
            TokenKind::CellIdentifier => "CellIdentifier",
            TokenKind::Bool => "Bool",
            TokenKind::Int => "Int",
            TokenKind::Float => "Float",
            TokenKind::String => "String",
            TokenKind::Assign => "Assign",
            TokenKind::Comma => "Comma",
            TokenKind::Colon => "Colon",
            TokenKind::LParen => "LParen",
            TokenKind::RParen => "RParen",
            TokenKind::Bang => "Bang",
            TokenKind::Plus => "Plus",
            TokenKind::Minus => "Minus",
            TokenKind::Asterisk => "Asterisk",
            TokenKind::Slash => "Slash",
            TokenKind::Eq => "Eq",
            TokenKind::NotEq => "NotEq",
            TokenKind::Gt => "Gt",
            TokenKind::Lt => "Lt",
            TokenKind::Ge => "Ge",
            TokenKind::Le => "Le",
        }
    }

    /// Binding power of the kind when it appears in infix position
    pub fn precedence(&self) -> Precedence {
        match self {
            TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
            TokenKind::Gt | TokenKind::Ge | TokenKind::Lt | TokenKind::Le => {
                Precedence::LessGreater
            }
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::Colon => Precedence::CellRange,
            TokenKind::LParen => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

/// Operator binding power, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    /// `==` `!=`
    Equals,
    /// `>` `>=` `<` `<=`
    LessGreater,
    /// `+` `-`
    Sum,
    /// `*` `/`
    Product,
    /// `:`
    CellRange,
    /// `-x` `!x`
    Prefix,
    /// `f(...)`
    Call,
}

/// A lexed token: its kind plus the source text it was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

impl Token {
    /// Create a new token
    pub fn new<S: Into<String>>(kind: TokenKind, literal: S) -> Self {
        Self {
            kind,
            literal: literal.into(),
        }
    }

    /// The `EndOfCell` sentinel
    pub fn end_of_cell() -> Self {
        Self::new(TokenKind::EndOfCell, "EOC")
    }

    /// Check if this token is of the given kind
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.name(), self.literal)
    }
}
