//! Formula lexer
//!
//! Turns raw cell text into a flat run of [`Token`]s. Tokenizing never fails:
//! unrecognized characters become [`TokenKind::Illegal`] tokens, and the run is
//! always terminated by an [`TokenKind::EndOfCell`] sentinel.

use crate::token::{Token, TokenKind};

/// Tokenize a cell's raw text
///
/// # Example
/// ```rust
/// use tabula_formula::lexer::tokenize;
/// use tabula_formula::TokenKind;
///
/// let kinds: Vec<TokenKind> = tokenize("=A1+2").into_iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![TokenKind::Assign, TokenKind::CellIdentifier, TokenKind::Plus, TokenKind::Int, TokenKind::EndOfCell]
/// );
/// ```
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(text);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }

    tokens.push(Token::end_of_cell());
    tokens
}

/// Render a token run for debugging, one `Kind(literal)` per line
pub fn tokens_to_string(tokens: &[Token]) -> String {
    if tokens.is_empty() {
        return "No tokens".to_string();
    }
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let c = self.peek_char()?;

        let token = match c {
            '=' => self.one_or_two('=', TokenKind::Assign, TokenKind::Eq),
            '!' => self.one_or_two('=', TokenKind::Bang, TokenKind::NotEq),
            '>' => self.one_or_two('=', TokenKind::Gt, TokenKind::Ge),
            '<' => self.one_or_two('=', TokenKind::Lt, TokenKind::Le),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Asterisk),
            '/' => self.single(TokenKind::Slash),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '"' => self.scan_string(),
            c if c.is_ascii_digit() || c == '.' => self.scan_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier_or_cell(),
            _ => self.single(TokenKind::Illegal),
        };

        Some(token)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        Token::new(kind, &self.input[start..self.pos])
    }

    /// `first` alone, or `second` when followed by `next`
    fn one_or_two(&mut self, next: char, first: TokenKind, second: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        if self.peek_char() == Some(next) {
            self.advance();
            Token::new(second, &self.input[start..self.pos])
        } else {
            Token::new(first, &self.input[start..self.pos])
        }
    }

    fn scan_string(&mut self) -> Token {
        self.advance(); // Skip opening quote
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == '"' {
                break;
            }
            self.advance();
        }
        let content = &self.input[start..self.pos];
        self.advance(); // Skip closing quote, if any
        Token::new(TokenKind::String, content)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        let dots = text.matches('.').count();
        let kind = match dots {
            0 => TokenKind::Int,
            1 if text.len() > 1 => TokenKind::Float,
            _ => TokenKind::Illegal,
        };
        Token::new(kind, text)
    }

    fn scan_identifier_or_cell(&mut self) -> Token {
        if let Some(len) = self.cell_identifier_len() {
            let start = self.pos;
            self.pos += len;
            return Token::new(TokenKind::CellIdentifier, &self.input[start..self.pos]);
        }

        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphabetic() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        match text {
            "true" | "false" => Token::new(TokenKind::Bool, text),
            _ => Token::new(TokenKind::Identifier, text),
        }
    }

    /// Byte length of a `[A-Z]+[1-9][0-9]*` run at the cursor, if there is one
    fn cell_identifier_len(&self) -> Option<usize> {
        let bytes = &self.input.as_bytes()[self.pos..];
        let letters = bytes.iter().take_while(|b| b.is_ascii_uppercase()).count();
        if letters == 0 {
            return None;
        }

        let rest = &bytes[letters..];
        match rest.first() {
            Some(b'1'..=b'9') => {}
            _ => return None,
        }
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();

        Some(letters + digits)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }
}
