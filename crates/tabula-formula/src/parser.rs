//! Formula parser
//!
//! A Pratt (precedence-climbing) parser over the token run produced by the
//! [lexer](crate::lexer). Prefix and infix parse functions are selected by
//! token kind; the climbing loop keeps consuming infix operators while the
//! next operator binds tighter than the caller's threshold.
//!
//! Nesting past [`MAX_NESTING_DEPTH`] and ranges past
//! [`MAX_RANGE_CELLS`] are rejected as parse errors.

use std::borrow::Cow;

use tabula_core::CellPosition;

use crate::ast::{
    Expression, InfixOperator, Literal, PrefixOperator, RangePositions, MAX_RANGE_CELLS,
};
use crate::error::{ParseError, ParseResult};
use crate::lexer::tokenize;
use crate::token::{Precedence, Token, TokenKind};

/// Parse a token run into an expression
///
/// A run that does not start with `=` is plain text: its literals are joined
/// with single spaces into a string literal. A formula must be a single
/// expression followed by the end of the cell.
pub fn parse(tokens: &[Token]) -> ParseResult<Expression> {
    let tokens: Cow<'_, [Token]> = match tokens.last() {
        Some(last) if last.is(TokenKind::EndOfCell) => Cow::Borrowed(tokens),
        _ => {
            let mut owned = tokens.to_vec();
            owned.push(Token::end_of_cell());
            Cow::Owned(owned)
        }
    };

    if !tokens[0].is(TokenKind::Assign) {
        return Ok(Expression::string(concat_literals(&tokens)));
    }

    let mut parser = Parser::new(&tokens[1..]);
    let expr = parser.parse_expression(Precedence::Lowest)?;

    // Make sure we consumed all input
    if !parser.current_token().is(TokenKind::EndOfCell) {
        return Err(ParseError::UnconsumedTokens(concat_literals(
            &parser.tokens[parser.pos..],
        )));
    }

    Ok(expr)
}

/// Tokenize and parse raw cell text
///
/// # Example
/// ```rust
/// use tabula_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=Sum(A1:A10)").unwrap();
/// assert!(parse_formula("=(1+2").is_err());
/// ```
pub fn parse_formula(text: &str) -> ParseResult<Expression> {
    parse(&tokenize(text))
}

/// Join token literals with single spaces, skipping the end sentinel
fn concat_literals(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter(|t| !t.is(TokenKind::EndOfCell))
        .map(|t| t.literal.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deepest nesting of sub-expressions a formula may use
///
/// Bounds both parser recursion and the height of the finished tree, so
/// walking an accepted tree stays shallow as well.
pub const MAX_NESTING_DEPTH: usize = 256;

type PrefixFn<'a> = fn(&mut Parser<'a>) -> ParseResult<Expression>;
type InfixFn<'a> = fn(&mut Parser<'a>, Expression) -> ParseResult<Expression>;

/// Parser state over a token run that ends with `EndOfCell`
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Active `parse_expression` calls
    depth: usize,
    /// Height of the tree most recently built by `parse_expression`
    height: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            height: 0,
        }
    }

    // === Token helpers ===

    fn current_token(&self) -> &'a Token {
        // The run always ends with the sentinel, so clamp to it
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn consume(&mut self) -> &'a Token {
        let token = self.current_token();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    // === Dispatch tables ===

    fn prefix_fn(kind: TokenKind) -> Option<PrefixFn<'a>> {
        Some(match kind {
            TokenKind::Identifier => Self::parse_identifier,
            TokenKind::CellIdentifier => Self::parse_cell_identifier,
            TokenKind::Int => Self::parse_int_literal,
            TokenKind::Float => Self::parse_float_literal,
            TokenKind::Bool => Self::parse_bool_literal,
            TokenKind::String => Self::parse_string_literal,
            TokenKind::Minus | TokenKind::Bang => Self::parse_prefix_expression,
            TokenKind::LParen => Self::parse_grouped_expression,
            _ => return None,
        })
    }

    fn infix_fn(kind: TokenKind) -> Option<InfixFn<'a>> {
        Some(match kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Asterisk
            | TokenKind::Slash
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Gt
            | TokenKind::Ge
            | TokenKind::Lt
            | TokenKind::Le => Self::parse_infix_expression,
            TokenKind::Colon => Self::parse_cell_range,
            TokenKind::LParen => Self::parse_fn_call,
            _ => return None,
        })
    }

    // === Precedence climbing ===

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep);
        }
        self.depth += 1;
        let result = self.parse_expression_inner(precedence);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        let token = self.current_token();
        let prefix = Self::prefix_fn(token.kind)
            .ok_or_else(|| ParseError::MissingPrefix(token.literal.clone()))?;
        self.height = 0;
        let mut lhs = prefix(self)?;
        let mut height = self.height + 1;

        loop {
            let next = self.current_token();
            if next.is(TokenKind::EndOfCell) || next.kind.precedence() <= precedence {
                break;
            }
            let Some(infix) = Self::infix_fn(next.kind) else {
                break;
            };
            self.height = 0;
            lhs = infix(self, lhs)?;
            // Left-associative chains grow upwards without recursing
            height = height.max(self.height) + 1;
            if height > MAX_NESTING_DEPTH {
                return Err(ParseError::TooDeep);
            }
        }

        self.height = height;
        Ok(lhs)
    }

    // === Prefix parse functions ===

    fn parse_identifier(&mut self) -> ParseResult<Expression> {
        Ok(Expression::Identifier(self.consume().literal.clone()))
    }

    fn parse_cell_identifier(&mut self) -> ParseResult<Expression> {
        let pos = CellPosition::parse(&self.consume().literal)?;
        Ok(Expression::Cell(pos))
    }

    fn parse_int_literal(&mut self) -> ParseResult<Expression> {
        let literal = &self.consume().literal;
        literal
            .parse::<i64>()
            .map(Expression::int)
            .map_err(|_| ParseError::InvalidInt(literal.clone()))
    }

    fn parse_float_literal(&mut self) -> ParseResult<Expression> {
        let literal = &self.consume().literal;
        literal
            .parse::<f64>()
            .map(|f| Expression::Literal(Literal::Float(f)))
            .map_err(|_| ParseError::InvalidFloat(literal.clone()))
    }

    fn parse_bool_literal(&mut self) -> ParseResult<Expression> {
        let value = self.consume().literal == "true";
        Ok(Expression::Literal(Literal::Bool(value)))
    }

    fn parse_string_literal(&mut self) -> ParseResult<Expression> {
        Ok(Expression::string(self.consume().literal.clone()))
    }

    fn parse_prefix_expression(&mut self) -> ParseResult<Expression> {
        let operator = match self.consume().kind {
            TokenKind::Bang => PrefixOperator::Not,
            _ => PrefixOperator::Negate,
        };
        let operand = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::Prefix {
            operator,
            operand: Box::new(operand),
        })
    }

    fn parse_grouped_expression(&mut self) -> ParseResult<Expression> {
        self.consume(); // (
        let expr = self.parse_expression(Precedence::Lowest)?;
        let closing = self.current_token();
        if !closing.is(TokenKind::RParen) {
            return Err(ParseError::UnclosedGroup(closing.literal.clone()));
        }
        self.consume();
        Ok(expr)
    }

    // === Infix parse functions ===

    fn parse_infix_expression(&mut self, lhs: Expression) -> ParseResult<Expression> {
        let token = self.consume();
        let operator = InfixOperator::from_token_kind(token.kind)
            .ok_or_else(|| ParseError::MissingPrefix(token.literal.clone()))?;
        let rhs = self.parse_expression(token.kind.precedence())?;
        Ok(Expression::Infix {
            lhs: Box::new(lhs),
            operator,
            rhs: Box::new(rhs),
        })
    }

    fn parse_cell_range(&mut self, begin: Expression) -> ParseResult<Expression> {
        self.consume(); // :
        let end = self.parse_expression(Precedence::CellRange)?;
        if let (Expression::Cell(a), Expression::Cell(b)) = (&begin, &end) {
            if RangePositions::cell_count(*a, *b) > MAX_RANGE_CELLS {
                return Err(ParseError::RangeTooLarge(format!("{}:{}", a, b)));
            }
        }
        Ok(Expression::CellRange {
            begin: Box::new(begin),
            end: Box::new(end),
        })
    }

    fn parse_fn_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        self.consume(); // (
        let arguments = self.parse_call_arguments()?;
        Ok(Expression::FnCall {
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_call_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();

        if self.current_token().is(TokenKind::RParen) {
            self.consume();
            return Ok(arguments);
        }

        arguments.push(self.parse_expression(Precedence::Lowest)?);
        let mut height = self.height;
        while self.current_token().is(TokenKind::Comma) {
            self.consume();
            arguments.push(self.parse_expression(Precedence::Lowest)?);
            height = height.max(self.height);
        }

        let closing = self.current_token();
        if !closing.is(TokenKind::RParen) {
            return Err(ParseError::UnclosedArguments(closing.literal.clone()));
        }
        self.consume();

        self.height = height;
        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pos(s: &str) -> CellPosition {
        s.parse().unwrap()
    }

    fn render(text: &str) -> String {
        parse_formula(text).unwrap().to_string()
    }

    #[test]
    fn test_empty_token_run() {
        assert_eq!(parse(&[]).unwrap(), Expression::string(""));
        assert_eq!(parse_formula("").unwrap(), Expression::string(""));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse_formula("hello   world").unwrap(),
            Expression::string("hello world")
        );
        assert_eq!(parse_formula("42").unwrap(), Expression::string("42"));
        assert_eq!(
            parse_formula("Sum(A1)").unwrap(),
            Expression::string("Sum ( A1 )")
        );
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("=42").unwrap(), Expression::int(42));
        assert_eq!(
            parse_formula("=3.5").unwrap(),
            Expression::Literal(Literal::Float(3.5))
        );
        assert_eq!(
            parse_formula("=.5").unwrap(),
            Expression::Literal(Literal::Float(0.5))
        );
        assert_eq!(
            parse_formula("=true").unwrap(),
            Expression::Literal(Literal::Bool(true))
        );
        assert_eq!(
            parse_formula("=\"hi there\"").unwrap(),
            Expression::string("hi there")
        );
    }

    #[test]
    fn test_parse_cell_reference() {
        assert_eq!(parse_formula("=B2").unwrap(), Expression::Cell(pos("B2")));
        assert!(matches!(
            parse_formula("=A99999"),
            Err(ParseError::InvalidCell(_))
        ));
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(render("=1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(render("=(1 + 2) * 3"), "((1 + 2) * 3)");
        assert_eq!(render("=1 - 2 - 3"), "((1 - 2) - 3)");
        assert_eq!(render("=1 + 2 > 2 == true"), "(((1 + 2) > 2) == true)");
        assert_eq!(render("=-1 * 2"), "((-1) * 2)");
        assert_eq!(render("=!true != false"), "((!true) != false)");
        assert_eq!(render("=A1 >= B1"), "(A1 >= B1)");
    }

    #[test]
    fn test_parse_cell_range() {
        assert_eq!(
            parse_formula("=A1:B3").unwrap(),
            Expression::CellRange {
                begin: Box::new(Expression::Cell(pos("A1"))),
                end: Box::new(Expression::Cell(pos("B3"))),
            }
        );
        assert_eq!(render("=A1:B3 * 2"), "(A1:B3 * 2)");
    }

    #[test]
    fn test_parse_function() {
        assert_eq!(
            parse_formula("= Sum(B2:D4, 5, A1, (5*2), -1)").unwrap(),
            Expression::FnCall {
                callee: Box::new(Expression::Identifier("Sum".into())),
                arguments: vec![
                    Expression::CellRange {
                        begin: Box::new(Expression::Cell(pos("B2"))),
                        end: Box::new(Expression::Cell(pos("D4"))),
                    },
                    Expression::int(5),
                    Expression::Cell(pos("A1")),
                    Expression::Infix {
                        lhs: Box::new(Expression::int(5)),
                        operator: InfixOperator::Multiply,
                        rhs: Box::new(Expression::int(2)),
                    },
                    Expression::Prefix {
                        operator: PrefixOperator::Negate,
                        operand: Box::new(Expression::int(1)),
                    },
                ],
            }
        );
    }

    #[test]
    fn test_parse_empty_and_nested_calls() {
        assert_eq!(render("=Pi()"), "Pi()");
        assert_eq!(render("=Sqrt(Sum(1, 2)) + 1"), "(Sqrt(Sum(1, 2)) + 1)");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_formula("=1 2 3"),
            Err(ParseError::UnconsumedTokens("2 3".into()))
        );
        assert_eq!(
            parse_formula("="),
            Err(ParseError::MissingPrefix("EOC".into()))
        );
        assert_eq!(
            parse_formula("=*2"),
            Err(ParseError::MissingPrefix("*".into()))
        );
        assert_eq!(
            parse_formula("=(1 + 2"),
            Err(ParseError::UnclosedGroup("EOC".into()))
        );
        assert_eq!(
            parse_formula("=Sum(1, 2"),
            Err(ParseError::UnclosedArguments("EOC".into()))
        );
        assert_eq!(
            parse_formula("=99999999999999999999"),
            Err(ParseError::InvalidInt("99999999999999999999".into()))
        );
        assert_eq!(
            parse_formula("=1 +"),
            Err(ParseError::MissingPrefix("EOC".into()))
        );
    }

    #[test]
    fn test_parse_range_size_limit() {
        assert!(parse_formula("=Sum(A1:A65535)").is_ok());
        assert!(parse_formula("=A1:P65535").is_ok());
        assert!(parse_formula("=A1:Q65535").is_err());
        assert_eq!(
            parse_formula("=Sum(B1:CRXO65535)"),
            Err(ParseError::RangeTooLarge("B1:CRXO65535".into()))
        );
        assert_eq!(
            parse_formula("=CRXO65535:A1").unwrap_err().to_string(),
            "Cell range too large: `CRXO65535:A1`"
        );
    }

    #[test]
    fn test_parse_nesting_limit() {
        let nested = |depth: usize| format!("={}1", "-".repeat(depth));
        assert!(parse_formula(&nested(100)).is_ok());
        assert_eq!(parse_formula(&nested(2000)), Err(ParseError::TooDeep));

        let grouped = |depth: usize| format!("={}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_formula(&grouped(100)).is_ok());
        assert_eq!(parse_formula(&grouped(2000)), Err(ParseError::TooDeep));

        let calls = |depth: usize| format!("={}1{}", "Abs(".repeat(depth), ")".repeat(depth));
        assert!(parse_formula(&calls(100)).is_ok());
        assert_eq!(parse_formula(&calls(2000)), Err(ParseError::TooDeep));

        assert_eq!(
            parse_formula(&nested(2000)).unwrap_err().to_string(),
            "Formula nested too deeply"
        );
    }

    #[test]
    fn test_parse_long_chains_are_bounded() {
        let chain = |terms: usize| format!("={}", vec!["1"; terms].join(" + "));
        assert!(parse_formula(&chain(200)).is_ok());
        assert_eq!(parse_formula(&chain(20_000)), Err(ParseError::TooDeep));

        // Wide argument lists stay shallow
        let wide = format!("=Sum({})", vec!["1"; 5000].join(", "));
        assert!(parse_formula(&wide).is_ok());
    }

    #[test]
    fn test_parse_error_messages() {
        assert_eq!(
            parse_formula("=1 2").unwrap_err().to_string(),
            "Couldn't parse: `2`"
        );
        assert_eq!(
            parse_formula("=(1").unwrap_err().to_string(),
            "expected: `)`, got: `EOC`"
        );
        assert_eq!(
            parse_formula("=Sum(1 2)").unwrap_err().to_string(),
            "Parsing arguments error, Expected: `)`, Got: `2`"
        );
    }
}
