//! Recursive-descent parser and evaluator for the tiny boolean expressions Inno Setup stores
//! in `components`/`tasks`/`languages`/`check` strings.
//!
//! Grounded in `setup::expression_match`/`evaluator` (`original_source/src/setup/expression.cpp`).
//! Grammar:
//!
//! ```text
//! expr       := term  ( ('or' | implicit-or) term )*
//! term       := factor ( 'and' factor )*
//! factor     := 'not' factor | '(' expr ')' | identifier
//! identifier := [A-Za-z_-] [A-Za-z0-9_\-]*
//! ```

use std::fmt;

#[derive(Debug, Eq, PartialEq)]
pub struct ExpressionParseError(String);

impl fmt::Display for ExpressionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ExpressionParseError {}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-'
}

fn is_identifier(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit() || c == '\\'
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Token<'a> {
    End,
    Or,
    And,
    Not,
    ParenLeft,
    ParenRight,
    Identifier(&'a str),
}

struct Lexer<'a> {
    rest: &'a str,
}

impl<'a> Lexer<'a> {
    const fn new(expr: &'a str) -> Self {
        Self { rest: expr }
    }

    fn next(&mut self) -> Result<Token<'a>, ExpressionParseError> {
        self.rest = self.rest.trim_start();

        let mut chars = self.rest.chars();
        let Some(c) = chars.next() else {
            return Ok(Token::End);
        };

        if c == '(' {
            self.rest = chars.as_str();
            return Ok(Token::ParenLeft);
        }
        if c == ')' {
            self.rest = chars.as_str();
            return Ok(Token::ParenRight);
        }

        if is_identifier_start(c) {
            let len = self
                .rest
                .char_indices()
                .find(|&(_, c)| !is_identifier(c))
                .map_or(self.rest.len(), |(i, _)| i);
            let word = &self.rest[..len];
            self.rest = &self.rest[len..];
            return Ok(match word {
                "not" => Token::Not,
                "and" => Token::And,
                "or" => Token::Or,
                identifier => Token::Identifier(identifier),
            });
        }

        Err(ExpressionParseError(format!("unexpected symbol: {c}")))
    }
}

/// A parsed boolean expression, ready to be evaluated against a single "true" identifier.
pub struct Expression<'a> {
    source: &'a str,
}

impl<'a> Expression<'a> {
    /// Validates `source` without evaluating it.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is not a well-formed expression.
    pub fn parse(source: &'a str) -> Result<Self, ExpressionParseError> {
        Evaluator::new(source, "").eval()?;
        Ok(Self { source })
    }

    /// Returns `true` iff the expression is satisfied with `test` assigned true and all other
    /// identifiers assigned false.
    fn evaluate(&self, test: &str) -> Result<bool, ExpressionParseError> {
        Evaluator::new(self.source, test).eval()
    }
}

struct Evaluator<'a> {
    test: &'a str,
    lexer: Lexer<'a>,
    token: Token<'a>,
}

impl<'a> Evaluator<'a> {
    fn new(expr: &'a str, test: &'a str) -> Self {
        Self {
            test,
            lexer: Lexer::new(expr),
            token: Token::End,
        }
    }

    fn advance(&mut self) -> Result<(), ExpressionParseError> {
        self.token = self.lexer.next()?;
        Ok(())
    }

    fn eval_identifier(&mut self, lazy: bool) -> Result<bool, ExpressionParseError> {
        let Token::Identifier(name) = self.token else {
            unreachable!("eval_identifier called on a non-identifier token");
        };
        let result = lazy || name == self.test;
        self.advance()?;
        Ok(result)
    }

    fn eval_factor(&mut self, lazy: bool) -> Result<bool, ExpressionParseError> {
        match self.token {
            Token::ParenLeft => {
                self.advance()?;
                let result = self.eval_expression(lazy, true)?;
                if self.token != Token::ParenRight {
                    return Err(ExpressionParseError(
                        "expected closing parenthesis".to_owned(),
                    ));
                }
                self.advance()?;
                Ok(result)
            }
            Token::Not => {
                self.advance()?;
                Ok(!self.eval_factor(lazy)?)
            }
            Token::Identifier(_) => self.eval_identifier(lazy),
            _ => Err(ExpressionParseError("unexpected token".to_owned())),
        }
    }

    fn eval_term(&mut self, lazy: bool) -> Result<bool, ExpressionParseError> {
        let mut result = self.eval_factor(lazy)?;
        while self.token == Token::And {
            self.advance()?;
            result = self.eval_factor(lazy || !result)? && result;
        }
        Ok(result)
    }

    /// `inner` mirrors the original's non-short-circuiting top-level call: only the outermost
    /// invocation may return as soon as the result is known without consuming all tokens.
    fn eval_expression(&mut self, lazy: bool, inner: bool) -> Result<bool, ExpressionParseError> {
        let mut result = self.eval_term(lazy)?;
        if result && !inner {
            return Ok(result);
        }
        while self.token == Token::Or || matches!(self.token, Token::Identifier(_)) {
            if self.token == Token::Or {
                self.advance()?;
            }
            result = self.eval_term(lazy || result)? || result;
            if result && !inner {
                return Ok(result);
            }
        }
        Ok(result)
    }

    fn eval(mut self) -> Result<bool, ExpressionParseError> {
        self.advance()?;
        self.eval_expression(false, false)
    }
}

/// Returns true iff `expression` is satisfied with `test` assigned true and all other
/// identifiers assigned false.
///
/// A malformed expression does not propagate an error: it logs a warning and returns `true`
/// (fail open), matching the original implementation's must-not-crash semantics.
#[must_use]
pub fn expression_match(test: &str, expression: &str) -> bool {
    match Expression { source: expression }.evaluate(test) {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(%expression, %error, "failed to evaluate expression");
            true
        }
    }
}

/// Returns true if `expression` is just a single identifier (no operators), the common case
/// for an unconditional `components`/`tasks` string.
#[must_use]
pub fn is_simple_expression(expression: &str) -> bool {
    let mut chars = expression.chars();
    match chars.next() {
        None => return true,
        Some(c) if !is_identifier_start(c) => return false,
        Some(_) => {}
    }
    chars.all(is_identifier)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Expression, expression_match, is_simple_expression};

    #[rstest]
    #[case("full", "full", true)]
    #[case("full", "compact", false)]
    #[case("not full", "full", false)]
    #[case("not full", "compact", true)]
    #[case("full or compact", "compact", true)]
    #[case("full and compact", "full", false)]
    #[case("(full or compact) and not help", "help", false)]
    // An empty expression fails to parse (no tokens for `eval_factor`) and fails open.
    #[case("", "anything", true)]
    fn evaluates_expected_result(#[case] expr: &str, #[case] test: &str, #[case] expected: bool) {
        assert_eq!(expression_match(test, expr), expected);
    }

    #[test]
    fn malformed_expression_fails_open() {
        assert!(expression_match("full", "(full"));
        assert!(expression_match("full", "full and"));
    }

    #[test]
    fn parse_rejects_malformed_expression() {
        assert!(Expression::parse("(full").is_err());
        assert!(Expression::parse("full and full").is_ok());
    }

    #[test]
    fn simple_expression_detection() {
        assert!(is_simple_expression(""));
        assert!(is_simple_expression("full"));
        assert!(!is_simple_expression("full or compact"));
        assert!(!is_simple_expression("not full"));
    }
}
