//! Arithmetic calculator.
//!
//! A small recursive-descent evaluator. Accepted input: integer and decimal
//! numerals, `+ - * / // % **`, unary sign, parentheses and whitespace.
//! Nothing is ever handed to an interpreter.

use async_trait::async_trait;
use serde_json::{json, Value};

use study_agent_core::{
    traits::Tool,
    types::{tool_names, ToolOutput},
    Error, Result, ToolError,
};

const ALLOWED_CHARS: &str = "0123456789.+-*/%() ";

/// Deepest nesting of parentheses, unary signs and exponents accepted.
pub const MAX_DEPTH: usize = 64;

/// Longest expression pulled out of free text.
pub const MAX_EXPRESSION_LEN: usize = 256;

// =============================================================================
// Evaluator
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    FloorDiv,
    Percent,
    Pow,
    LParen,
    RParen,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::Tool(ToolError::InvalidExpression(msg.into()))
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("bad numeral '{}'", text)))?;
                tokens.push(Token::Num(value));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::FloorDiv);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(invalid(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Run `f` one nesting level deeper.
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<f64>) -> Result<f64> {
        if self.depth >= MAX_DEPTH {
            return Err(invalid(format!("expression nested deeper than {}", MAX_DEPTH)));
        }
        self.depth += 1;
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(tok @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let rhs = self.term()?;
            value = if tok == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(tok @ (Token::Star | Token::Slash | Token::FloorDiv | Token::Percent)) =
            self.peek()
        {
            self.advance();
            let rhs = self.unary()?;
            value = match tok {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => return Err(invalid("division by zero")),
                Token::Slash => value / rhs,
                Token::FloorDiv => (value / rhs).floor(),
                // Floor modulo: result takes the sign of the divisor.
                _ => value - rhs * (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(-self.nested(Self::unary)?)
            }
            Some(Token::Plus) => {
                self.advance();
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    // power := atom ('**' unary)?   (right-associative)
    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.advance();
            let exp = self.nested(Self::unary)?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(invalid("missing closing parenthesis")),
                }
            }
            Some(tok) => Err(invalid(format!("unexpected token {:?}", tok))),
            None => Err(invalid("unexpected end of expression")),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = lex(expression)?;
    if tokens.is_empty() {
        return Err(invalid("empty expression"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(invalid(format!("trailing input in '{}'", expression.trim())));
    }
    if !value.is_finite() {
        return Err(invalid("result is not a finite number"));
    }
    Ok(value)
}

/// Render a result without a spurious fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.10}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

// =============================================================================
// Expression detection
// =============================================================================

/// Find the first arithmetic expression embedded in free text.
///
/// A candidate is a run of calculator characters holding at least two
/// numbers joined by an operator. Bare hyphenated runs such as dates
/// (`2024-01-02`) or ranges (`1-2`) are skipped, as are runs longer than
/// [`MAX_EXPRESSION_LEN`].
pub fn extract_expression(text: &str) -> Option<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if ALLOWED_CHARS.contains(c) {
            current.push(c);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs.into_iter()
        .filter(|run| run.trim().len() <= MAX_EXPRESSION_LEN)
        .map(|run| balance_parens(run.trim()).trim().to_string())
        .find(|run| looks_arithmetic(run))
}

fn looks_arithmetic(run: &str) -> bool {
    let tokens = match lex(run) {
        Ok(t) => t,
        Err(_) => return false,
    };
    let numbers = tokens.iter().filter(|t| matches!(t, Token::Num(_))).count();
    let operators: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Num(_) | Token::LParen | Token::RParen))
        .collect();
    if numbers < 2 || operators.is_empty() {
        return false;
    }
    let only_minus = operators.iter().all(|t| **t == Token::Minus);
    !(only_minus && !run.contains(' '))
}

fn balance_parens(run: &str) -> &str {
    let mut s = run;
    loop {
        let open = s.matches('(').count();
        let close = s.matches(')').count();
        if open > close && s.starts_with('(') {
            s = s[1..].trim_start();
        } else if close > open && s.ends_with(')') {
            s = s[..s.len() - 1].trim_end();
        } else {
            return s;
        }
    }
}

// =============================================================================
// Tool
// =============================================================================

/// Calculator tool: `{"expression": "..."}` → numeric result.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        tool_names::CALCULATOR
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression (+ - * / // % **, parentheses)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. '(3 + 4) * 2'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("expression is required".into()))?;

        let value = evaluate(expression)?;
        let rendered = format_number(value);
        tracing::debug!(expression = %expression, result = %rendered, "Calculated");

        Ok(ToolOutput::text(format!("{} = {}", expression.trim(), rendered))
            .with_data(json!({ "expression": expression.trim(), "result": value })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> f64 {
        evaluate(s).unwrap()
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval("-2 ** 2"), -4.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("1.5 * 4"), 6.0);
    }

    #[test]
    fn test_floor_division_and_modulo() {
        assert_eq!(eval("7 // 2"), 3.0);
        assert_eq!(eval("-7 // 2"), -4.0);
        assert_eq!(eval("7 % 3"), 1.0);
        assert_eq!(eval("-7 % 3"), 2.0);
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        for bad in ["__import__('os')", "2 + x", "", "2 +", "(1 + 2", "1 2", "1..2 + 1"] {
            let err = evaluate(bad).unwrap_err();
            assert!(
                matches!(err, Error::Tool(ToolError::InvalidExpression(_))),
                "{bad} gave {err}"
            );
        }
    }

    #[test]
    fn test_division_by_zero() {
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("1 // (2 - 2)").is_err());
        assert!(evaluate("5 % 0").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("1 + {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let signs = format!("{}1", "-".repeat(200_000));
        let powers = vec!["2"; 100_000].join(" ** ");
        for deep in [parens, signs, powers] {
            let err = evaluate(&deep).unwrap_err();
            assert!(matches!(err, Error::Tool(ToolError::InvalidExpression(_))));
        }

        let shallow = format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert_eq!(eval(&shallow), 1.0);
        assert_eq!(eval("--3"), 3.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
    }

    #[test]
    fn test_extract_expression() {
        assert_eq!(
            extract_expression("If I study (3 + 2) * 4 hours a week, how much is that?").as_deref(),
            Some("(3 + 2) * 4")
        );
        assert_eq!(extract_expression("What is 12 * 7?").as_deref(), Some("12 * 7"));
        assert_eq!(extract_expression("Plan my 2024-01-02 exam"), None);
        assert_eq!(extract_expression("Learn Python 3.11 in 2 weeks"), None);
        assert_eq!(extract_expression("What is a multi-agent system?"), None);
    }

    #[test]
    fn test_extract_skips_oversized_runs() {
        let request = format!("Is 1 + {}1{} right? Also 2 * 3", "(".repeat(5_000), ")".repeat(5_000));
        assert_eq!(extract_expression(&request).as_deref(), Some("2 * 3"));
    }

    #[tokio::test]
    async fn test_tool_execute() {
        let out = CalculatorTool
            .execute(json!({ "expression": "12 * 7" }))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.content, "12 * 7 = 84");

        let err = CalculatorTool.execute(json!({ "expression": "rm -rf" })).await.unwrap_err();
        assert!(err.is_tool_error());
    }
}
