//! Extrusion expression parser
//!
//! # Supported Syntax
//!
//! ```text
//! [POP2007] / 10
//! [POP07_SQMI] * 5000
//! ([MALES] + [FEMALES]) / 2
//! -[ELEVATION] * 0.5
//! ```
//!
//! Standard precedence: unary minus, then `* /`, then `+ -`, all
//! left-associative.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0, one_of},
    combinator::map,
    multi::fold_many0,
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use crate::error::ExtrusionError;

use super::expr::{BinaryOp, Expr};

/// Parse an expression, requiring the whole input to be consumed
pub fn parse_expression(input: &str) -> Result<Expr, ExtrusionError> {
    match expression(input) {
        Ok((remaining, expr)) => {
            if remaining.trim().is_empty() {
                Ok(expr)
            } else {
                Err(ExtrusionError::Parse {
                    remaining: remaining.trim().to_string(),
                    message: "unexpected trailing input".to_string(),
                })
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ExtrusionError::Parse {
            remaining: e.input.to_string(),
            message: format!("{:?}", e.code),
        }),
        Err(nom::Err::Incomplete(_)) => Err(ExtrusionError::Parse {
            remaining: String::new(),
            message: "incomplete expression".to_string(),
        }),
    }
}

/// expr := term (('+' | '-') term)*
fn expression(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    fold_many0(
        pair(delimited(multispace0, one_of("+-"), multispace0), term),
        move || first.clone(),
        |acc, (op, rhs)| Expr::binary(BinaryOp::from_char(op), acc, rhs),
    )
    .parse(input)
}

/// term := factor (('*' | '/') factor)*
fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = factor(input)?;
    fold_many0(
        pair(delimited(multispace0, one_of("*/"), multispace0), factor),
        move || first.clone(),
        |acc, (op, rhs)| Expr::binary(BinaryOp::from_char(op), acc, rhs),
    )
    .parse(input)
}

/// factor := '-' factor | field | number | '(' expr ')'
fn factor(input: &str) -> IResult<&str, Expr> {
    delimited(
        multispace0,
        alt((
            map(preceded(char('-'), factor), |e| Expr::Negate(Box::new(e))),
            field_reference,
            map(double, Expr::Number),
            delimited(char('('), expression, preceded(multispace0, char(')'))),
        )),
        multispace0,
    )
    .parse(input)
}

/// field := '[' name ']'
fn field_reference(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(char('['), take_while1(|c: char| c != ']'), char(']')),
        |name: &str| Expr::Field(name.trim().to_string()),
    )
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Expr {
        Expr::Field(name.to_string())
    }

    #[test]
    fn test_parse_field_division() {
        let expr = parse_expression("[POP2007]/ 10").unwrap();
        assert_eq!(
            expr,
            Expr::binary(BinaryOp::Div, field("POP2007"), Expr::Number(10.0))
        );
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expression("1 + [A] * 2").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                Expr::Number(1.0),
                Expr::binary(BinaryOp::Mul, field("A"), Expr::Number(2.0))
            )
        );
    }

    #[test]
    fn test_parse_left_associative() {
        let expr = parse_expression("10 - 4 - 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, Expr::Number(10.0), Expr::Number(4.0)),
                Expr::Number(3.0)
            )
        );
    }

    #[test]
    fn test_parse_parentheses_and_negation() {
        let expr = parse_expression(" -( [A] + [B] ) / 2 ").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Div,
                Expr::Negate(Box::new(Expr::binary(BinaryOp::Add, field("A"), field("B")))),
                Expr::Number(2.0)
            )
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expression("[POP2007] /").is_err());
        assert!(parse_expression("[POP2007").is_err());
        assert!(parse_expression("[] * 2").is_err());
        assert!(matches!(
            parse_expression("[A] 5"),
            Err(ExtrusionError::Parse { remaining, .. }) if remaining == "5"
        ));
    }
}
