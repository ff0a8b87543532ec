//! Extrusion expression AST and evaluation

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::ExtrusionError;
use crate::types::FieldValue;

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// Operator for one of `+ - * /`; anything else maps to `Add`
    pub(crate) fn from_char(c: char) -> Self {
        match c {
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            '/' => BinaryOp::Div,
            _ => BinaryOp::Add,
        }
    }

    fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

/// Arithmetic expression over feature attributes
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Attribute reference, written `[NAME]`
    Field(String),
    /// Unary minus
    Negate(Box<Expr>),
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
}

impl Expr {
    /// Build a binary node
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate against one feature's attributes
    pub fn evaluate(&self, attributes: &HashMap<String, FieldValue>) -> Result<f64, ExtrusionError> {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Field(name) => match attributes.get(name) {
                None | Some(FieldValue::Null) => {
                    Err(ExtrusionError::MissingAttribute(name.clone()))
                }
                Some(value) => value
                    .as_f64()
                    .ok_or_else(|| ExtrusionError::NonNumericAttribute(name.clone())),
            },
            Expr::Negate(inner) => Ok(-inner.evaluate(attributes)?),
            Expr::Binary { op, left, right } => {
                let l = left.evaluate(attributes)?;
                let r = right.evaluate(attributes)?;
                match op {
                    BinaryOp::Add => Ok(l + r),
                    BinaryOp::Sub => Ok(l - r),
                    BinaryOp::Mul => Ok(l * r),
                    BinaryOp::Div if r == 0.0 => Err(ExtrusionError::DivisionByZero),
                    BinaryOp::Div => Ok(l / r),
                }
            }
        }
    }

    /// Names of every referenced attribute, sorted and deduplicated
    pub fn referenced_fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Field(name) => {
                out.insert(name.as_str());
            }
            Expr::Negate(inner) => inner.collect_fields(out),
            Expr::Binary { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{}", v),
            Expr::Field(name) => write!(f, "[{}]", name),
            Expr::Negate(inner) => write!(f, "-({})", inner),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
        }
    }
}
