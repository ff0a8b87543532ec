//! Extrusion height expressions
//!
//! A scene layer can raise each feature by a height computed from its
//! attributes, e.g. total population (`[POP2007] / 10`) or population density
//! (`[POP07_SQMI] * 5000`). This module parses and evaluates those
//! expressions; drawing the result is left to the renderer.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use feature_stats::extrusion::{ExtrusionExpression, ExtrusionMode};
//! use feature_stats::types::FieldValue;
//!
//! let expression = ExtrusionMode::TotalPopulation.expression().unwrap();
//! let feature = HashMap::from([("POP2007".to_string(), FieldValue::Integer(1_000))]);
//! assert_eq!(expression.height(&feature).unwrap(), Some(100.0));
//!
//! let none = ExtrusionExpression::parse("").unwrap();
//! assert_eq!(none.height(&feature).unwrap(), None);
//! ```

pub mod expr;
pub mod parser;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{ExtrusionError, ValidationError};
use crate::types::FieldValue;

pub use expr::{BinaryOp, Expr};
pub use parser::parse_expression;

/// Expression for extruding by total population
pub const TOTAL_POPULATION_EXPRESSION: &str = "[POP2007]/ 10";

/// Expression for extruding by population density
pub const POPULATION_DENSITY_EXPRESSION: &str = "[POP07_SQMI] * 5000";

// ============================================================================
// Expression
// ============================================================================

/// A parsed extrusion expression; empty text means no extrusion
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrusionExpression {
    source: String,
    expr: Option<Expr>,
}

impl ExtrusionExpression {
    /// Parse expression text
    pub fn parse(source: &str) -> Result<Self, ExtrusionError> {
        let expr = if source.trim().is_empty() {
            None
        } else {
            Some(parse_expression(source)?)
        };
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Original text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed tree, `None` when the expression is empty
    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    /// Attributes the expression needs
    pub fn referenced_fields(&self) -> BTreeSet<&str> {
        self.expr
            .as_ref()
            .map(|e| e.referenced_fields())
            .unwrap_or_default()
    }

    /// Height of one feature, `None` when the expression is empty
    pub fn height(
        &self,
        attributes: &HashMap<String, FieldValue>,
    ) -> Result<Option<f64>, ExtrusionError> {
        self.expr
            .as_ref()
            .map(|e| e.evaluate(attributes))
            .transpose()
    }

    /// Heights of many features, one result per feature
    pub fn heights<'a, I>(&self, features: I) -> Vec<Result<Option<f64>, ExtrusionError>>
    where
        I: IntoIterator<Item = &'a HashMap<String, FieldValue>>,
    {
        features.into_iter().map(|f| self.height(f)).collect()
    }
}

impl fmt::Display for ExtrusionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ============================================================================
// Modes
// ============================================================================

/// Preset extrusion choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtrusionMode {
    /// Height from total population
    #[default]
    TotalPopulation,
    /// Height from population density
    PopulationDensity,
    /// Flat features
    None,
}

impl ExtrusionMode {
    /// Mode for a segmented-control position; unknown positions are flat
    pub fn from_segment(index: usize) -> Self {
        match index {
            0 => ExtrusionMode::TotalPopulation,
            1 => ExtrusionMode::PopulationDensity,
            _ => ExtrusionMode::None,
        }
    }

    /// Expression text for this mode
    pub fn expression_text(&self) -> &'static str {
        match self {
            ExtrusionMode::TotalPopulation => TOTAL_POPULATION_EXPRESSION,
            ExtrusionMode::PopulationDensity => POPULATION_DENSITY_EXPRESSION,
            ExtrusionMode::None => "",
        }
    }

    /// Parsed expression for this mode
    pub fn expression(&self) -> Result<ExtrusionExpression, ExtrusionError> {
        ExtrusionExpression::parse(self.expression_text())
    }
}

impl FromStr for ExtrusionMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "totalpopulation" | "population" => Ok(ExtrusionMode::TotalPopulation),
            "populationdensity" | "density" => Ok(ExtrusionMode::PopulationDensity),
            "none" | "flat" => Ok(ExtrusionMode::None),
            other => Err(ValidationError::InvalidFormat {
                field: "extrusion mode".to_string(),
                message: format!("unrecognized mode '{}'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pop: i64, density: f64) -> HashMap<String, FieldValue> {
        HashMap::from([
            ("POP2007".to_string(), FieldValue::Integer(pop)),
            ("POP07_SQMI".to_string(), FieldValue::Double(density)),
        ])
    }

    #[test]
    fn test_modes_from_segments() {
        assert_eq!(ExtrusionMode::from_segment(0), ExtrusionMode::TotalPopulation);
        assert_eq!(ExtrusionMode::from_segment(1), ExtrusionMode::PopulationDensity);
        assert_eq!(ExtrusionMode::from_segment(7), ExtrusionMode::None);
    }

    #[test]
    fn test_preset_heights() {
        let ohio = state(11_466_917, 280.0);
        let total = ExtrusionMode::TotalPopulation.expression().unwrap();
        let density = ExtrusionMode::PopulationDensity.expression().unwrap();
        let flat = ExtrusionMode::None.expression().unwrap();

        assert_eq!(total.height(&ohio).unwrap(), Some(1_146_691.7));
        assert_eq!(density.height(&ohio).unwrap(), Some(1_400_000.0));
        assert_eq!(flat.height(&ohio).unwrap(), None);
        assert!(flat.referenced_fields().is_empty());
    }

    #[test]
    fn test_heights_per_feature() {
        let features = vec![state(100, 1.0), HashMap::new()];
        let expression = ExtrusionMode::TotalPopulation.expression().unwrap();
        let heights = expression.heights(&features);
        assert_eq!(heights[0], Ok(Some(10.0)));
        assert!(heights[1].is_err());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "population-density".parse::<ExtrusionMode>().unwrap(),
            ExtrusionMode::PopulationDensity
        );
        assert_eq!("NONE".parse::<ExtrusionMode>().unwrap(), ExtrusionMode::None);
        assert!("volume".parse::<ExtrusionMode>().is_err());
    }

    #[test]
    fn test_expression_keeps_source() {
        let expression = ExtrusionExpression::parse("[A] * 2").unwrap();
        assert_eq!(expression.to_string(), "[A] * 2");
        assert_eq!(expression.source(), "[A] * 2");
        assert!(expression.expr().is_some());
        assert!(ExtrusionExpression::parse("[A] *").is_err());
    }
}
