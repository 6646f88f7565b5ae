//! Wilson coefficients and ordered coefficient sets.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use wilco_expr::{structure_term, Expr};

use crate::operator::Operator;

/// Coefficient of one operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WilsonCoefficient {
    /// Operator.
    pub operator: Operator,
    /// Coefficient; loop parts are abbreviation symbols.
    pub coefficient: Expr,
}

impl WilsonCoefficient {
    /// Coefficient expression.
    pub fn coefficient(&self) -> &Expr {
        &self.coefficient
    }

    /// `coefficient × structure`.
    pub fn term(&self) -> Expr {
        structure_term(self.operator.structure, self.coefficient.clone())
    }
}

/// Non-zero coefficients in basis order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WilsonSet {
    /// Entries in derivation order.
    pub coefficients: Vec<WilsonCoefficient>,
}

impl WilsonSet {
    /// Number of non-zero coefficients.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Whether every coefficient vanished.
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &WilsonCoefficient> {
        self.coefficients.iter()
    }

    /// `Σ coefficient × structure`.
    pub fn recombine(&self) -> Expr {
        Expr::add(self.coefficients.iter().map(WilsonCoefficient::term))
    }
}

impl Index<usize> for WilsonSet {
    type Output = WilsonCoefficient;

    fn index(&self, index: usize) -> &Self::Output {
        &self.coefficients[index]
    }
}

impl fmt::Display for WilsonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, entry) in self.coefficients.iter().enumerate() {
            writeln!(f, "  [{}] {} : {}", idx, entry.operator, entry.coefficient)?;
        }
        Ok(())
    }
}
