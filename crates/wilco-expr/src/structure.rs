//! Canonical Lorentz/Dirac structures sandwiched between external spinors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use wilco_core::{ErrorInfo, WilcoError};

use crate::expand::{monomial_expr, poly};
use crate::expr::{replace_with, Expr, Node};

/// Structure atom `ū(p') Γ u(p)`; vector structures carry the free index `μ`.
///
/// Momenta follow the fermion line: `p` flows in, `p'` flows out,
/// `P = p + p'` and `q = p' - p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Structure {
    /// `1`
    Scalar,
    /// `γ5`
    Pseudoscalar,
    /// `p̸`, only meaningful for off-shell two-point functions.
    Slash,
    /// `γ^μ`
    Vector,
    /// `γ^μ γ5`
    Axial,
    /// `P^μ`
    MomentumSum,
    /// `q^μ`
    MomentumTransfer,
    /// `i σ^{μν} q_ν`
    Magnetic,
    /// `i σ^{μν} γ5 q_ν`
    ElectricDipole,
    /// `P^μ q̸`, left by a vertex with one off-shell fermion leg.
    MomentumSumSlash,
    /// `q^μ q̸`
    MomentumTransferSlash,
}

impl Structure {
    /// Every structure in declaration order.
    pub const ALL: [Structure; 11] = [
        Structure::Scalar,
        Structure::Pseudoscalar,
        Structure::Slash,
        Structure::Vector,
        Structure::Axial,
        Structure::MomentumSum,
        Structure::MomentumTransfer,
        Structure::Magnetic,
        Structure::ElectricDipole,
        Structure::MomentumSumSlash,
        Structure::MomentumTransferSlash,
    ];

    /// Whether the structure carries the free Lorentz index of an external vector.
    pub fn is_vector_like(self) -> bool {
        !matches!(
            self,
            Structure::Scalar | Structure::Pseudoscalar | Structure::Slash
        )
    }

    /// Short ASCII label used in reports and generated code comments.
    pub fn label(self) -> &'static str {
        match self {
            Structure::Scalar => "1",
            Structure::Pseudoscalar => "g5",
            Structure::Slash => "pslash",
            Structure::Vector => "gamma^mu",
            Structure::Axial => "gamma^mu g5",
            Structure::MomentumSum => "P^mu",
            Structure::MomentumTransfer => "q^mu",
            Structure::Magnetic => "i sigma^{mu nu} q_nu",
            Structure::ElectricDipole => "i sigma^{mu nu} g5 q_nu",
            Structure::MomentumSumSlash => "P^mu qslash",
            Structure::MomentumTransferSlash => "q^mu qslash",
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn structure_error(code: &str, message: impl Into<String>, term: &Expr) -> WilcoError {
    WilcoError::Expr(ErrorInfo::new(code, message).with_context("term", term.to_string()))
}

/// Splits an expression that is linear in structure atoms into
/// `(structure, coefficient)` pairs, in [`Structure`] order.
///
/// Terms without a structure, with a product of structures, or with a
/// structure buried inside another atom are `Expr` errors.
pub fn collect_structures(expr: &Expr) -> Result<Vec<(Structure, Expr)>, WilcoError> {
    let mut grouped: BTreeMap<Structure, Vec<Expr>> = BTreeMap::new();
    for (monomial, coefficient) in poly(expr) {
        let mut found = None;
        let mut rest = Vec::with_capacity(monomial.len());
        for (atom, exp) in &monomial {
            match atom.node() {
                Node::Structure(structure) if *exp == 1 && found.is_none() => found = Some(*structure),
                Node::Structure(_) => {
                    return Err(structure_error(
                        "structure-product",
                        "a term carries more than one structure",
                        &monomial_expr(&monomial, &coefficient),
                    ))
                }
                _ if atom.contains_structure() => {
                    return Err(structure_error(
                        "structure-nested",
                        "a structure appears inside another atom",
                        &monomial_expr(&monomial, &coefficient),
                    ))
                }
                _ => rest.push((atom.clone(), *exp)),
            }
        }
        let structure = found.ok_or_else(|| {
            structure_error(
                "missing-structure",
                "a term carries no structure",
                &monomial_expr(&monomial, &coefficient),
            )
        })?;
        grouped
            .entry(structure)
            .or_default()
            .push(monomial_expr(&rest, &coefficient));
    }
    Ok(grouped
        .into_iter()
        .map(|(structure, parts)| (structure, Expr::add(parts)))
        .filter(|(_, coefficient)| !coefficient.is_zero())
        .collect())
}

/// Replaces structure atoms by expressions and re-expands.
pub fn replace_structures(expr: &Expr, replacements: &BTreeMap<Structure, Expr>) -> Expr {
    if replacements.is_empty() {
        return expr.clone();
    }
    let replaced = replace_with(expr, &|node: &Expr| match node.node() {
        Node::Structure(structure) => replacements.get(structure).cloned(),
        _ => None,
    });
    crate::expand::expand(&replaced)
}

/// `coefficient × structure`.
pub fn structure_term(structure: Structure, coefficient: Expr) -> Expr {
    Expr::mul([coefficient, Expr::structure(structure)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;

    #[test]
    fn collects_coefficients_per_structure() {
        let a = Expr::param("a");
        let b = Expr::param("b");
        let expr = Expr::add([
            structure_term(Structure::Vector, a.clone()),
            structure_term(Structure::MomentumSum, Expr::mul([Expr::int(2), b.clone()])),
            structure_term(Structure::Vector, b.clone()),
        ]);
        let parts = collect_structures(&expr).expect("linear");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, Structure::Vector);
        assert_eq!(expand(&parts[0].1), expand(&Expr::add([a, b.clone()])));
        assert_eq!(parts[1].0, Structure::MomentumSum);
        assert_eq!(expand(&parts[1].1), expand(&Expr::mul([Expr::int(2), b])));
    }

    #[test]
    fn products_and_bare_terms_are_rejected() {
        let product = Expr::mul([
            Expr::structure(Structure::Vector),
            Expr::structure(Structure::Scalar),
        ]);
        assert_eq!(
            collect_structures(&product).expect_err("product").code(),
            "structure-product"
        );
        let bare = Expr::add([Expr::param("x"), Expr::structure(Structure::Scalar)]);
        assert_eq!(
            collect_structures(&bare).expect_err("bare").code(),
            "missing-structure"
        );
    }

    #[test]
    fn cancelling_structures_are_dropped() {
        let v = Expr::structure(Structure::Vector);
        let expr = Expr::sub(v.clone(), v);
        assert!(collect_structures(&expr).expect("linear").is_empty());
    }
}
