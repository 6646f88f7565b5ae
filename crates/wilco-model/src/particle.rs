//! Particle definitions.

use std::collections::BTreeMap;
use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use wilco_expr::Expr;

/// Spin and statistics of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Spin {
    /// Spin one-half Dirac fermion.
    DiracFermion,
    /// Spin one gauge boson.
    Vector,
}

/// Field registered in a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Identifier used in process specifications.
    pub name: String,
    /// Optional LaTeX rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,
    /// Spin kind.
    pub spin: Spin,
    /// Mass, absent for massless fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<Expr>,
    /// U(1) charge per gauge group name.
    #[serde(default)]
    pub charges: BTreeMap<String, BigRational>,
}

/// Splits `"name ; latex"` declarations.
fn parse_declaration(declaration: &str) -> (String, Option<String>) {
    match declaration.split_once(';') {
        Some((name, latex)) => {
            let latex = latex.trim();
            (
                name.trim().to_string(),
                (!latex.is_empty()).then(|| latex.to_string()),
            )
        }
        None => (declaration.trim().to_string(), None),
    }
}

impl Particle {
    /// Dirac fermion from a `"name"` or `"name ; latex"` declaration.
    pub fn dirac_fermion(declaration: &str) -> Self {
        let (name, latex) = parse_declaration(declaration);
        Self {
            name,
            latex,
            spin: Spin::DiracFermion,
            mass: None,
            charges: BTreeMap::new(),
        }
    }

    /// Massless vector boson.
    pub fn vector_boson(declaration: &str) -> Self {
        let (name, latex) = parse_declaration(declaration);
        Self {
            name,
            latex,
            spin: Spin::Vector,
            mass: None,
            charges: BTreeMap::new(),
        }
    }

    /// Sets an integer charge under `group`.
    pub fn with_charge(self, group: &str, charge: i64) -> Self {
        self.with_fractional_charge(group, charge, 1)
    }

    /// Sets a fractional charge `numer / denom` under `group`.
    pub fn with_fractional_charge(mut self, group: &str, numer: i64, denom: i64) -> Self {
        let charge = BigRational::new(BigInt::from(numer), BigInt::from(denom.max(1)));
        self.charges.insert(group.to_string(), charge);
        self
    }

    /// Sets the mass.
    pub fn with_mass(mut self, mass: Expr) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Mass expression, zero when massless.
    pub fn mass_expr(&self) -> Expr {
        self.mass.clone().unwrap_or_else(Expr::zero)
    }

    /// Squared mass expression.
    pub fn mass_sq(&self) -> Expr {
        Expr::pow(self.mass_expr(), 2)
    }

    /// Charge under `group`, zero when unset.
    pub fn charge(&self, group: &str) -> BigRational {
        self.charges.get(group).cloned().unwrap_or_else(BigRational::zero)
    }

    /// Whether the field is a fermion.
    pub fn is_fermion(&self) -> bool {
        self.spin == Spin::DiracFermion
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spin = match self.spin {
            Spin::DiracFermion => "dirac fermion",
            Spin::Vector => "vector boson",
        };
        write!(f, "{:<8} {:<14} mass = {}", self.name, spin, self.mass_expr())?;
        for (group, charge) in &self.charges {
            write!(f, ", Q_{} = {}", group, charge)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_split_name_and_latex() {
        let muon = Particle::dirac_fermion("mu ; \\mu");
        assert_eq!(muon.name, "mu");
        assert_eq!(muon.latex.as_deref(), Some("\\mu"));
        let bare = Particle::dirac_fermion("tau");
        assert_eq!(bare.latex, None);
    }

    #[test]
    fn charges_default_to_zero() {
        let muon = Particle::dirac_fermion("mu").with_charge("em", -1);
        assert_eq!(muon.charge("em"), BigRational::from_integer(BigInt::from(-1)));
        assert!(muon.charge("weak").is_zero());
    }
}
