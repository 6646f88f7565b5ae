//! Effective operators and the bases amplitudes are projected onto.

use std::fmt;

use serde::{Deserialize, Serialize};
use wilco_amp::{Amplitude, Direction, Leg};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::Structure;
use wilco_model::Model;

/// Dirac bilinear sandwiched between the fermion fields of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiracCoupling {
    /// `1`
    S,
    /// `γ5`
    P,
    /// `γ^μ`
    V,
    /// `γ^μ γ5`
    A,
    /// `σ^{μν}`
    T,
}

/// Named operator template: a structure atom with its coupling and fields.
///
/// Empty `fields` act as a wildcard when the operator is used as a lookup
/// template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Operator {
    /// Operator name.
    pub name: String,
    /// Structure the coefficient multiplies.
    pub structure: Structure,
    /// Dirac coupling of the fermion bilinear.
    pub coupling: DiracCoupling,
    /// Field content, `ψ̄` first.
    pub fields: Vec<String>,
}

impl Operator {
    fn template(name: &str, structure: Structure, coupling: DiracCoupling) -> Self {
        Self {
            name: name.to_string(),
            structure,
            coupling,
            fields: Vec::new(),
        }
    }

    /// `m ψ̄ψ`.
    pub fn mass() -> Self {
        Self::template("mass", Structure::Scalar, DiracCoupling::S)
    }

    /// `ψ̄ p̸ ψ`.
    pub fn kinetic() -> Self {
        Self::template("kinetic", Structure::Slash, DiracCoupling::V)
    }

    /// `ψ̄ γ5 ψ`.
    pub fn pseudoscalar() -> Self {
        Self::template("pseudoscalar", Structure::Pseudoscalar, DiracCoupling::P)
    }

    /// `ψ̄ γ^μ ψ A_μ`.
    pub fn vector_current() -> Self {
        Self::template("vector-current", Structure::Vector, DiracCoupling::V)
    }

    /// `ψ̄ γ^μ γ5 ψ A_μ`.
    pub fn axial_current() -> Self {
        Self::template("axial-current", Structure::Axial, DiracCoupling::A)
    }

    /// `ψ̄ σ^{μν} Γ ψ F_{μν}` with `Γ = 1` (magnetic) or `Γ = γ5` (electric dipole).
    ///
    /// Other couplings keep their own coupling tag, so no decomposition
    /// ever produces them and lookups miss.
    pub fn magnetic(coupling: DiracCoupling) -> Self {
        match coupling {
            DiracCoupling::P => Self::template("electric-dipole", Structure::ElectricDipole, DiracCoupling::P),
            other => Self::template("magnetic", Structure::Magnetic, other),
        }
    }

    /// `q^μ ψ̄ψ A_μ`, present only when the vector is off shell.
    pub fn momentum_transfer() -> Self {
        Self::template("momentum-transfer", Structure::MomentumTransfer, DiracCoupling::S)
    }

    /// `P^μ ψ̄ψ A_μ`, left when the Gordon identity does not apply.
    pub fn momentum_sum() -> Self {
        Self::template("momentum-sum", Structure::MomentumSum, DiracCoupling::S)
    }

    /// `P^μ ψ̄ q̸ ψ A_μ`, present only with an off-shell fermion leg.
    pub fn momentum_sum_slash() -> Self {
        Self::template("momentum-sum-slash", Structure::MomentumSumSlash, DiracCoupling::V)
    }

    /// `q^μ ψ̄ q̸ ψ A_μ`, present only with off-shell fermion and vector legs.
    pub fn momentum_transfer_slash() -> Self {
        Self::template("momentum-transfer-slash", Structure::MomentumTransferSlash, DiracCoupling::V)
    }

    /// Same operator with explicit field content.
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Whether `self` satisfies the lookup `template`.
    pub fn matches(&self, template: &Operator) -> bool {
        self.structure == template.structure
            && self.coupling == template.coupling
            && (template.fields.is_empty() || self.fields == template.fields)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.structure)?;
        if !self.fields.is_empty() {
            write!(f, " ({})", self.fields.join(" "))?;
        }
        Ok(())
    }
}

/// Operators in derivation order for one leg content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorBasis {
    /// Operators in the order coefficients are reported.
    pub operators: Vec<Operator>,
}

impl OperatorBasis {
    /// Basis for a two-fermion or two-fermion-one-vector process.
    pub fn for_legs(model: &Model, legs: &[Leg]) -> Result<Self, WilcoError> {
        let mut incoming = None;
        let mut outgoing = None;
        let mut vectors = Vec::new();
        for leg in legs {
            let particle = model.require_particle(&leg.particle)?;
            match (particle.is_fermion(), leg.direction) {
                (true, Direction::Incoming) if incoming.is_none() => incoming = Some(&leg.particle),
                (true, Direction::Outgoing) if outgoing.is_none() => outgoing = Some(&leg.particle),
                (false, _) => vectors.push(&leg.particle),
                _ => return Err(no_basis(legs)),
            }
        }
        let (incoming, outgoing) = match (incoming, outgoing) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(no_basis(legs)),
        };
        let mut fields = vec![format!("{}_bar", outgoing), incoming.clone()];
        let templates = match vectors.as_slice() {
            [] => two_fermion_templates(),
            [vector] => {
                fields.push((*vector).clone());
                vector_templates()
            }
            _ => return Err(no_basis(legs)),
        };
        Ok(Self::from_templates(templates, fields))
    }

    /// Basis for the legs of an amplitude whose kinematics are already resolved.
    pub fn for_amplitude(amplitude: &Amplitude) -> Self {
        let legs = &amplitude.process.legs;
        let kinematics = &amplitude.kinematics;
        let mut fields = vec![
            format!("{}_bar", legs[kinematics.out_leg].particle),
            legs[kinematics.in_leg].particle.clone(),
        ];
        let templates = match kinematics.vector_leg {
            None => two_fermion_templates(),
            Some(vector) => {
                fields.push(legs[vector].particle.clone());
                vector_templates()
            }
        };
        Self::from_templates(templates, fields)
    }

    fn from_templates(templates: Vec<Operator>, fields: Vec<String>) -> Self {
        Self {
            operators: templates
                .into_iter()
                .map(|operator| operator.with_fields(fields.clone()))
                .collect(),
        }
    }

    /// Operator whose coefficient multiplies `structure`.
    pub fn operator_for(&self, structure: Structure) -> Option<&Operator> {
        self.operators.iter().find(|operator| operator.structure == structure)
    }
}

fn two_fermion_templates() -> Vec<Operator> {
    vec![Operator::mass(), Operator::kinetic(), Operator::pseudoscalar()]
}

fn vector_templates() -> Vec<Operator> {
    vec![
        Operator::vector_current(),
        Operator::axial_current(),
        Operator::magnetic(DiracCoupling::S),
        Operator::magnetic(DiracCoupling::P),
        Operator::momentum_transfer(),
        Operator::momentum_sum(),
        Operator::momentum_sum_slash(),
        Operator::momentum_transfer_slash(),
    ]
}

fn no_basis(legs: &[Leg]) -> WilcoError {
    let listing: Vec<String> = legs.iter().map(|leg| leg.to_string()).collect();
    WilcoError::Match(
        ErrorInfo::new("no-basis", "no operator basis for this leg content")
            .with_context("legs", listing.join(" "))
            .with_hint("bases exist for two fermions with at most one vector"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wilco_model::toy_qed;

    #[test]
    fn vertex_basis_is_in_derivation_order() {
        let model = toy_qed("mu", -1, "m_mu").expect("model");
        let legs = vec![Leg::incoming("mu"), Leg::outgoing("mu"), Leg::outgoing("A")];
        let basis = OperatorBasis::for_legs(&model, &legs).expect("basis");
        let names: Vec<&str> = basis.operators.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "vector-current",
                "axial-current",
                "magnetic",
                "electric-dipole",
                "momentum-transfer",
                "momentum-sum",
                "momentum-sum-slash",
                "momentum-transfer-slash",
            ]
        );
        assert_eq!(basis.operators[0].fields, vec!["mu_bar", "mu", "A"]);
    }

    #[test]
    fn wildcard_templates_match_any_fields() {
        let concrete = Operator::magnetic(DiracCoupling::S).with_fields(vec!["mu_bar".into(), "mu".into()]);
        assert!(concrete.matches(&Operator::magnetic(DiracCoupling::S)));
        assert!(!concrete.matches(&Operator::magnetic(DiracCoupling::P)));
        let other = Operator::magnetic(DiracCoupling::S).with_fields(vec!["e_bar".into(), "e".into()]);
        assert!(!concrete.matches(&other));
    }

    #[test]
    fn magnetic_templates_keep_their_coupling() {
        let scalar = Operator::magnetic(DiracCoupling::S);
        for coupling in [DiracCoupling::V, DiracCoupling::A, DiracCoupling::T] {
            let template = Operator::magnetic(coupling);
            assert_eq!(template.coupling, coupling);
            assert!(!scalar.matches(&template), "{:?}", coupling);
        }
    }

    #[test]
    fn photon_pairs_have_no_basis() {
        let model = toy_qed("mu", -1, "m_mu").expect("model");
        let legs = vec![Leg::incoming("A"), Leg::outgoing("A")];
        let err = OperatorBasis::for_legs(&model, &legs).expect_err("no basis");
        assert_eq!(err.code(), "no-basis");
    }
}
