//! Spin- and polarization-summed squared amplitudes.

use tracing::debug;
use wilco_core::WilcoError;
use wilco_expr::{expand, Expr, Structure};

use crate::amplitude::Amplitude;
use crate::dirac::{
    contract_indices, multiply, reduction_error, trace, DiracTerm, Gamma, ScalarProducts, Vector,
    FREE_INDEX,
};
use crate::kinematics::Kinematics;

const POLARIZATION_INDEX: u32 = FREE_INDEX + 1;

fn term(coefficient: Expr, vector: Option<Vector>, chain: Vec<Gamma>) -> DiracTerm {
    DiracTerm {
        coefficient,
        vector,
        chain,
    }
}

/// Gamma-chain expansion of a structure, with `q = p' - p` and `P = p + p'`.
fn structure_chain(structure: Structure) -> Result<Vec<DiracTerm>, WilcoError> {
    let mu = Gamma::Index(POLARIZATION_INDEX);
    let out = Gamma::Slash(Vector::Out);
    let inc = Gamma::Slash(Vector::In);
    Ok(match structure {
        Structure::Scalar => vec![term(Expr::one(), None, Vec::new())],
        Structure::Slash => vec![term(Expr::one(), None, vec![inc])],
        Structure::Vector => vec![term(Expr::one(), None, vec![mu])],
        Structure::MomentumSum => vec![
            term(Expr::one(), Some(Vector::In), Vec::new()),
            term(Expr::one(), Some(Vector::Out), Vec::new()),
        ],
        Structure::MomentumTransfer => vec![
            term(Expr::one(), Some(Vector::Out), Vec::new()),
            term(Expr::int(-1), Some(Vector::In), Vec::new()),
        ],
        // iσ^{μν}q_ν = -(γ^μ q̸ - q̸ γ^μ)/2
        Structure::Magnetic => vec![
            term(Expr::rational(-1, 2), None, vec![mu, out]),
            term(Expr::rational(1, 2), None, vec![mu, inc]),
            term(Expr::rational(1, 2), None, vec![out, mu]),
            term(Expr::rational(-1, 2), None, vec![inc, mu]),
        ],
        Structure::MomentumSumSlash => vec![
            term(Expr::one(), Some(Vector::In), vec![out]),
            term(Expr::int(-1), Some(Vector::In), vec![inc]),
            term(Expr::one(), Some(Vector::Out), vec![out]),
            term(Expr::int(-1), Some(Vector::Out), vec![inc]),
        ],
        Structure::MomentumTransferSlash => vec![
            term(Expr::one(), Some(Vector::Out), vec![out]),
            term(Expr::int(-1), Some(Vector::Out), vec![inc]),
            term(Expr::int(-1), Some(Vector::In), vec![out]),
            term(Expr::one(), Some(Vector::In), vec![inc]),
        ],
        Structure::Pseudoscalar | Structure::Axial | Structure::ElectricDipole => {
            return Err(reduction_error(
                "gamma5-trace",
                format!("traces with {} are not evaluated", structure),
            ))
        }
    })
}

/// `Γ̄ = γ⁰ Γ† γ⁰` for real coefficients: the chain reversed.
fn barred(terms: &[DiracTerm]) -> Vec<DiracTerm> {
    terms
        .iter()
        .map(|t| {
            let mut chain = t.chain.clone();
            chain.reverse();
            term(t.coefficient.clone(), t.vector, chain)
        })
        .collect()
}

fn slash_plus_mass(vector: Vector, mass: &Expr) -> Vec<DiracTerm> {
    let mut terms = vec![term(Expr::one(), None, vec![Gamma::Slash(vector)])];
    if !mass.is_zero() {
        terms.push(term(mass.clone(), None, Vec::new()));
    }
    terms
}

/// Applies `Σ ε_μ ε*_ν → -g_{μν}` to one product; `left` and `right` are the
/// momenta carrying the index on either side, if it left the chain.
fn polarization_sum(
    product: DiracTerm,
    left: Option<Vector>,
    right: Option<Vector>,
    kinematics: &Kinematics,
) -> Result<DiracTerm, WilcoError> {
    let mut summed = term(Expr::neg(product.coefficient), None, product.chain);
    match (left, right) {
        (Some(a), Some(b)) => {
            summed.coefficient = Expr::mul([summed.coefficient, kinematics.dot(a, b)?]);
        }
        (Some(v), None) | (None, Some(v)) => {
            for gamma in summed.chain.iter_mut() {
                if *gamma == Gamma::Index(POLARIZATION_INDEX) {
                    *gamma = Gamma::Slash(v);
                }
            }
        }
        (None, None) => {}
    }
    Ok(summed)
}

fn chain_vectors(chain: &[Gamma]) -> Result<Vec<Vector>, WilcoError> {
    chain
        .iter()
        .map(|gamma| match gamma {
            Gamma::Slash(vector) => Ok(*vector),
            Gamma::Index(_) => Err(reduction_error("open-index", "trace with an uncontracted index")),
        })
        .collect()
}

/// `Σ_spins Σ_pol |M|²` of a single open fermion line, coefficients taken real.
///
/// Fermion spin sums give `p̸ + m` and `p̸' + m'`, the vector polarization sum
/// gives `-g_{μν}`; traces are four-dimensional.
pub fn squared_amplitude(amplitude: &Amplitude) -> Result<Expr, WilcoError> {
    let kinematics = &amplitude.kinematics;
    let parts = amplitude.structures()?;
    let out_vector = if kinematics.two_point { Vector::In } else { Vector::Out };
    let out_spin = slash_plus_mass(out_vector, &kinematics.out_mass);
    let in_spin = slash_plus_mass(Vector::In, &kinematics.in_mass);
    let has_vector = kinematics.vector_leg.is_some();

    let mut total = Vec::new();
    for (left_structure, left_coefficient) in &parts {
        let left = structure_chain(*left_structure)?;
        for (right_structure, right_coefficient) in &parts {
            let right = barred(&structure_chain(*right_structure)?);
            let mut value = Vec::new();
            for l in &left {
                for r in &right {
                    let l_only = term(l.coefficient.clone(), None, l.chain.clone());
                    let r_only = term(r.coefficient.clone(), None, r.chain.clone());
                    let product = multiply(
                        &multiply(&multiply(&out_spin, &[l_only]), &in_spin),
                        &[r_only],
                    );
                    for p in product {
                        let summed = if has_vector {
                            vec![polarization_sum(p, l.vector, r.vector, kinematics)?]
                        } else {
                            vec![p]
                        };
                        for s in contract_indices(summed, &Expr::int(4)) {
                            let vectors = chain_vectors(&s.chain)?;
                            value.push(Expr::mul([s.coefficient.clone(), trace(&vectors, kinematics)?]));
                        }
                    }
                }
            }
            total.push(Expr::mul([
                left_coefficient.clone(),
                right_coefficient.clone(),
                Expr::add(value),
            ]));
        }
    }
    let squared = expand(&Expr::add(total));
    debug!(structures = parts.len(), "squared amplitude");
    Ok(squared)
}
