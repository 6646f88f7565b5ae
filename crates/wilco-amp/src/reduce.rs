//! Passarino-Veltman reduction of loop-momentum slashes.

use wilco_core::WilcoError;
use wilco_expr::{Expr, LoopFunction};

use crate::dirac::{reduction_error, DiracTerm, Gamma, Vector, FREE_INDEX};
use crate::kinematics::{Kinematics, Momentum};

/// Scalar one-loop integral a chain is reduced against.
///
/// `shifts[k]` is the momentum `r_{k+1}` of denominator
/// `D_{k+1} = (l + r_{k+1})² - m_{k+1}²`; `D_0` carries `l` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopIntegral {
    /// Denominator shifts `r_1, ..., r_{n-1}`.
    pub shifts: Vec<Momentum>,
    /// Squared internal masses `m_0², ..., m_{n-1}²`.
    pub masses_sq: Vec<Expr>,
}

impl LoopIntegral {
    /// LoopTools argument list.
    pub fn arguments(&self, kinematics: &Kinematics) -> Result<Vec<Expr>, WilcoError> {
        let mut args = match self.shifts.as_slice() {
            [r1] => vec![kinematics.square(*r1)],
            [r1, r2] => vec![
                kinematics.square(*r1),
                kinematics.square(r2.minus(*r1)),
                kinematics.square(*r2),
            ],
            _ => {
                return Err(reduction_error(
                    "unsupported-integral",
                    format!("{}-point integrals are not reduced", self.shifts.len() + 1),
                ))
            }
        };
        args.extend(self.masses_sq.iter().cloned());
        Ok(args)
    }

    fn is_two_point(&self) -> bool {
        self.shifts.len() == 1
    }
}

fn scalar_function(two_point: bool) -> LoopFunction {
    if two_point {
        LoopFunction::B0
    } else {
        LoopFunction::C0
    }
}

fn vector_functions(two_point: bool) -> &'static [LoopFunction] {
    if two_point {
        &[LoopFunction::B1]
    } else {
        &[LoopFunction::C1, LoopFunction::C2]
    }
}

fn metric_function(two_point: bool) -> LoopFunction {
    if two_point {
        LoopFunction::B00
    } else {
        LoopFunction::C00
    }
}

fn tensor_functions(two_point: bool) -> &'static [(usize, usize, LoopFunction)] {
    if two_point {
        &[(0, 0, LoopFunction::B11)]
    } else {
        &[
            (0, 0, LoopFunction::C11),
            (0, 1, LoopFunction::C12),
            (1, 0, LoopFunction::C12),
            (1, 1, LoopFunction::C22),
        ]
    }
}

/// Replaces the slot at `position` by `Σ coef × gamma`.
fn substitute_slot(term: &DiracTerm, position: usize, replacement: &[(i64, Gamma)]) -> Vec<DiracTerm> {
    replacement
        .iter()
        .map(|(coef, gamma)| {
            let mut chain = term.chain.clone();
            chain[position] = *gamma;
            DiracTerm {
                coefficient: Expr::mul([term.coefficient.clone(), Expr::int(*coef)]),
                vector: term.vector,
                chain,
            }
        })
        .collect()
}

fn with_function(term: DiracTerm, function: &Expr) -> DiracTerm {
    term.scaled(function.clone())
}

fn max_label(terms: &[DiracTerm]) -> u32 {
    terms
        .iter()
        .flat_map(|term| term.chain.iter())
        .filter_map(|gamma| match gamma {
            Gamma::Index(label) => Some(*label),
            Gamma::Slash(_) => None,
        })
        .max()
        .unwrap_or(FREE_INDEX)
}

/// Integrates the loop momentum out of `terms`.
///
/// Rank 0 gives `X0`, rank 1 `Σ X_k r̸_k`, rank 2 `X00 γ^κ..γ_κ + Σ X_kl r̸_k..r̸_l`;
/// higher ranks are `Reduction` errors.
pub fn reduce_loop_momenta(
    terms: Vec<DiracTerm>,
    integral: &LoopIntegral,
    kinematics: &Kinematics,
) -> Result<Vec<DiracTerm>, WilcoError> {
    let args = integral.arguments(kinematics)?;
    let two_point = integral.is_two_point();
    let dummy = max_label(&terms) + 1;
    let shifts: Vec<Vec<(i64, Gamma)>> = integral.shifts.iter().map(|r| r.slashes()).collect();
    let mut out = Vec::new();
    for term in terms {
        let positions: Vec<usize> = term
            .chain
            .iter()
            .enumerate()
            .filter(|(_, gamma)| **gamma == Gamma::Slash(Vector::Loop))
            .map(|(position, _)| position)
            .collect();
        match positions.as_slice() {
            [] => {
                let function = scalar_function(two_point).apply(args.clone())?;
                out.push(with_function(term, &function));
            }
            [position] => {
                for (shift, function) in shifts.iter().zip(vector_functions(two_point)) {
                    let function = function.apply(args.clone())?;
                    for reduced in substitute_slot(&term, *position, shift) {
                        out.push(with_function(reduced, &function));
                    }
                }
            }
            [first, second] => {
                let metric = metric_function(two_point).apply(args.clone())?;
                let mut paired = term.clone();
                paired.chain[*first] = Gamma::Index(dummy);
                paired.chain[*second] = Gamma::Index(dummy);
                out.push(with_function(paired, &metric));
                for (a, b, function) in tensor_functions(two_point) {
                    let function = function.apply(args.clone())?;
                    for left in substitute_slot(&term, *first, &shifts[*a]) {
                        for reduced in substitute_slot(&left, *second, &shifts[*b]) {
                            out.push(with_function(reduced, &function));
                        }
                    }
                }
            }
            _ => {
                return Err(reduction_error(
                    "tensor-rank",
                    format!("tensor rank {} exceeds two", positions.len()),
                ))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Leg, ProcessSpec};
    use wilco_expr::expand;
    use wilco_model::toy_qed;

    fn self_energy_kinematics() -> Kinematics {
        let model = toy_qed("mu", -1, "m_mu").expect("model");
        let process = ProcessSpec::new(vec![Leg::incoming("mu").off_shell(), Leg::outgoing("mu")]);
        Kinematics::from_process(&model, &process).expect("kinematics")
    }

    fn integral() -> LoopIntegral {
        LoopIntegral {
            shifts: vec![Momentum::new(1, 0)],
            masses_sq: vec![Expr::zero(), Expr::pow(Expr::param("m_mu"), 2)],
        }
    }

    #[test]
    fn rank_one_becomes_b1_times_shift() {
        let kin = self_energy_kinematics();
        let term = DiracTerm::new(Expr::one(), vec![Gamma::Slash(Vector::Loop)]);
        let reduced = reduce_loop_momenta(vec![term], &integral(), &kin).expect("reduce");
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].chain, vec![Gamma::Slash(Vector::In)]);
        assert!(reduced[0].coefficient.contains_loop_function());
        let args = integral().arguments(&kin).expect("args");
        let b1 = LoopFunction::B1.apply(args).expect("B1");
        assert_eq!(expand(&reduced[0].coefficient), expand(&b1));
    }

    #[test]
    fn rank_two_uses_fresh_dummy_index() {
        let kin = self_energy_kinematics();
        let chain = vec![
            Gamma::Index(1),
            Gamma::Slash(Vector::Loop),
            Gamma::Slash(Vector::Loop),
            Gamma::Index(1),
        ];
        let reduced = reduce_loop_momenta(vec![DiracTerm::new(Expr::one(), chain)], &integral(), &kin)
            .expect("reduce");
        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[0].chain[1], Gamma::Index(2));
        assert_eq!(reduced[0].chain[2], Gamma::Index(2));
        assert_eq!(reduced[1].chain[1], Gamma::Slash(Vector::In));
    }

    #[test]
    fn rank_three_is_rejected() {
        let kin = self_energy_kinematics();
        let chain = vec![Gamma::Slash(Vector::Loop); 3];
        let err = reduce_loop_momenta(vec![DiracTerm::new(Expr::one(), chain)], &integral(), &kin)
            .expect_err("rank three");
        assert_eq!(err.code(), "tensor-rank");
    }
}
