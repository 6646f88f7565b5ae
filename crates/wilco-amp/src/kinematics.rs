//! External kinematics of a single open fermion line with at most one vector.

use serde::{Deserialize, Serialize};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::{expand, Expr};
use wilco_model::Model;

use crate::dirac::{Gamma, ScalarProducts, Vector};
use crate::process::{Direction, ProcessSpec};

/// Integer combination `a p + b p'` of the external fermion momenta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Momentum {
    /// Coefficient of the incoming momentum `p`.
    pub in_coef: i64,
    /// Coefficient of the outgoing momentum `p'`.
    pub out_coef: i64,
}

impl Momentum {
    /// `a p + b p'`.
    pub const fn new(in_coef: i64, out_coef: i64) -> Self {
        Self { in_coef, out_coef }
    }

    /// Sum of two momenta.
    pub fn plus(self, other: Momentum) -> Momentum {
        Momentum::new(self.in_coef + other.in_coef, self.out_coef + other.out_coef)
    }

    /// Difference of two momenta.
    pub fn minus(self, other: Momentum) -> Momentum {
        Momentum::new(self.in_coef - other.in_coef, self.out_coef - other.out_coef)
    }

    /// Non-zero `(coefficient, vector)` components.
    pub fn components(self) -> Vec<(i64, Vector)> {
        [(self.in_coef, Vector::In), (self.out_coef, Vector::Out)]
            .into_iter()
            .filter(|(coef, _)| *coef != 0)
            .collect()
    }

    /// Components as slashed gamma matrices.
    pub fn slashes(self) -> Vec<(i64, Gamma)> {
        self.components()
            .into_iter()
            .map(|(coef, vector)| (coef, Gamma::Slash(vector)))
            .collect()
    }
}

/// Invariants and masses of the external fermion line.
///
/// Incoming fermion momentum is `p`, outgoing is `p'` and the vector carries
/// `q = p' - p` into the vertex. In a two-point function `p' = p`, so only
/// [`Vector::In`] appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Whether the process is a two-point function.
    pub two_point: bool,
    /// Leg index of the incoming fermion.
    pub in_leg: usize,
    /// Leg index of the outgoing fermion.
    pub out_leg: usize,
    /// Leg index of the vector, if any.
    pub vector_leg: Option<usize>,
    /// `p²`.
    pub in_sq: Expr,
    /// `p'²`.
    pub out_sq: Expr,
    /// `q²`.
    pub transfer_sq: Expr,
    /// Mass of the incoming fermion.
    pub in_mass: Expr,
    /// Mass of the outgoing fermion.
    pub out_mass: Expr,
    /// Whether `u(p)` obeys the Dirac equation.
    pub in_on_shell: bool,
    /// Whether `ū(p')` obeys the Dirac equation.
    pub out_on_shell: bool,
    /// Whether the vector is on shell, making `q^μ` terms vanish.
    pub vector_on_shell: bool,
}

fn topology_error(message: impl Into<String>, process: &ProcessSpec) -> WilcoError {
    WilcoError::Reduction(
        ErrorInfo::new("unsupported-topology", message)
            .with_context("process", process.to_string())
            .with_hint("amplitudes are built for one open fermion line with at most one vector"),
    )
}

fn invariant(index: usize) -> Expr {
    Expr::kinematic(format!("p{}_sq", index + 1))
}

impl Kinematics {
    /// Kinematics of `process`; anything other than one incoming fermion,
    /// one outgoing fermion and at most one vector is unsupported.
    pub fn from_process(model: &Model, process: &ProcessSpec) -> Result<Self, WilcoError> {
        let mut in_leg = None;
        let mut out_leg = None;
        let mut vector_leg = None;
        for (index, leg) in process.legs.iter().enumerate() {
            let particle = model.require_particle(&leg.particle)?;
            let slot = match (particle.is_fermion(), leg.direction) {
                (true, Direction::Incoming) => &mut in_leg,
                (true, Direction::Outgoing) => &mut out_leg,
                (false, _) => &mut vector_leg,
            };
            if slot.replace(index).is_some() {
                return Err(topology_error("more than one open fermion line or vector", process));
            }
        }
        let (in_leg, out_leg) = match (in_leg, out_leg) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(topology_error("no open fermion line", process)),
        };
        let in_particle = model.require_particle(&process.legs[in_leg].particle)?;
        let out_particle = model.require_particle(&process.legs[out_leg].particle)?;
        let in_mass = in_particle.mass_expr();
        let out_mass = out_particle.mass_expr();
        let two_point = vector_leg.is_none();

        if two_point {
            let on_shell = process.legs[in_leg].is_on_shell() && process.legs[out_leg].is_on_shell();
            let p_sq = if on_shell { in_particle.mass_sq() } else { invariant(in_leg) };
            return Ok(Self {
                two_point,
                in_leg,
                out_leg,
                vector_leg,
                in_sq: p_sq.clone(),
                out_sq: p_sq,
                transfer_sq: Expr::zero(),
                in_mass,
                out_mass,
                in_on_shell: on_shell,
                out_on_shell: on_shell,
                vector_on_shell: false,
            });
        }

        let in_on_shell = process.legs[in_leg].is_on_shell();
        let out_on_shell = process.legs[out_leg].is_on_shell();
        let vector_on_shell = vector_leg
            .map(|index| process.legs[index].is_on_shell())
            .unwrap_or(false);
        Ok(Self {
            two_point,
            in_leg,
            out_leg,
            vector_leg,
            in_sq: if in_on_shell { in_particle.mass_sq() } else { invariant(in_leg) },
            out_sq: if out_on_shell { out_particle.mass_sq() } else { invariant(out_leg) },
            transfer_sq: match vector_leg {
                Some(index) if !vector_on_shell => invariant(index),
                _ => Expr::zero(),
            },
            in_mass,
            out_mass,
            in_on_shell,
            out_on_shell,
            vector_on_shell,
        })
    }

    /// Momentum flowing into the diagram through leg `index`.
    pub fn inflow(&self, index: usize) -> Momentum {
        if index == self.in_leg {
            Momentum::new(1, 0)
        } else if index == self.out_leg {
            if self.two_point {
                Momentum::new(-1, 0)
            } else {
                Momentum::new(0, -1)
            }
        } else {
            Momentum::new(-1, 1)
        }
    }

    /// `k²` for a combination of external momenta.
    pub fn square(&self, k: Momentum) -> Expr {
        let (a, b) = (k.in_coef, k.out_coef);
        expand(&Expr::add([
            Expr::mul([Expr::int(a * a), self.in_sq.clone()]),
            Expr::mul([Expr::int(b * b), self.out_sq.clone()]),
            Expr::mul([Expr::int(2 * a * b), self.in_out()]),
        ]))
    }

    fn in_out(&self) -> Expr {
        if self.two_point {
            return self.in_sq.clone();
        }
        Expr::mul([
            Expr::rational(1, 2),
            Expr::add([
                self.in_sq.clone(),
                self.out_sq.clone(),
                Expr::neg(self.transfer_sq.clone()),
            ]),
        ])
    }

    /// Mass applied by the Dirac equation on the outgoing spinor.
    pub fn out_equation_mass(&self) -> Option<&Expr> {
        self.out_on_shell.then_some(&self.out_mass)
    }

    /// Mass applied by the Dirac equation on the incoming spinor.
    pub fn in_equation_mass(&self) -> Option<&Expr> {
        self.in_on_shell.then_some(&self.in_mass)
    }
}

impl ScalarProducts for Kinematics {
    fn dot(&self, a: Vector, b: Vector) -> Result<Expr, WilcoError> {
        match (a, b) {
            (Vector::Loop, _) | (_, Vector::Loop) => Err(WilcoError::Reduction(ErrorInfo::new(
                "loop-momentum-left",
                "a loop momentum survived tensor reduction",
            ))),
            (Vector::In, Vector::In) => Ok(self.in_sq.clone()),
            (Vector::Out, Vector::Out) => Ok(self.out_sq.clone()),
            _ => Ok(self.in_out()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Leg;
    use wilco_model::toy_qed;

    #[test]
    fn off_shell_self_energy_uses_leg_invariant() {
        let model = toy_qed("mu", -1, "m_mu").expect("model");
        let process = ProcessSpec::new(vec![Leg::incoming("mu").off_shell(), Leg::outgoing("mu")]);
        let kin = Kinematics::from_process(&model, &process).expect("kinematics");
        assert!(kin.two_point);
        assert!(!kin.in_on_shell && !kin.out_on_shell);
        assert_eq!(kin.in_sq, Expr::kinematic("p1_sq"));
        assert_eq!(kin.inflow(1), Momentum::new(-1, 0));
    }

    #[test]
    fn on_shell_vertex_has_massless_transfer() {
        let model = toy_qed("mu", -1, "m_mu").expect("model");
        let process = ProcessSpec::new(vec![
            Leg::incoming("mu"),
            Leg::outgoing("mu"),
            Leg::outgoing("A"),
        ]);
        let kin = Kinematics::from_process(&model, &process).expect("kinematics");
        let m_sq = Expr::pow(Expr::param("m_mu"), 2);
        assert_eq!(kin.square(Momentum::new(-1, 1)), Expr::zero());
        assert_eq!(kin.square(Momentum::new(1, 0)), expand(&m_sq));
        let dot = kin.dot(Vector::In, Vector::Out).expect("dot");
        assert_eq!(expand(&dot), expand(&m_sq));
        assert!(kin.dot(Vector::Loop, Vector::In).is_err());
    }

    #[test]
    fn two_vectors_are_unsupported() {
        let model = toy_qed("mu", -1, "m_mu").expect("model");
        let process = ProcessSpec::new(vec![Leg::incoming("A"), Leg::outgoing("A")]);
        let err = Kinematics::from_process(&model, &process).expect_err("unsupported");
        assert_eq!(err.code(), "unsupported-topology");
    }
}
