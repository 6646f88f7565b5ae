//! Passarino-Veltman one-loop functions.
//!
//! Arguments follow the LoopTools ordering: `A0(m²)`, `B(p²; m0², m1²)` and
//! `C(p1², p2², (p1+p2)²; m0², m1², m2²)`. The integral measure is
//! `μ^{4-d} / (i π^{d/2} r_Γ) ∫ d^d l`, so that `B0 = Δ - ∫ ln(D/μ²)` with
//! `Δ = 1/ε - γ_E + ln 4π`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;
use wilco_core::{ErrorInfo, WilcoError};

use crate::expand::poly;
use crate::expr::{Expr, Node, SymbolKind};
use crate::quadrature::GradedRule;

/// Identifier of a Passarino-Veltman function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoopFunction {
    /// One-point scalar integral.
    A0,
    /// Two-point scalar integral.
    B0,
    /// Two-point vector coefficient.
    B1,
    /// Two-point metric coefficient.
    B00,
    /// Two-point rank-two coefficient.
    B11,
    /// Three-point scalar integral.
    C0,
    /// Three-point vector coefficient along the first momentum.
    C1,
    /// Three-point vector coefficient along the second momentum.
    C2,
    /// Three-point metric coefficient.
    C00,
    /// Three-point rank-two coefficient.
    C11,
    /// Three-point mixed rank-two coefficient.
    C12,
    /// Three-point rank-two coefficient along the second momentum.
    C22,
}

impl LoopFunction {
    /// Name used for display and in generated code.
    pub fn name(self) -> &'static str {
        match self {
            LoopFunction::A0 => "A0",
            LoopFunction::B0 => "B0",
            LoopFunction::B1 => "B1",
            LoopFunction::B00 => "B00",
            LoopFunction::B11 => "B11",
            LoopFunction::C0 => "C0",
            LoopFunction::C1 => "C1",
            LoopFunction::C2 => "C2",
            LoopFunction::C00 => "C00",
            LoopFunction::C11 => "C11",
            LoopFunction::C12 => "C12",
            LoopFunction::C22 => "C22",
        }
    }

    /// Number of arguments.
    pub fn arity(self) -> usize {
        match self {
            LoopFunction::A0 => 1,
            LoopFunction::B0 | LoopFunction::B1 | LoopFunction::B00 | LoopFunction::B11 => 3,
            _ => 6,
        }
    }

    /// All functions in declaration order.
    pub const ALL: [LoopFunction; 12] = [
        LoopFunction::A0,
        LoopFunction::B0,
        LoopFunction::B1,
        LoopFunction::B00,
        LoopFunction::B11,
        LoopFunction::C0,
        LoopFunction::C1,
        LoopFunction::C2,
        LoopFunction::C00,
        LoopFunction::C11,
        LoopFunction::C12,
        LoopFunction::C22,
    ];

    /// Applies the function to arguments after checking the arity.
    pub fn apply(self, args: Vec<Expr>) -> Result<Expr, WilcoError> {
        if args.len() != self.arity() {
            return Err(WilcoError::Expr(
                ErrorInfo::new(
                    "loop-arity",
                    format!("{} expects {} arguments", self.name(), self.arity()),
                )
                .with_context("given", args.len().to_string()),
            ));
        }
        Ok(Expr::loop_fn(self, args))
    }

    /// Coefficient of `Δ` (the `1/ε` pole) in the function.
    pub fn uv_residue(self, args: &[Expr]) -> Expr {
        match self {
            LoopFunction::A0 => args.first().cloned().unwrap_or_else(Expr::zero),
            LoopFunction::B0 => Expr::one(),
            LoopFunction::B1 => Expr::rational(-1, 2),
            LoopFunction::B11 => Expr::rational(1, 3),
            LoopFunction::B00 => match args {
                [p_sq, m0_sq, m1_sq] => Expr::add([
                    Expr::mul([Expr::rational(1, 4), m0_sq.clone()]),
                    Expr::mul([Expr::rational(1, 4), m1_sq.clone()]),
                    Expr::mul([Expr::rational(-1, 12), p_sq.clone()]),
                ]),
                _ => Expr::zero(),
            },
            LoopFunction::C00 => Expr::rational(1, 4),
            _ => Expr::zero(),
        }
    }
}

impl fmt::Display for LoopFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options of numeric loop-function evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopEvalOpts {
    /// Value substituted for the UV divergence `Δ`; zero is MS-bar.
    #[serde(default)]
    pub delta_uv: f64,
    /// Squared renormalisation scale.
    #[serde(default = "default_mu_sq")]
    pub mu_sq: f64,
    /// Squared regulator mass replacing vanishing internal masses in three-point functions.
    #[serde(default = "default_ir_lambda_sq")]
    pub ir_lambda_sq: f64,
    /// Gauss-Legendre order per panel.
    #[serde(default = "default_order")]
    pub order: usize,
    /// Number of geometrically graded panels per half interval.
    #[serde(default = "default_grading")]
    pub grading: u32,
}

fn default_mu_sq() -> f64 {
    1.0
}

fn default_ir_lambda_sq() -> f64 {
    1e-16
}

fn default_order() -> usize {
    16
}

fn default_grading() -> u32 {
    30
}

impl Default for LoopEvalOpts {
    fn default() -> Self {
        Self {
            delta_uv: 0.0,
            mu_sq: default_mu_sq(),
            ir_lambda_sq: default_ir_lambda_sq(),
            order: default_order(),
            grading: default_grading(),
        }
    }
}

fn eval_error(code: &str, message: impl Into<String>) -> WilcoError {
    WilcoError::Eval(ErrorInfo::new(code, message))
}

/// Real part of `function(args)` by Feynman-parameter quadrature.
pub fn evaluate_loop_function(
    function: LoopFunction,
    args: &[f64],
    opts: &LoopEvalOpts,
) -> Result<f64, WilcoError> {
    if args.len() != function.arity() {
        return Err(eval_error(
            "loop-arity",
            format!("{} expects {} arguments", function.name(), function.arity()),
        ));
    }
    if opts.mu_sq <= 0.0 {
        return Err(eval_error("mu-sq", "renormalisation scale must be positive"));
    }
    if args.iter().all(|value| *value == 0.0) {
        return Ok(0.0);
    }
    let rule = GradedRule::new(opts.order, opts.grading);
    let delta = opts.delta_uv;
    let log = |value: f64| (value.abs() / opts.mu_sq).ln();
    let value = match function {
        LoopFunction::A0 => {
            let m_sq = args[0];
            m_sq * (delta + 1.0 - log(m_sq))
        }
        LoopFunction::B0 | LoopFunction::B1 | LoopFunction::B00 | LoopFunction::B11 => {
            let (p_sq, m0_sq, m1_sq) = (args[0], args[1], args[2]);
            let denom = |x: f64| x * m1_sq + (1.0 - x) * m0_sq - x * (1.0 - x) * p_sq;
            match function {
                LoopFunction::B0 => delta - rule.integrate(|x| log(denom(x))),
                LoopFunction::B1 => -0.5 * delta + rule.integrate(|x| x * log(denom(x))),
                LoopFunction::B11 => delta / 3.0 - rule.integrate(|x| x * x * log(denom(x))),
                _ => {
                    0.5 * rule.integrate(|x| {
                        let d = denom(x);
                        if d == 0.0 {
                            0.0
                        } else {
                            d * (delta + 1.0 - log(d))
                        }
                    })
                }
            }
        }
        _ => {
            let regulate = |m_sq: f64| if m_sq == 0.0 { opts.ir_lambda_sq } else { m_sq };
            let (r1_sq, p2_sq, r2_sq) = (args[0], args[1], args[2]);
            let (m0_sq, m1_sq, m2_sq) = (regulate(args[3]), regulate(args[4]), regulate(args[5]));
            let r1_r2 = 0.5 * (r1_sq + r2_sq - p2_sq);
            let denom = |x: f64, y: f64| {
                (1.0 - x - y) * m0_sq + x * m1_sq + y * m2_sq
                    - x * (1.0 - x) * r1_sq
                    - y * (1.0 - y) * r2_sq
                    + 2.0 * x * y * r1_r2
            };
            match function {
                LoopFunction::C0 => -rule.integrate_simplex(|x, y| 1.0 / denom(x, y)),
                LoopFunction::C1 => rule.integrate_simplex(|x, y| x / denom(x, y)),
                LoopFunction::C2 => rule.integrate_simplex(|x, y| y / denom(x, y)),
                LoopFunction::C11 => -rule.integrate_simplex(|x, y| x * x / denom(x, y)),
                LoopFunction::C12 => -rule.integrate_simplex(|x, y| x * y / denom(x, y)),
                LoopFunction::C22 => -rule.integrate_simplex(|x, y| y * y / denom(x, y)),
                _ => 0.25 * delta - 0.5 * rule.integrate_simplex(|x, y| log(denom(x, y))),
            }
        }
    };
    trace!(function = function.name(), value, "evaluated loop function");
    if value.is_finite() {
        Ok(value)
    } else {
        Err(eval_error("non-finite", format!("{} is not finite", function.name())))
    }
}

/// Removes the dimension symbol `d = 4 - 2ε` from an expression.
///
/// A term `d^k F` with a single loop function `F` becomes
/// `4^k F - 2k 4^{k-1} Res(F)` up to `O(ε)`; terms without a loop function
/// take `d = 4`.
pub fn eliminate_dimension(expr: &Expr) -> Result<Expr, WilcoError> {
    let mut terms = Vec::new();
    for (monomial, coefficient) in poly(expr) {
        let mut power = 0i64;
        let mut loops = Vec::new();
        let mut rest = vec![Expr::num(coefficient)];
        for (atom, exp) in monomial {
            match atom.node() {
                Node::Sym(symbol) if symbol.kind == SymbolKind::Dimension => power += exp,
                Node::Loop(_, _) => loops.push((atom.clone(), exp)),
                _ => rest.push(Expr::pow(atom, exp)),
            }
        }
        if power < 0 {
            return Err(WilcoError::Reduction(ErrorInfo::new(
                "dimension-denominator",
                "negative powers of the dimension cannot be expanded around d = 4",
            )));
        }
        let rest = Expr::mul(rest);
        let four_k = Expr::pow(Expr::int(4), power);
        match loops.as_slice() {
            [] => terms.push(Expr::mul([four_k, rest])),
            [(atom, 1)] if power > 0 => {
                let residue = match atom.node() {
                    Node::Loop(function, args) => function.uv_residue(args),
                    _ => Expr::zero(),
                };
                let shift = Expr::mul([
                    Expr::int(-2 * power),
                    Expr::pow(Expr::int(4), power - 1),
                    residue,
                ]);
                terms.push(Expr::mul([
                    rest,
                    Expr::add([Expr::mul([four_k, atom.clone()]), shift]),
                ]));
            }
            _ if power == 0 => {
                let mut factors = vec![rest];
                factors.extend(loops.iter().map(|(atom, exp)| Expr::pow(atom.clone(), *exp)));
                terms.push(Expr::mul(factors));
            }
            _ => {
                return Err(WilcoError::Reduction(ErrorInfo::new(
                    "dimension-loop-product",
                    "a power of d multiplies more than one loop function",
                )))
            }
        }
    }
    Ok(Expr::add(terms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;

    fn opts() -> LoopEvalOpts {
        LoopEvalOpts {
            ir_lambda_sq: 1e-20,
            ..LoopEvalOpts::default()
        }
    }

    #[test]
    fn b0_at_zero_momentum_matches_closed_form() {
        // B0(0; m², m²) = Δ - ln(m²/μ²)
        let value = evaluate_loop_function(LoopFunction::B0, &[0.0, 2.0, 2.0], &opts()).expect("B0");
        assert!((value + 2.0f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn on_shell_b_functions_match_closed_forms() {
        // B0(m²; 0, m²) = Δ + 2 - ln(m²/μ²), B1(m²; m², 0) = -Δ/2 - 3/2 + ln(m²/μ²)/2
        let m_sq = 0.5;
        let b0 = evaluate_loop_function(LoopFunction::B0, &[m_sq, 0.0, m_sq], &opts()).expect("B0");
        assert!((b0 - (2.0 - m_sq.ln())).abs() < 1e-9, "{b0}");
        let b1 = evaluate_loop_function(LoopFunction::B1, &[m_sq, m_sq, 0.0], &opts()).expect("B1");
        assert!((b1 - (-1.5 + 0.5 * m_sq.ln())).abs() < 1e-9, "{b1}");
    }

    #[test]
    fn vertex_functions_at_zero_transfer() {
        let m_sq: f64 = 1.3;
        let args = [m_sq, 0.0, m_sq, 0.0, m_sq, m_sq];
        let c1 = evaluate_loop_function(LoopFunction::C1, &args, &opts()).expect("C1");
        let c11 = evaluate_loop_function(LoopFunction::C11, &args, &opts()).expect("C11");
        let c12 = evaluate_loop_function(LoopFunction::C12, &args, &opts()).expect("C12");
        assert!((c1 - 0.5 / m_sq).abs() < 1e-8, "{c1}");
        assert!((c11 + 1.0 / (6.0 * m_sq)).abs() < 1e-8, "{c11}");
        assert!((c12 + 1.0 / (12.0 * m_sq)).abs() < 1e-8, "{c12}");
    }

    #[test]
    fn scaleless_integrals_vanish() {
        let value = evaluate_loop_function(LoopFunction::B0, &[0.0, 0.0, 0.0], &opts()).expect("B0");
        assert_eq!(value, 0.0);
    }

    #[test]
    fn dimension_multiplies_residue() {
        let m_sq = Expr::param("m_sq");
        let b0 = Expr::loop_fn(LoopFunction::B0, vec![m_sq.clone(), Expr::zero(), m_sq.clone()]);
        let expr = Expr::mul([Expr::dimension(), b0.clone()]);
        let reduced = eliminate_dimension(&expr).expect("reduce");
        let expected = Expr::add([Expr::mul([Expr::int(4), b0]), Expr::int(-2)]);
        assert_eq!(expand(&reduced), expand(&expected));
        let plain = Expr::mul([Expr::dimension(), m_sq.clone()]);
        assert_eq!(
            expand(&eliminate_dimension(&plain).expect("reduce")),
            expand(&Expr::mul([Expr::int(4), m_sq]))
        );
    }
}
