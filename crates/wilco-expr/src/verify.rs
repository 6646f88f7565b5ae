//! Randomized numeric equivalence checks.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wilco_core::{RngHandle, WilcoError};

use crate::eval::{evaluate, EvalContext};
use crate::expr::{Expr, SymbolKind};

/// Outcome of [`numerically_equivalent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceReport {
    /// Number of substitution points evaluated.
    pub trials: usize,
    /// Largest relative deviation observed.
    pub max_relative_deviation: f64,
    /// Tolerance the deviation was compared against.
    pub tolerance: f64,
    /// Whether every trial stayed within tolerance.
    pub passed: bool,
}

/// Compares `a` and `b` at random points.
///
/// Free symbols without a value in `base` are drawn from `[0.5, 2)` per
/// trial; values already present in `base` are kept fixed.
pub fn numerically_equivalent(
    a: &Expr,
    b: &Expr,
    base: &EvalContext,
    rng: &mut RngHandle,
    trials: usize,
    tolerance: f64,
) -> Result<EquivalenceReport, WilcoError> {
    let mut symbols = a.free_symbols();
    symbols.extend(b.free_symbols());
    let free: Vec<String> = symbols
        .into_iter()
        .filter(|symbol| symbol.kind != SymbolKind::Abbreviation)
        .map(|symbol| symbol.name)
        .filter(|name| !base.values.contains_key(name))
        .collect();
    let mut max_relative_deviation: f64 = 0.0;
    for trial in 0..trials {
        let mut ctx = base.clone();
        for name in &free {
            ctx.set(name.clone(), rng.gen_range(0.5..2.0));
        }
        let left = evaluate(a, &ctx)?;
        let right = evaluate(b, &ctx)?;
        let scale = left.abs().max(right.abs()).max(1.0);
        let deviation = (left - right).abs() / scale;
        debug!(trial, left, right, deviation, "equivalence trial");
        max_relative_deviation = max_relative_deviation.max(deviation);
    }
    Ok(EquivalenceReport {
        trials,
        max_relative_deviation,
        tolerance,
        passed: max_relative_deviation <= tolerance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::canonicalize;

    #[test]
    fn canonical_form_matches_input_numerically() {
        let (a, b) = (Expr::param("a"), Expr::param("b"));
        let expr = Expr::div(
            Expr::pow(Expr::add([a.clone(), b.clone()]), 3),
            Expr::mul([Expr::int(3), a, Expr::add([b, Expr::one()])]),
        );
        let mut rng = RngHandle::from_seed(11);
        let report =
            numerically_equivalent(&expr, &canonicalize(&expr), &EvalContext::new(), &mut rng, 16, 1e-12)
                .expect("verify");
        assert!(report.passed, "{report:?}");
    }

    #[test]
    fn different_expressions_fail() {
        let a = Expr::param("a");
        let mut rng = RngHandle::from_seed(3);
        let report = numerically_equivalent(
            &Expr::pow(a.clone(), 2),
            &Expr::mul([Expr::int(2), a]),
            &EvalContext::new(),
            &mut rng,
            8,
            1e-9,
        )
        .expect("verify");
        assert!(!report.passed);
    }
}
