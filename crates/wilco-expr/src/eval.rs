//! Numeric evaluation of expressions.

use std::collections::BTreeMap;

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use wilco_core::{ErrorInfo, WilcoError};

use crate::expr::{Expr, Function, Node, PI_NAME};
use crate::loopfn::{evaluate_loop_function, LoopEvalOpts};

/// Symbol values and loop-function options used by [`evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalContext {
    /// Values by symbol name.
    pub values: BTreeMap<String, f64>,
    /// Loop-function evaluation options.
    #[serde(default)]
    pub loop_opts: LoopEvalOpts,
}

impl Default for EvalContext {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        values.insert(PI_NAME.to_string(), std::f64::consts::PI);
        Self {
            values,
            loop_opts: LoopEvalOpts::default(),
        }
    }
}

impl EvalContext {
    /// Context with `pi` defined and default loop options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a symbol value.
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Sets a symbol value in place.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Replaces the loop-function options.
    pub fn with_loop_opts(mut self, opts: LoopEvalOpts) -> Self {
        self.loop_opts = opts;
        self
    }
}

fn eval_error(code: &str, message: impl Into<String>) -> WilcoError {
    WilcoError::Eval(ErrorInfo::new(code, message))
}

/// Evaluates `expr` to a finite real number.
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> Result<f64, WilcoError> {
    let value = match expr.node() {
        Node::Num(value) => value
            .to_f64()
            .ok_or_else(|| eval_error("rational-overflow", "rational constant out of range"))?,
        Node::Sym(symbol) => {
            if symbol.is_abbreviation() && !ctx.values.contains_key(&symbol.name) {
                return Err(WilcoError::Eval(
                    ErrorInfo::new(
                        "unexpanded-abbreviation",
                        format!("abbreviation {} must be expanded before evaluation", symbol.name),
                    )
                    .with_hint("call expand_abbreviations with the owning table"),
                ));
            }
            *ctx.values.get(&symbol.name).ok_or_else(|| {
                WilcoError::Eval(
                    ErrorInfo::new("missing-symbol", format!("no value for {}", symbol.name))
                        .with_context("symbol", symbol.name.clone()),
                )
            })?
        }
        Node::Structure(structure) => {
            return Err(eval_error(
                "structure-atom",
                format!("structure {} has no numeric value", structure),
            ))
        }
        Node::Add(terms) => {
            let mut sum = 0.0;
            for term in terms {
                sum += evaluate(term, ctx)?;
            }
            sum
        }
        Node::Mul(factors) => {
            let mut product = 1.0;
            for factor in factors {
                product *= evaluate(factor, ctx)?;
            }
            product
        }
        Node::Pow(base, exp) => {
            let exp = i32::try_from(*exp)
                .map_err(|_| eval_error("exponent-range", "exponent out of range"))?;
            evaluate(base, ctx)?.powi(exp)
        }
        Node::Func(function, arg) => {
            let arg = evaluate(arg, ctx)?;
            match function {
                Function::Log => arg.ln(),
                Function::Sqrt => arg.sqrt(),
            }
        }
        Node::Loop(function, args) => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            evaluate_loop_function(*function, &values, &ctx.loop_opts)?
        }
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(eval_error("non-finite", format!("{} evaluated to {}", expr, value)))
    }
}
