//! C++ rendering of expressions.

use num_rational::BigRational;
use num_traits::Signed;
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::{Expr, Function, LoopFunction, Node, SymbolKind, PI_NAME};

/// Prefix of the externally provided loop-function runtime.
pub const LOOP_RUNTIME_PREFIX: &str = "wilco_";

const RESERVED: &[&str] = &[
    "auto", "bool", "break", "case", "char", "class", "const", "continue", "default", "delete",
    "do", "double", "else", "enum", "extern", "float", "for", "if", "inline", "int", "long",
    "namespace", "new", "params", "return", "short", "signed", "sizeof", "static", "struct",
    "switch", "template", "this", "typedef", "union", "unsigned", "void", "while",
];

pub(crate) fn codegen_error(code: &str, message: impl Into<String>) -> WilcoError {
    WilcoError::Codegen(ErrorInfo::new(code, message))
}

/// Checks that `name` is a C++ identifier that cannot clash with generated code.
pub fn validate_identifier(name: &str) -> Result<(), WilcoError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid || RESERVED.contains(&name) || name.starts_with(LOOP_RUNTIME_PREFIX) {
        return Err(WilcoError::Codegen(
            ErrorInfo::new("invalid-identifier", "name is not usable as a C++ identifier")
                .with_context("name", name)
                .with_hint("use [A-Za-z_][A-Za-z0-9_]* outside keywords and the wilco_ prefix"),
        ));
    }
    Ok(())
}

/// Runtime symbol implementing `function`.
pub fn loop_runtime_name(function: LoopFunction) -> String {
    format!("{}{}", LOOP_RUNTIME_PREFIX, function.name())
}

fn rational_literal(value: &BigRational) -> String {
    let literal = if value.is_integer() {
        format!("{}.0", value.numer().abs())
    } else {
        format!("{}.0 / {}.0", value.numer().abs(), value.denom())
    };
    match (value.is_negative(), value.is_integer()) {
        (false, true) => literal,
        (false, false) => format!("({})", literal),
        (true, _) => format!("(-{})", literal),
    }
}

fn join(parts: Vec<String>, separator: &str) -> String {
    format!("({})", parts.join(separator))
}

/// Renders `expr` as a C++ `double` expression reading parameters from `params`.
///
/// Abbreviation symbols render as bare local names; the caller declares them.
pub fn render(expr: &Expr) -> Result<String, WilcoError> {
    match expr.node() {
        Node::Num(value) => Ok(rational_literal(value)),
        Node::Sym(symbol) => match symbol.kind {
            SymbolKind::Parameter if symbol.name == PI_NAME => Ok("M_PI".to_string()),
            SymbolKind::Parameter | SymbolKind::Kinematic => {
                validate_identifier(&symbol.name)?;
                Ok(format!("params.{}", symbol.name))
            }
            SymbolKind::Abbreviation => Ok(symbol.name.clone()),
            SymbolKind::Dimension => Err(codegen_error(
                "dimension-left",
                "the space-time dimension must be eliminated before emission",
            )),
        },
        Node::Add(terms) => Ok(join(terms.iter().map(render).collect::<Result<_, _>>()?, " + ")),
        Node::Mul(factors) => Ok(join(factors.iter().map(render).collect::<Result<_, _>>()?, " * ")),
        Node::Pow(base, exp) => {
            let base = render(base)?;
            Ok(match *exp {
                0 => "1.0".to_string(),
                1 => base,
                e if e > 0 => format!("std::pow({}, {})", base, e),
                e => format!("(1.0 / std::pow({}, {}))", base, -e),
            })
        }
        Node::Func(function, arg) => {
            let name = match function {
                Function::Log => "std::log",
                Function::Sqrt => "std::sqrt",
            };
            Ok(format!("{}({})", name, render(arg)?))
        }
        Node::Loop(function, args) => {
            let rendered: Vec<String> = args.iter().map(render).collect::<Result<_, _>>()?;
            Ok(format!("{}({})", loop_runtime_name(*function), rendered.join(", ")))
        }
        Node::Structure(structure) => Err(WilcoError::Codegen(
            ErrorInfo::new("structure-left", "only Wilson coefficients can be emitted")
                .with_context("structure", structure.to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wilco_expr::Structure;

    #[test]
    fn renders_parameters_pi_and_rationals() {
        let expr = Expr::mul([
            Expr::rational(-1, 16),
            Expr::pow(Expr::pi(), -2),
            Expr::pow(Expr::param("e"), 2),
        ]);
        let rendered = render(&expr).expect("render");
        assert!(rendered.contains("(-1.0 / 16.0)"));
        assert!(rendered.contains("(1.0 / std::pow(M_PI, 2))"));
        assert!(rendered.contains("std::pow(params.e, 2)"));
    }

    #[test]
    fn loop_functions_call_the_runtime() {
        let b0 = Expr::loop_fn(
            LoopFunction::B0,
            vec![Expr::kinematic("p1_sq"), Expr::zero(), Expr::param("m_mu")],
        );
        assert_eq!(
            render(&b0).expect("render"),
            "wilco_B0(params.p1_sq, 0.0, params.m_mu)"
        );
    }

    #[test]
    fn leftover_structures_and_dimensions_are_rejected() {
        let structure = Expr::mul([Expr::param("c"), Expr::structure(Structure::Vector)]);
        assert_eq!(render(&structure).expect_err("structure").code(), "structure-left");
        assert_eq!(render(&Expr::dimension()).expect_err("d").code(), "dimension-left");
    }

    #[test]
    fn identifiers_are_validated() {
        assert!(validate_identifier("mu_self_e_mterm").is_ok());
        for bad in ["", "1abc", "a-b", "double", "wilco_B0"] {
            assert_eq!(validate_identifier(bad).expect_err(bad).code(), "invalid-identifier");
        }
    }
}
