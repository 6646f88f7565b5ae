//! Projection of amplitudes onto operator bases.
//!
//! The canonical representative of a vertex amplitude carries no `P^μ`:
//! on-shell spinors of equal mass obey the Gordon identity
//! `ū(p') P^μ u(p) = ū(p') (2m γ^μ - iσ^{μν}q_ν) u(p)`, and `q^μ` terms
//! vanish against an on-shell vector.

use std::collections::BTreeMap;

use tracing::{debug, info};
use wilco_amp::{apply_transversality, compute_amplitude, Amplitude, LoopOrder, ProcessSpec};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::expr::replace_with;
use wilco_expr::{
    collect_structures, expand, replace_structures, terms, AbbreviationTable, Expr, Structure,
};
use wilco_model::Model;

use crate::operator::{DiracCoupling, Operator, OperatorBasis};
use crate::wilson::{WilsonCoefficient, WilsonSet};

/// Prefix of abbreviations standing for single loop functions.
pub const LOOP_PREFIX: &str = "PV";

fn gordon_applies(amplitude: &Amplitude) -> bool {
    let kinematics = &amplitude.kinematics;
    !kinematics.two_point
        && kinematics.in_on_shell
        && kinematics.out_on_shell
        && kinematics.in_mass == kinematics.out_mass
}

/// Amplitude rewritten with the basis identities: Gordon decomposition of
/// `P^μ` and transversality of an on-shell vector.
pub fn reduce_to_basis(amplitude: &Amplitude) -> Result<Expr, WilcoError> {
    let expanded = expand(&amplitude.expr);
    if expanded.contains_abbreviation() {
        return Err(WilcoError::Match(
            ErrorInfo::new("abbreviated-amplitude", "amplitudes are matched before abbreviation")
                .with_hint("expand abbreviations before matching"),
        ));
    }
    let gordon = if gordon_applies(amplitude) {
        let mass = amplitude.kinematics.in_mass.clone();
        let mut replacements = BTreeMap::new();
        replacements.insert(
            Structure::MomentumSum,
            Expr::sub(
                Expr::mul([Expr::int(2), mass, Expr::structure(Structure::Vector)]),
                Expr::structure(Structure::Magnetic),
            ),
        );
        replace_structures(&expanded, &replacements)
    } else {
        expanded
    };
    Ok(apply_transversality(&gordon, &amplitude.kinematics))
}

/// Replaces loop functions by `PV_k` symbols and the whole loop part by one
/// `Ab_k` symbol; tree-level terms stay explicit.
fn abbreviate_loop_part(coefficient: &Expr, table: &mut AbbreviationTable) -> Result<Expr, WilcoError> {
    let (loop_terms, mut parts): (Vec<Expr>, Vec<Expr>) = terms(coefficient)
        .into_iter()
        .partition(|term| term.contains_loop_function());
    if loop_terms.is_empty() {
        return Ok(coefficient.clone());
    }
    let loop_part = Expr::add(loop_terms);
    let mut symbols = BTreeMap::new();
    for function in loop_part.loop_functions() {
        let symbol = table.abbreviate_with(LOOP_PREFIX, function.clone())?;
        symbols.insert(function, symbol);
    }
    let body = replace_with(&loop_part, &|node: &Expr| symbols.get(node).cloned());
    parts.push(table.abbreviate(expand(&body))?);
    Ok(Expr::add(parts))
}

/// Decomposes `amplitude` onto its operator basis.
///
/// Entries follow basis order; coefficients that expand to zero are omitted.
/// Structures outside the basis are `Match` errors.
pub fn get_wilson_coefficients(
    amplitude: &Amplitude,
    table: &mut AbbreviationTable,
) -> Result<WilsonSet, WilcoError> {
    let basis = OperatorBasis::for_amplitude(amplitude);
    let reduced = reduce_to_basis(amplitude)?;
    let parts: BTreeMap<Structure, Expr> = collect_structures(&reduced)?.into_iter().collect();
    if let Some(structure) = parts.keys().find(|s| basis.operator_for(**s).is_none()) {
        return Err(WilcoError::Match(
            ErrorInfo::new("outside-basis", format!("structure {} has no operator", structure))
                .with_context("process", amplitude.process.to_string())
                .with_hint("bases cover two fermions with at most one vector"),
        ));
    }
    let mut coefficients = Vec::new();
    for operator in &basis.operators {
        let coefficient = match parts.get(&operator.structure) {
            Some(coefficient) => expand(coefficient),
            None => continue,
        };
        if coefficient.is_zero() {
            continue;
        }
        let abbreviated = abbreviate_loop_part(&coefficient, table)?;
        debug!(operator = %operator, coefficient = %abbreviated, "matched operator");
        coefficients.push(WilsonCoefficient {
            operator: operator.clone(),
            coefficient: abbreviated,
        });
    }
    info!(
        process = %amplitude.process,
        coefficients = coefficients.len(),
        abbreviations = table.len(),
        "matched amplitude"
    );
    Ok(WilsonSet { coefficients })
}

/// Computes the amplitude of `process` and decomposes it.
pub fn compute_wilson_coefficients(
    model: &Model,
    order: LoopOrder,
    process: &ProcessSpec,
    table: &mut AbbreviationTable,
) -> Result<WilsonSet, WilcoError> {
    let amplitude = compute_amplitude(model, order, process)?;
    get_wilson_coefficients(&amplitude, table)
}

/// First entry satisfying `template`; absence is a `NotFound` error.
pub fn match_operator<'a>(set: &'a WilsonSet, template: &Operator) -> Result<&'a WilsonCoefficient, WilcoError> {
    set.iter().find(|entry| entry.operator.matches(template)).ok_or_else(|| {
        WilcoError::NotFound(
            ErrorInfo::new("operator-not-found", "no coefficient matches the operator template")
                .with_context("template", template.to_string())
                .with_hint("a missing operator is not a zero coefficient; check the basis and couplings"),
        )
    })
}

/// Magnetic templates with Dirac coupling `coupling` for every
/// fermion-vector field content of `set` that the model couples.
pub fn magnetic_operator(model: &Model, set: &WilsonSet, coupling: DiracCoupling) -> Vec<Operator> {
    let mut operators: Vec<Operator> = Vec::new();
    for entry in set.iter() {
        let fields = &entry.operator.fields;
        let (fermion, boson) = match fields.as_slice() {
            [_, fermion, boson] => (fermion, boson),
            _ => continue,
        };
        if model.coupling(fermion, boson).is_none() {
            continue;
        }
        let operator = Operator::magnetic(coupling).with_fields(fields.clone());
        if !operators.contains(&operator) {
            operators.push(operator);
        }
    }
    operators
}

/// Sum of the coefficients of `operators` found in `set`.
///
/// Operators absent from the set are skipped; when none is present the
/// first lookup miss is returned.
pub fn get_wilson_coefficient(set: &WilsonSet, operators: &[Operator]) -> Result<Expr, WilcoError> {
    let mut found = Vec::new();
    let mut first_miss = None;
    for operator in operators {
        match match_operator(set, operator) {
            Ok(entry) => found.push(entry.coefficient.clone()),
            Err(err) if err.is_not_found() => {
                first_miss.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    if found.is_empty() {
        return Err(first_miss.unwrap_or_else(|| {
            WilcoError::NotFound(ErrorInfo::new("no-operators", "no operator templates were given"))
        }));
    }
    Ok(Expr::add(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wilco_amp::{Kinematics, Leg};
    use wilco_expr::{expand_abbreviations, structure_term};
    use wilco_model::toy_qed;

    fn vertex_amplitude(expr: Expr) -> Amplitude {
        let model = toy_qed("mu", -1, "m_mu").expect("model");
        let process = ProcessSpec::new(vec![
            Leg::incoming("mu"),
            Leg::outgoing("mu"),
            Leg::outgoing("A"),
        ]);
        let kinematics = Kinematics::from_process(&model, &process).expect("kinematics");
        Amplitude::from_expr(process, LoopOrder::OneLoop, kinematics, expr)
    }

    #[test]
    fn gordon_identity_trades_momentum_sum_for_magnetic() {
        let amplitude = vertex_amplitude(structure_term(Structure::MomentumSum, Expr::param("c")));
        let reduced = reduce_to_basis(&amplitude).expect("reduced");
        let expected = Expr::add([
            structure_term(
                Structure::Vector,
                Expr::mul([Expr::int(2), Expr::param("m_mu"), Expr::param("c")]),
            ),
            structure_term(Structure::Magnetic, Expr::neg(Expr::param("c"))),
        ]);
        assert_eq!(reduced, expand(&expected));
    }

    #[test]
    fn loop_parts_are_abbreviated_and_tree_parts_kept() {
        let b0 = Expr::loop_fn(
            wilco_expr::LoopFunction::B0,
            vec![Expr::zero(), Expr::one(), Expr::one()],
        );
        let coefficient = expand(&Expr::add([
            Expr::param("e"),
            Expr::mul([Expr::param("e"), b0.clone()]),
        ]));
        let mut table = AbbreviationTable::new();
        let abbreviated = abbreviate_loop_part(&coefficient, &mut table).expect("abbreviated");
        assert!(abbreviated.contains_abbreviation());
        assert!(!abbreviated.contains_loop_function());
        assert_eq!(table.len(), 2);
        let restored = expand_abbreviations(&abbreviated, &table).expect("expand");
        assert_eq!(expand(&restored), coefficient);
    }

    #[test]
    fn structures_outside_the_basis_are_match_errors() {
        let amplitude = vertex_amplitude(structure_term(Structure::Slash, Expr::param("c")));
        let mut table = AbbreviationTable::new();
        let err = get_wilson_coefficients(&amplitude, &mut table).expect_err("outside");
        assert_eq!(err.code(), "outside-basis");
        assert!(!err.is_not_found());
    }

    #[test]
    fn empty_template_lists_are_not_found() {
        let err = get_wilson_coefficient(&WilsonSet::default(), &[]).expect_err("empty");
        assert!(err.is_not_found());
    }
}
