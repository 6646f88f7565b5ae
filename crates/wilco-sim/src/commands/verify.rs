//! `wilco-sim verify`: randomized self-checks of the matching pipeline.

use serde::Serialize;
use tracing::{debug, info};
use wilco_amp::{compute_amplitude, LoopOrder, ProcessSpec};
use wilco_core::{RngHandle, RunProvenance, WilcoError};
use wilco_expr::{
    canonicalize, expand, expand_abbreviations, numerically_equivalent, AbbreviationTable, EvalContext,
};
use wilco_match::{get_wilson_coefficients, reduce_to_basis};

use super::Session;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    /// Check name.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Largest relative deviation, for numeric checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_relative_deviation: Option<f64>,
}

/// Verification report.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    /// Run provenance.
    pub provenance: RunProvenance,
    /// Every check in execution order.
    pub checks: Vec<CheckOutcome>,
    /// Whether all checks passed.
    pub passed: bool,
}

fn exact(name: String, passed: bool) -> CheckOutcome {
    CheckOutcome {
        name,
        passed,
        max_relative_deviation: None,
    }
}

fn verify_process(
    session: &Session,
    label: &str,
    process: &ProcessSpec,
    checks: &mut Vec<CheckOutcome>,
) -> Result<(), WilcoError> {
    let amplitude = compute_amplitude(&session.model, LoopOrder::OneLoop, process)?;
    let mut table = AbbreviationTable::new();
    let wilsons = get_wilson_coefficients(&amplitude, &mut table)?;

    let recombined = expand(&expand_abbreviations(&wilsons.recombine(), &table)?);
    checks.push(exact(
        format!("{}/round-trip", label),
        recombined == reduce_to_basis(&amplitude)?,
    ));

    let size = table.len();
    let again = get_wilson_coefficients(&amplitude, &mut table)?;
    checks.push(exact(
        format!("{}/determinism", label),
        again == wilsons && table.len() == size,
    ));

    let base = EvalContext::new().with_loop_opts(session.config.loop_eval.clone());
    for entry in wilsons.iter() {
        let explicit = expand(&expand_abbreviations(&entry.coefficient, &table)?);
        let canonical = canonicalize(&explicit);
        let stream = checks.len() as u64;
        let mut rng = RngHandle::substream(session.config.seed, stream);
        let report = numerically_equivalent(
            &explicit,
            &canonical,
            &base,
            &mut rng,
            session.config.verify_trials,
            session.config.verify_tolerance,
        )?;
        debug!(operator = %entry.operator, deviation = report.max_relative_deviation, "canonical form checked");
        checks.push(CheckOutcome {
            name: format!("{}/canonicalize/{}", label, entry.operator.name),
            passed: report.passed,
            max_relative_deviation: Some(report.max_relative_deviation),
        });
    }
    Ok(())
}

/// Runs every check on the self-energy and the vertex.
pub fn build_report(session: &Session) -> Result<VerifyReport, WilcoError> {
    let mut checks = Vec::new();
    verify_process(session, "self-energy", &session.self_energy_process(), &mut checks)?;
    verify_process(session, "vertex", &session.vertex_process(), &mut checks)?;
    let passed = checks.iter().all(|check| check.passed);
    info!(checks = checks.len(), passed, "verification finished");
    Ok(VerifyReport {
        provenance: session.provenance.clone(),
        checks,
        passed,
    })
}
