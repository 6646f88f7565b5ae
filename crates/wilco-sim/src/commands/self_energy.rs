//! `wilco-sim self-energy`: one-loop fermion self-energy.

use serde::Serialize;
use tracing::info;
use wilco_amp::{compute_amplitude, squared_amplitude, Amplitude, LoopOrder};
use wilco_core::{RunProvenance, WilcoError};
use wilco_expr::{expand, expand_abbreviations, AbbreviationTable, Expr};
use wilco_match::{get_wilson_coefficients, match_operator, Operator, WilsonSet};

use super::{ExprReport, Session};

/// Self-energy results kept for later stages.
#[derive(Debug, Clone)]
pub struct SelfEnergy {
    /// Reduced amplitude.
    pub amplitude: Amplitude,
    /// Wilson coefficients.
    pub wilsons: WilsonSet,
    /// Abbreviations introduced while matching.
    pub table: AbbreviationTable,
    /// Coefficient of the mass operator.
    pub m_term: Expr,
    /// Coefficient of the kinetic operator.
    pub p_term: Expr,
    /// Spin-summed squared amplitude.
    pub squared: Expr,
}

impl SelfEnergy {
    /// Runs amplitude, matching and squaring.
    pub fn compute(session: &Session) -> Result<Self, WilcoError> {
        let amplitude = compute_amplitude(&session.model, LoopOrder::OneLoop, &session.self_energy_process())?;
        let mut table = AbbreviationTable::new();
        let wilsons = get_wilson_coefficients(&amplitude, &mut table)?;
        let m_term = match_operator(&wilsons, &Operator::mass())?.coefficient.clone();
        let p_term = match_operator(&wilsons, &Operator::kinetic())?.coefficient.clone();
        let squared = squared_amplitude(&amplitude)?;
        info!(
            diagrams = amplitude.diagrams.len(),
            coefficients = wilsons.len(),
            "computed self-energy"
        );
        Ok(Self {
            amplitude,
            wilsons,
            table,
            m_term,
            p_term,
            squared,
        })
    }

    /// `expr` with every abbreviation of the run expanded.
    pub fn evaluated(&self, expr: &Expr) -> Result<Expr, WilcoError> {
        Ok(expand(&expand_abbreviations(expr, &self.table)?))
    }
}

/// Self-energy report.
#[derive(Debug, Clone, Serialize)]
pub struct SelfEnergyReport {
    /// Run provenance.
    pub provenance: RunProvenance,
    /// Process.
    pub process: String,
    /// Diagrams.
    pub diagrams: Vec<String>,
    /// Reduced amplitude.
    pub amplitude: String,
    /// Wilson coefficient listing.
    pub wilson_coefficients: Vec<String>,
    /// Mass-operator coefficient.
    pub m_term: ExprReport,
    /// Kinetic-operator coefficient.
    pub p_term: ExprReport,
    /// Squared amplitude.
    pub squared: ExprReport,
}

/// Builds the report from computed results.
pub fn report(session: &Session, result: &SelfEnergy) -> Result<SelfEnergyReport, WilcoError> {
    Ok(SelfEnergyReport {
        provenance: session.provenance.clone(),
        process: result.amplitude.process.to_string(),
        diagrams: result.amplitude.diagrams.iter().map(|d| d.to_string()).collect(),
        amplitude: result.amplitude.expr.to_string(),
        wilson_coefficients: result
            .wilsons
            .iter()
            .map(|entry| format!("{} : {}", entry.operator, entry.coefficient))
            .collect(),
        m_term: ExprReport::new(session, &result.m_term, &result.evaluated(&result.m_term)?),
        p_term: ExprReport::new(session, &result.p_term, &result.evaluated(&result.p_term)?),
        squared: ExprReport::new(session, &result.squared, &result.evaluated(&result.squared)?),
    })
}

/// Computes and reports the self-energy.
pub fn build_report(session: &Session) -> Result<SelfEnergyReport, WilcoError> {
    report(session, &SelfEnergy::compute(session)?)
}
