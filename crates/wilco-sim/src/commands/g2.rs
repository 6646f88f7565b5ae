//! `wilco-sim g2`: anomalous magnetic moment from the one-loop vertex.

use serde::Serialize;
use tracing::{info, warn};
use wilco_amp::LoopOrder;
use wilco_core::{ErrorInfo, RunProvenance, WilcoError};
use wilco_expr::{evaluate, expand, expand_abbreviations, AbbreviationTable, Expr};
use wilco_match::{compute_wilson_coefficients, get_wilson_coefficient, magnetic_operator, DiracCoupling, WilsonSet};

use super::{ExprReport, Session};

/// Vertex matching results kept for later stages.
#[derive(Debug, Clone)]
pub struct MagneticMoment {
    /// Wilson coefficients of the vertex.
    pub wilsons: WilsonSet,
    /// Abbreviations introduced while matching.
    pub table: AbbreviationTable,
    /// Coefficient of the magnetic operator, abbreviated.
    pub coefficient: Expr,
    /// Coefficient with abbreviations expanded.
    pub evaluated: Expr,
    /// Whether an electric-dipole coefficient was found.
    pub electric_dipole: Option<Expr>,
}

impl MagneticMoment {
    /// Matches the on-shell vertex and extracts the magnetic coefficient.
    pub fn compute(session: &Session) -> Result<Self, WilcoError> {
        let mut table = AbbreviationTable::new();
        let wilsons = compute_wilson_coefficients(
            &session.model,
            LoopOrder::OneLoop,
            &session.vertex_process(),
            &mut table,
        )?;
        let operators = magnetic_operator(&session.model, &wilsons, DiracCoupling::S);
        let coefficient = get_wilson_coefficient(&wilsons, &operators)?;
        let evaluated = expand(&expand_abbreviations(&coefficient, &table)?);
        let dipoles = magnetic_operator(&session.model, &wilsons, DiracCoupling::P);
        let electric_dipole = match get_wilson_coefficient(&wilsons, &dipoles) {
            Ok(found) => Some(found),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };
        info!(coefficients = wilsons.len(), abbreviations = table.len(), "matched vertex");
        Ok(Self {
            wilsons,
            table,
            coefficient,
            evaluated,
            electric_dipole,
        })
    }

    /// `a = F2` from the magnetic coefficient `c` of `M ⊃ c iσ^{μν}q_ν`:
    /// `a = -2 m c / (g Q)`.
    pub fn anomaly(&self, session: &Session) -> Result<f64, WilcoError> {
        let model = &session.config.model;
        let ctx = session.eval_context();
        let value = |name: &str| {
            ctx.values.get(name).copied().ok_or_else(|| {
                WilcoError::Config(
                    ErrorInfo::new("missing-value", "g-2 needs numeric coupling and mass")
                        .with_context("parameter", name),
                )
            })
        };
        let mass = value(&model.mass)?;
        let coupling = value(&model.coupling)?;
        let coefficient = evaluate(&self.evaluated, &ctx)?;
        Ok(-2.0 * mass * coefficient / (coupling * model.charge as f64))
    }
}

/// `Q² α / 2π` with `α = g² / 4π`.
pub fn schwinger_term(coupling: f64, charge: i64) -> f64 {
    let q = charge as f64;
    q * q * coupling * coupling / (8.0 * std::f64::consts::PI * std::f64::consts::PI)
}

/// g-2 report.
#[derive(Debug, Clone, Serialize)]
pub struct MagneticMomentReport {
    /// Run provenance.
    pub provenance: RunProvenance,
    /// Wilson coefficient listing.
    pub wilson_coefficients: Vec<String>,
    /// Magnetic coefficient.
    pub magnetic: ExprReport,
    /// Electric-dipole coefficient, absent for a CP-conserving model.
    pub electric_dipole: Option<String>,
    /// Anomalous magnetic moment at the configured point.
    pub anomaly: f64,
    /// Reference one-loop value.
    pub schwinger: f64,
    /// `|a / schwinger - 1|`.
    pub relative_deviation: f64,
}

/// Builds the report from computed results.
pub fn report(session: &Session, result: &MagneticMoment) -> Result<MagneticMomentReport, WilcoError> {
    let anomaly = result.anomaly(session)?;
    let coupling = session.config.values.get(&session.config.model.coupling).copied().unwrap_or(0.0);
    let schwinger = schwinger_term(coupling, session.config.model.charge);
    let relative_deviation = if schwinger == 0.0 {
        f64::INFINITY
    } else {
        (anomaly / schwinger - 1.0).abs()
    };
    if relative_deviation > 1e-4 {
        warn!(anomaly, schwinger, "anomaly deviates from the one-loop reference");
    }
    Ok(MagneticMomentReport {
        provenance: session.provenance.clone(),
        wilson_coefficients: result
            .wilsons
            .iter()
            .map(|entry| format!("{} : {}", entry.operator, entry.coefficient))
            .collect(),
        magnetic: ExprReport::new(session, &result.coefficient, &result.evaluated),
        electric_dipole: result.electric_dipole.as_ref().map(|expr| expr.to_string()),
        anomaly,
        schwinger,
        relative_deviation,
    })
}

/// Computes and reports g-2.
pub fn build_report(session: &Session) -> Result<MagneticMomentReport, WilcoError> {
    report(session, &MagneticMoment::compute(session)?)
}
