//! Subcommands. Each builds a serializable report from a [`Session`].

pub mod demo;
pub mod g2;
pub mod library;
pub mod model;
pub mod self_energy;
pub mod verify;

use std::error::Error;

use serde::Serialize;
use wilco_amp::{Leg, ProcessSpec};
use wilco_core::{commit_string, stable_hash_string, to_canonical_json_pretty, RunProvenance, SchemaVersion, WilcoError};
use wilco_expr::{canonicalize, evaluate, expand, EvalContext, Expr};
use wilco_model::Model;

use crate::config::RunConfig;

/// Configuration and model shared by every command of one run.
#[derive(Debug, Clone)]
pub struct Session {
    /// Loaded configuration.
    pub config: RunConfig,
    /// Model built from the configuration.
    pub model: Model,
    /// Provenance stamped on every report.
    pub provenance: RunProvenance,
}

impl Session {
    /// Builds the model and provenance for `config`.
    pub fn new(config: RunConfig) -> Result<Self, WilcoError> {
        let model = config.model.build()?;
        let provenance = RunProvenance {
            schema_version: SchemaVersion::default(),
            commit: commit_string(),
            config_hash: stable_hash_string(&config)?,
            seed: config.seed,
        };
        Ok(Self {
            config,
            model,
            provenance,
        })
    }

    /// Fermion name of the configured model.
    pub fn fermion(&self) -> String {
        self.config.model.fermion_name()
    }

    /// `f → f` with both legs off shell so the Dirac equation is never applied.
    pub fn self_energy_process(&self) -> ProcessSpec {
        let fermion = self.fermion();
        ProcessSpec::new(vec![
            Leg::incoming(&fermion).off_shell(),
            Leg::outgoing(&fermion).off_shell(),
        ])
    }

    /// On-shell `f → f A`.
    pub fn vertex_process(&self) -> ProcessSpec {
        let fermion = self.fermion();
        ProcessSpec::new(vec![
            Leg::incoming(&fermion),
            Leg::outgoing(&fermion),
            Leg::outgoing(&self.config.model.photon),
        ])
    }

    /// Evaluation context from the configured values.
    pub fn eval_context(&self) -> EvalContext {
        self.config.eval_context()
    }

    /// Numeric value of `expr` when every symbol has a configured value.
    pub fn try_evaluate(&self, expr: &Expr) -> Option<f64> {
        let ctx = self.eval_context();
        let covered = expr
            .free_symbols()
            .iter()
            .all(|symbol| ctx.values.contains_key(&symbol.name));
        if !covered {
            return None;
        }
        evaluate(expr, &ctx).ok()
    }
}

/// Symbolic expression in three forms, mirroring how results are inspected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExprReport {
    /// Expression as produced, abbreviations kept.
    pub raw: String,
    /// Abbreviations expanded.
    pub evaluated: String,
    /// Expanded then factored.
    pub simplified: String,
    /// Numeric value at the configured point, when all symbols have values.
    pub numeric: Option<f64>,
}

impl ExprReport {
    /// Report of `raw` whose abbreviation-free form is `evaluated`.
    pub fn new(session: &Session, raw: &Expr, evaluated: &Expr) -> Self {
        Self {
            raw: raw.to_string(),
            evaluated: evaluated.to_string(),
            simplified: canonicalize(&expand(evaluated)).to_string(),
            numeric: session.try_evaluate(evaluated),
        }
    }
}

/// Prints `report` as canonical pretty JSON on stdout.
pub fn print_report<T: Serialize>(report: &T) -> Result<(), Box<dyn Error>> {
    let json = to_canonical_json_pretty(report).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!("{}", json);
    Ok(())
}
