//! `wilco-sim model`: the built model and its Feynman rules.

use serde::Serialize;
use wilco_core::{stable_hash_string, RunProvenance, WilcoError};
use wilco_model::Model;

use super::Session;

/// Model summary.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    /// Run provenance.
    pub provenance: RunProvenance,
    /// Full model.
    pub model: Model,
    /// Readable model listing.
    pub display: String,
    /// One line per vertex.
    pub feynman_rules: Vec<String>,
    /// Canonical hash of the model.
    pub model_hash: String,
}

/// Builds the model report.
pub fn build_report(session: &Session) -> Result<ModelReport, WilcoError> {
    Ok(ModelReport {
        provenance: session.provenance.clone(),
        model: session.model.clone(),
        display: session.model.to_string(),
        feynman_rules: session
            .model
            .feynman_rules()
            .iter()
            .map(|rule| rule.to_string())
            .collect(),
        model_hash: stable_hash_string(&session.model)?,
    })
}
