//! YAML run configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::{EvalContext, Expr, LoopEvalOpts};
use wilco_model::{GroupKind, Model, ModelBuilder, Particle};

/// Model declaration: one U(1) group and one charged Dirac fermion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name.
    pub name: String,
    /// Gauge group name.
    pub group: String,
    /// Gauge coupling parameter.
    pub coupling: String,
    /// Name given to the gauge boson.
    pub photon: String,
    /// Fermion declaration, `"name"` or `"name ; latex"`.
    pub fermion: String,
    /// Fermion charge under the group.
    pub charge: i64,
    /// Fermion mass parameter.
    pub mass: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "toy-qed".to_string(),
            group: "em".to_string(),
            coupling: "e".to_string(),
            photon: "A".to_string(),
            fermion: "mu ; \\mu".to_string(),
            charge: -1,
            mass: "m_mu".to_string(),
        }
    }
}

impl ModelConfig {
    /// Fermion name as used in process specifications.
    pub fn fermion_name(&self) -> String {
        Particle::dirac_fermion(&self.fermion).name
    }

    /// Builds the model in declaration order: group, init, rename, fermion, refresh.
    pub fn build(&self) -> Result<Model, WilcoError> {
        let mut builder = ModelBuilder::new(self.name.clone());
        builder.add_gauged_group(GroupKind::U1, &self.group, Expr::param(self.coupling.clone()))?;
        builder.init()?;
        builder.rename_particle(&format!("A_{}", self.group), &self.photon)?;
        builder.add_particle(
            Particle::dirac_fermion(&self.fermion)
                .with_charge(&self.group, self.charge)
                .with_mass(Expr::param(self.mass.clone())),
        )?;
        builder.refresh()
    }
}

/// Emitted library settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Library name.
    pub name: String,
    /// Output directory used when the CLI gives none.
    pub out: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: "demolib".to_string(),
            out: PathBuf::from("demolib"),
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Model declaration.
    #[serde(default)]
    pub model: ModelConfig,
    /// Numeric parameter values used by evaluated reports.
    #[serde(default = "default_values")]
    pub values: BTreeMap<String, f64>,
    /// Loop-function evaluation options.
    #[serde(default)]
    pub loop_eval: LoopEvalOpts,
    /// Library emission settings.
    #[serde(default)]
    pub library: LibraryConfig,
    /// Master seed of randomized checks.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Points per randomized equivalence check.
    #[serde(default = "default_trials")]
    pub verify_trials: usize,
    /// Relative tolerance of randomized checks.
    #[serde(default = "default_tolerance")]
    pub verify_tolerance: f64,
}

fn default_values() -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    values.insert("e".to_string(), 0.302_822_12);
    values.insert("m_mu".to_string(), 0.105_658_375_5);
    values
}

fn default_seed() -> u64 {
    2024
}

fn default_trials() -> usize {
    8
}

fn default_tolerance() -> f64 {
    1e-9
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            values: default_values(),
            loop_eval: LoopEvalOpts::default(),
            library: LibraryConfig::default(),
            seed: default_seed(),
            verify_trials: default_trials(),
            verify_tolerance: default_tolerance(),
        }
    }
}

fn config_error(code: &str, path: &Path, message: impl Into<String>) -> WilcoError {
    WilcoError::Config(ErrorInfo::new(code, message).with_context("path", path.display().to_string()))
}

impl RunConfig {
    /// Loads `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, WilcoError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).map_err(|err| config_error("read", path, err.to_string()))?;
        Self::from_yaml(&contents).map_err(|err| match err {
            WilcoError::Config(info) => {
                WilcoError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Parses a YAML document; missing fields take their defaults.
    pub fn from_yaml(contents: &str) -> Result<Self, WilcoError> {
        let config: RunConfig = serde_yaml::from_str(contents)
            .map_err(|err| WilcoError::Config(ErrorInfo::new("parse", err.to_string())))?;
        if config.verify_tolerance <= 0.0 {
            return Err(WilcoError::Config(
                ErrorInfo::new("tolerance", "verify_tolerance must be positive")
                    .with_context("value", config.verify_tolerance.to_string()),
            ));
        }
        Ok(config)
    }

    /// Evaluation context carrying the configured values and loop options.
    pub fn eval_context(&self) -> EvalContext {
        let mut ctx = EvalContext::new().with_loop_opts(self.loop_eval.clone());
        for (name, value) in &self.values {
            ctx.set(name.clone(), *value);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = RunConfig::from_yaml("{}").expect("config");
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.model.fermion_name(), "mu");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = RunConfig::from_yaml("model:\n  fermion: \"e ; e^-\"\n  mass: m_e\nseed: 7\n")
            .expect("config");
        assert_eq!(config.model.fermion_name(), "e");
        assert_eq!(config.model.charge, -1);
        assert_eq!(config.seed, 7);
        assert_eq!(config.library.name, "demolib");
    }

    #[test]
    fn default_model_matches_the_toy_theory() {
        let built = ModelConfig::default().build().expect("model");
        let toy = wilco_model::toy_qed("mu", -1, "m_mu").expect("toy");
        assert_eq!(built.vertices, toy.vertices);
        assert_eq!(built.particle("mu").and_then(|p| p.latex.clone()), Some("\\mu".to_string()));
    }

    #[test]
    fn malformed_documents_are_config_errors() {
        let err = RunConfig::from_yaml("seed: [1, 2]").expect_err("bad seed");
        assert_eq!(err.code(), "parse");
        let err = RunConfig::from_yaml("verify_tolerance: 0").expect_err("tolerance");
        assert_eq!(err.code(), "tolerance");
    }
}
