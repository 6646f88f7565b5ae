//! Mutable model construction.

use num_traits::Zero;
use tracing::{debug, info};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::Expr;

use crate::model::{GaugeGroup, GroupKind, Model, Vertex};
use crate::particle::{Particle, Spin};

fn model_error(code: &str, message: impl Into<String>) -> WilcoError {
    WilcoError::Model(ErrorInfo::new(code, message))
}

/// Collects groups and particles, then derives the vertices on [`finalize`](Self::finalize).
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    groups: Vec<GaugeGroup>,
    particles: Vec<Particle>,
    initialized: bool,
}

impl ModelBuilder {
    /// Empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            particles: Vec::new(),
            initialized: false,
        }
    }

    /// Declares a gauge group. Groups must be declared before [`init`](Self::init).
    pub fn add_gauged_group(
        &mut self,
        kind: GroupKind,
        name: &str,
        coupling: Expr,
    ) -> Result<&mut Self, WilcoError> {
        if self.initialized {
            return Err(model_error(
                "group-after-init",
                format!("group {} declared after init", name),
            ));
        }
        if self.groups.iter().any(|group| group.name == name) {
            return Err(model_error(
                "duplicate-group",
                format!("group {} already declared", name),
            ));
        }
        self.groups.push(GaugeGroup {
            name: name.to_string(),
            kind,
            coupling,
            boson: format!("A_{}", name),
        });
        Ok(self)
    }

    /// Creates one gauge boson per declared group.
    pub fn init(&mut self) -> Result<&mut Self, WilcoError> {
        if self.initialized {
            return Err(model_error("double-init", "model already initialized"));
        }
        let bosons: Vec<String> = self.groups.iter().map(|group| group.boson.clone()).collect();
        for boson in bosons {
            self.insert(Particle::vector_boson(&boson))?;
        }
        self.initialized = true;
        Ok(self)
    }

    /// Renames a particle, keeping gauge-group boson references in sync.
    pub fn rename_particle(&mut self, old: &str, new: &str) -> Result<&mut Self, WilcoError> {
        if self.particles.iter().any(|particle| particle.name == new) {
            return Err(WilcoError::Model(
                ErrorInfo::new("rename-collision", format!("particle {} already exists", new))
                    .with_context("old", old)
                    .with_context("new", new),
            ));
        }
        let particle = self
            .particles
            .iter_mut()
            .find(|particle| particle.name == old)
            .ok_or_else(|| model_error("unknown-particle", format!("no particle named {}", old)))?;
        particle.name = new.to_string();
        for group in self.groups.iter_mut().filter(|group| group.boson == old) {
            group.boson = new.to_string();
        }
        Ok(self)
    }

    /// Adds a particle. Charges must refer to declared groups and require [`init`](Self::init).
    pub fn add_particle(&mut self, particle: Particle) -> Result<&mut Self, WilcoError> {
        if !particle.charges.is_empty() && !self.initialized {
            return Err(model_error(
                "charge-before-init",
                format!("{} carries charges before the model was initialized", particle.name),
            ));
        }
        for group in particle.charges.keys() {
            if !self.groups.iter().any(|declared| &declared.name == group) {
                return Err(WilcoError::Model(
                    ErrorInfo::new("unknown-group", format!("no gauge group named {}", group))
                        .with_context("particle", particle.name.clone()),
                ));
            }
        }
        if particle.spin == Spin::Vector && particle.charges.values().any(|q| !q.is_zero()) {
            return Err(model_error(
                "charged-vector",
                format!("vector {} cannot carry an abelian charge", particle.name),
            ));
        }
        self.insert(particle)?;
        Ok(self)
    }

    fn insert(&mut self, particle: Particle) -> Result<(), WilcoError> {
        if particle.name.is_empty() {
            return Err(model_error("empty-name", "particle names must not be empty"));
        }
        if self.particles.iter().any(|existing| existing.name == particle.name) {
            return Err(WilcoError::Model(
                ErrorInfo::new("duplicate-particle", "particle already registered")
                    .with_context("particle", particle.name),
            ));
        }
        debug!(particle = %particle.name, "registered particle");
        self.particles.push(particle);
        Ok(())
    }

    /// Derives the vertices and returns the immutable model.
    pub fn finalize(&self) -> Result<Model, WilcoError> {
        if !self.initialized {
            return Err(model_error("not-initialized", "call init before finalize"));
        }
        let mut vertices = Vec::new();
        for particle in self.particles.iter().filter(|particle| particle.is_fermion()) {
            for group in &self.groups {
                let charge = particle.charge(&group.name);
                if charge.is_zero() {
                    continue;
                }
                vertices.push(Vertex {
                    fermion: particle.name.clone(),
                    boson: group.boson.clone(),
                    group: group.name.clone(),
                    coupling: Expr::mul([Expr::int(-1), Expr::num(charge), group.coupling.clone()]),
                });
            }
        }
        info!(
            model = %self.name,
            particles = self.particles.len(),
            vertices = vertices.len(),
            "finalized model"
        );
        Ok(Model {
            name: self.name.clone(),
            groups: self.groups.clone(),
            particles: self.particles.clone(),
            vertices,
        })
    }

    /// Alias of [`finalize`](Self::finalize) matching the refresh step of the demo workflow.
    pub fn refresh(&self) -> Result<Model, WilcoError> {
        self.finalize()
    }
}
