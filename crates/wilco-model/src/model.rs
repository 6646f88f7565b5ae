//! Finalized models and their Feynman rules.

use std::fmt;

use serde::{Deserialize, Serialize};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::Expr;

use crate::particle::Particle;

/// Kind of gauge group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupKind {
    /// Abelian U(1).
    U1,
}

/// Gauge group with its coupling and gauge boson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeGroup {
    /// Group name, e.g. `em`.
    pub name: String,
    /// Group kind.
    pub kind: GroupKind,
    /// Gauge coupling.
    pub coupling: Expr,
    /// Name of the gauge boson, `A_<name>` until renamed.
    pub boson: String,
}

/// Fermion-fermion-vector interaction `ψ̄ γ^μ ψ A_μ` with factor `i · coupling · γ^μ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Fermion flowing through the vertex.
    pub fermion: String,
    /// Gauge boson attached to the vertex.
    pub boson: String,
    /// Gauge group the interaction belongs to.
    pub group: String,
    /// Real coupling `-g Q` multiplying `i γ^μ`.
    pub coupling: Expr,
}

/// Printable Feynman rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeynmanRule {
    /// Fields meeting at the vertex, in `ψ̄ ψ A` order.
    pub fields: Vec<String>,
    /// Vertex factor `i · coupling · γ^μ` with the coupling written out.
    pub factor: String,
}

impl fmt::Display for FeynmanRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] : {}", self.fields.join(", "), self.factor)
    }
}

/// Immutable model: gauge groups, particles and interaction vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Gauge groups in declaration order.
    pub groups: Vec<GaugeGroup>,
    /// Particles in declaration order.
    pub particles: Vec<Particle>,
    /// Derived vertices.
    pub vertices: Vec<Vertex>,
}

impl Model {
    /// Particle called `name`.
    pub fn particle(&self, name: &str) -> Option<&Particle> {
        self.particles.iter().find(|particle| particle.name == name)
    }

    /// Particle called `name`, or a `Model` error.
    pub fn require_particle(&self, name: &str) -> Result<&Particle, WilcoError> {
        self.particle(name).ok_or_else(|| {
            WilcoError::Model(
                ErrorInfo::new("unknown-particle", format!("no particle named {}", name))
                    .with_context("particle", name),
            )
        })
    }

    /// Gauge group called `name`.
    pub fn group(&self, name: &str) -> Option<&GaugeGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Vertices joining `fermion` to `boson`.
    pub fn vertices_between<'a>(
        &'a self,
        fermion: &'a str,
        boson: &'a str,
    ) -> impl Iterator<Item = &'a Vertex> + 'a {
        self.vertices
            .iter()
            .filter(move |vertex| vertex.fermion == fermion && vertex.boson == boson)
    }

    /// Summed coupling of all vertices joining `fermion` to `boson`.
    pub fn coupling(&self, fermion: &str, boson: &str) -> Option<Expr> {
        let couplings: Vec<Expr> = self
            .vertices_between(fermion, boson)
            .map(|vertex| vertex.coupling.clone())
            .collect();
        if couplings.is_empty() {
            None
        } else {
            Some(Expr::add(couplings))
        }
    }

    /// Feynman rules in vertex order.
    pub fn feynman_rules(&self) -> Vec<FeynmanRule> {
        self.vertices
            .iter()
            .map(|vertex| FeynmanRule {
                fields: vec![
                    format!("{}_bar", vertex.fermion),
                    vertex.fermion.clone(),
                    vertex.boson.clone(),
                ],
                factor: format!("i*({})*gamma^mu", vertex.coupling),
            })
            .collect()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model {}", self.name)?;
        for group in &self.groups {
            writeln!(
                f,
                "  group {:<6} {:?} coupling = {} boson = {}",
                group.name, group.kind, group.coupling, group.boson
            )?;
        }
        for particle in &self.particles {
            writeln!(f, "  {}", particle)?;
        }
        Ok(())
    }
}
