#![deny(missing_docs)]
#![doc = "Model registry for abelian gauge theories with Dirac fermions, and Feynman-rule derivation."]

/// Mutable model construction.
pub mod builder;
pub mod model;
pub mod particle;

pub use builder::ModelBuilder;
pub use model::{FeynmanRule, GaugeGroup, GroupKind, Model, Vertex};
pub use particle::{Particle, Spin};

use wilco_core::WilcoError;
use wilco_expr::Expr;

/// Toy electrodynamics: one U(1) group `em` with coupling `e`, its photon
/// renamed to `A`, and one fermion of the given charge and mass.
pub fn toy_qed(fermion: &str, charge: i64, mass: &str) -> Result<Model, WilcoError> {
    let mut builder = ModelBuilder::new("toy-qed");
    builder.add_gauged_group(GroupKind::U1, "em", Expr::param("e"))?;
    builder.init()?;
    builder.rename_particle("A_em", "A")?;
    builder.add_particle(
        Particle::dirac_fermion(fermion)
            .with_charge("em", charge)
            .with_mass(Expr::param(mass)),
    )?;
    builder.finalize()
}
