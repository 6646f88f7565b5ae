//! `wilco-sim library`: emits the C++ evaluation library.

use std::path::Path;

use serde::Serialize;
use wilco_core::{RunProvenance, WilcoError};
use wilco_expr::{canonicalize, expand};
use wilco_lib::{Library, LibraryManifest};

use super::g2::MagneticMoment;
use super::self_energy::SelfEnergy;
use super::Session;

/// Library emission report.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryReport {
    /// Run provenance.
    pub provenance: RunProvenance,
    /// Output directory.
    pub out: String,
    /// Files removed from a previous emission.
    pub removed: usize,
    /// Manifest of the written library.
    pub manifest: LibraryManifest,
}

/// Assembles the library from the self-energy and g-2 results.
pub fn assemble(
    session: &Session,
    self_energy: &SelfEnergy,
    magnetic: &MagneticMoment,
) -> Result<Library, WilcoError> {
    let prefix = session.fermion();
    let mut lib = Library::new(&session.config.library.name)?;
    lib.add_function_with(&format!("{}_self_e_mterm", prefix), &self_energy.m_term, &self_energy.table)?;
    lib.add_function_with(&format!("{}_self_e_pterm", prefix), &self_energy.p_term, &self_energy.table)?;
    lib.add_function(&format!("{}_self_e_squared", prefix), &self_energy.squared)?;
    lib.add_function_with(&format!("{}_magnetic_vertex", prefix), &magnetic.coefficient, &magnetic.table)?;
    lib.add_function(&format!("{}_magnetic_vertex_eval", prefix), &magnetic.evaluated)?;
    lib.add_function(
        &format!("{}_magnetic_vertex_simpli", prefix),
        &canonicalize(&expand(&magnetic.evaluated)),
    )?;
    Ok(lib)
}

/// Cleans `out` of a previous emission and writes `lib` there.
pub fn emit(session: &Session, lib: &Library, out: &Path) -> Result<LibraryReport, WilcoError> {
    let removed = lib.clean_existing_sources(out)?;
    let manifest = lib.write(out)?;
    Ok(LibraryReport {
        provenance: session.provenance.clone(),
        out: out.display().to_string(),
        removed,
        manifest,
    })
}

/// Computes every result and emits the library under `out`.
pub fn build_report(session: &Session, out: &Path) -> Result<LibraryReport, WilcoError> {
    let self_energy = SelfEnergy::compute(session)?;
    let magnetic = MagneticMoment::compute(session)?;
    let lib = assemble(session, &self_energy, &magnetic)?;
    emit(session, &lib, out)
}
