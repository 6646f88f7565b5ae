//! `wilco-sim demo`: the full workflow, optionally paced by the user.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;
use wilco_core::{ErrorInfo, WilcoError};

use super::g2::{self, MagneticMoment, MagneticMomentReport};
use super::library::{self, LibraryReport};
use super::model::{self, ModelReport};
use super::self_energy::{self, SelfEnergy, SelfEnergyReport};
use super::Session;

/// Waits for a line on `input` before each stage when enabled.
pub struct Pacer<R, W> {
    enabled: bool,
    input: R,
    prompt: W,
}

impl<R: BufRead, W: Write> Pacer<R, W> {
    /// Pacer reading from `input` and prompting on `prompt`.
    pub fn new(enabled: bool, input: R, prompt: W) -> Self {
        Self {
            enabled,
            input,
            prompt,
        }
    }

    /// Announces `stage` and blocks until a line (or end of input) arrives.
    pub fn wait(&mut self, stage: &str) -> Result<(), WilcoError> {
        if !self.enabled {
            return Ok(());
        }
        let io_error = |err: io::Error| {
            WilcoError::Io(ErrorInfo::new("pause", err.to_string()).with_context("stage", stage))
        };
        writeln!(self.prompt, "Press enter to launch the {} ...", stage).map_err(io_error)?;
        self.prompt.flush().map_err(io_error)?;
        let mut line = String::new();
        self.input.read_line(&mut line).map_err(io_error)?;
        Ok(())
    }
}

/// Every stage report of one demo run.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    /// Model stage.
    pub model: ModelReport,
    /// Self-energy stage.
    pub self_energy: SelfEnergyReport,
    /// g-2 stage.
    pub magnetic_moment: MagneticMomentReport,
    /// Library stage.
    pub library: LibraryReport,
}

/// Runs model, self-energy, g-2 and library emission in order.
pub fn build_report<R: BufRead, W: Write>(
    session: &Session,
    out: &Path,
    pacer: &mut Pacer<R, W>,
) -> Result<DemoReport, WilcoError> {
    let model = model::build_report(session)?;
    info!(rules = model.feynman_rules.len(), "model ready");

    pacer.wait("calculation of the self-energy")?;
    let self_energy = SelfEnergy::compute(session)?;
    let self_energy_report = self_energy::report(session, &self_energy)?;

    pacer.wait("calculation of g-2")?;
    let magnetic = MagneticMoment::compute(session)?;
    let magnetic_report = g2::report(session, &magnetic)?;
    info!(anomaly = magnetic_report.anomaly, "g-2 ready");

    pacer.wait("library generation")?;
    let lib = library::assemble(session, &self_energy, &magnetic)?;
    let library_report = library::emit(session, &lib, out)?;

    Ok(DemoReport {
        model,
        self_energy: self_energy_report,
        magnetic_moment: magnetic_report,
        library: library_report,
    })
}
