//! Process specifications and their validation.

use std::collections::BTreeMap;
use std::fmt;

use num_rational::BigRational;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_model::Model;

/// Direction of an external leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Enters the process.
    Incoming,
    /// Leaves the process.
    Outgoing,
}

/// Whether an external leg satisfies its mass-shell condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shell {
    /// `p² = m²`; spinors obey the Dirac equation.
    OnShell,
    /// Free `p²`; no equation of motion is applied.
    OffShell,
}

/// External leg of a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leg {
    /// Particle name.
    pub particle: String,
    /// Direction.
    pub direction: Direction,
    /// Shell condition.
    pub shell: Shell,
}

impl Leg {
    /// On-shell incoming leg.
    pub fn incoming(particle: &str) -> Self {
        Self {
            particle: particle.to_string(),
            direction: Direction::Incoming,
            shell: Shell::OnShell,
        }
    }

    /// On-shell outgoing leg.
    pub fn outgoing(particle: &str) -> Self {
        Self {
            particle: particle.to_string(),
            direction: Direction::Outgoing,
            shell: Shell::OnShell,
        }
    }

    /// Same leg taken off shell.
    pub fn off_shell(mut self) -> Self {
        self.shell = Shell::OffShell;
        self
    }

    /// Whether the leg is on shell.
    pub fn is_on_shell(&self) -> bool {
        self.shell == Shell::OnShell
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Incoming => "in",
            Direction::Outgoing => "out",
        };
        match self.shell {
            Shell::OnShell => write!(f, "{}({})", self.particle, direction),
            Shell::OffShell => write!(f, "{}({}, off-shell)", self.particle, direction),
        }
    }
}

/// Perturbative order of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopOrder {
    /// Tree level.
    Tree,
    /// One loop.
    OneLoop,
}

/// Ordered list of external legs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// External legs; their positions name the kinematic invariants `p<i>_sq`.
    pub legs: Vec<Leg>,
}

impl ProcessSpec {
    /// Process from legs.
    pub fn new(legs: Vec<Leg>) -> Self {
        Self { legs }
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let incoming: Vec<String> = self
            .legs
            .iter()
            .filter(|leg| leg.direction == Direction::Incoming)
            .map(|leg| leg.to_string())
            .collect();
        let outgoing: Vec<String> = self
            .legs
            .iter()
            .filter(|leg| leg.direction == Direction::Outgoing)
            .map(|leg| leg.to_string())
            .collect();
        write!(f, "{} -> {}", incoming.join(" "), outgoing.join(" "))
    }
}

pub(crate) fn process_error(code: &str, message: impl Into<String>, process: &ProcessSpec) -> WilcoError {
    WilcoError::Process(ErrorInfo::new(code, message).with_context("process", process.to_string()))
}

/// Checks leg count, particle names and conservation laws against the model.
pub fn validate_process(model: &Model, process: &ProcessSpec) -> Result<(), WilcoError> {
    if process.legs.len() < 2 {
        return Err(process_error(
            "too-few-legs",
            "a process needs at least two external legs",
            process,
        ));
    }
    if process.legs.len() > 4 {
        return Err(process_error(
            "too-many-legs",
            "at most four external legs are supported",
            process,
        ));
    }
    let mut charges: BTreeMap<&str, BigRational> = BTreeMap::new();
    let mut fermion_number: BTreeMap<&str, i64> = BTreeMap::new();
    for leg in &process.legs {
        let particle = model.particle(&leg.particle).ok_or_else(|| {
            WilcoError::Process(
                ErrorInfo::new("unknown-particle", format!("no particle named {}", leg.particle))
                    .with_context("process", process.to_string())
                    .with_hint("declare the particle in the model before requesting the process"),
            )
        })?;
        let sign = match leg.direction {
            Direction::Incoming => 1,
            Direction::Outgoing => -1,
        };
        for group in &model.groups {
            let entry = charges
                .entry(group.name.as_str())
                .or_insert_with(BigRational::zero);
            let charge = particle.charge(&group.name);
            *entry = if sign > 0 { &*entry + &charge } else { &*entry - &charge };
        }
        if particle.is_fermion() {
            *fermion_number.entry(particle.name.as_str()).or_insert(0) += sign;
        }
    }
    for (group, total) in &charges {
        if !total.is_zero() {
            return Err(WilcoError::Process(
                ErrorInfo::new("charge-violation", format!("charge under {} is not conserved", group))
                    .with_context("process", process.to_string())
                    .with_context("imbalance", total.to_string()),
            ));
        }
    }
    for (flavor, total) in &fermion_number {
        if *total != 0 {
            return Err(WilcoError::Process(
                ErrorInfo::new(
                    "fermion-number-violation",
                    format!("fermion number of {} is not conserved", flavor),
                )
                .with_context("process", process.to_string())
                .with_hint("antiparticle legs are not supported; use matching in/out fermions"),
            ));
        }
    }
    Ok(())
}
