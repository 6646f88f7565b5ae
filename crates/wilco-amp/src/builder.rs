//! Amplitude assembly: one open fermion line walked from `ū(p')` to `u(p)`.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::{
    eliminate_dimension, expand, replace_structures, structure_term, terms, Expr, Structure,
};
use wilco_model::Model;

use crate::amplitude::Amplitude;
use crate::diagram::{generate_diagrams, Diagram, Line, Topology};
use crate::dirac::{
    apply_dirac_equation, contract_indices, multiply, normal_order, reduction_error, DiracTerm,
    Gamma, Vector, FREE_INDEX,
};
use crate::kinematics::{Kinematics, Momentum};
use crate::process::{process_error, validate_process, LoopOrder, ProcessSpec};
use crate::reduce::{reduce_loop_momenta, LoopIntegral};

fn loop_factor() -> Expr {
    Expr::pow(Expr::mul([Expr::int(16), Expr::pow(Expr::pi(), 2)]), -1)
}

fn coupling_at(model: &Model, fermion: &str, boson: &str) -> Result<Expr, WilcoError> {
    model.coupling(fermion, boson).ok_or_else(|| {
        WilcoError::Reduction(
            ErrorInfo::new("missing-vertex", "diagram uses a vertex absent from the model")
                .with_context("fermion", fermion)
                .with_context("boson", boson),
        )
    })
}

/// View of a ring diagram with the process legs resolved.
struct Ring<'a> {
    model: &'a Model,
    process: &'a ProcessSpec,
    kinematics: &'a Kinematics,
    diagram: &'a Diagram,
}

impl Ring<'_> {
    fn len(&self) -> usize {
        self.diagram.lines.len()
    }

    fn position_of(&self, leg: usize) -> Result<usize, WilcoError> {
        self.diagram
            .arrangement
            .iter()
            .position(|candidate| *candidate == leg)
            .ok_or_else(|| reduction_error("leg-not-placed", format!("leg {} is not on the ring", leg)))
    }

    fn line_before(&self, position: usize) -> usize {
        (position + self.len() - 1) % self.len()
    }

    fn is_external_vector(&self, position: usize) -> bool {
        self.kinematics.vector_leg == Some(self.diagram.arrangement[position])
    }

    /// `r_j`: momentum of line `j` minus the loop momentum.
    fn shift(&self, line: usize) -> Momentum {
        if line + 1 == self.len() {
            return Momentum::default();
        }
        self.diagram.arrangement[..=line]
            .iter()
            .fold(Momentum::default(), |acc, leg| acc.plus(self.kinematics.inflow(*leg)))
    }

    /// Gamma matrix, fermion and boson meeting at `position`.
    fn vertex(&self, position: usize) -> Result<(Gamma, String, String), WilcoError> {
        let leg = &self.process.legs[self.diagram.arrangement[position]];
        let after = &self.diagram.lines[position];
        let before_index = self.line_before(position);
        let before = &self.diagram.lines[before_index];
        if self.is_external_vector(position) {
            return Ok((Gamma::Index(FREE_INDEX), after.particle().to_string(), leg.particle.clone()));
        }
        match (before, after) {
            (Line::Vector(boson), _) => Ok((
                Gamma::Index(before_index as u32 + 1),
                leg.particle.clone(),
                boson.clone(),
            )),
            (_, Line::Vector(boson)) => Ok((
                Gamma::Index(position as u32 + 1),
                leg.particle.clone(),
                boson.clone(),
            )),
            _ => Err(reduction_error(
                "closed-fermion-loop",
                "fermion vertex without a vector line",
            )),
        }
    }

    /// Fermion line whose arrow enters `position`, with the position it comes from.
    fn arriving(&self, position: usize) -> Result<(usize, usize), WilcoError> {
        let before = self.line_before(position);
        if let Line::Fermion(_, flow) = &self.diagram.lines[before] {
            if flow.sign() > 0 {
                return Ok((before, before));
            }
        }
        if let Line::Fermion(_, flow) = &self.diagram.lines[position] {
            if flow.sign() < 0 {
                return Ok((position, (position + 1) % self.len()));
            }
        }
        Err(reduction_error(
            "broken-fermion-line",
            format!("no fermion arrow enters position {}", position),
        ))
    }

    /// `s (l̸ + r̸_j) + m` for fermion line `j` with arrow sign `s`.
    fn numerator(&self, line: usize) -> Result<Vec<DiracTerm>, WilcoError> {
        let (name, sign) = match &self.diagram.lines[line] {
            Line::Fermion(name, flow) => (name, flow.sign()),
            Line::Vector(_) => return Err(reduction_error("broken-fermion-line", "vector on the fermion line")),
        };
        let mass = self.model.require_particle(name)?.mass_expr();
        let mut terms = vec![DiracTerm::new(Expr::int(sign), vec![Gamma::Slash(Vector::Loop)])];
        for (coef, gamma) in self.shift(line).slashes() {
            terms.push(DiracTerm::new(Expr::int(sign * coef), vec![gamma]));
        }
        if !mass.is_zero() {
            terms.push(DiracTerm::new(mass, Vec::new()));
        }
        Ok(terms)
    }

    fn integral(&self) -> Result<LoopIntegral, WilcoError> {
        let n = self.len();
        let mut masses_sq = Vec::with_capacity(n);
        for line in std::iter::once(n - 1).chain(0..n - 1) {
            let particle = self.model.require_particle(self.diagram.lines[line].particle())?;
            masses_sq.push(expand(&particle.mass_sq()));
        }
        Ok(LoopIntegral {
            shifts: (0..n - 1).map(|line| self.shift(line)).collect(),
            masses_sq,
        })
    }

    /// Chain and coupling product from the outgoing to the incoming spinor.
    fn chain(&self) -> Result<(Vec<DiracTerm>, Expr), WilcoError> {
        let start = self.position_of(self.kinematics.out_leg)?;
        let end = self.position_of(self.kinematics.in_leg)?;
        let mut terms = vec![DiracTerm::new(Expr::one(), Vec::new())];
        let mut couplings = Vec::new();
        let mut position = start;
        for _ in 0..self.len() {
            let (gamma, fermion, boson) = self.vertex(position)?;
            couplings.push(coupling_at(self.model, &fermion, &boson)?);
            terms = multiply(&terms, &[DiracTerm::new(Expr::one(), vec![gamma])]);
            if position == end {
                return Ok((terms, Expr::mul(couplings)));
            }
            let (line, next) = self.arriving(position)?;
            terms = multiply(&terms, &self.numerator(line)?);
            position = next;
        }
        Err(reduction_error(
            "broken-fermion-line",
            "the fermion line does not reach the incoming spinor",
        ))
    }

    /// Overall factor: couplings, `-g` of each vector propagator, `1/(16π²)`
    /// and the phase `i^{2n}` of `n` vertices, `n` propagators and the measure.
    fn prefactor(&self, couplings: Expr) -> Expr {
        let vectors = self.diagram.lines.iter().filter(|line| !line.is_fermion()).count();
        let sign = if (vectors + self.len()) % 2 == 0 { 1 } else { -1 };
        Expr::mul([Expr::int(sign), couplings, loop_factor()])
    }
}

/// `v^μ` in terms of `P^μ` and `q^μ`: `p = (P - q)/2`, `p' = (P + q)/2`.
fn momentum_structures(vector: Vector, sum: Structure, transfer: Structure) -> Result<Expr, WilcoError> {
    let sign = match vector {
        Vector::In => -1,
        Vector::Out => 1,
        Vector::Loop => {
            return Err(reduction_error(
                "loop-momentum-left",
                "a loop momentum survived tensor reduction",
            ))
        }
    };
    Ok(Expr::add([
        Expr::mul([Expr::rational(1, 2), Expr::structure(sum)]),
        Expr::mul([Expr::rational(sign, 2), Expr::structure(transfer)]),
    ]))
}

/// Maps a normal-ordered term onto its structure.
///
/// With one fermion leg off shell the Dirac equation of the other spinor
/// still fixes the chain: `ū' γ^μ p̸ = ū' (P^μ - m' γ^μ + iσ^{μν}q_ν)`,
/// `ū' p̸ = ū' (m' - q̸)` and mirrored on the incoming side.
fn structure_of(term: &DiracTerm, kinematics: &Kinematics) -> Result<Expr, WilcoError> {
    let vertex = !kinematics.two_point;
    let out_mass = kinematics.out_equation_mass().filter(|_| vertex);
    let in_mass = kinematics.in_equation_mass().filter(|_| vertex);
    let plain = |vector| momentum_structures(vector, Structure::MomentumSum, Structure::MomentumTransfer);
    let slashed = |vector| {
        momentum_structures(vector, Structure::MomentumSumSlash, Structure::MomentumTransferSlash)
    };
    let structure = match (term.vector, term.chain.as_slice(), out_mass, in_mass) {
        (None, [], _, _) => Expr::structure(Structure::Scalar),
        (None, [Gamma::Index(FREE_INDEX)], _, _) => Expr::structure(Structure::Vector),
        (None, [Gamma::Slash(Vector::In)], _, _) if kinematics.two_point => Expr::structure(Structure::Slash),
        (None, [Gamma::Index(FREE_INDEX), Gamma::Slash(Vector::In)], Some(mass), _)
        | (None, [Gamma::Slash(Vector::Out), Gamma::Index(FREE_INDEX)], _, Some(mass)) => Expr::add([
            Expr::structure(Structure::MomentumSum),
            Expr::mul([Expr::int(-1), mass.clone(), Expr::structure(Structure::Vector)]),
            Expr::structure(Structure::Magnetic),
        ]),
        (Some(vector), [], _, _) => plain(vector)?,
        (Some(vector), [Gamma::Slash(Vector::In)], Some(mass), _) => Expr::sub(
            Expr::mul([mass.clone(), plain(vector)?]),
            slashed(vector)?,
        ),
        (Some(vector), [Gamma::Slash(Vector::Out)], _, Some(mass)) => Expr::add([
            Expr::mul([mass.clone(), plain(vector)?]),
            slashed(vector)?,
        ]),
        _ => {
            return Err(WilcoError::Match(
                ErrorInfo::new("outside-basis", "chain has no canonical structure")
                    .with_context("chain", format!("{:?}", term.chain))
                    .with_context("vector", format!("{:?}", term.vector))
                    .with_hint("vertices are matched with at most one off-shell fermion leg"),
            ))
        }
    };
    Ok(Expr::mul([term.coefficient.clone(), structure]))
}

/// Drops `q^μ` terms when the vector is on shell.
pub fn apply_transversality(expr: &Expr, kinematics: &Kinematics) -> Expr {
    if !kinematics.vector_on_shell {
        return expr.clone();
    }
    let mut replacements = BTreeMap::new();
    replacements.insert(Structure::MomentumTransfer, Expr::zero());
    replacements.insert(Structure::MomentumTransferSlash, Expr::zero());
    replace_structures(expr, &replacements)
}

/// Normal form of a reduced chain: contraction, ordering, Dirac equation.
fn reduce_chain(terms: Vec<DiracTerm>, kinematics: &Kinematics) -> Result<Expr, WilcoError> {
    let contracted = contract_indices(terms, &Expr::dimension());
    let ordered = normal_order(contracted, kinematics)?;
    let reduced = apply_dirac_equation(
        ordered,
        kinematics.out_equation_mass(),
        kinematics.in_equation_mass(),
    );
    let mut parts = Vec::with_capacity(reduced.len());
    for term in &reduced {
        parts.push(structure_of(term, kinematics)?);
    }
    Ok(Expr::add(parts))
}

fn build_ring(ring: &Ring<'_>) -> Result<Expr, WilcoError> {
    let (chain, couplings) = ring.chain()?;
    let integral = ring.integral()?;
    let reduced = reduce_loop_momenta(chain, &integral, ring.kinematics)?;
    let structures = reduce_chain(reduced, ring.kinematics)?;
    let total = Expr::mul([ring.prefactor(couplings), structures]);
    eliminate_dimension(&expand(&total))
}

fn build_contact(model: &Model, process: &ProcessSpec, kinematics: &Kinematics) -> Result<Expr, WilcoError> {
    let (fermion, boson) = match kinematics.vector_leg {
        Some(vector) => (&process.legs[kinematics.in_leg].particle, &process.legs[vector].particle),
        None => return Err(reduction_error("unsupported-topology", "contact vertex without vector")),
    };
    let coupling = coupling_at(model, fermion, boson)?;
    Ok(structure_term(Structure::Vector, coupling))
}

/// Contribution of one diagram.
pub fn build_diagram(
    model: &Model,
    process: &ProcessSpec,
    kinematics: &Kinematics,
    diagram: &Diagram,
) -> Result<Expr, WilcoError> {
    let raw = match diagram.topology {
        Topology::Contact => build_contact(model, process, kinematics)?,
        Topology::Ring => build_ring(&Ring {
            model,
            process,
            kinematics,
            diagram,
        })?,
        Topology::Exchange(_) => {
            return Err(reduction_error(
                "unsupported-topology",
                "exchange diagrams have more than one open fermion line or vector",
            ))
        }
    };
    let contribution = apply_transversality(&expand(&raw), kinematics);
    debug!(diagram = diagram.id, terms = terms(&contribution).len(), "built diagram");
    Ok(contribution)
}

fn check_topology(process: &ProcessSpec, diagrams: &[Diagram]) -> Result<(), WilcoError> {
    if let Some(diagram) = diagrams.iter().find(|diagram| diagram.has_fermion_loop()) {
        return Err(WilcoError::Reduction(
            ErrorInfo::new("closed-fermion-loop", "closed fermion loops are not reduced")
                .with_context("process", process.to_string())
                .with_context("diagram", diagram.to_string()),
        ));
    }
    Ok(())
}

/// Validates `process`, generates its diagrams and assembles the amplitude.
pub fn compute_amplitude(
    model: &Model,
    order: LoopOrder,
    process: &ProcessSpec,
) -> Result<Amplitude, WilcoError> {
    validate_process(model, process)?;
    let diagrams = generate_diagrams(model, order, process)?;
    if diagrams.is_empty() {
        return Err(process_error(
            "no-diagrams",
            format!("no {:?} diagram connects the legs", order),
            process,
        ));
    }
    check_topology(process, &diagrams)?;
    let kinematics = Kinematics::from_process(model, process)?;

    let results: Result<Vec<(usize, Expr)>, WilcoError> = diagrams
        .par_iter()
        .enumerate()
        .map(|(index, diagram)| Ok((index, build_diagram(model, process, &kinematics, diagram)?)))
        .collect();
    let mut ordered = results?;
    ordered.sort_by_key(|(index, _)| *index);
    let contributions: Vec<Expr> = ordered.into_iter().map(|(_, expr)| expr).collect();
    let expr = expand(&Expr::add(contributions.iter().cloned()));
    info!(
        process = %process,
        diagrams = diagrams.len(),
        terms = terms(&expr).len(),
        "computed amplitude"
    );
    Ok(Amplitude {
        process: process.clone(),
        order,
        diagrams,
        contributions,
        expr,
        kinematics,
    })
}
