//! Feynman-diagram enumeration from the model's vertices.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wilco_core::WilcoError;
use wilco_model::Model;

use crate::process::{Direction, LoopOrder, ProcessSpec};

/// Exchange channel of a four-leg tree diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Legs `(0, 1)` meet legs `(2, 3)`.
    S,
    /// Legs `(0, 2)` meet legs `(1, 3)`.
    T,
    /// Legs `(0, 3)` meet legs `(1, 2)`.
    U,
}

/// Shape of a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// Single vertex joining three legs.
    Contact,
    /// Two vertices joined by one propagator.
    Exchange(Channel),
    /// One-loop ring with one vertex per external leg.
    Ring,
}

/// Direction of the fermion-number arrow relative to the line's orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flow {
    /// Arrow runs from the line's first vertex to its second.
    Forward,
    /// Arrow runs from the line's second vertex to its first.
    Backward,
}

impl Flow {
    fn flip(self) -> Self {
        match self {
            Flow::Forward => Flow::Backward,
            Flow::Backward => Flow::Forward,
        }
    }

    /// `+1` for forward lines, `-1` otherwise.
    pub fn sign(self) -> i64 {
        match self {
            Flow::Forward => 1,
            Flow::Backward => -1,
        }
    }
}

/// Internal propagator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Line {
    /// Vector boson propagator.
    Vector(String),
    /// Fermion propagator with its arrow.
    Fermion(String, Flow),
}

impl Line {
    /// Particle name.
    pub fn particle(&self) -> &str {
        match self {
            Line::Vector(name) | Line::Fermion(name, _) => name,
        }
    }

    /// Whether the line is a fermion.
    pub fn is_fermion(&self) -> bool {
        matches!(self, Line::Fermion(..))
    }

    fn flipped(&self) -> Line {
        match self {
            Line::Vector(name) => Line::Vector(name.clone()),
            Line::Fermion(name, flow) => Line::Fermion(name.clone(), flow.flip()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Line::Fermion(_, Flow::Forward) => 0,
            Line::Vector(_) => 1,
            Line::Fermion(_, Flow::Backward) => 2,
        }
    }

    /// End of the line at its first (`start = true`) or second vertex.
    fn end(&self, start: bool) -> End<'_> {
        match self {
            Line::Vector(name) => End::Vector(name),
            Line::Fermion(name, flow) => {
                let leaving = (*flow == Flow::Forward) == start;
                if leaving {
                    End::FermionOut(name)
                } else {
                    End::FermionIn(name)
                }
            }
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Vector(name) => write!(f, "{}", name),
            Line::Fermion(name, Flow::Forward) => write!(f, "{}>", name),
            Line::Fermion(name, Flow::Backward) => write!(f, "<{}", name),
        }
    }
}

/// One diagram of a process.
///
/// For rings, position `k` holds leg `arrangement[k]` and line `k` joins
/// positions `k` and `k + 1`. For exchanges, legs `arrangement[0..2]` meet
/// at the first vertex and the single line runs from it to the second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagram {
    /// Position in the deterministic enumeration order.
    pub id: usize,
    /// Loop order.
    pub order: LoopOrder,
    /// Shape.
    pub topology: Topology,
    /// Leg indices in vertex order.
    pub arrangement: Vec<usize>,
    /// Internal lines.
    pub lines: Vec<Line>,
}

impl Diagram {
    /// Whether the lines form a closed fermion loop.
    pub fn has_fermion_loop(&self) -> bool {
        self.topology == Topology::Ring && self.lines.iter().all(Line::is_fermion)
    }
}

impl fmt::Display for Diagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.lines.iter().map(|line| line.to_string()).collect();
        write!(
            f,
            "#{} {:?} legs {:?} lines [{}]",
            self.id,
            self.topology,
            self.arrangement,
            lines.join(", ")
        )
    }
}

/// Field end meeting a vertex; fermion ends carry the arrow direction
/// relative to that vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End<'a> {
    FermionIn(&'a str),
    FermionOut(&'a str),
    Vector(&'a str),
}

fn vertex_allowed(model: &Model, ends: &[End<'_>]) -> bool {
    let mut incoming = None;
    let mut outgoing = None;
    let mut vector = None;
    for end in ends {
        let slot = match end {
            End::FermionIn(name) => (&mut incoming, *name),
            End::FermionOut(name) => (&mut outgoing, *name),
            End::Vector(name) => (&mut vector, *name),
        };
        if slot.0.replace(slot.1).is_some() {
            return false;
        }
    }
    match (incoming, outgoing, vector) {
        (Some(a), Some(b), Some(v)) => a == b && model.coupling(a, v).is_some(),
        _ => false,
    }
}

fn leg_ends<'a>(model: &Model, process: &'a ProcessSpec) -> Result<Vec<End<'a>>, WilcoError> {
    process
        .legs
        .iter()
        .map(|leg| {
            let particle = model.require_particle(&leg.particle)?;
            Ok(match (particle.is_fermion(), leg.direction) {
                (true, Direction::Incoming) => End::FermionIn(&leg.particle),
                (true, Direction::Outgoing) => End::FermionOut(&leg.particle),
                (false, _) => End::Vector(&leg.particle),
            })
        })
        .collect()
}

fn candidate_lines(model: &Model) -> Vec<Line> {
    let mut lines = Vec::new();
    for particle in &model.particles {
        if particle.is_fermion() {
            lines.push(Line::Fermion(particle.name.clone(), Flow::Forward));
            lines.push(Line::Fermion(particle.name.clone(), Flow::Backward));
        } else {
            lines.push(Line::Vector(particle.name.clone()));
        }
    }
    lines
}

/// Permutations of `items` in lexicographic order.
fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for (i, head) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, *head);
            out.push(tail);
        }
    }
    out
}

/// Every assignment of `slots` lines drawn from `candidates`.
fn assignments(candidates: &[Line], slots: usize) -> Vec<Vec<Line>> {
    let mut out: Vec<Vec<Line>> = vec![Vec::new()];
    for _ in 0..slots {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                candidates.iter().map(move |line| {
                    let mut next = prefix.clone();
                    next.push(line.clone());
                    next
                })
            })
            .collect();
    }
    out
}

type RingKey = (Vec<(u8, String)>, Vec<usize>);

fn ring_key(arrangement: &[usize], lines: &[Line]) -> RingKey {
    (
        lines
            .iter()
            .map(|line| (line.rank(), line.particle().to_string()))
            .collect(),
        arrangement.to_vec(),
    )
}

/// Same ring traversed in the opposite direction, leg of position 0 fixed.
fn reflect(arrangement: &[usize], lines: &[Line]) -> (Vec<usize>, Vec<Line>) {
    let n = arrangement.len();
    let reflected_arrangement = (0..n).map(|k| arrangement[(n - k) % n]).collect();
    let reflected_lines = (0..n).map(|k| lines[(2 * n - k - 1) % n].flipped()).collect();
    (reflected_arrangement, reflected_lines)
}

fn tree_diagrams(model: &Model, process: &ProcessSpec, ends: &[End<'_>]) -> Vec<Diagram> {
    match ends.len() {
        3 if vertex_allowed(model, ends) => vec![Diagram {
            id: 0,
            order: LoopOrder::Tree,
            topology: Topology::Contact,
            arrangement: vec![0, 1, 2],
            lines: Vec::new(),
        }],
        4 => {
            let channels = [
                (Channel::S, [0, 1, 2, 3]),
                (Channel::T, [0, 2, 1, 3]),
                (Channel::U, [0, 3, 1, 2]),
            ];
            let mut diagrams = Vec::new();
            for (channel, arrangement) in channels {
                for line in candidate_lines(model) {
                    let first = [ends[arrangement[0]], ends[arrangement[1]], line.end(true)];
                    let second = [ends[arrangement[2]], ends[arrangement[3]], line.end(false)];
                    if vertex_allowed(model, &first) && vertex_allowed(model, &second) {
                        diagrams.push(Diagram {
                            id: 0,
                            order: LoopOrder::Tree,
                            topology: Topology::Exchange(channel),
                            arrangement: arrangement.to_vec(),
                            lines: vec![line],
                        });
                    }
                }
            }
            debug!(process = %process, diagrams = diagrams.len(), "tree exchange diagrams");
            diagrams
        }
        _ => Vec::new(),
    }
}

fn ring_diagrams(model: &Model, ends: &[End<'_>]) -> Vec<Diagram> {
    let n = ends.len();
    if !(2..=3).contains(&n) {
        return Vec::new();
    }
    let candidates = candidate_lines(model);
    let rest: Vec<usize> = (1..n).collect();
    let mut unique: BTreeMap<RingKey, (Vec<usize>, Vec<Line>)> = BTreeMap::new();
    for tail in permutations(&rest) {
        let mut arrangement = vec![0];
        arrangement.extend(tail);
        for lines in assignments(&candidates, n) {
            let allowed = (0..n).all(|k| {
                let before = &lines[(k + n - 1) % n];
                let after = &lines[k];
                vertex_allowed(model, &[ends[arrangement[k]], before.end(false), after.end(true)])
            });
            if !allowed {
                continue;
            }
            let (mirror_arrangement, mirror_lines) = reflect(&arrangement, &lines);
            let key = ring_key(&arrangement, &lines);
            let mirror_key = ring_key(&mirror_arrangement, &mirror_lines);
            if key <= mirror_key {
                unique.insert(key, (arrangement.clone(), lines));
            } else {
                unique.insert(mirror_key, (mirror_arrangement, mirror_lines));
            }
        }
    }
    unique
        .into_values()
        .map(|(arrangement, lines)| Diagram {
            id: 0,
            order: LoopOrder::OneLoop,
            topology: Topology::Ring,
            arrangement,
            lines,
        })
        .collect()
}

/// Diagrams of `process` at `order`, in a deterministic order.
pub fn generate_diagrams(
    model: &Model,
    order: LoopOrder,
    process: &ProcessSpec,
) -> Result<Vec<Diagram>, WilcoError> {
    let ends = leg_ends(model, process)?;
    let mut diagrams = match order {
        LoopOrder::Tree => tree_diagrams(model, process, &ends),
        LoopOrder::OneLoop => ring_diagrams(model, &ends),
    };
    for (id, diagram) in diagrams.iter_mut().enumerate() {
        diagram.id = id;
        debug!(diagram = %diagram, "generated diagram");
    }
    Ok(diagrams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Leg;
    use wilco_model::toy_qed;

    fn model() -> Model {
        toy_qed("mu", -1, "m_mu").expect("model")
    }

    #[test]
    fn self_energy_has_one_ring_with_forward_fermion() {
        let process = ProcessSpec::new(vec![Leg::incoming("mu").off_shell(), Leg::outgoing("mu")]);
        let diagrams = generate_diagrams(&model(), LoopOrder::OneLoop, &process).expect("diagrams");
        assert_eq!(diagrams.len(), 1);
        assert_eq!(
            diagrams[0].lines,
            vec![Line::Fermion("mu".into(), Flow::Forward), Line::Vector("A".into())]
        );
    }

    #[test]
    fn vertex_correction_is_unique_up_to_reflection() {
        let process = ProcessSpec::new(vec![
            Leg::incoming("mu"),
            Leg::outgoing("mu"),
            Leg::outgoing("A"),
        ]);
        let diagrams = generate_diagrams(&model(), LoopOrder::OneLoop, &process).expect("diagrams");
        assert_eq!(diagrams.len(), 1);
        assert_eq!(diagrams[0].arrangement, vec![0, 2, 1]);
        assert!(!diagrams[0].has_fermion_loop());
        let tree = generate_diagrams(&model(), LoopOrder::Tree, &process).expect("tree");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].topology, Topology::Contact);
    }

    #[test]
    fn compton_scattering_has_s_and_u_channels() {
        let process = ProcessSpec::new(vec![
            Leg::incoming("mu"),
            Leg::incoming("A"),
            Leg::outgoing("mu"),
            Leg::outgoing("A"),
        ]);
        let diagrams = generate_diagrams(&model(), LoopOrder::Tree, &process).expect("diagrams");
        let topologies: Vec<Topology> = diagrams.iter().map(|d| d.topology).collect();
        assert_eq!(
            topologies,
            vec![Topology::Exchange(Channel::S), Topology::Exchange(Channel::U)]
        );
    }

    #[test]
    fn vacuum_polarization_is_a_fermion_loop() {
        let process = ProcessSpec::new(vec![Leg::incoming("A"), Leg::outgoing("A")]);
        let diagrams = generate_diagrams(&model(), LoopOrder::OneLoop, &process).expect("diagrams");
        assert_eq!(diagrams.len(), 1);
        assert!(diagrams[0].has_fermion_loop());
    }
}
