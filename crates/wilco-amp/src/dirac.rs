//! Dirac algebra on gamma-matrix chains sandwiched between external spinors.
//!
//! Chains are read from the outgoing spinor `ū(p')` on the left to the
//! incoming spinor `u(p)` on the right.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wilco_core::{ErrorInfo, WilcoError};
use wilco_expr::Expr;

/// Label of the free Lorentz index carried by an external vector.
pub const FREE_INDEX: u32 = 0;

/// Four-vector that can appear in a slash or as a free-index factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Vector {
    /// Loop momentum.
    Loop,
    /// Momentum of the incoming fermion.
    In,
    /// Momentum of the outgoing fermion.
    Out,
}

/// Element of a gamma chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gamma {
    /// `γ^α` with index label `α`.
    Index(u32),
    /// `v̸`.
    Slash(Vector),
}

impl Gamma {
    // Out=0, Index=1, In=2 so that the Dirac equation applies at both ends.
    fn rank(self) -> u8 {
        match self {
            Gamma::Slash(Vector::Out) => 0,
            Gamma::Index(_) => 1,
            Gamma::Slash(Vector::In) => 2,
            Gamma::Slash(Vector::Loop) => 3,
        }
    }
}

/// Scalar products of the external momenta.
pub trait ScalarProducts {
    /// `a · b`.
    fn dot(&self, a: Vector, b: Vector) -> Result<Expr, WilcoError>;
}

/// `coefficient × v^μ × chain`, where `v^μ` is an optional momentum carrying
/// the free index.
#[derive(Debug, Clone, PartialEq)]
pub struct DiracTerm {
    /// Scalar coefficient.
    pub coefficient: Expr,
    /// Momentum carrying the free index, if the index left the chain.
    pub vector: Option<Vector>,
    /// Gamma matrices.
    pub chain: Vec<Gamma>,
}

impl DiracTerm {
    /// Term without free-index momentum.
    pub fn new(coefficient: Expr, chain: Vec<Gamma>) -> Self {
        Self {
            coefficient,
            vector: None,
            chain,
        }
    }

    /// Term with a new coefficient factor.
    pub fn scaled(&self, factor: Expr) -> Self {
        Self {
            coefficient: Expr::mul([self.coefficient.clone(), factor]),
            vector: self.vector,
            chain: self.chain.clone(),
        }
    }

    fn with_chain(&self, factor: Expr, chain: Vec<Gamma>) -> Self {
        Self {
            coefficient: Expr::mul([self.coefficient.clone(), factor]),
            vector: self.vector,
            chain,
        }
    }
}

pub(crate) fn reduction_error(code: &str, message: impl Into<String>) -> WilcoError {
    WilcoError::Reduction(ErrorInfo::new(code, message))
}

/// Concatenates chains of every pair of terms.
pub fn multiply(left: &[DiracTerm], right: &[DiracTerm]) -> Vec<DiracTerm> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for a in left {
        for b in right {
            let mut chain = a.chain.clone();
            chain.extend_from_slice(&b.chain);
            out.push(DiracTerm {
                coefficient: Expr::mul([a.coefficient.clone(), b.coefficient.clone()]),
                vector: a.vector.or(b.vector),
                chain,
            });
        }
    }
    out
}

/// Merges terms with equal chains and free-index momenta.
pub fn collect(terms: Vec<DiracTerm>) -> Vec<DiracTerm> {
    let mut grouped: BTreeMap<(Option<Vector>, Vec<Gamma>), Vec<Expr>> = BTreeMap::new();
    for term in terms {
        if term.coefficient.is_zero() {
            continue;
        }
        grouped
            .entry((term.vector, term.chain))
            .or_default()
            .push(term.coefficient);
    }
    grouped
        .into_iter()
        .map(|((vector, chain), coefficients)| DiracTerm {
            coefficient: Expr::add(coefficients),
            vector,
            chain,
        })
        .filter(|term| !term.coefficient.is_zero())
        .collect()
}

/// `γ^α S γ_α` by `γ^α S' a γ_α = 2 a S' - (γ^α S' γ_α) a`, with `γ^α γ_α = dim`.
fn contract_segment(segment: &[Gamma], dim: &Expr) -> Vec<(Expr, Vec<Gamma>)> {
    match segment.split_last() {
        None => vec![(dim.clone(), Vec::new())],
        Some((last, rest)) => {
            let mut leading = Vec::with_capacity(segment.len());
            leading.push(*last);
            leading.extend_from_slice(rest);
            let mut out = vec![(Expr::int(2), leading)];
            for (coefficient, mut chain) in contract_segment(rest, dim) {
                chain.push(*last);
                out.push((Expr::neg(coefficient), chain));
            }
            out
        }
    }
}

fn find_pair(chain: &[Gamma]) -> Option<(usize, usize)> {
    for (i, gamma) in chain.iter().enumerate() {
        if let Gamma::Index(label) = gamma {
            if *label == FREE_INDEX {
                continue;
            }
            if let Some(offset) = chain[i + 1..].iter().position(|other| other == gamma) {
                return Some((i, i + 1 + offset));
            }
        }
    }
    None
}

/// Contracts every repeated index label in `dim` dimensions.
pub fn contract_indices(terms: Vec<DiracTerm>, dim: &Expr) -> Vec<DiracTerm> {
    let mut done = Vec::new();
    let mut work = terms;
    while let Some(term) = work.pop() {
        match find_pair(&term.chain) {
            None => done.push(term),
            Some((i, j)) => {
                for (factor, middle) in contract_segment(&term.chain[i + 1..j], dim) {
                    let mut chain = term.chain[..i].to_vec();
                    chain.extend(middle);
                    chain.extend_from_slice(&term.chain[j + 1..]);
                    work.push(term.with_chain(factor, chain));
                }
            }
        }
    }
    collect(done)
}

fn first_disorder(chain: &[Gamma]) -> Option<usize> {
    chain.windows(2).position(|pair| {
        let (a, b) = (pair[0], pair[1]);
        (a == b && matches!(a, Gamma::Slash(_))) || a.rank() > b.rank()
    })
}

/// Sorts chains into `p̸'... γ^μ ... p̸` order using anticommutators and
/// collapses `v̸ v̸ = v²`.
pub fn normal_order<K: ScalarProducts>(
    terms: Vec<DiracTerm>,
    kinematics: &K,
) -> Result<Vec<DiracTerm>, WilcoError> {
    let mut done = Vec::new();
    let mut work = terms;
    while let Some(term) = work.pop() {
        let i = match first_disorder(&term.chain) {
            None => {
                done.push(term);
                continue;
            }
            Some(i) => i,
        };
        let (a, b) = (term.chain[i], term.chain[i + 1]);
        let mut reduced = term.chain[..i].to_vec();
        reduced.extend_from_slice(&term.chain[i + 2..]);
        if a == b {
            if let Gamma::Slash(v) = a {
                work.push(term.with_chain(kinematics.dot(v, v)?, reduced));
            }
            continue;
        }
        let mut swapped = term.chain.clone();
        swapped.swap(i, i + 1);
        work.push(term.with_chain(Expr::int(-1), swapped));
        match (a, b) {
            (Gamma::Slash(u), Gamma::Slash(v)) => {
                let product = Expr::mul([Expr::int(2), kinematics.dot(u, v)?]);
                work.push(term.with_chain(product, reduced));
            }
            (Gamma::Slash(v), Gamma::Index(FREE_INDEX)) | (Gamma::Index(FREE_INDEX), Gamma::Slash(v)) => {
                if term.vector.is_some() {
                    return Err(reduction_error(
                        "free-index-twice",
                        "the free index appears twice in one term",
                    ));
                }
                let mut next = term.with_chain(Expr::int(2), reduced);
                next.vector = Some(v);
                work.push(next);
            }
            _ => {
                return Err(reduction_error(
                    "uncontracted-index",
                    "normal ordering met an uncontracted dummy index",
                ))
            }
        }
    }
    Ok(collect(done))
}

/// Applies `ū(p') p̸' = m' ū(p')` and `p̸ u(p) = m u(p)` at the chain ends.
pub fn apply_dirac_equation(
    terms: Vec<DiracTerm>,
    out_mass: Option<&Expr>,
    in_mass: Option<&Expr>,
) -> Vec<DiracTerm> {
    let reduced = terms
        .into_iter()
        .map(|mut term| {
            if let Some(mass) = out_mass {
                while term.chain.first() == Some(&Gamma::Slash(Vector::Out)) {
                    term.chain.remove(0);
                    term.coefficient = Expr::mul([term.coefficient.clone(), mass.clone()]);
                }
            }
            if let Some(mass) = in_mass {
                while term.chain.last() == Some(&Gamma::Slash(Vector::In)) {
                    term.chain.pop();
                    term.coefficient = Expr::mul([term.coefficient.clone(), mass.clone()]);
                }
            }
            term
        })
        .collect();
    collect(reduced)
}

/// Four-dimensional trace of a chain of slashes.
pub fn trace<K: ScalarProducts>(chain: &[Vector], kinematics: &K) -> Result<Expr, WilcoError> {
    if chain.is_empty() {
        return Ok(Expr::int(4));
    }
    if chain.len() % 2 == 1 {
        return Ok(Expr::zero());
    }
    let first = chain[0];
    let mut terms = Vec::with_capacity(chain.len() - 1);
    for k in 1..chain.len() {
        let mut rest: Vec<Vector> = chain[1..k].to_vec();
        rest.extend_from_slice(&chain[k + 1..]);
        let sign = if k % 2 == 1 { 1 } else { -1 };
        terms.push(Expr::mul([
            Expr::int(sign),
            kinematics.dot(first, chain[k])?,
            trace(&rest, kinematics)?,
        ]));
    }
    Ok(Expr::add(terms))
}
