#![deny(missing_docs)]
#![doc = "Immutable symbolic expressions, normal forms, abbreviations and Passarino-Veltman loop functions."]

/// Abbreviation registry and expansion.
pub mod abbrev;
/// Numeric evaluation.
pub mod eval;
/// Expanded normal form.
pub mod expand;
pub mod expr;
/// Factoring and canonicalization.
pub mod factor;
pub mod loopfn;
/// Gauss-Legendre rules for Feynman-parameter integrals.
pub mod quadrature;
pub mod structure;
/// Randomized numeric equivalence.
pub mod verify;

pub use abbrev::{ensure_expanded, expand_abbreviations, AbbreviationTable, DEFAULT_PREFIX};
pub use eval::{evaluate, EvalContext};
pub use expand::{expand, poly, primitive_part, terms, Monomial, Poly};
pub use expr::{substitute, Expr, Function, Node, Symbol, SymbolKind, DIMENSION_NAME, PI_NAME};
pub use factor::{canonicalize, factor};
pub use loopfn::{eliminate_dimension, evaluate_loop_function, LoopEvalOpts, LoopFunction};
pub use structure::{collect_structures, replace_structures, structure_term, Structure};
pub use verify::{numerically_equivalent, EquivalenceReport};
