//! Abbreviation registry.
//!
//! The table is an explicit context object: callers own it and pass it to
//! every stage that introduces or resolves abbreviations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wilco_core::{ErrorInfo, WilcoError};

use crate::expr::{replace_with, Expr, Node, Symbol, SymbolKind};

/// Default prefix of generated abbreviation names.
pub const DEFAULT_PREFIX: &str = "Ab";

fn abbreviation_error(code: &str, message: impl Into<String>) -> WilcoError {
    WilcoError::Abbreviation(ErrorInfo::new(code, message))
}

/// Ordered registry of abbreviation symbols and their bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbbreviationTable {
    entries: Vec<(Symbol, Expr)>,
    #[serde(skip)]
    by_body: HashMap<Expr, usize>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    #[serde(skip)]
    counters: HashMap<String, usize>,
}

impl AbbreviationTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of abbreviations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Abbreviates `body` with the default prefix.
    pub fn abbreviate(&mut self, body: Expr) -> Result<Expr, WilcoError> {
        self.abbreviate_with(DEFAULT_PREFIX, body)
    }

    /// Returns the symbol standing for `body`, defining `<prefix>_<n>` on first use.
    ///
    /// Structurally equal bodies share one symbol regardless of prefix.
    pub fn abbreviate_with(&mut self, prefix: &str, body: Expr) -> Result<Expr, WilcoError> {
        if let Some(&idx) = self.by_body.get(&body) {
            return Ok(Expr::symbol(self.entries[idx].0.clone()));
        }
        self.check_references(&body)?;
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let mut name = format!("{}_{}", prefix, counter);
        while self.by_name.contains_key(&name) {
            *counter += 1;
            name = format!("{}_{}", prefix, counter);
        }
        *counter += 1;
        let symbol = Symbol::new(name.clone(), SymbolKind::Abbreviation);
        debug!(abbreviation = %name, body = %body, "defined abbreviation");
        let idx = self.entries.len();
        self.entries.push((symbol.clone(), body.clone()));
        self.by_body.insert(body, idx);
        self.by_name.insert(name, idx);
        Ok(Expr::symbol(symbol))
    }

    fn check_references(&self, body: &Expr) -> Result<(), WilcoError> {
        for symbol in body.free_symbols() {
            if symbol.is_abbreviation() && !self.by_name.contains_key(&symbol.name) {
                return Err(WilcoError::Abbreviation(
                    ErrorInfo::new(
                        "forward-reference",
                        "abbreviation bodies may only reference earlier abbreviations",
                    )
                    .with_context("symbol", symbol.name),
                ));
            }
        }
        Ok(())
    }

    /// Body of the abbreviation called `name`.
    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.by_name.get(name).map(|&idx| &self.entries[idx].1)
    }

    /// Abbreviations in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Expr)> {
        self.entries.iter().map(|(symbol, body)| (symbol, body))
    }

    /// Rebuilds the lookup indices after deserialization.
    pub fn reindex(&mut self) {
        self.by_body.clear();
        self.by_name.clear();
        for (idx, (symbol, body)) in self.entries.iter().enumerate() {
            self.by_body.insert(body.clone(), idx);
            self.by_name.insert(symbol.name.clone(), idx);
        }
    }

    /// Abbreviations referenced by `expr`, transitively, in definition order.
    pub fn dependencies(&self, expr: &Expr) -> Vec<(Symbol, Expr)> {
        let mut needed = vec![false; self.entries.len()];
        let mut stack: Vec<Expr> = vec![expr.clone()];
        while let Some(current) = stack.pop() {
            for symbol in current.free_symbols() {
                if let Some(&idx) = self.by_name.get(&symbol.name) {
                    if !needed[idx] {
                        needed[idx] = true;
                        stack.push(self.entries[idx].1.clone());
                    }
                }
            }
        }
        self.entries
            .iter()
            .zip(needed)
            .filter(|(_, keep)| *keep)
            .map(|(entry, _)| entry.clone())
            .collect()
    }
}

/// Replaces abbreviation symbols by their bodies until none remain.
///
/// Expressions without abbreviations are returned unchanged, so the
/// operation is idempotent.
pub fn expand_abbreviations(expr: &Expr, table: &AbbreviationTable) -> Result<Expr, WilcoError> {
    if !expr.contains_abbreviation() {
        return Ok(expr.clone());
    }
    let mut missing: Option<String> = None;
    let mut resolved: HashMap<String, Expr> = HashMap::new();
    for symbol in expr.free_symbols() {
        if !symbol.is_abbreviation() {
            continue;
        }
        match table.get(&symbol.name) {
            Some(body) => {
                let body = expand_abbreviations(body, table)?;
                resolved.insert(symbol.name.clone(), body);
            }
            None => {
                missing = Some(symbol.name.clone());
                break;
            }
        }
    }
    if let Some(name) = missing {
        return Err(WilcoError::Abbreviation(
            ErrorInfo::new("unknown-abbreviation", format!("{} is not defined", name))
                .with_context("symbol", name),
        ));
    }
    Ok(replace_with(expr, &|node: &Expr| match node.node() {
        Node::Sym(symbol) if symbol.is_abbreviation() => resolved.get(&symbol.name).cloned(),
        _ => None,
    }))
}

/// Fails unless `expr` is free of abbreviations.
pub fn ensure_expanded(expr: &Expr) -> Result<(), WilcoError> {
    if expr.contains_abbreviation() {
        return Err(abbreviation_error(
            "unexpanded",
            format!("expression still contains abbreviations: {}", expr),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopfn::LoopFunction;

    #[test]
    fn abbreviations_dedupe_structurally_equal_bodies() {
        let mut table = AbbreviationTable::new();
        let body = Expr::add([Expr::param("a"), Expr::param("b")]);
        let first = table.abbreviate(body.clone()).expect("abbreviate");
        let second = table.abbreviate(Expr::add([Expr::param("b"), Expr::param("a")])).expect("abbreviate");
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Ab_0"), Some(&body));
    }

    #[test]
    fn nested_abbreviations_expand_fully() {
        let mut table = AbbreviationTable::new();
        let m_sq = Expr::pow(Expr::param("m"), 2);
        let pv = table
            .abbreviate_with(
                "PV",
                Expr::loop_fn(LoopFunction::B0, vec![m_sq.clone(), Expr::zero(), m_sq.clone()]),
            )
            .expect("pv");
        let outer = table
            .abbreviate(Expr::add([Expr::mul([Expr::int(4), pv.clone()]), Expr::int(-2)]))
            .expect("outer");
        let expr = Expr::mul([Expr::param("e"), outer]);
        let once = expand_abbreviations(&expr, &table).expect("expand");
        assert!(!once.contains_abbreviation());
        let twice = expand_abbreviations(&once, &table).expect("expand");
        assert!(twice.ptr_eq(&once));
        assert_eq!(table.dependencies(&expr).len(), 2);
    }

    #[test]
    fn unknown_and_forward_references_are_rejected() {
        let mut table = AbbreviationTable::new();
        let ghost = Expr::symbol(Symbol::new("Ab_7", SymbolKind::Abbreviation));
        let err = expand_abbreviations(&ghost, &table).expect_err("unknown");
        assert_eq!(err.code(), "unknown-abbreviation");
        let err = table.abbreviate(Expr::mul([Expr::int(2), ghost])).expect_err("forward");
        assert_eq!(err.code(), "forward-reference");
    }
}
