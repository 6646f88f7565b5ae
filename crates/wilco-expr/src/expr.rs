//! Immutable, structurally compared expression trees.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::loopfn::LoopFunction;
use crate::structure::Structure;

/// Name reserved for the number pi; evaluation contexts pre-populate it.
pub const PI_NAME: &str = "pi";

/// Name reserved for the space-time dimension of dimensional regularisation.
pub const DIMENSION_NAME: &str = "d";

/// Role of a [`Symbol`] inside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    /// Model parameter such as a coupling or a mass.
    Parameter,
    /// Kinematic invariant such as an off-shell momentum squared.
    Kinematic,
    /// Space-time dimension `d = 4 - 2 eps`.
    Dimension,
    /// Shorthand standing for a previously derived subexpression.
    Abbreviation,
}

/// Named atom of an expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Identifier used for display, substitution and code generation.
    pub name: String,
    /// Role of the symbol.
    pub kind: SymbolKind,
}

impl Symbol {
    /// Creates a symbol of the given kind.
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates a model parameter symbol.
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Parameter)
    }

    /// Creates a kinematic invariant symbol.
    pub fn kinematic(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Kinematic)
    }

    /// Whether the symbol is an abbreviation.
    pub fn is_abbreviation(&self) -> bool {
        self.kind == SymbolKind::Abbreviation
    }
}

/// Elementary functions supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Function {
    /// Natural logarithm.
    Log,
    /// Principal square root.
    Sqrt,
}

impl Function {
    /// Display name of the function.
    pub fn name(self) -> &'static str {
        match self {
            Function::Log => "log",
            Function::Sqrt => "sqrt",
        }
    }
}

/// Node of an expression tree. Obtain nodes through [`Expr::node`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Node {
    /// Exact rational number.
    Num(BigRational),
    /// Symbol.
    Sym(Symbol),
    /// Sum of at least two terms, flattened and sorted.
    Add(Vec<Expr>),
    /// Product of at least two factors, flattened and sorted.
    Mul(Vec<Expr>),
    /// Integer power.
    Pow(Expr, i64),
    /// Elementary function application.
    Func(Function, Expr),
    /// Passarino-Veltman loop function.
    Loop(LoopFunction, Vec<Expr>),
    /// Lorentz/Dirac structure atom.
    Structure(Structure),
}

/// Immutable expression shared by reference; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expr(Arc<Node>);

pub(crate) fn rational_pow(value: &BigRational, exp: i64) -> BigRational {
    let mut result = BigRational::one();
    for _ in 0..exp.unsigned_abs() {
        result = &result * value;
    }
    if exp < 0 {
        result.recip()
    } else {
        result
    }
}

impl Expr {
    fn from_node(node: Node) -> Self {
        Expr(Arc::new(node))
    }

    /// Returns the root node.
    pub fn node(&self) -> &Node {
        &self.0
    }

    /// Whether two handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Exact rational constant.
    pub fn num(value: BigRational) -> Self {
        Self::from_node(Node::Num(value))
    }

    /// Integer constant.
    pub fn int(value: i64) -> Self {
        Self::num(BigRational::from_integer(BigInt::from(value)))
    }

    /// Rational constant `numer / denom`. Panics when `denom` is zero.
    pub fn rational(numer: i64, denom: i64) -> Self {
        Self::num(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    /// The constant zero.
    pub fn zero() -> Self {
        Self::int(0)
    }

    /// The constant one.
    pub fn one() -> Self {
        Self::int(1)
    }

    /// Wraps a symbol.
    pub fn symbol(symbol: Symbol) -> Self {
        Self::from_node(Node::Sym(symbol))
    }

    /// Model parameter symbol.
    pub fn param(name: impl Into<String>) -> Self {
        Self::symbol(Symbol::parameter(name))
    }

    /// Kinematic invariant symbol.
    pub fn kinematic(name: impl Into<String>) -> Self {
        Self::symbol(Symbol::kinematic(name))
    }

    /// Space-time dimension symbol `d`.
    pub fn dimension() -> Self {
        Self::symbol(Symbol::new(DIMENSION_NAME, SymbolKind::Dimension))
    }

    /// The number pi, kept symbolic.
    pub fn pi() -> Self {
        Self::param(PI_NAME)
    }

    /// Lorentz/Dirac structure atom.
    pub fn structure(structure: Structure) -> Self {
        Self::from_node(Node::Structure(structure))
    }

    /// Loop function application.
    pub fn loop_fn(function: LoopFunction, args: Vec<Expr>) -> Self {
        Self::from_node(Node::Loop(function, args))
    }

    /// Elementary function application.
    pub fn func(function: Function, arg: Expr) -> Self {
        Self::from_node(Node::Func(function, arg))
    }

    /// Natural logarithm.
    pub fn log(arg: Expr) -> Self {
        Self::func(Function::Log, arg)
    }

    /// Square root.
    pub fn sqrt(arg: Expr) -> Self {
        Self::func(Function::Sqrt, arg)
    }

    /// Sum with flattening, constant folding and sorted terms.
    pub fn add<I: IntoIterator<Item = Expr>>(terms: I) -> Self {
        let mut constant = BigRational::zero();
        let mut flat = Vec::new();
        for term in terms {
            match term.node() {
                Node::Num(value) => constant = &constant + value,
                Node::Add(inner) => {
                    for child in inner {
                        if let Node::Num(value) = child.node() {
                            constant = &constant + value;
                        } else {
                            flat.push(child.clone());
                        }
                    }
                }
                _ => flat.push(term.clone()),
            }
        }
        if !constant.is_zero() {
            flat.push(Self::num(constant));
        }
        flat.sort();
        match flat.len() {
            0 => Self::zero(),
            1 => flat.remove(0),
            _ => Self::from_node(Node::Add(flat)),
        }
    }

    /// Product with flattening, constant folding and sorted factors.
    pub fn mul<I: IntoIterator<Item = Expr>>(factors: I) -> Self {
        let mut coefficient = BigRational::one();
        let mut flat = Vec::new();
        for factor in factors {
            match factor.node() {
                Node::Num(value) => coefficient = &coefficient * value,
                Node::Mul(inner) => {
                    for child in inner {
                        if let Node::Num(value) = child.node() {
                            coefficient = &coefficient * value;
                        } else {
                            flat.push(child.clone());
                        }
                    }
                }
                _ => flat.push(factor.clone()),
            }
        }
        if coefficient.is_zero() {
            return Self::zero();
        }
        flat.sort();
        if !coefficient.is_one() {
            flat.insert(0, Self::num(coefficient));
        }
        match flat.len() {
            0 => Self::one(),
            1 => flat.remove(0),
            _ => Self::from_node(Node::Mul(flat)),
        }
    }

    /// Integer power; `x^0 = 1`, nested powers collapse.
    pub fn pow(base: Expr, exp: i64) -> Self {
        if exp == 0 {
            return Self::one();
        }
        if exp == 1 {
            return base;
        }
        match base.node() {
            Node::Num(value) => {
                if value.is_zero() {
                    if exp > 0 {
                        return Self::zero();
                    }
                    return Self::from_node(Node::Pow(base.clone(), exp));
                }
                return Self::num(rational_pow(value, exp));
            }
            Node::Pow(inner, inner_exp) => return Self::pow(inner.clone(), inner_exp * exp),
            _ => {}
        }
        Self::from_node(Node::Pow(base, exp))
    }

    /// Negation.
    pub fn neg(value: Expr) -> Self {
        Self::mul([Self::int(-1), value])
    }

    /// Difference `a - b`.
    pub fn sub(a: Expr, b: Expr) -> Self {
        Self::add([a, Self::neg(b)])
    }

    /// Quotient `a / b`.
    pub fn div(a: Expr, b: Expr) -> Self {
        Self::mul([a, Self::pow(b, -1)])
    }

    /// Rational value when the expression is a constant.
    pub fn as_num(&self) -> Option<&BigRational> {
        match self.node() {
            Node::Num(value) => Some(value),
            _ => None,
        }
    }

    /// Symbol when the expression is a bare symbol.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self.node() {
            Node::Sym(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// Whether the expression is the constant zero.
    pub fn is_zero(&self) -> bool {
        self.as_num().map(|value| value.is_zero()).unwrap_or(false)
    }

    /// Whether the expression is the constant one.
    pub fn is_one(&self) -> bool {
        self.as_num().map(|value| value.is_one()).unwrap_or(false)
    }

    /// Direct children of the node.
    pub fn children(&self) -> Vec<Expr> {
        match self.node() {
            Node::Num(_) | Node::Sym(_) | Node::Structure(_) => Vec::new(),
            Node::Add(items) | Node::Mul(items) | Node::Loop(_, items) => items.clone(),
            Node::Pow(base, _) | Node::Func(_, base) => vec![base.clone()],
        }
    }

    /// Whether any node of the tree satisfies `pred`.
    pub fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        self.children().iter().any(|child| child.any(pred))
    }

    /// Whether the tree mentions an abbreviation symbol.
    pub fn contains_abbreviation(&self) -> bool {
        self.any(&|e| matches!(e.node(), Node::Sym(symbol) if symbol.is_abbreviation()))
    }

    /// Whether the tree mentions a structure atom.
    pub fn contains_structure(&self) -> bool {
        self.any(&|e| matches!(e.node(), Node::Structure(_)))
    }

    /// Whether the tree mentions a loop function.
    pub fn contains_loop_function(&self) -> bool {
        self.any(&|e| matches!(e.node(), Node::Loop(_, _)))
    }

    /// All symbols of the tree in canonical order.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        collect_symbols(self, &mut out);
        out
    }

    /// Distinct loop-function applications of the tree in canonical order.
    pub fn loop_functions(&self) -> BTreeSet<Expr> {
        let mut out = BTreeSet::new();
        collect_loop_functions(self, &mut out);
        out
    }
}

fn collect_symbols(expr: &Expr, out: &mut BTreeSet<Symbol>) {
    if let Node::Sym(symbol) = expr.node() {
        out.insert(symbol.clone());
    }
    for child in expr.children() {
        collect_symbols(&child, out);
    }
}

fn collect_loop_functions(expr: &Expr, out: &mut BTreeSet<Expr>) {
    if let Node::Loop(_, _) = expr.node() {
        out.insert(expr.clone());
    }
    for child in expr.children() {
        collect_loop_functions(&child, out);
    }
}

/// Rebuilds `expr` bottom-up, replacing every node for which `f` returns a value.
pub fn replace_with<F>(expr: &Expr, f: &F) -> Expr
where
    F: Fn(&Expr) -> Option<Expr>,
{
    if let Some(replacement) = f(expr) {
        return replacement;
    }
    match expr.node() {
        Node::Num(_) | Node::Sym(_) | Node::Structure(_) => expr.clone(),
        Node::Add(terms) => Expr::add(terms.iter().map(|term| replace_with(term, f))),
        Node::Mul(factors) => Expr::mul(factors.iter().map(|factor| replace_with(factor, f))),
        Node::Pow(base, exp) => Expr::pow(replace_with(base, f), *exp),
        Node::Func(function, arg) => Expr::func(*function, replace_with(arg, f)),
        Node::Loop(function, args) => {
            Expr::loop_fn(*function, args.iter().map(|arg| replace_with(arg, f)).collect())
        }
    }
}

/// Substitutes symbols by expressions.
pub fn substitute(expr: &Expr, map: &BTreeMap<Symbol, Expr>) -> Expr {
    if map.is_empty() {
        return expr.clone();
    }
    replace_with(expr, &|node: &Expr| match node.node() {
        Node::Sym(symbol) => map.get(symbol).cloned(),
        _ => None,
    })
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::int(value)
    }
}

impl From<Symbol> for Expr {
    fn from(value: Symbol) -> Self {
        Expr::symbol(value)
    }
}

/// Splits a term into `(is_negative, absolute_value)` for display.
fn split_sign(term: &Expr) -> (bool, Expr) {
    match term.node() {
        Node::Num(value) if value.is_negative() => (true, Expr::num(-value.clone())),
        Node::Mul(factors) => match factors.first().and_then(|f| f.as_num()) {
            Some(value) if value.is_negative() => {
                let mut rest = factors.clone();
                rest[0] = Expr::num(-value.clone());
                (true, Expr::mul(rest))
            }
            _ => (false, term.clone()),
        },
        _ => (false, term.clone()),
    }
}

fn write_rational(f: &mut fmt::Formatter<'_>, value: &BigRational, wrap: bool) -> fmt::Result {
    if value.is_integer() {
        if wrap && value.is_negative() {
            write!(f, "({})", value.to_integer())
        } else {
            write!(f, "{}", value.to_integer())
        }
    } else if wrap {
        write!(f, "({}/{})", value.numer(), value.denom())
    } else {
        write!(f, "{}/{}", value.numer(), value.denom())
    }
}

fn write_product(f: &mut fmt::Formatter<'_>, factors: &[Expr]) -> fmt::Result {
    let mut coefficient = BigRational::one();
    let mut numer = Vec::new();
    let mut denom = Vec::new();
    for factor in factors {
        match factor.node() {
            Node::Num(value) => coefficient = &coefficient * value,
            Node::Pow(base, exp) if *exp < 0 => denom.push(Expr::pow(base.clone(), -exp)),
            _ => numer.push(factor.clone()),
        }
    }
    if coefficient.is_negative() {
        write!(f, "-")?;
        coefficient = -coefficient;
    }
    let coefficient_numer = BigRational::from_integer(coefficient.numer().clone());
    let coefficient_denom = coefficient.denom().clone();
    let mut wrote = false;
    if !coefficient_numer.is_one() || numer.is_empty() {
        write!(f, "{}", coefficient_numer.to_integer())?;
        wrote = true;
    }
    for factor in &numer {
        if wrote {
            write!(f, "*")?;
        }
        write_expr(f, factor, 2)?;
        wrote = true;
    }
    let mut denominators: Vec<String> = Vec::new();
    if !coefficient_denom.is_one() {
        denominators.push(coefficient_denom.to_string());
    }
    for factor in &denom {
        denominators.push(format!("{}", Precedence(factor, 2)));
    }
    match denominators.len() {
        0 => Ok(()),
        1 => write!(f, "/{}", denominators[0]),
        _ => write!(f, "/({})", denominators.join("*")),
    }
}

struct Precedence<'a>(&'a Expr, u8);

impl fmt::Display for Precedence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self.0, self.1)
    }
}

// prec: 0 = top level / sum operand, 1 = product operand, 2 = power base
fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr, prec: u8) -> fmt::Result {
    match expr.node() {
        Node::Num(value) => write_rational(f, value, prec > 0),
        Node::Sym(symbol) => write!(f, "{}", symbol.name),
        Node::Structure(structure) => write!(f, "[{}]", structure),
        Node::Add(terms) => {
            if prec > 0 {
                write!(f, "(")?;
            }
            for (idx, term) in terms.iter().enumerate() {
                let (negative, magnitude) = split_sign(term);
                match (idx, negative) {
                    (0, true) => write!(f, "-")?,
                    (0, false) => {}
                    (_, true) => write!(f, " - ")?,
                    (_, false) => write!(f, " + ")?,
                }
                write_expr(f, &magnitude, 1)?;
            }
            if prec > 0 {
                write!(f, ")")?;
            }
            Ok(())
        }
        Node::Mul(factors) => {
            let negative = factors
                .first()
                .and_then(|factor| factor.as_num())
                .map(|value| value.is_negative())
                .unwrap_or(false);
            let wrap = prec > 1 || (prec > 0 && negative);
            if wrap {
                write!(f, "(")?;
            }
            write_product(f, factors)?;
            if wrap {
                write!(f, ")")?;
            }
            Ok(())
        }
        Node::Pow(base, exp) => {
            if *exp < 0 {
                if prec > 1 {
                    write!(f, "(")?;
                }
                write!(f, "1/")?;
                write_expr(f, &Expr::pow(base.clone(), -exp), 2)?;
                if prec > 1 {
                    write!(f, ")")?;
                }
                Ok(())
            } else {
                write_expr(f, base, 3)?;
                write!(f, "^{}", exp)
            }
        }
        Node::Func(function, arg) => {
            write!(f, "{}(", function.name())?;
            write_expr(f, arg, 0)?;
            write!(f, ")")
        }
        Node::Loop(function, args) => {
            write!(f, "{}(", function.name())?;
            for (idx, arg) in args.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write_expr(f, arg, 0)?;
            }
            write!(f, ")")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}
