//! Multiplicative grouping of expanded expressions.

use std::collections::BTreeMap;

use num_rational::BigRational;
use tracing::trace;

use crate::expand::{expand, poly, primitive_part, Monomial, Poly};
use crate::expr::{Expr, Node};

/// Groups common factors: rational content, common monomial, then the most
/// shared atom recursively. Function arguments are factored as well.
pub fn factor(expr: &Expr) -> Expr {
    factor_poly(&poly(expr))
}

/// `factor(expand(expr))`; an idempotent canonical form.
pub fn canonicalize(expr: &Expr) -> Expr {
    let expanded = expand(expr);
    let out = factor(&expanded);
    trace!(input = %expr, output = %out, "canonicalized");
    out
}

fn factor_atom(atom: &Expr) -> Expr {
    match atom.node() {
        Node::Func(function, arg) => Expr::func(*function, factor(arg)),
        Node::Loop(function, args) => Expr::loop_fn(*function, args.iter().map(factor).collect()),
        Node::Add(_) => factor(atom),
        _ => atom.clone(),
    }
}

fn monomial_factors(monomial: &Monomial) -> Vec<Expr> {
    monomial
        .iter()
        .map(|(atom, exp)| Expr::pow(factor_atom(atom), *exp))
        .collect()
}

fn term_expr(monomial: &Monomial, coefficient: &BigRational) -> Expr {
    let mut factors = vec![Expr::num(coefficient.clone())];
    factors.extend(monomial_factors(monomial));
    Expr::mul(factors)
}

fn factor_poly(p: &Poly) -> Expr {
    if p.len() < 2 {
        return Expr::add(p.iter().map(|(m, c)| term_expr(m, c)));
    }
    let (scale, common, primitive) = primitive_part(p);
    let mut factors = vec![Expr::num(scale)];
    factors.extend(monomial_factors(&common));
    factors.push(group(&primitive));
    Expr::mul(factors)
}

fn group(p: &Poly) -> Expr {
    let mut counts: BTreeMap<(&Expr, bool), usize> = BTreeMap::new();
    for monomial in p.keys() {
        for (atom, exp) in monomial {
            *counts.entry((atom, *exp > 0)).or_insert(0) += 1;
        }
    }
    let mut best: Option<((&Expr, bool), usize)> = None;
    for (key, count) in counts {
        if count < 2 {
            continue;
        }
        match best {
            Some((_, current)) if current >= count => {}
            _ => best = Some((key, count)),
        }
    }
    let ((atom, positive), _) = match best {
        Some(best) => best,
        None => return Expr::add(p.iter().map(|(m, c)| term_expr(m, c))),
    };
    let (with, rest): (Poly, Poly) = p.iter().map(|(m, c)| (m.clone(), c.clone())).partition(|(m, _)| {
        m.iter()
            .any(|(candidate, exp)| candidate == atom && (*exp > 0) == positive)
    });
    Expr::add([factor_poly(&with), factor_poly(&rest)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Expr {
        Expr::param(name)
    }

    #[test]
    fn factor_extracts_content_and_monomial() {
        let (a, b, c, x) = (sym("a"), sym("b"), sym("c"), sym("x"));
        let expr = Expr::add([
            Expr::mul([Expr::int(6), a.clone(), b.clone(), Expr::pow(x.clone(), -1)]),
            Expr::mul([Expr::int(4), a.clone(), c.clone(), Expr::pow(x.clone(), -1)]),
        ]);
        let expected = Expr::mul([
            Expr::int(2),
            a,
            Expr::pow(x, -1),
            Expr::add([Expr::mul([Expr::int(3), b]), Expr::mul([Expr::int(2), c])]),
        ]);
        assert_eq!(factor(&expr), expected);
    }

    #[test]
    fn factor_groups_most_shared_atom() {
        let (a, b, c, d) = (sym("a"), sym("b"), sym("c"), sym("d"));
        let expr = Expr::add([
            Expr::mul([a.clone(), b.clone()]),
            Expr::mul([a.clone(), c.clone()]),
            d.clone(),
        ]);
        let expected = Expr::add([Expr::mul([a, Expr::add([b, c])]), d]);
        assert_eq!(factor(&expr), expected);
    }

    #[test]
    fn canonicalize_is_idempotent_on_rational_functions() {
        let (a, b) = (sym("a"), sym("b"));
        let expr = Expr::add([
            Expr::div(a.clone(), Expr::add([a.clone(), b.clone()])),
            Expr::div(b.clone(), Expr::add([a.clone(), b.clone()])),
            Expr::log(Expr::mul([Expr::int(2), Expr::add([a.clone(), b])])),
        ]);
        let once = canonicalize(&expr);
        assert_eq!(canonicalize(&once), once);
        assert_eq!(expand(&once), expand(&expr));
    }
}
