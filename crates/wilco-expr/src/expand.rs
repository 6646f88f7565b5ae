//! Expanded normal form.
//!
//! An expanded expression is a sum of monomials `c · Π atom^e`. Atoms are
//! symbols, structures, function applications with expanded arguments, and
//! negative powers of primitive sums (integer content one, positive leading
//! term, no common monomial).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::expr::{rational_pow, Expr, Node};

/// Product of atoms raised to non-zero integer powers, sorted by atom.
pub type Monomial = Vec<(Expr, i64)>;

/// Sum of monomials with exact rational coefficients.
pub type Poly = BTreeMap<Monomial, BigRational>;

/// Multiplies two monomials.
pub fn monomial_mul(a: &Monomial, b: &Monomial) -> Monomial {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => {
                out.push(a[i].clone());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j].clone());
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                let exp = a[i].1 + b[j].1;
                if exp != 0 {
                    out.push((a[i].0.clone(), exp));
                }
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

fn monomial_pow(m: &Monomial, exp: i64) -> Monomial {
    m.iter().map(|(atom, e)| (atom.clone(), e * exp)).collect()
}

fn add_term(poly: &mut Poly, monomial: Monomial, coefficient: BigRational) {
    if coefficient.is_zero() {
        return;
    }
    match poly.entry(monomial) {
        Entry::Occupied(mut entry) => {
            let sum = entry.get() + &coefficient;
            if sum.is_zero() {
                entry.remove();
            } else {
                *entry.get_mut() = sum;
            }
        }
        Entry::Vacant(entry) => {
            entry.insert(coefficient);
        }
    }
}

/// Sum of two polynomials.
pub fn poly_add(a: &Poly, b: &Poly) -> Poly {
    let mut out = a.clone();
    for (monomial, coefficient) in b {
        add_term(&mut out, monomial.clone(), coefficient.clone());
    }
    out
}

/// Product of two polynomials.
pub fn poly_mul(a: &Poly, b: &Poly) -> Poly {
    let mut out = Poly::new();
    for (ma, ca) in a {
        for (mb, cb) in b {
            add_term(&mut out, monomial_mul(ma, mb), ca * cb);
        }
    }
    out
}

/// Polynomial of a single atom.
pub fn atom_poly(atom: Expr, exp: i64) -> Poly {
    let mut out = Poly::new();
    out.insert(vec![(atom, exp)], BigRational::one());
    out
}

/// Polynomial of a rational constant.
pub fn constant_poly(value: BigRational) -> Poly {
    let mut out = Poly::new();
    if !value.is_zero() {
        out.insert(Vec::new(), value);
    }
    out
}

/// Rational content: gcd of numerators over lcm of denominators, signed like
/// the leading coefficient. One for the empty polynomial.
pub fn content(poly: &Poly) -> BigRational {
    let mut numer = BigInt::zero();
    let mut denom = BigInt::one();
    for value in poly.values() {
        numer = numer.gcd(value.numer());
        denom = denom.lcm(value.denom());
    }
    if numer.is_zero() {
        return BigRational::one();
    }
    let content = BigRational::new(numer, denom);
    match poly.values().next() {
        Some(leading) if leading.is_negative() => -content,
        _ => content,
    }
}

/// Largest monomial dividing every term.
///
/// An atom contributes only when every term carries it with the same sign of
/// exponent; the smallest exponent is taken so that some term loses the atom.
pub fn common_monomial(poly: &Poly) -> Monomial {
    let mut terms = poly.keys();
    let first = match terms.next() {
        Some(first) => first.clone(),
        None => return Vec::new(),
    };
    let mut common: Monomial = first;
    for monomial in terms {
        common = common
            .into_iter()
            .filter_map(|(atom, exp)| {
                let other = monomial.iter().find(|(candidate, _)| *candidate == atom)?;
                if (exp > 0) != (other.1 > 0) {
                    return None;
                }
                Some((atom, exp.min(other.1)))
            })
            .collect();
        if common.is_empty() {
            break;
        }
    }
    common
}

/// Divides every term by a rational and a monomial.
pub fn poly_divide(poly: &Poly, by: &BigRational, monomial: &Monomial) -> Poly {
    let inverse = monomial_pow(monomial, -1);
    poly.iter()
        .map(|(m, c)| (monomial_mul(m, &inverse), c / by))
        .collect()
}

/// Splits `poly` into `scale · common · primitive`, where the primitive part
/// has integer coefficients without common divisor, a positive leading
/// coefficient and no common monomial.
pub fn primitive_part(poly: &Poly) -> (BigRational, Monomial, Poly) {
    let common = common_monomial(poly);
    let reduced = poly_divide(poly, &BigRational::one(), &common);
    let scale = content(&reduced);
    let primitive = poly_divide(&reduced, &scale, &Vec::new());
    (scale, common, primitive)
}

fn power_of_poly(base: &Poly, exp: i64) -> Poly {
    if exp > 0 {
        let mut out = constant_poly(BigRational::one());
        for _ in 0..exp {
            out = poly_mul(&out, base);
        }
        return out;
    }
    if base.is_empty() {
        return atom_poly(Expr::zero(), exp);
    }
    if base.len() == 1 {
        let mut out = Poly::new();
        for (monomial, coefficient) in base {
            out.insert(monomial_pow(monomial, exp), rational_pow(coefficient, exp));
        }
        return out;
    }
    let (scale, common, primitive) = primitive_part(base);
    let primitive = from_poly(&primitive);
    let mut out = Poly::new();
    out.insert(monomial_pow(&common, exp), rational_pow(&scale, exp));
    poly_mul(&out, &atom_poly(primitive, exp))
}

/// Expanded polynomial representation of `expr`.
pub fn poly(expr: &Expr) -> Poly {
    match expr.node() {
        Node::Num(value) => constant_poly(value.clone()),
        Node::Sym(_) | Node::Structure(_) => atom_poly(expr.clone(), 1),
        Node::Func(function, arg) => atom_poly(Expr::func(*function, expand(arg)), 1),
        Node::Loop(function, args) => {
            atom_poly(Expr::loop_fn(*function, args.iter().map(expand).collect()), 1)
        }
        Node::Add(terms) => {
            let mut out = Poly::new();
            for term in terms {
                for (monomial, coefficient) in poly(term) {
                    add_term(&mut out, monomial, coefficient);
                }
            }
            out
        }
        Node::Mul(factors) => factors.iter().fold(
            constant_poly(BigRational::one()),
            |acc, factor| {
                if acc.is_empty() {
                    acc
                } else {
                    poly_mul(&acc, &poly(factor))
                }
            },
        ),
        Node::Pow(base, exp) => power_of_poly(&poly(base), *exp),
    }
}

/// Rebuilds an expression from a monomial and its coefficient.
pub fn monomial_expr(monomial: &Monomial, coefficient: &BigRational) -> Expr {
    let mut factors = Vec::with_capacity(monomial.len() + 1);
    factors.push(Expr::num(coefficient.clone()));
    factors.extend(monomial.iter().map(|(atom, exp)| Expr::pow(atom.clone(), *exp)));
    Expr::mul(factors)
}

/// Rebuilds an expression from its polynomial.
pub fn from_poly(poly: &Poly) -> Expr {
    Expr::add(poly.iter().map(|(m, c)| monomial_expr(m, c)))
}

/// Distributes products over sums and normalizes denominators.
pub fn expand(expr: &Expr) -> Expr {
    from_poly(&poly(expr))
}

/// Terms of the expanded form.
pub fn terms(expr: &Expr) -> Vec<Expr> {
    poly(expr).iter().map(|(m, c)| monomial_expr(m, c)).collect()
}
