//! Gauss-Legendre quadrature on graded panels for Feynman-parameter integrals.

use std::f64::consts::PI;

/// Nodes and weights of an `n`-point Gauss-Legendre rule on `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Computes the rule by Newton iteration on the Legendre polynomial.
    pub fn new(order: usize) -> Self {
        let n = order.max(1);
        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];
        let half = (n + 1) / 2;
        for i in 0..half {
            let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            let mut derivative = 1.0;
            for _ in 0..100 {
                let (value, slope) = legendre(n, z);
                derivative = slope;
                let step = value / slope;
                z -= step;
                if step.abs() < 1e-15 {
                    break;
                }
            }
            let (_, slope) = legendre(n, z);
            if slope.is_finite() {
                derivative = slope;
            }
            let weight = 2.0 / ((1.0 - z * z) * derivative * derivative);
            nodes[i] = -z;
            nodes[n - 1 - i] = z;
            weights[i] = weight;
            weights[n - 1 - i] = weight;
        }
        Self { nodes, weights }
    }

    /// Integrates `f` over `[a, b]`.
    pub fn integrate<F: Fn(f64) -> f64>(&self, a: f64, b: f64, f: F) -> f64 {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (b + a);
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * f(mid + half * x))
            .sum::<f64>()
            * half
    }
}

fn legendre(n: usize, z: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = 0.0;
    for j in 1..=n {
        let p2 = p1;
        p1 = p0;
        p0 = ((2 * j - 1) as f64 * z * p1 - (j - 1) as f64 * p2) / j as f64;
    }
    let slope = n as f64 * (z * p0 - p1) / (z * z - 1.0);
    (p0, slope)
}

/// Composite rule on `[0, 1]` whose panels shrink geometrically toward both
/// endpoints, so integrable endpoint singularities converge quickly.
#[derive(Debug, Clone)]
pub struct GradedRule {
    points: Vec<(f64, f64)>,
}

impl GradedRule {
    /// Builds the rule with `levels` geometric panels per half interval.
    pub fn new(order: usize, levels: u32) -> Self {
        let base = GaussLegendre::new(order);
        let mut breaks = vec![0.0];
        for level in (0..=levels).rev() {
            breaks.push(0.5 * 0.5f64.powi(level as i32));
        }
        let left: Vec<f64> = breaks.clone();
        for value in left.iter().rev().skip(1) {
            breaks.push(1.0 - value);
        }
        let mut points = Vec::with_capacity(breaks.len() * base.nodes.len());
        for window in breaks.windows(2) {
            let (a, b) = (window[0], window[1]);
            let half = 0.5 * (b - a);
            let mid = 0.5 * (b + a);
            for (x, w) in base.nodes.iter().zip(&base.weights) {
                points.push((mid + half * x, w * half));
            }
        }
        Self { points }
    }

    /// Integrates `f` over `[0, 1]`.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.points.iter().map(|(x, w)| w * f(*x)).sum()
    }

    /// Integrates `f(x, y)` over the simplex `x, y >= 0, x + y <= 1`.
    pub fn integrate_simplex<F: Fn(f64, f64) -> f64>(&self, f: F) -> f64 {
        let mut total = 0.0;
        for (s, ws) in &self.points {
            let mut inner = 0.0;
            for (t, wt) in &self.points {
                inner += wt * f(s * t, s * (1.0 - t));
            }
            total += ws * s * inner;
        }
        total
    }

    /// Quadrature points and weights.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauss_legendre_is_exact_for_polynomials() {
        let rule = GaussLegendre::new(8);
        let value = rule.integrate(0.0, 2.0, |x| x.powi(7) + 3.0 * x * x);
        assert!((value - (256.0 / 8.0 + 8.0)).abs() < 1e-10);
    }

    #[test]
    fn graded_rule_handles_log_endpoints() {
        let rule = GradedRule::new(16, 30);
        let value = rule.integrate(|x| x.ln());
        assert!((value + 1.0).abs() < 1e-9, "{value}");
        let tail = rule.integrate(|x| (1.0 - x).ln() * x);
        assert!((tail + 0.75).abs() < 1e-9, "{tail}");
    }

    #[test]
    fn simplex_area_and_moment() {
        let rule = GradedRule::new(8, 4);
        assert!((rule.integrate_simplex(|_, _| 1.0) - 0.5).abs() < 1e-12);
        assert!((rule.integrate_simplex(|x, y| x * y) - 1.0 / 24.0).abs() < 1e-12);
    }
}
