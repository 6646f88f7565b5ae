//! Amplitudes: the reduced expression together with its process data.

use serde::{Deserialize, Serialize};
use wilco_core::WilcoError;
use wilco_expr::{collect_structures, Expr, Structure};

use crate::diagram::Diagram;
use crate::kinematics::Kinematics;
use crate::process::{LoopOrder, ProcessSpec};

/// `M` with `iM` the Feynman amplitude, as a sum of structure atoms times
/// scalar coefficients. The vector polarization index is left free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amplitude {
    /// External legs.
    pub process: ProcessSpec,
    /// Loop order.
    pub order: LoopOrder,
    /// Diagrams in enumeration order.
    pub diagrams: Vec<Diagram>,
    /// Expanded contribution of each diagram, parallel to `diagrams`.
    pub contributions: Vec<Expr>,
    /// Expanded sum of the contributions.
    pub expr: Expr,
    /// External kinematics.
    pub kinematics: Kinematics,
}

impl Amplitude {
    /// Amplitude from an already reduced expression, without diagrams.
    pub fn from_expr(process: ProcessSpec, order: LoopOrder, kinematics: Kinematics, expr: Expr) -> Self {
        Self {
            process,
            order,
            diagrams: Vec::new(),
            contributions: Vec::new(),
            expr,
            kinematics,
        }
    }

    /// `(structure, coefficient)` pairs of the expression.
    pub fn structures(&self) -> Result<Vec<(Structure, Expr)>, WilcoError> {
        collect_structures(&self.expr)
    }

    /// Coefficient of one structure, zero when absent.
    pub fn coefficient(&self, structure: Structure) -> Result<Expr, WilcoError> {
        Ok(self
            .structures()?
            .into_iter()
            .find(|(candidate, _)| *candidate == structure)
            .map(|(_, coefficient)| coefficient)
            .unwrap_or_else(Expr::zero))
    }

    /// Whether the process is a fermion two-point function.
    pub fn is_two_point(&self) -> bool {
        self.kinematics.two_point
    }
}
