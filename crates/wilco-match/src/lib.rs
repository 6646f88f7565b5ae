#![deny(missing_docs)]
#![doc = "Wilson-coefficient matcher: projects amplitudes onto operator bases and looks operators up."]

pub mod matcher;
pub mod operator;
/// Coefficient containers.
pub mod wilson;

pub use matcher::{
    compute_wilson_coefficients, get_wilson_coefficient, get_wilson_coefficients, magnetic_operator,
    match_operator, reduce_to_basis, LOOP_PREFIX,
};
pub use operator::{DiracCoupling, Operator, OperatorBasis};
pub use wilson::{WilsonCoefficient, WilsonSet};
