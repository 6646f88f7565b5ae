#![deny(missing_docs)]
#![doc = "Process validation, diagram generation, Dirac algebra and one-loop reduction producing amplitudes."]

pub mod amplitude;
pub mod builder;
pub mod diagram;
pub mod dirac;
pub mod kinematics;
/// External legs and process validation.
pub mod process;
pub mod reduce;
pub mod squared;

pub use amplitude::Amplitude;
pub use builder::{apply_transversality, build_diagram, compute_amplitude};
pub use diagram::{generate_diagrams, Channel, Diagram, Flow, Line, Topology};
pub use dirac::{DiracTerm, Gamma, ScalarProducts, Vector, FREE_INDEX};
pub use kinematics::{Kinematics, Momentum};
pub use process::{validate_process, Direction, Leg, LoopOrder, ProcessSpec, Shell};
pub use reduce::{reduce_loop_momenta, LoopIntegral};
pub use squared::squared_amplitude;
