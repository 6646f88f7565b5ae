#![deny(missing_docs)]
#![doc = "Command implementations behind the `wilco-sim` binary."]

pub mod commands;
/// YAML configuration with serde defaults.
pub mod config;

pub use commands::{print_report, ExprReport, Session};
pub use config::{LibraryConfig, ModelConfig, RunConfig};
