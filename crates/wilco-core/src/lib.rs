#![deny(missing_docs)]
#![doc = "Core error, randomness and serialization helpers shared by the wilco crates."]

pub mod errors;
/// Canonical content hashing.
pub mod hash;
pub mod provenance;
pub mod rng;
pub mod serde;

pub use errors::{ErrorInfo, WilcoError};
pub use hash::stable_hash_string;
pub use provenance::{commit_string, RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
pub use serde::{from_json_slice, to_canonical_json_bytes, to_canonical_json_pretty};
