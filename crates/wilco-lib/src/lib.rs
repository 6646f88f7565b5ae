#![deny(missing_docs)]
#![doc = "Emission of Wilson coefficients as a C++ evaluation library."]

/// Expression rendering and identifier rules.
pub mod cpp;
pub mod library;

pub use cpp::{loop_runtime_name, render, validate_identifier, LOOP_RUNTIME_PREFIX};
pub use library::{GeneratedFile, Library, LibraryFunction, LibraryManifest};
