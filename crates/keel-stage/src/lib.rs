//! Library resolution and sketch staging for keel.
//!
//! Swift libraries live in the tool's `swift/libs` tree (or the project's own
//! `libs/`); optional native counterparts live in `arduino/libs`. Staging
//! appends the Swift sources to a bounded [`CompilerArgs`] list and copies the
//! native side into `sketch/libraries/<Name>/src`, mirrored at the sketch root
//! so the vendor tool compiles it whether or not its library discovery works.

pub mod args;
pub mod error;
pub mod layout;
pub mod resolve;
pub mod shim;
pub mod stage;
pub mod walk;

pub use args::{CompilerArgs, DEFAULT_ARG_BUDGET};
pub use error::{Result, StageError};
pub use resolve::{resolve_dir, LibraryReference, ResolvedDir};
pub use stage::{resolve_and_stage, SketchbookLibrary, StageRequest, StagedLibrary, StagedLibrarySet};
