//! Board catalog resolution and toolchain flag derivation for keel.
//!
//! A build target is assembled from two documents:
//! - **Project configuration** (`config.json`): which board, which libraries,
//!   and per-project board option overrides.
//! - **Board catalog** (`boards.json`, shipped with the tool): one profile per
//!   board with its FQBN, core, Swift target triple, CPU and float settings.
//!
//! [`select_target`] folds both into a [`TargetDescriptor`]; [`flags::derive`]
//! turns the descriptor into a [`CompilerFlagSet`] that keeps the Swift object
//! and the vendor-compiled objects on the same floating-point ABI.

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod flags;
pub mod options;
pub mod project;

pub use catalog::{Catalog, TargetProfile, DEFAULT_CPU, DEFAULT_TRIPLE};
pub use descriptor::{load_sources, select_from, select_target, RawSources, TargetDescriptor};
pub use error::{ConfigError, Result};
pub use flags::{derive, derive_with, CompilerFlagSet, FloatAbi, RuntimeInventory, TargetFamily};
pub use options::{BoardOptions, CANONICAL_OPTION_KEYS};
pub use project::ProjectConfig;
