//! Pipeline driver for keel builds.
//!
//! Every command runs as a [`Pipeline`] of named steps over one
//! [`BuildContext`]. Steps run in order and the first failure stops the run;
//! nothing is rolled back. Child tools (`swiftc`, `arduino-cli`) are run
//! synchronously with their merged output teed into `build/logs/<step>.log`.

pub mod arduino;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod port;
pub mod process;
pub mod report;
pub mod steps;
pub mod toolchain;

pub use arduino::ArduinoCli;
pub use context::{BuildContext, Overrides, CACHE_FILE, OBJECT_FILE};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineFailure, Step};
pub use port::{DeviceLister, PortDetector};
pub use report::{PipelineReport, PipelineStatus, StepRecord};
pub use steps::{build_pipeline, monitor_pipeline, upload_pipeline, verify_pipeline};
pub use toolchain::ToolchainCache;
