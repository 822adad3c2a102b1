//! Embeddable patch pipeline for unityfix.
//!
//! The pipeline is I/O-light and port-driven: toolchain discovery goes
//! through the [`SdkLocator`] trait so hosts and tests can substitute the
//! `xcodebuild` probe.

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;
pub mod sink;

pub use adapters::{StaticSdkLocator, XcodebuildSdkLocator};
pub use pipeline::{
    DESCRIPTOR_SUFFIX, PatchOutcome, REQUIRED_FRAMEWORKS, REQUIRED_LDFLAG, run_patch,
};
pub use ports::{SdkLocator, SdkResolution};
pub use settings::{DEFAULT_LOG_FILE, PatchSettings};
pub use sink::LogSink;
