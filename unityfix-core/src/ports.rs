//! Port traits abstracting toolchain discovery away from the pipeline.

use camino::{Utf8Path, Utf8PathBuf};

/// Result of probing the host toolchain for the iPhoneOS SDK.
///
/// Discovery is infallible by contract: failure degrades to [`NotFound`]
/// and the pipeline continues with SDK-relative paths.
///
/// [`NotFound`]: SdkResolution::NotFound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkResolution {
    Found(Utf8PathBuf),
    NotFound { reason: String },
}

impl SdkResolution {
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            SdkResolution::Found(path) => Some(path),
            SdkResolution::NotFound { .. } => None,
        }
    }
}

/// Xcode SDK discovery.
pub trait SdkLocator {
    fn locate_iphoneos_sdk(&self) -> SdkResolution;
}
