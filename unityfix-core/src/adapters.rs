//! Default host-backed port implementations.

use crate::ports::{SdkLocator, SdkResolution};
use camino::Utf8PathBuf;
use regex::Regex;
use std::process::Command;
use tracing::debug;

/// Exit statuses that still carry a usable SDK listing. `xcodebuild` is
/// known to exit 66 on some hosts while printing the listing anyway.
const ACCEPTED_STATUSES: [i32; 2] = [0, 66];

/// Queries `xcodebuild -version -sdk` and extracts the iPhoneOS SDK path.
#[derive(Debug, Clone, Default)]
pub struct XcodebuildSdkLocator;

impl SdkLocator for XcodebuildSdkLocator {
    fn locate_iphoneos_sdk(&self) -> SdkResolution {
        let output = match Command::new("xcodebuild").args(["-version", "-sdk"]).output() {
            Ok(output) => output,
            Err(e) => {
                return SdkResolution::NotFound {
                    reason: format!("failed to run xcodebuild: {e}"),
                };
            }
        };

        let code = output.status.code();
        if !code.is_some_and(|c| ACCEPTED_STATUSES.contains(&c)) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return SdkResolution::NotFound {
                reason: format!(
                    "xcodebuild exited with code {code:?}, err: {}",
                    stderr.trim()
                ),
            };
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match extract_iphoneos_path(&stdout) {
            Some(path) => {
                debug!(%path, "resolved iPhoneOS SDK");
                SdkResolution::Found(path)
            }
            None => SdkResolution::NotFound {
                reason: "no iPhoneOS SDK in xcodebuild listing".to_string(),
            },
        }
    }
}

/// Pulls the `Path:` field of the iPhoneOS SDK block out of an
/// `xcodebuild -version -sdk` listing.
pub(crate) fn extract_iphoneos_path(listing: &str) -> Option<Utf8PathBuf> {
    let re = Regex::new(r"(?s)iPhoneOS.*?Path: (?P<sdk_path>.*?)\n").ok()?;
    re.captures(listing)?
        .name("sdk_path")
        .map(|m| Utf8PathBuf::from(m.as_str()))
}

/// Fixed-answer locator for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticSdkLocator {
    pub resolution: SdkResolution,
}

impl StaticSdkLocator {
    pub fn found(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            resolution: SdkResolution::Found(path.into()),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            resolution: SdkResolution::NotFound {
                reason: reason.into(),
            },
        }
    }
}

impl SdkLocator for StaticSdkLocator {
    fn locate_iphoneos_sdk(&self) -> SdkResolution {
        self.resolution.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::extract_iphoneos_path;
    use camino::Utf8PathBuf;

    const LISTING: &str = "\
Xcode 7.2\nBuild version 7C68\n\n\
iPhoneOS9.2.sdk - iOS 9.2 (iphoneos9.2)\n\
SDKVersion: 9.2\n\
Path: /Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform/Developer/SDKs/iPhoneOS9.2.sdk\n\
PlatformPath: /Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform\n\n\
iPhoneSimulator9.2.sdk - Simulator - iOS 9.2 (iphonesimulator9.2)\n\
SDKVersion: 9.2\n\
Path: /Applications/Xcode.app/Contents/Developer/Platforms/iPhoneSimulator.platform/Developer/SDKs/iPhoneSimulator9.2.sdk\n";

    #[test]
    fn picks_the_iphoneos_block() {
        assert_eq!(
            extract_iphoneos_path(LISTING),
            Some(Utf8PathBuf::from(
                "/Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform/Developer/SDKs/iPhoneOS9.2.sdk"
            ))
        );
    }

    #[test]
    fn minimal_marker_and_path() {
        assert_eq!(
            extract_iphoneos_path("iPhoneOS\nsomething\nPath: /X/Y/Z\n"),
            Some(Utf8PathBuf::from("/X/Y/Z"))
        );
    }

    #[test]
    fn no_iphoneos_section_yields_none() {
        assert_eq!(
            extract_iphoneos_path("MacOSX10.11.sdk\nPath: /Some/Path\n"),
            None
        );
    }

    #[test]
    fn missing_path_field_yields_none() {
        assert_eq!(extract_iphoneos_path("iPhoneOS9.2.sdk - iOS 9.2"), None);
    }
}
