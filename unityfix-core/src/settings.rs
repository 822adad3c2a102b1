//! Clap-free settings for the patch pipeline.

use camino::Utf8PathBuf;

/// Default run-log location, in the working directory. Unity build
/// machines harvest this file by name.
pub const DEFAULT_LOG_FILE: &str = "AdjustPostBuildiOSLog.txt";

/// Settings for the patch pipeline.
#[derive(Debug, Clone)]
pub struct PatchSettings {
    /// Directory of the Unity-exported iOS project.
    pub ios_project_path: Utf8PathBuf,

    /// Compute and preview the patch without writing the descriptor.
    pub dry_run: bool,

    // Backups
    pub backup: bool,
    pub backup_suffix: String,
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            ios_project_path: Utf8PathBuf::from("."),
            dry_run: false,
            backup: true,
            backup_suffix: ".unityfix.bak".to_string(),
        }
    }
}
