//! The patch pipeline: resolve SDK, derive paths, edit, save.
//!
//! A strict sequence with one branch: SDK discovery may fail, in which
//! case the run continues with SDK-relative framework paths. Descriptor
//! failures (missing file, parse error) propagate to the caller.

use crate::ports::{SdkLocator, SdkResolution};
use crate::settings::PatchSettings;
use crate::sink::LogSink;
use anyhow::Context;
use camino::Utf8PathBuf;
use diffy::PatchFormatter;
use fs_err as fs;
use tracing::debug;
use unityfix_pbxproj::{AddFileOptions, SourceTree, XcodeProject};
use unityfix_types::ops::{OpResult, OpStatus, PatchOp};

/// Frameworks the Adjust SDK needs, weak-linked from the SDK root.
pub const REQUIRED_FRAMEWORKS: [&str; 2] = ["AdSupport.framework", "iAd.framework"];

/// Required for Objective-C categories in static libraries to load.
pub const REQUIRED_LDFLAG: &str = "-ObjC";

/// Location of the descriptor inside a Unity iOS export.
pub const DESCRIPTOR_SUFFIX: &str = "Unity-iPhone.xcodeproj/project.pbxproj";

const SDK_FRAMEWORKS_SUFFIX: &str = "System/Library/Frameworks";

/// Outcome of [`run_patch`].
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// Resolved iPhoneOS SDK root, when discovery succeeded.
    pub sdk_path: Option<Utf8PathBuf>,
    pub project_path: Utf8PathBuf,
    pub framework_dir: Utf8PathBuf,
    pub results: Vec<OpResult>,
    /// Whether any edit took effect. Formatting-only differences do not
    /// count and do not trigger a rewrite.
    pub changed: bool,
    /// Unified diff of the rewrite; empty when nothing changed.
    pub patch: String,
}

/// Runs the patch pipeline against the export in `settings.ios_project_path`.
pub fn run_patch(
    settings: &PatchSettings,
    locator: &dyn SdkLocator,
    sink: &mut LogSink,
) -> anyhow::Result<PatchOutcome> {
    let sdk_path = match locator.locate_iphoneos_sdk() {
        SdkResolution::Found(path) => {
            sink.line(format!("Xcode sdk path: {path}"))?;
            Some(path)
        }
        SdkResolution::NotFound { reason } => {
            sink.line("Xcode sdk path: None")?;
            sink.line(format!("Could not retrieve Xcode sdk path. {reason}"))?;
            None
        }
    };

    let project_path = settings.ios_project_path.join(DESCRIPTOR_SUFFIX);
    sink.line(format!("Unity3d Xcode project path: {project_path}"))?;

    let framework_dir = match &sdk_path {
        Some(sdk) => sdk.join(SDK_FRAMEWORKS_SUFFIX),
        // References carry sourceTree = SDKROOT, so Xcode resolves them
        // without the absolute prefix.
        None => Utf8PathBuf::from(SDK_FRAMEWORKS_SUFFIX),
    };
    sink.line(format!("framework path: {framework_dir}"))?;

    let before =
        fs::read_to_string(&project_path).with_context(|| format!("read {project_path}"))?;
    let mut project =
        XcodeProject::parse(&before).with_context(|| format!("parse {project_path}"))?;

    let mut results = Vec::new();
    for name in REQUIRED_FRAMEWORKS {
        let framework_path = framework_dir.join(name);
        let opts = AddFileOptions {
            tree: SourceTree::SdkRoot,
            group: Some("Frameworks".to_string()),
            create_build_file: true,
            weak: true,
        };
        let outcome = project
            .add_file_if_missing(framework_path.as_str(), &opts)
            .with_context(|| format!("add {name} to {project_path}"))?;
        sink.line(format!("added {} framework", name.trim_end_matches(".framework")))?;
        results.push(OpResult {
            op: PatchOp::AddFramework {
                name: name.to_string(),
                path: framework_path.into_string(),
                weak: true,
            },
            status: if outcome.added() {
                OpStatus::Added
            } else {
                OpStatus::AlreadyPresent
            },
        });
    }

    let flag_added = project.add_other_ldflags(REQUIRED_LDFLAG);
    results.push(OpResult {
        op: PatchOp::AddLinkerFlag {
            flag: REQUIRED_LDFLAG.to_string(),
        },
        status: if flag_added {
            OpStatus::Added
        } else {
            OpStatus::AlreadyPresent
        },
    });

    for result in &results {
        debug!(status = ?result.status, "{}", result.op.label());
    }

    let changed = results.iter().any(|r| r.status == OpStatus::Added);
    let patch = if changed {
        render_patch(&project_path, &before, &project.to_pbxproj_string())
    } else {
        String::new()
    };

    if changed && !settings.dry_run {
        if settings.backup {
            let backup_path = Utf8PathBuf::from(format!("{project_path}{}", settings.backup_suffix));
            fs::write(&backup_path, &before).with_context(|| format!("write {backup_path}"))?;
        }
        project
            .save(&project_path)
            .with_context(|| format!("write {project_path}"))?;
        debug!(%project_path, "descriptor rewritten");
    }

    Ok(PatchOutcome {
        sdk_path,
        project_path,
        framework_dir,
        results,
        changed,
        patch,
    })
}

fn render_patch(path: &Utf8PathBuf, before: &str, after: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- a/{path}\n+++ b/{path}\n"));
    let patch = diffy::create_patch(before, after);
    out.push_str(&PatchFormatter::new().fmt_patch(&patch).to_string());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
