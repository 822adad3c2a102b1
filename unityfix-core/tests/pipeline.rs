//! End-to-end pipeline tests against a temp Unity export.

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use unityfix_core::{
    DESCRIPTOR_SUFFIX, LogSink, PatchSettings, StaticSdkLocator, run_patch,
};
use unityfix_types::ops::OpStatus;

const MINIMAL_PROJECT: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objectVersion = 46;
	objects = {
		86A0010001000100010001AA /* Frameworks */ = {
			isa = PBXFrameworksBuildPhase;
			files = (
			);
		};
		86A0010001000100010001BB = {
			isa = PBXGroup;
			children = (
			);
			sourceTree = "<group>";
		};
		86A0010001000100010001CC /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				SDKROOT = iphoneos;
			};
			name = Debug;
		};
		86A0010001000100010001DD /* Project object */ = {
			isa = PBXProject;
			mainGroup = 86A0010001000100010001BB;
		};
	};
	rootObject = 86A0010001000100010001DD;
}
"#;

struct Export {
    _temp: TempDir,
    root: Utf8PathBuf,
    descriptor: Utf8PathBuf,
    log: Utf8PathBuf,
}

fn create_export() -> Export {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().join("proj")).expect("utf8");
    let descriptor = root.join(DESCRIPTOR_SUFFIX);
    std::fs::create_dir_all(descriptor.parent().unwrap()).expect("mkdir");
    std::fs::write(&descriptor, MINIMAL_PROJECT).expect("write descriptor");
    let log = Utf8PathBuf::from_path_buf(temp.path().join("run.log")).expect("utf8");
    Export {
        _temp: temp,
        root,
        descriptor,
        log,
    }
}

fn settings(export: &Export) -> PatchSettings {
    PatchSettings {
        ios_project_path: export.root.clone(),
        ..PatchSettings::default()
    }
}

#[test]
fn patches_descriptor_and_logs_in_order() {
    let export = create_export();
    let locator = StaticSdkLocator::found("/SDKs/iPhoneOS9.2.sdk");

    let mut sink = LogSink::create(&export.log).unwrap();
    let outcome = run_patch(&settings(&export), &locator, &mut sink).unwrap();
    drop(sink);

    assert!(outcome.changed);
    assert_eq!(
        outcome.sdk_path.as_deref().map(|p| p.as_str()),
        Some("/SDKs/iPhoneOS9.2.sdk")
    );
    assert!(
        outcome
            .results
            .iter()
            .all(|r| r.status == OpStatus::Added)
    );

    let rewritten = std::fs::read_to_string(&export.descriptor).unwrap();
    assert!(rewritten.contains("/SDKs/iPhoneOS9.2.sdk/System/Library/Frameworks/AdSupport.framework"));
    assert!(rewritten.contains("iAd.framework"));
    assert!(rewritten.contains("\"-ObjC\""));

    let log = std::fs::read_to_string(&export.log).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Xcode sdk path: /SDKs/iPhoneOS9.2.sdk",
            format!("Unity3d Xcode project path: {}", export.descriptor).as_str(),
            "framework path: /SDKs/iPhoneOS9.2.sdk/System/Library/Frameworks",
            "added AdSupport framework",
            "added iAd framework",
        ]
    );
}

#[test]
fn second_run_is_a_no_op() {
    let export = create_export();
    let locator = StaticSdkLocator::found("/SDKs/iPhoneOS9.2.sdk");

    let mut sink = LogSink::create(&export.log).unwrap();
    run_patch(&settings(&export), &locator, &mut sink).unwrap();
    let after_first = std::fs::read_to_string(&export.descriptor).unwrap();

    let outcome = run_patch(&settings(&export), &locator, &mut sink).unwrap();
    assert!(!outcome.changed);
    assert!(outcome.patch.is_empty());
    assert!(
        outcome
            .results
            .iter()
            .all(|r| r.status == OpStatus::AlreadyPresent)
    );
    assert_eq!(std::fs::read_to_string(&export.descriptor).unwrap(), after_first);
}

#[test]
fn sdk_discovery_failure_degrades_to_relative_paths() {
    let export = create_export();
    let locator = StaticSdkLocator::not_found("code: Some(70), err: not installed");

    let mut sink = LogSink::create(&export.log).unwrap();
    let outcome = run_patch(&settings(&export), &locator, &mut sink).unwrap();
    drop(sink);

    assert!(outcome.sdk_path.is_none());
    assert_eq!(outcome.framework_dir.as_str(), "System/Library/Frameworks");
    assert!(outcome.changed);

    let rewritten = std::fs::read_to_string(&export.descriptor).unwrap();
    assert!(rewritten.contains("path = System/Library/Frameworks/AdSupport.framework;"));

    let log = std::fs::read_to_string(&export.log).unwrap();
    assert!(log.starts_with("Xcode sdk path: None\n"));
    assert!(log.contains("Could not retrieve Xcode sdk path. code: Some(70), err: not installed"));
}

#[test]
fn rerun_matches_by_file_name_across_sdk_prefixes() {
    let export = create_export();

    let mut sink = LogSink::create(&export.log).unwrap();
    let found = StaticSdkLocator::found("/SDKs/iPhoneOS9.2.sdk");
    run_patch(&settings(&export), &found, &mut sink).unwrap();

    // SDK vanished between runs; the frameworks are still recognized.
    let lost = StaticSdkLocator::not_found("gone");
    let outcome = run_patch(&settings(&export), &lost, &mut sink).unwrap();
    assert!(!outcome.changed);
}

#[test]
fn dry_run_previews_without_writing() {
    let export = create_export();
    let locator = StaticSdkLocator::found("/SDKs/iPhoneOS9.2.sdk");

    let mut patch_settings = settings(&export);
    patch_settings.dry_run = true;

    let mut sink = LogSink::create(&export.log).unwrap();
    let outcome = run_patch(&patch_settings, &locator, &mut sink).unwrap();

    assert!(outcome.changed);
    assert!(outcome.patch.contains("AdSupport.framework"));
    assert!(outcome.patch.contains("+++ b/"));
    assert_eq!(
        std::fs::read_to_string(&export.descriptor).unwrap(),
        MINIMAL_PROJECT
    );
}

#[test]
fn backup_is_written_before_the_rewrite() {
    let export = create_export();
    let locator = StaticSdkLocator::found("/SDKs/iPhoneOS9.2.sdk");

    let mut sink = LogSink::create(&export.log).unwrap();
    run_patch(&settings(&export), &locator, &mut sink).unwrap();

    let backup = Utf8PathBuf::from(format!("{}.unityfix.bak", export.descriptor));
    assert_eq!(std::fs::read_to_string(backup).unwrap(), MINIMAL_PROJECT);
}

#[test]
fn no_backup_setting_skips_the_copy() {
    let export = create_export();
    let locator = StaticSdkLocator::found("/SDKs/iPhoneOS9.2.sdk");

    let mut patch_settings = settings(&export);
    patch_settings.backup = false;

    let mut sink = LogSink::create(&export.log).unwrap();
    run_patch(&patch_settings, &locator, &mut sink).unwrap();

    let backup = format!("{}.unityfix.bak", export.descriptor);
    assert!(!std::path::Path::new(&backup).exists());
}

#[test]
fn missing_descriptor_is_an_error() {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("empty")).unwrap();
    std::fs::create_dir_all(&root).unwrap();
    let log = Utf8PathBuf::from_path_buf(temp.path().join("run.log")).unwrap();

    let mut sink = LogSink::create(&log).unwrap();
    let err = run_patch(
        &PatchSettings {
            ios_project_path: root,
            ..PatchSettings::default()
        },
        &StaticSdkLocator::not_found("gone"),
        &mut sink,
    )
    .unwrap_err();
    assert!(err.to_string().contains("read"));

    // The derived paths were still logged before the failure.
    let log_contents = std::fs::read_to_string(&log).unwrap();
    assert!(log_contents.contains("Unity3d Xcode project path:"));
}
