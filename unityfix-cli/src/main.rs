use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use clap::Parser;
use fs_err as fs;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use unityfix_core::{
    DEFAULT_LOG_FILE, DESCRIPTOR_SUFFIX, LogSink, PatchSettings, XcodebuildSdkLocator, run_patch,
};
use unityfix_types::report::{PatchReport, ToolInfo};

/// Post-export repair for Unity-generated Xcode iOS projects.
///
/// Intended to run from Unity's PostprocessBuildPlayer hook after an iOS
/// export: it weak-links the frameworks the Adjust SDK needs and sets the
/// `-ObjC` linker flag, then rewrites the descriptor in place.
#[derive(Debug, Parser)]
#[command(
    name = "unityfix",
    version,
    about = "Patch a Unity-exported Xcode iOS project for the Adjust SDK."
)]
struct Cli {
    /// Path to the folder of the iOS project generated by Unity.
    ios_project_path: Utf8PathBuf,

    /// Further PostprocessBuildPlayer arguments (install path, target
    /// platform, ...). Accepted and ignored.
    #[arg(hide = true, num_args = 0..)]
    build_args: Vec<String>,

    /// Run log location.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: Utf8PathBuf,

    /// Compute and print the patch without writing the descriptor.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Skip the descriptor backup before rewriting.
    #[arg(long, default_value_t = false)]
    no_backup: bool,

    /// Also write a JSON report artifact to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = PatchSettings {
        ios_project_path: cli.ios_project_path,
        dry_run: cli.dry_run,
        backup: !cli.no_backup,
        ..PatchSettings::default()
    };

    let mut report = PatchReport::new(
        tool_info(),
        settings.ios_project_path.join(DESCRIPTOR_SUFFIX),
    );

    let mut sink = LogSink::create(&cli.log_file)
        .with_context(|| format!("create log file {}", cli.log_file))?;

    let outcome = run_patch(&settings, &XcodebuildSdkLocator, &mut sink)?;

    info!(
        changed = outcome.changed,
        dry_run = cli.dry_run,
        "processed {}",
        outcome.project_path
    );
    if cli.dry_run && !outcome.patch.is_empty() {
        print!("{}", outcome.patch);
    }

    if let Some(report_path) = &cli.report {
        report.run.ended_at = Some(Utc::now());
        report.sdk_path = outcome.sdk_path;
        report.changed = outcome.changed;
        report.results = outcome.results;
        write_json(report_path, &report)?;
    }

    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {path}"))?;
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "unityfix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}
