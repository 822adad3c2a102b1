use crate::ops::OpResult;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Report artifact describing one patch run.
///
/// Consumers (build pipelines) should tolerate unknown fields; unityfix only
/// promises the fields below for `unityfix.report.v1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchReport {
    /// Schema identifier, `unityfix.report.v1`.
    pub schema: String,

    pub tool: ToolInfo,

    #[serde(default)]
    pub run: RunInfo,

    /// Descriptor the run operated on.
    pub project_path: Utf8PathBuf,

    /// Resolved iPhoneOS SDK root, when discovery succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_path: Option<Utf8PathBuf>,

    /// Whether the descriptor was rewritten.
    pub changed: bool,

    #[serde(default)]
    pub results: Vec<OpResult>,
}

impl PatchReport {
    pub fn new(tool: ToolInfo, project_path: Utf8PathBuf) -> Self {
        Self {
            schema: crate::schema::UNITYFIX_REPORT_V1.to_string(),
            tool,
            run: RunInfo {
                started_at: Some(Utc::now()),
                ended_at: None,
            },
            project_path,
            sdk_path: None,
            changed: false,
            results: Vec::new(),
        }
    }
}
