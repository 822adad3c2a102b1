use serde::{Deserialize, Serialize};

/// A single edit the patch pipeline performs against the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchOp {
    /// Ensure a framework reference exists (weak-linked, with a build-file
    /// entry in every frameworks build phase).
    AddFramework {
        /// File name of the framework, e.g. `AdSupport.framework`.
        name: String,
        /// Path passed to the descriptor; SDK-rooted.
        path: String,
        weak: bool,
    },
    /// Ensure a flag appears in `OTHER_LDFLAGS` of every build configuration.
    AddLinkerFlag { flag: String },
}

impl PatchOp {
    /// Short human-readable label, used in logs and reports.
    pub fn label(&self) -> String {
        match self {
            PatchOp::AddFramework { name, .. } => format!("add {name}"),
            PatchOp::AddLinkerFlag { flag } => format!("add linker flag {flag}"),
        }
    }
}

/// What actually happened for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    /// The descriptor was modified.
    Added,
    /// The edit was already in place; nothing changed.
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpResult {
    pub op: PatchOp,
    pub status: OpStatus,
}
