//! The hook's file-based run log.

use anyhow::Context;
use camino::Utf8Path;
use fs_err::File;
use std::io::Write;
use tracing::debug;

/// Append-only run log, one line per pipeline step.
///
/// Unity build machines harvest this file by name, so lines are plain
/// text in a fixed order, not tracing output. Each line is flushed as
/// written; the file closes when the sink drops.
#[derive(Debug)]
pub struct LogSink {
    file: File,
}

impl LogSink {
    /// Creates (or truncates) the log file.
    pub fn create(path: &Utf8Path) -> anyhow::Result<Self> {
        let file = File::create(path.to_path_buf()).with_context(|| format!("create {path}"))?;
        Ok(Self { file })
    }

    pub fn line(&mut self, message: impl AsRef<str>) -> anyhow::Result<()> {
        let message = message.as_ref();
        debug!(target: "unityfix::runlog", "{message}");
        writeln!(self.file, "{message}").context("write run log")?;
        self.file.flush().context("flush run log")?;
        Ok(())
    }
}
