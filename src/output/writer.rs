//! Report writer: stdout or an atomically replaced file

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{CommFlagError, CommFlagResult};

/// Writes rendered reports
#[derive(Debug, Default)]
pub struct ReportWriter {
    path: Option<PathBuf>,
}

impl ReportWriter {
    /// Write to `path`, or stdout when `None`
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn write(&self, content: &str) -> CommFlagResult<()> {
        match &self.path {
            Some(path) => Self::write_atomic(path, content),
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
                Ok(())
            }
        }
    }

    fn write_atomic(path: &Path, content: &str) -> CommFlagResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CommFlagError::OutputError {
                message: format!("Failed to create output directory: {}", e),
            })?;
        }

        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        std::fs::write(&temp_path, content).map_err(|e| CommFlagError::OutputError {
            message: format!("Failed to write {}: {}", temp_path.display(), e),
        })?;
        std::fs::rename(&temp_path, path).map_err(|e| CommFlagError::OutputError {
            message: format!("Failed to rename temporary file: {}", e),
        })?;

        info!("Report written to {}", path.display());
        Ok(())
    }
}
