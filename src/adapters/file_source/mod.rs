// File source adapter - Recording files on local disk or in storage directories

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::errors::SourceError;
use crate::ports::{MediaSource, SourceOpener};

#[cfg(feature = "ffmpeg")]
mod libav;

/// Opens recordings by path, falling back to a search of the storage directories
pub struct FileSourceOpener {
    storage_dirs: Vec<PathBuf>,
}

impl FileSourceOpener {
    pub fn new(storage_dirs: Vec<PathBuf>) -> Self {
        Self { storage_dirs }
    }

    /// Locate the file for an identifier
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, SourceError> {
        let path = Path::new(identifier);
        if path.is_file() {
            return Ok(path.to_path_buf());
        }

        let not_found = || SourceError::SourceNotFound {
            identifier: identifier.to_string(),
        };
        let file_name = path.file_name().ok_or_else(not_found)?;

        for dir in &self.storage_dirs {
            debug!("Searching {} for {:?}", dir.display(), file_name);
            let found = WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(Result::ok)
                .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name);

            if let Some(entry) = found {
                info!(
                    "{} not found at its path, using {}",
                    identifier,
                    entry.path().display()
                );
                return Ok(entry.into_path());
            }
        }

        Err(not_found())
    }
}

impl SourceOpener for FileSourceOpener {
    fn open(&self, identifier: &str) -> Result<Box<dyn MediaSource>, SourceError> {
        let path = self.resolve(identifier)?;
        let size = std::fs::metadata(&path)
            .map_err(|_| SourceError::SourceNotFound {
                identifier: identifier.to_string(),
            })?
            .len();

        if size == 0 {
            return Err(SourceError::SourceEmpty {
                identifier: path.display().to_string(),
            });
        }

        open_decoder(&path, size)
    }
}

#[cfg(feature = "ffmpeg")]
fn open_decoder(path: &Path, size: u64) -> Result<Box<dyn MediaSource>, SourceError> {
    Ok(Box::new(libav::LibavSource::open(path, size)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_decoder(path: &Path, _size: u64) -> Result<Box<dyn MediaSource>, SourceError> {
    Err(SourceError::DecoderUnavailable {
        identifier: path.display().to_string(),
        reason: "built without the ffmpeg feature".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_not_found() {
        let opener = FileSourceOpener::new(Vec::new());
        let err = opener.open("/definitely/not/here.ts").err().unwrap();
        assert!(matches!(err, SourceError::SourceNotFound { .. }));
    }

    #[test]
    fn test_zero_byte_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.ts");
        fs::write(&path, b"").unwrap();

        let opener = FileSourceOpener::new(Vec::new());
        let err = opener.open(path.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, SourceError::SourceEmpty { .. }));
    }

    #[test]
    fn test_storage_dir_fallback() {
        let storage = TempDir::new().unwrap();
        let nested = storage.path().join("recordings").join("2024");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("1001_20240101.ts"), b"not really mpeg-ts").unwrap();

        let opener = FileSourceOpener::new(vec![storage.path().to_path_buf()]);
        let resolved = opener.resolve("/old/location/1001_20240101.ts").unwrap();
        assert_eq!(resolved, nested.join("1001_20240101.ts"));
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn test_decoder_unavailable_without_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rec.ts");
        fs::write(&path, b"\x47\x40\x00\x10").unwrap();

        let opener = FileSourceOpener::new(Vec::new());
        let err = opener.open(path.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, SourceError::DecoderUnavailable { .. }));
    }
}
