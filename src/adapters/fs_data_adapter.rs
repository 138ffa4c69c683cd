//! Local filesystem implementation of [`DataPort`].

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::domain::error::SegviewError;
use crate::ports::data_port::{DataPort, FileEntry};

#[derive(Debug, Default, Clone, Copy)]
pub struct FsDataAdapter;

impl FsDataAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DataPort for FsDataAdapter {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<FileEntry>, SegviewError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "cannot stat directory entry");
                    continue;
                }
            };
            if !meta.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            entries.push(FileEntry {
                name,
                path: entry.path(),
                modified: meta.modified().ok(),
            });
        }
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, SegviewError> {
        fs::read_to_string(path).map_err(|e| SegviewError::FileRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}
