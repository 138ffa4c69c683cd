//! Data access port: the filesystem primitives the core reads datasets through.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::domain::error::SegviewError;
use crate::domain::record::non_blank_lines;

/// One regular file found in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

pub trait DataPort {
    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// Regular files directly inside `dir`, in no particular order.
    fn list_dir(&self, dir: &Path) -> Result<Vec<FileEntry>, SegviewError>;

    fn read_to_string(&self, path: &Path) -> Result<String, SegviewError>;

    fn modified(&self, path: &Path) -> Option<SystemTime>;

    /// Non-blank line count, zero when the file cannot be read.
    fn count_lines(&self, path: &Path) -> usize {
        self.read_to_string(path)
            .map(|content| non_blank_lines(&content).count())
            .unwrap_or(0)
    }
}
