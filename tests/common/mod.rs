#![allow(dead_code)]

use segview::domain::error::SegviewError;
use segview::domain::session::SessionWindow;
use segview::domain::settings::{DataDirs, Settings};
use segview::ports::data_port::{DataPort, FileEntry};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// A throwaway data root laid out the way the viewer expects.
pub struct DataRoot {
    pub dir: TempDir,
}

impl DataRoot {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_lines(&self, rel: &str, lines: &[String]) -> PathBuf {
        let mut body = lines.join("\n");
        body.push('\n');
        self.write(rel, &body)
    }

    /// A classified segment file of `lines` records ending in `summary`, plus
    /// a raw-vector companion with `raw_lines` records.
    pub fn segment(&self, stem: &str, lines: usize, raw_lines: usize, summary: &str) {
        let mut classified = filler(lines - 1);
        classified.push(summary.to_string());
        self.write_lines(&format!("classified/{stem}.jsonl"), &classified);
        self.write_lines(&format!("raw_vectors/{stem}.jsonl"), &filler(raw_lines));
    }

    pub fn settings(&self) -> Settings {
        Settings {
            dirs: DataDirs::rooted_at(self.path()),
            session: SessionWindow::default(),
            listen: "127.0.0.1:0".to_string(),
            static_dir: self.path().join("static"),
        }
    }
}

pub fn filler(n: usize) -> Vec<String> {
    (0..n).map(|i| format!(r#"{{"bar_index":{i}}}"#)).collect()
}

/// Classified summary line for a segment.
pub fn summary(start_time: &str, duration_min: u32, p0: f64, p1: f64, tier: &str) -> String {
    format!(
        r#"{{"start_time":"{start_time}","duration_min":{duration_min},"p0_close":{p0},"p1_close":{p1},"tier":"{tier}"}}"#
    )
}

/// In-memory [`DataPort`]. Paths listed in `unreadable` fail to read.
pub struct MockDataPort {
    pub files: BTreeMap<PathBuf, String>,
    pub unreadable: BTreeSet<PathBuf>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            unreadable: BTreeSet::new(),
        }
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(PathBuf::from(path), content.to_string());
        self
    }

    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.files.insert(PathBuf::from(path), String::new());
        self.unreadable.insert(PathBuf::from(path));
        self
    }
}

impl DataPort for MockDataPort {
    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<FileEntry>, SegviewError> {
        if !self.is_dir(dir) {
            return Err(SegviewError::FileNotFound(dir.display().to_string()));
        }
        Ok(self
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .map(|p| FileEntry {
                name: p.file_name().unwrap().to_string_lossy().into_owned(),
                path: p.clone(),
                modified: None,
            })
            .collect())
    }

    fn read_to_string(&self, path: &Path) -> Result<String, SegviewError> {
        if self.unreadable.contains(path) {
            return Err(SegviewError::FileRead {
                path: path.display().to_string(),
                reason: "permission denied".to_string(),
            });
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SegviewError::FileNotFound(path.display().to_string()))
    }

    fn modified(&self, _path: &Path) -> Option<SystemTime> {
        None
    }
}

pub fn mock_settings(base: &str) -> Settings {
    Settings {
        dirs: DataDirs::rooted_at(base),
        session: SessionWindow::default(),
        listen: "127.0.0.1:0".to_string(),
        static_dir: PathBuf::from("static"),
    }
}
