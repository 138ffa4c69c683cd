//! Dataset location: which files on disk belong to a dataset key.
//!
//! Each [`DatasetKind`] has an ordered chain of [`Resolver`]s built from the
//! configured overrides and the data-root conventions. Lookups walk the chain
//! and stop at the first resolver that yields anything, so an override always
//! shadows the conventional locations.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use crate::domain::dataset::{DatasetKey, DatasetKind, file_stem};
use crate::domain::settings::DataDirs;
use crate::ports::data_port::{DataPort, FileEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolver {
    /// One log file holding records for many keys.
    File(PathBuf),
    /// Accepted files directly inside a directory.
    Dir(PathBuf),
}

impl Resolver {
    pub fn path(&self) -> &Path {
        match self {
            Resolver::File(p) | Resolver::Dir(p) => p,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Resolver::File(_))
    }
}

/// Files found through one resolver.
#[derive(Debug, Clone)]
pub struct ResolvedGroup {
    pub resolver: Resolver,
    pub files: Vec<FileEntry>,
}

pub struct Locator<'a> {
    port: &'a dyn DataPort,
    dirs: &'a DataDirs,
}

impl<'a> Locator<'a> {
    pub fn new(port: &'a dyn DataPort, dirs: &'a DataDirs) -> Self {
        Self { port, dirs }
    }

    pub fn port(&self) -> &'a dyn DataPort {
        self.port
    }

    /// The override, else `classified` or `Classified` under the data root,
    /// whichever exists first.
    pub fn classified_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dirs.classified_dir {
            return dir.clone();
        }
        let lower = self.dirs.base.join("classified");
        let upper = self.dirs.base.join("Classified");
        if self.port.is_dir(&lower) {
            lower
        } else if self.port.is_dir(&upper) {
            upper
        } else {
            lower
        }
    }

    pub fn resolvers(&self, kind: DatasetKind) -> Vec<Resolver> {
        let base = &self.dirs.base;
        match kind {
            DatasetKind::Classified => vec![Resolver::Dir(self.classified_dir())],
            DatasetKind::RawVectors => {
                let mut chain = Vec::new();
                if let Some(dir) = &self.dirs.raw_vectors_dir {
                    chain.push(Resolver::Dir(dir.clone()));
                }
                chain.push(Resolver::Dir(base.join("raw_vectors")));
                chain
            }
            DatasetKind::Alerts => event_log_chain(
                base,
                self.dirs.alerts_file.as_ref(),
                self.dirs.alerts_dir.as_ref(),
                ["Alerts", "alerts"],
            ),
            DatasetKind::Trades => event_log_chain(
                base,
                self.dirs.trades_file.as_ref(),
                self.dirs.trades_dir.as_ref(),
                ["Trades", "trades"],
            ),
        }
    }

    /// Candidate files of one resolver, sorted by name.
    pub fn candidates(&self, kind: DatasetKind, resolver: &Resolver) -> Vec<FileEntry> {
        match resolver {
            Resolver::File(path) => {
                if !self.port.is_file(path) {
                    return Vec::new();
                }
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                vec![FileEntry {
                    name,
                    path: path.clone(),
                    modified: self.port.modified(path),
                }]
            }
            Resolver::Dir(dir) => {
                if !self.port.is_dir(dir) {
                    return Vec::new();
                }
                let mut files = match self.port.list_dir(dir) {
                    Ok(files) => files,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "cannot list dataset directory");
                        return Vec::new();
                    }
                };
                files.retain(|f| kind.accepts_file_name(&f.name));
                files.sort_by(|a, b| a.name.cmp(&b.name));
                files
            }
        }
    }

    /// Non-empty candidate lists in resolver order.
    pub fn groups(&self, kind: DatasetKind) -> Vec<ResolvedGroup> {
        self.resolvers(kind)
            .into_iter()
            .filter_map(|resolver| {
                let files = self.candidates(kind, &resolver);
                (!files.is_empty()).then_some(ResolvedGroup { resolver, files })
            })
            .collect()
    }

    /// Accepted files of the first resolver that has any.
    pub fn first_match<F>(&self, kind: DatasetKind, accept: F) -> Vec<FileEntry>
    where
        F: Fn(&Resolver, &FileEntry) -> bool,
    {
        for resolver in self.resolvers(kind) {
            let files: Vec<FileEntry> = self
                .candidates(kind, &resolver)
                .into_iter()
                .filter(|f| accept(&resolver, f))
                .collect();
            if !files.is_empty() {
                tracing::debug!(kind = %kind, from = %resolver.path().display(), count = files.len(), "resolved dataset files");
                return files;
            }
        }
        Vec::new()
    }

    /// Per-segment files of `key`, sorted by name.
    pub fn segment_files(&self, kind: DatasetKind, key: &DatasetKey) -> Vec<FileEntry> {
        self.first_match(kind, |_, f| key.is_segment_stem(file_stem(&f.name)))
    }

    /// Alert files for `key`: timeframe-qualified stems first, then the bare
    /// `{asset}_{date}` stem. Single-file resolvers match every key.
    pub fn alert_files(&self, key: &DatasetKey) -> Vec<FileEntry> {
        if key.has_timeframe() {
            let found = self.first_match(DatasetKind::Alerts, |r, f| {
                r.is_file() || key.matches_tf_stem(file_stem(&f.name))
            });
            if !found.is_empty() {
                return found;
            }
        }
        self.first_match(DatasetKind::Alerts, |r, f| {
            r.is_file() || key.matches_day_stem(file_stem(&f.name))
        })
    }

    /// `{stem}.jsonl` in the first directory of the chain that has it.
    pub fn find_by_stem(&self, kind: DatasetKind, stem: &str) -> Option<PathBuf> {
        let name = format!("{stem}.jsonl");
        self.resolvers(kind).into_iter().find_map(|r| match r {
            Resolver::Dir(dir) => {
                let path = dir.join(&name);
                self.port.is_file(&path).then_some(path)
            }
            Resolver::File(_) => None,
        })
    }

    /// Listing of a kind, most recently modified first.
    pub fn list_files(&self, kind: DatasetKind) -> Vec<FileEntry> {
        let mut files = self.first_match(kind, |_, _| true);
        files.sort_by_key(|f| Reverse(f.modified));
        files
    }
}

fn event_log_chain(
    base: &Path,
    file_override: Option<&PathBuf>,
    dir_override: Option<&PathBuf>,
    dir_names: [&str; 2],
) -> Vec<Resolver> {
    let mut chain = Vec::new();
    if let Some(file) = file_override {
        chain.push(Resolver::File(file.clone()));
    }
    if let Some(dir) = dir_override {
        chain.push(Resolver::Dir(dir.clone()));
    }
    for name in dir_names {
        chain.push(Resolver::Dir(base.join(name)));
    }
    let lower = dir_names[1];
    chain.push(Resolver::File(base.join(format!("{lower}.jsonl"))));
    chain.push(Resolver::File(base.join(format!("{}.jsonl", dir_names[0]))));
    chain.push(Resolver::Dir(base.to_path_buf()));
    chain
}
