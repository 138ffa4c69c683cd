//! INI file configuration adapter.

use crate::domain::error::SegviewError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SegviewError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| SegviewError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SegviewError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| SegviewError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// Config from `path` when given, otherwise an empty config so every
    /// value falls back to its default.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, SegviewError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::from_string(""),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}
