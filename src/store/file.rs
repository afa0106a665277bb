use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use super::PersistentStore;
use crate::error::StoreError;

const RECORD_EXTENSION: &str = "json";

/// Stores each key as its own JSON file inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader sees either the previous record or the new one.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.{RECORD_EXTENSION}"))
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "record not readable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
            file.write_all(value.as_bytes())
                .map_err(|source| StoreError::Io {
                    path: tmp_path.clone(),
                    source,
                })?;
            file.sync_all().ok();
        }

        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}
