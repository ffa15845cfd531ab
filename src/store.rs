use crate::errors::PipelineError;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Persistent record of which links have ever been alerted, and when.
///
/// Entries are only ever added. `persist` rewrites the whole store.
pub trait AlertStore {
    /// Loads durable state, replacing whatever is in memory. A missing or
    /// unreadable backing store starts empty instead of failing.
    fn load(&mut self);
    fn get(&self, link: &str) -> Option<&str>;
    /// Records `link` unless it is already present. Returns `true` on insert.
    fn put(&mut self, link: &str, alerted_at: &str) -> bool;
    fn persist(&mut self) -> Result<(), PipelineError>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// JSON object `{link: timestamp}` on disk, replaced atomically on persist.
#[derive(Debug)]
pub struct JsonFileAlertStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileAlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    fn write_atomically(&self) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &self.entries)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl AlertStore for JsonFileAlertStore {
    fn load(&mut self) {
        self.entries = match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "[AlertStore] {} is corrupt ({}); starting from an empty store",
                        self.path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("[AlertStore] {} not found; starting empty", self.path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!(
                    "[AlertStore] Could not read {} ({}); starting from an empty store",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        };
    }

    fn get(&self, link: &str) -> Option<&str> {
        self.entries.get(link).map(String::as_str)
    }

    fn put(&mut self, link: &str, alerted_at: &str) -> bool {
        if self.entries.contains_key(link) {
            return false;
        }
        self.entries.insert(link.to_string(), alerted_at.to_string());
        true
    }

    fn persist(&mut self) -> Result<(), PipelineError> {
        self.write_atomically().map_err(|source| PipelineError::AlertStore {
            path: self.path.clone(),
            source,
        })?;
        info!(
            "[AlertStore] Persisted {} alerted link(s) to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Process-local store; `persist` snapshots into `persisted` so tests can
/// check what would have reached disk.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAlertStore {
    pub entries: BTreeMap<String, String>,
    pub persisted: BTreeMap<String, String>,
    pub persist_count: usize,
    pub fail_persist: bool,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries: BTreeMap<String, String> =
            entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self {
            persisted: entries.clone(),
            entries,
            ..Default::default()
        }
    }
}

impl AlertStore for InMemoryAlertStore {
    fn load(&mut self) {
        self.entries = self.persisted.clone();
    }

    fn get(&self, link: &str) -> Option<&str> {
        self.entries.get(link).map(String::as_str)
    }

    fn put(&mut self, link: &str, alerted_at: &str) -> bool {
        if self.entries.contains_key(link) {
            return false;
        }
        self.entries.insert(link.to_string(), alerted_at.to_string());
        true
    }

    fn persist(&mut self) -> Result<(), PipelineError> {
        if self.fail_persist {
            return Err(PipelineError::AlertStore {
                path: PathBuf::from("<memory>"),
                source: io::Error::other("persist disabled"),
            });
        }
        self.persisted = self.entries.clone();
        self.persist_count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerted_deals.json");

        let mut store = JsonFileAlertStore::open(&path);
        assert!(store.is_empty());
        assert!(store.put("https://example.com/a", "2025-03-01T09:30:00+00:00"));
        store.persist().unwrap();

        let reopened = JsonFileAlertStore::open(&path);
        assert_eq!(reopened.get("https://example.com/a"), Some("2025-03-01T09:30:00+00:00"));
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temp file must not linger");
    }

    #[test]
    fn existing_entries_are_never_overwritten() {
        let mut store = InMemoryAlertStore::new();
        assert!(store.put("a", "first"));
        assert!(!store.put("a", "second"));
        assert_eq!(store.get("a"), Some("first"));
    }

    #[test]
    fn corrupt_or_non_object_files_load_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerted_deals.json");

        fs::write(&path, "{ truncated").unwrap();
        assert!(JsonFileAlertStore::open(&path).is_empty());

        fs::write(&path, r#"["a", "b"]"#).unwrap();
        assert!(JsonFileAlertStore::open(&path).is_empty());
    }
}
