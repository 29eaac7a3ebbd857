use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use registry_core::KeyValueStore;
use registry_engine::{AtomicFileWriter, PersistError};
use registry_logging::{registry_error, registry_info, registry_warn};

/// Key-value store kept in a single RON file, rewritten on every change.
///
/// Concurrent processes are last-writer-wins.
#[derive(Debug)]
pub struct FileStore {
    writer: AtomicFileWriter,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Loads `path`; a missing or unparseable file starts empty.
    pub fn open(path: PathBuf) -> Result<Self, PersistError> {
        let writer = AtomicFileWriter::new(path);
        let entries = match writer.read()? {
            Some(content) => match ron::from_str(&content) {
                Ok(entries) => {
                    registry_info!("Loaded store from {:?}", writer.target());
                    entries
                }
                Err(err) => {
                    registry_warn!("Ignoring unreadable store {:?}: {}", writer.target(), err);
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };
        Ok(Self {
            writer,
            entries: Mutex::new(entries),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) {
        let content = match ron::ser::to_string_pretty(entries, ron::ser::PrettyConfig::new()) {
            Ok(text) => text,
            Err(err) => {
                registry_error!("Failed to serialize store: {}", err);
                return;
            }
        };
        if let Err(err) = self.writer.write(&content) {
            registry_error!("Failed to write store to {:?}: {}", self.writer.target(), err);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
            self.save(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(key).is_some() {
                self.save(&entries);
            }
        }
    }
}
