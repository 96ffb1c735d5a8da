use anyhow::{Context, Result};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, warn};

use crate::config::Config;

/// Key under which the last searched city is remembered.
pub const LAST_CITY_KEY: &str = "lastCity";

/// Small string key/value persistence.
///
/// `save` is fire-and-forget: implementations log failures instead of
/// returning them.
pub trait PreferenceStore: Send + Sync + Debug {
    fn save(&self, key: &str, value: &str);

    fn load(&self, key: &str) -> Option<String>;
}

pub fn save_last_city(store: &dyn PreferenceStore, city: &str) {
    store.save(LAST_CITY_KEY, city);
}

/// Blank values are treated as absent.
pub fn load_last_city(store: &dyn PreferenceStore) -> Option<String> {
    store
        .load(LAST_CITY_KEY)
        .filter(|city| !city.trim().is_empty())
}

/// Preferences kept in a TOML table on disk.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dirs = Config::project_dirs()?;
        Ok(Self::new(dirs.data_dir().join("preferences.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences: {}", self.path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse preferences: {}", self.path.display()))
    }

    fn write_entry(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        // A corrupt file is replaced rather than blocking every later save.
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create preferences directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string(&entries).context("Failed to serialize preferences")?;
        fs::write(&self.path, toml)
            .with_context(|| format!("Failed to write preferences: {}", self.path.display()))?;

        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn save(&self, key: &str, value: &str) {
        match self.write_entry(key, value) {
            Ok(()) => debug!(key, "preference saved"),
            Err(err) => warn!(key, error = %format!("{err:#}"), "failed to save preference"),
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut entries) => entries.remove(key),
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "failed to load preferences");
                None
            }
        }
    }
}

/// In-process preferences, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.save(key, value);
        store
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn save(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_last_city() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("prefs").join("preferences.toml"));

        assert_eq!(load_last_city(&store), None);

        save_last_city(&store, "Paris");
        assert_eq!(load_last_city(&store).as_deref(), Some("Paris"));

        save_last_city(&store, "Lyon");
        let reopened = FilePreferenceStore::new(store.path());
        assert_eq!(load_last_city(&reopened).as_deref(), Some("Lyon"));
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("preferences.toml"));

        store.save("theme", "dark");
        save_last_city(&store, "Rome");

        assert_eq!(store.load("theme").as_deref(), Some("dark"));
        assert_eq!(store.load(LAST_CITY_KEY).as_deref(), Some("Rome"));
    }

    #[test]
    fn corrupt_file_loads_as_empty_and_is_replaced_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let store = FilePreferenceStore::new(&path);
        assert_eq!(load_last_city(&store), None);

        save_last_city(&store, "Madrid");
        assert_eq!(load_last_city(&store).as_deref(), Some("Madrid"));
    }

    #[test]
    fn unwritable_location_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        // Parent "directory" is a regular file.
        let store = FilePreferenceStore::new(blocker.join("preferences.toml"));
        save_last_city(&store, "Berlin");
        assert_eq!(load_last_city(&store), None);
    }

    #[test]
    fn blank_saved_city_reads_as_absent() {
        let store = MemoryPreferenceStore::with_entry(LAST_CITY_KEY, "  ");
        assert_eq!(load_last_city(&store), None);
    }
}
