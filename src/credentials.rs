use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = "torn_terminal";
const CONFIG_FILE: &str = "credentials.json";
const FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialName {
    Primary,
    Companion,
}

impl CredentialName {
    pub const ALL: [CredentialName; 2] = [CredentialName::Primary, CredentialName::Companion];

    pub fn storage_key(self) -> &'static str {
        match self {
            CredentialName::Primary => "torn_api_key",
            CredentialName::Companion => "ffscouter_api_key",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CredentialName::Primary => "Torn API key",
            CredentialName::Companion => "FFScouter API key",
        }
    }

    fn env_key(self) -> &'static str {
        match self {
            CredentialName::Primary => "TORN_API_KEY",
            CredentialName::Companion => "FFSCOUTER_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CredentialFile {
    version: u32,
    entries: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Inner {
    path: Option<PathBuf>,
    persisted: HashMap<String, String>,
    fields: HashMap<CredentialName, String>,
}

/// The two API keys: a persisted copy plus the live settings field for each.
///
/// Clones share the same storage, so the worker thread always reads what the
/// settings form currently holds.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<Mutex<Inner>>,
}

impl CredentialStore {
    /// Config-dir storage, with empty fields seeded from `TORN_API_KEY` / `FFSCOUTER_API_KEY`.
    pub fn open_default() -> Self {
        let store = match config_path() {
            Some(path) => Self::at_path(path),
            None => Self::in_memory(),
        };
        store.seed_from_env();
        store
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let persisted = load_file(&path)
            .filter(|file| file.version == FILE_VERSION)
            .map(|file| file.entries)
            .unwrap_or_default();
        Self::build(Some(path), persisted)
    }

    pub fn in_memory() -> Self {
        Self::build(None, HashMap::new())
    }

    fn build(path: Option<PathBuf>, persisted: HashMap<String, String>) -> Self {
        let mut fields = HashMap::new();
        for name in CredentialName::ALL {
            let seed = persisted.get(name.storage_key()).cloned().unwrap_or_default();
            fields.insert(name, seed.trim().to_string());
        }
        Self {
            inner: Arc::new(Mutex::new(Inner {
                path,
                persisted,
                fields,
            })),
        }
    }

    fn seed_from_env(&self) {
        let mut inner = self.lock();
        for name in CredentialName::ALL {
            let empty = inner.fields.get(&name).is_none_or(|f| f.trim().is_empty());
            if let (true, Ok(value)) = (empty, env::var(name.env_key())) {
                inner.fields.insert(name, value.trim().to_string());
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Live field first, then storage.
    pub fn get(&self, name: CredentialName) -> Option<String> {
        let inner = self.lock();
        let field = inner
            .fields
            .get(&name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        field
            .or_else(|| {
                inner
                    .persisted
                    .get(name.storage_key())
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
            })
            .map(str::to_string)
    }

    pub fn is_configured(&self, name: CredentialName) -> bool {
        self.get(name).is_some()
    }

    pub fn field(&self, name: CredentialName) -> String {
        self.lock().fields.get(&name).cloned().unwrap_or_default()
    }

    pub fn set_field(&self, name: CredentialName, value: &str) {
        self.lock().fields.insert(name, value.to_string());
    }

    /// Persist `value`; an empty value removes the entry.
    pub fn set(&self, name: CredentialName, value: &str) -> Result<()> {
        let mut inner = self.lock();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            inner.persisted.remove(name.storage_key());
        } else {
            inner
                .persisted
                .insert(name.storage_key().to_string(), trimmed.to_string());
        }
        inner.fields.insert(name, trimmed.to_string());

        let Some(path) = inner.path.clone() else {
            return Ok(());
        };
        save_file(
            &path,
            &CredentialFile {
                version: FILE_VERSION,
                entries: inner.persisted.clone(),
            },
        )
    }

    pub fn stored(&self, name: CredentialName) -> Option<String> {
        self.lock().persisted.get(name.storage_key()).cloned()
    }
}

fn load_file(path: &Path) -> Option<CredentialFile> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<CredentialFile>(&raw).ok()
}

fn save_file(path: &Path, file: &CredentialFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(file).context("failed to encode credentials")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn config_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CONFIG_DIR).join(CONFIG_FILE));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(CONFIG_FILE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_field_wins_over_storage() {
        let store = CredentialStore::in_memory();
        store.set(CredentialName::Primary, "stored-key").unwrap();
        store.set_field(CredentialName::Primary, "  typed-key ");
        assert_eq!(store.get(CredentialName::Primary).as_deref(), Some("typed-key"));

        store.set_field(CredentialName::Primary, "   ");
        assert_eq!(store.get(CredentialName::Primary).as_deref(), Some("stored-key"));
    }

    #[test]
    fn empty_set_clears_entry() {
        let store = CredentialStore::in_memory();
        store.set(CredentialName::Companion, "abc").unwrap();
        store.set(CredentialName::Companion, "").unwrap();
        assert_eq!(store.stored(CredentialName::Companion), None);
        assert_eq!(store.get(CredentialName::Companion), None);
    }

    #[test]
    fn clones_share_state() {
        let store = CredentialStore::in_memory();
        let worker = store.clone();
        store.set_field(CredentialName::Companion, "xyz");
        assert!(worker.is_configured(CredentialName::Companion));
    }
}
