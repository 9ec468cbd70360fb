/// Durable key/value storage for client-side state (the persisted session record)
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String values stored under string keys. Implementations must be usable from several threads;
/// all operations are synchronous.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a key that does not exist is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Stores each key as a `<key>.json` file in a state directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    /// `$LECTERN_STATE_DIR`, else `$HOME/.lectern`, else `./.lectern`
    pub fn default_dir() -> PathBuf {
        match std::env::var("LECTERN_STATE_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => match std::env::var("HOME") {
                Ok(home) if !home.is_empty() => Path::new(&home).join(".lectern"),
                _ => PathBuf::from(".lectern"),
            },
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(anyhow!("invalid storage key: {:?}", key));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // the session record holds a bearer token: owner-only from creation on
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;
        // an existing file keeps its old mode through open, so tighten it before writing
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage; contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Default::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[test]
fn test_memory_storage() {
    let store = MemoryStorage::new();
    assert_eq!(store.get("auth").unwrap(), None);
    store.set("auth", "{}").unwrap();
    assert_eq!(store.get("auth").unwrap().as_deref(), Some("{}"));
    store.remove("auth").unwrap();
    store.remove("auth").unwrap();
    assert_eq!(store.get("auth").unwrap(), None);
}

#[test]
fn test_file_storage() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStorage::new(tmp.path().join("state"));
    assert_eq!(store.get("auth").unwrap(), None);
    store.remove("auth").unwrap();

    store.set("auth", r#"{"token":"abc123"}"#).unwrap();
    assert!(tmp.path().join("state/auth.json").exists());
    assert_eq!(
        store.get("auth").unwrap().as_deref(),
        Some(r#"{"token":"abc123"}"#)
    );

    // a second handle on the same directory sees the same contents
    let other = FileStorage::new(store.dir());
    assert!(other.get("auth").unwrap().is_some());

    store.remove("auth").unwrap();
    assert_eq!(other.get("auth").unwrap(), None);

    assert!(store.get("../escape").is_err());
    assert!(store.set("", "x").is_err());
}

#[cfg(unix)]
#[test]
fn test_file_storage_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStorage::new(tmp.path());
    let path = tmp.path().join("auth.json");

    store.set("auth", r#"{"token":"abc123"}"#).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    // a world-readable leftover is tightened on the next write
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    store.set("auth", r#"{"token":"def456"}"#).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(
        store.get("auth").unwrap().as_deref(),
        Some(r#"{"token":"def456"}"#)
    );
}
