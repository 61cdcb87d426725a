//! Persisted current user, read once at startup and rewritten on every change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::models::User;

/// File name of the single persisted slot (`@auth_user` on the device).
pub const STORAGE_FILE: &str = "auth_user.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("stored user is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub trait UserStorage: Send + Sync {
    fn load(&self) -> Result<Option<User>, StorageError>;

    /// `None` removes the stored entry.
    fn save(&self, user: Option<&User>) -> Result<(), StorageError>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/auth_user.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STORAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UserStorage for FileStorage {
    fn load(&self) -> Result<Option<User>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, user: Option<&User>) -> Result<(), StorageError> {
        let Some(user) = user else {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(user)?)?;

        // Файл содержит токен
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        tracing::debug!("Stored user {} in {:?}", user.username, self.path);
        Ok(())
    }
}

/// In-process slot holding the serialized user.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with raw text, e.g. to model a corrupt entry.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl UserStorage for MemoryStorage {
    fn load(&self) -> Result<Option<User>, StorageError> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, user: Option<&User>) -> Result<(), StorageError> {
        let raw = user.map(serde_json::to_string).transpose()?;
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "storage lock poisoned"))?;
        *slot = raw;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn jake() -> User {
        User {
            email: "jake@jake.jake".into(),
            token: "jwt.token.here".into(),
            username: "jake".into(),
            bio: Some("I work at statefarm".into()),
            image: None,
        }
    }

    #[test]
    fn file_storage_saves_and_removes() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::in_dir(dir.path().join("nested"));

        assert!(storage.load().unwrap().is_none());

        storage.save(Some(&jake())).unwrap();
        assert_eq!(storage.load().unwrap(), Some(jake()));

        storage.save(None).unwrap();
        assert!(!storage.path().exists());
        assert!(storage.load().unwrap().is_none());

        // removing twice is fine
        storage.save(None).unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::in_dir(dir.path());
        fs::write(storage.path(), "{not json").unwrap();

        assert!(matches!(storage.load(), Err(StorageError::Corrupt(_))));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = FileStorage::in_dir(dir.path());
        storage.save(Some(&jake())).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_storage_models_corruption() {
        let storage = MemoryStorage::with_raw("garbage");
        assert!(storage.load().is_err());

        storage.save(Some(&jake())).unwrap();
        assert_eq!(storage.load().unwrap(), Some(jake()));

        storage.save(None).unwrap();
        assert!(storage.raw().is_none());
    }
}
