//! Persisted session-token storage.
//!
//! The token survives process restarts through a [`TokenStore`]; the
//! file-backed implementation keeps a single token string in a well-known
//! file, written on login/registration/refresh success and deleted on
//! refresh failure or logout.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

/// Storage slot for the persisted session token.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load(&self) -> io::Result<Option<String>>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn save(&self, token: &str) -> io::Result<()>;

    /// Delete the stored token; deleting an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be removed.
    fn clear(&self) -> io::Result<()>;
}

/// File-backed token slot.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// In-memory token slot for tests and embedders that manage persistence
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
