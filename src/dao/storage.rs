use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

/// Result alias for token storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// File name used by [`FileTokenStore`] inside its storage directory.
const STORAGE_FILE: &str = "session.json";

/// Error raised by durable token storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access token storage at `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed token storage at `{path}`")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable key/value storage for the session credential.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;
    fn set(&self, key: &str, token: &str) -> BoxFuture<'static, StorageResult<()>>;
    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>>;
}

/// JSON map persisted to `{dir}/session.json`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: Arc<Path>,
}

impl FileTokenStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: Arc::from(dir.as_ref().join(STORAGE_FILE)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(path: &Path) -> StorageResult<HashMap<String, String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| StorageError::Format {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(source) => Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn write_all(path: &Path, entries: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let contents = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Format {
            path: path.to_path_buf(),
            source,
        })?;

        tokio::fs::write(path, contents)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let path = self.path.clone();
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = Self::read_all(&path).await?;
            Ok(entries.remove(&key))
        })
    }

    fn set(&self, key: &str, token: &str) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let key = key.to_string();
        let token = token.to_string();
        Box::pin(async move {
            let mut entries = Self::read_all(&path).await?;
            entries.insert(key, token);
            Self::write_all(&path, &entries).await
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = Self::read_all(&path).await?;
            if entries.remove(&key).is_none() {
                debug!(key = %key, "no stored token to remove");
                return Ok(());
            }
            Self::write_all(&path, &entries).await
        })
    }
}

/// Process-local storage, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a token, as if persisted by an earlier run.
    pub fn with_token(self, key: &str, token: &str) -> Self {
        self.lock().insert(key.to_string(), token.to_string());
        self
    }

    /// Synchronous peek used by callers that only inspect state.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let token = self.peek(key);
        Box::pin(async move { Ok(token) })
    }

    fn set(&self, key: &str, token: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.lock().insert(key.to_string(), token.to_string());
        Box::pin(async { Ok(()) })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.lock().remove(key);
        Box::pin(async { Ok(()) })
    }
}
