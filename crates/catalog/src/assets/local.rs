//! Local filesystem backend.
//!
//! Objects are written to `<root>/<key>`; the storefront serves `<root>`
//! under `/<bucket>` so locators look like
//! `<public_base_url>/<bucket>/products/<file>`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use reve_essence_core::{ImageLocator, ObjectStore, ObjectStoreError, StorageKey};

/// Object store that keeps files in a directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    bucket: String,
}

impl LocalObjectStore {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: &str,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
            bucket: bucket.into(),
        }
    }

    /// Directory the objects are stored in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path inside the root, refusing anything that
    /// would escape it.
    fn path_for(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(ObjectStoreError(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(context: &str, err: &std::io::Error) -> ObjectStoreError {
    ObjectStoreError(format!("{context}: {err}"))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &StorageKey,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.path_for(key.as_str())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("failed to create directory", &e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| io_error("failed to write object", &e))
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ObjectStoreError> {
        let path = self.path_for(key.as_str())?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("failed to remove object", &e)),
        }
    }

    fn public_url(&self, key: &StorageKey) -> ImageLocator {
        ImageLocator::new(format!("{}/{}/{key}", self.public_base_url, self.bucket))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StorageKey>, ObjectStoreError> {
        let (folder, partial) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let dir = if folder.is_empty() {
            self.root.clone()
        } else {
            self.path_for(folder)?
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("failed to list directory", &e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("failed to list directory", &e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| io_error("failed to stat object", &e))?
                .is_file();
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_file || !name.starts_with(partial) {
                continue;
            }
            keys.push(if folder.is_empty() {
                StorageKey::new(name)
            } else {
                StorageKey::new(format!("{folder}/{name}"))
            });
        }

        keys.sort();
        Ok(keys)
    }
}
