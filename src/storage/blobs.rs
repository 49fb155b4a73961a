use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs::{File, OpenOptions};
use tracing::warn;

/// Flat directory of uploaded bytes, one file per upload id.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids are generated server-side (UUIDs); anything else never maps to a path.
    pub fn path_for(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| self.root.join(id))
    }

    /// Creates a new blob, failing if one already exists under `id`.
    pub async fn create(&self, id: &str) -> io::Result<File> {
        let path = self.path_for(id).ok_or_else(|| invalid_id(id))?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
    }

    pub async fn open(&self, id: &str) -> io::Result<File> {
        let path = self.path_for(id).ok_or_else(|| invalid_id(id))?;
        File::open(path).await
    }

    /// Removes a blob; a blob that is already gone is not an error.
    pub async fn remove(&self, id: &str) -> io::Result<()> {
        let path = self.path_for(id).ok_or_else(|| invalid_id(id))?;
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Like [`BlobStore::remove`] but only logs failures.
    pub async fn discard(&self, id: &str) {
        if let Err(e) = self.remove(id).await {
            warn!(id = %id, error = %e, "Failed to remove blob");
        }
    }
}

fn invalid_id(id: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("invalid blob id: {id:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ids_that_could_escape_the_root() {
        let store = BlobStore::new("/srv/data");
        assert!(store.path_for("../secret").is_none());
        assert!(store.path_for("a/b").is_none());
        assert!(store.path_for("").is_none());
        assert_eq!(
            store.path_for("6f1c-42"),
            Some(PathBuf::from("/srv/data/6f1c-42"))
        );
    }
}
