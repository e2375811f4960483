use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use color_eyre::Result;
use color_eyre::eyre::Context;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use uuid::Uuid;

/// A file persisted on durable storage, owned by the record it is attached
/// to. Removed only through record deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    /// File name as submitted on the form.
    pub name: String,
    path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn open(&self) -> std::io::Result<File> {
        File::open(&self.path).await
    }
}

/// Upload storage rooted at one directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.wrap_err_with(|| {
            format!(
                "Failed to create upload directory: {}",
                root.to_string_lossy()
            )
        })?;

        Ok(Self { root })
    }

    /// Persists uploaded bytes under a collision-free disk name.
    pub async fn store(&self, name: &str, contents: &[u8]) -> Result<StoredFile> {
        let base = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let path = self.root.join(format!("{}_{}", Uuid::new_v4(), base));
        fs::write(&path, contents)
            .await
            .wrap_err_with(|| format!("Failed to write upload: {}", path.to_string_lossy()))?;

        Ok(StoredFile {
            name: name.to_string(),
            path,
            uploaded_at: Utc::now(),
        })
    }

    pub async fn remove(&self, file: &StoredFile) -> Result<()> {
        fs::remove_file(&file.path)
            .await
            .wrap_err_with(|| format!("Failed to remove upload: {}", file.path.to_string_lossy()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("uploads")).await.unwrap();

        let file = store.store("items.csv", b"a,b\n1,2\n").await.unwrap();
        assert_eq!(file.name, "items.csv");

        let contents = fs::read(file.path()).await.unwrap();
        assert_eq!(contents, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn distinct_disk_names_for_same_upload_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("uploads")).await.unwrap();

        let first = store.store("items.csv", b"a\n1\n").await.unwrap();
        let second = store.store("items.csv", b"a\n2\n").await.unwrap();

        assert_ne!(first.path(), second.path());
    }

    #[tokio::test]
    async fn remove_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("uploads")).await.unwrap();

        let file = store.store("items.csv", b"a\n1\n").await.unwrap();
        store.remove(&file).await.unwrap();

        assert!(!file.path().exists());
    }

    #[test]
    fn stored_file_round_trips_through_serde() {
        let file = StoredFile {
            name: "items.csv".to_string(),
            path: PathBuf::from("/var/lib/app/uploads/abc_items.csv"),
            uploaded_at: Utc::now(),
        };

        let raw = toml::to_string(&file).unwrap();
        let parsed: StoredFile = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, file);
    }
}
