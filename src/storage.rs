use std::path::PathBuf;

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

/// Where uploaded ad images live. Local disk in production; faked in tests.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete(&self, filename: &str) -> anyhow::Result<()>;
    /// Path the file is served back under (see the /uploads static route).
    fn public_url(&self, filename: &str) -> String;
}

#[derive(Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, filename: &str, body: Bytes) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create upload dir {}", self.root.display()))?;
        let path = self.root.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write upload {}", path.display()))?;
        Ok(())
    }

    async fn delete(&self, filename: &str) -> anyhow::Result<()> {
        let path = self.root.join(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove upload {}", path.display())),
        }
    }

    fn public_url(&self, filename: &str) -> String {
        format!("/uploads/{}", filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store() -> LocalImageStore {
        let dir = std::env::temp_dir().join(format!("foodboard-test-{}", uuid::Uuid::new_v4()));
        LocalImageStore::new(dir)
    }

    #[test]
    fn public_url_is_under_uploads() {
        let store = scratch_store();
        assert_eq!(store.public_url("pie.jpg"), "/uploads/pie.jpg");
    }

    #[tokio::test]
    async fn save_then_delete_roundtrip() {
        let store = scratch_store();
        store
            .save("a.png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();
        let on_disk = store.root.join("a.png");
        assert!(on_disk.exists());
        store.delete("a.png").await.unwrap();
        assert!(!on_disk.exists());
        tokio::fs::remove_dir_all(&store.root).await.ok();
    }

    #[tokio::test]
    async fn delete_of_missing_file_is_ok() {
        let store = scratch_store();
        assert!(store.delete("never-saved.jpg").await.is_ok());
    }
}
