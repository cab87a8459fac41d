use std::path::PathBuf;

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use uuid::Uuid;

/// Where uploaded avatar images end up. Local disk in production; tests
/// swap in a fake so no filesystem is touched.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Writes `body` under a freshly generated name and returns that name.
    async fn save(&self, ext: &str, body: Bytes) -> anyhow::Result<String>;
}

pub struct LocalAvatarStore {
    dir: PathBuf,
}

impl LocalAvatarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AvatarStore for LocalAvatarStore {
    async fn save(&self, ext: &str, body: Bytes) -> anyhow::Result<String> {
        // Random name so concurrent uploads never clobber each other.
        let name = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let path = self.dir.join(&name);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("create upload dir")?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write avatar {}", path.display()))?;
        Ok(name)
    }
}

/// Maps an upload's content type to a stored file extension. Anything not on
/// the whitelist is rejected upstream as a validation error.
pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_whitelist() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("image/webp"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn save_generates_distinct_names() {
        let dir = std::env::temp_dir().join("askaway-avatar-test");
        let store = LocalAvatarStore::new(&dir);
        let a = store.save("png", Bytes::from_static(b"a")).await.unwrap();
        let b = store.save("png", Bytes::from_static(b"b")).await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
