//! Content store boundary
//!
//! The rest of the service only sees [`ContentStore`]: bytes in, CID out,
//! and the reverse. Replication, chunking and peer discovery are the
//! backend's own business. The default backend is [`LocalStore`], a
//! content-addressed object directory where the CID is the SHA-256 of the
//! stored bytes.
//!
//! This layer never retries; a failure aborts ingestion of the one file and
//! is reported to the uploader.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Narrow boundary into the content-addressable backend.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Persist `bytes`, returning a content identifier deterministically
    /// derived from them (same bytes, same CID).
    async fn store(&self, bytes: &[u8]) -> Result<String>;

    /// Fetch the bytes previously stored under `cid`.
    async fn retrieve(&self, cid: &str) -> Result<Vec<u8>>;
}

/// Compute the CID for a byte slice: lowercase hex SHA-256.
pub fn cid_for(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Local filesystem backend.
///
/// Objects live at `objects/<first-2-hex>/<cid>` under the data directory.
/// Writes are atomic (temp file then rename) and idempotent: an existing
/// object is authoritative and a second put of the same CID is a no-op.
#[derive(Clone, Debug)]
pub struct LocalStore {
    objects_dir: PathBuf,
}

impl LocalStore {
    /// Open the store rooted at `data_dir`, creating `objects/` if missing.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let objects_dir = data_dir.as_ref().join("objects");
        tokio::fs::create_dir_all(&objects_dir)
            .await
            .map_err(Error::StoreUnavailable)?;
        Ok(Self { objects_dir })
    }

    /// Erase all stored objects and start fresh. Called once at process
    /// start, together with the ledger reset.
    pub async fn reset(&self) -> Result<()> {
        if self.objects_dir.exists() {
            tokio::fs::remove_dir_all(&self.objects_dir)
                .await
                .map_err(Error::StoreWriteFailed)?;
        }
        tokio::fs::create_dir_all(&self.objects_dir)
            .await
            .map_err(Error::StoreUnavailable)?;
        Ok(())
    }

    fn object_path(&self, cid: &str) -> Option<PathBuf> {
        // A CID is exactly 64 lowercase hex chars; anything else (including
        // path traversal attempts) does not resolve.
        if cid.len() != 64 || !cid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(self.objects_dir.join(&cid[0..2]).join(cid))
    }

    async fn atomic_write(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        let parent = dest.parent().expect("object path always has a parent");
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(Error::StoreWriteFailed)?;

        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let tmp = dest.with_extension(format!("tmp.{ts}"));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(Error::StoreWriteFailed)?;
        tokio::fs::rename(&tmp, dest)
            .await
            .map_err(Error::StoreWriteFailed)?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    async fn store(&self, bytes: &[u8]) -> Result<String> {
        let cid = cid_for(bytes);
        let path = self
            .object_path(&cid)
            .expect("freshly computed cid is valid hex");

        if !path.exists() {
            self.atomic_write(&path, bytes).await?;
        }
        Ok(cid)
    }

    async fn retrieve(&self, cid: &str) -> Result<Vec<u8>> {
        let path = self
            .object_path(cid)
            .ok_or_else(|| Error::NotRetrievable(cid.to_string()))?;
        tokio::fs::read(&path)
            .await
            .map_err(|_| Error::NotRetrievable(cid.to_string()))
    }
}
