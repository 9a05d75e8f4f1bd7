//! Object storage contract (S3-style bucket + public URLs) and profile picture flows.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::media::{validate_files, FileCategory, MediaFile};
use crate::{ApiError, ApiResult, IdentityProvider, UpdateUserRequest, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self { Self { endpoint: "http://localhost:9000".into(), bucket: "tabula".into() } }
}

impl StorageConfig {
    /// Read `TABULA_S3_ENDPOINT` and `TABULA_S3_BUCKET` over the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("TABULA_S3_ENDPOINT") {
            let v = v.trim().trim_end_matches('/');
            if !v.is_empty() { cfg.endpoint = v.to_string(); }
        }
        if let Ok(v) = std::env::var("TABULA_S3_BUCKET") {
            if !v.trim().is_empty() { cfg.bucket = v.trim().to_string(); }
        }
        cfg
    }

    fn prefix(&self) -> String { format!("{}/{}/", self.endpoint, self.bucket) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub key: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub public_read: bool,
}

impl Upload {
    pub fn from_file(key: impl Into<String>, file: &MediaFile) -> Self {
        Self { key: key.into(), content_type: file.content_type.clone(), bytes: file.bytes.clone(), public_read: false }
    }
}

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store one object; returns its key.
    async fn upload(&self, upload: Upload) -> ApiResult<String>;

    /// Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> ApiResult<()>;

    fn public_url(&self, key: &str) -> String;

    /// Inverse of `public_url`; input without the bucket prefix is returned unchanged.
    fn key_from_public_url(&self, url: &str) -> String;
}

/// Upload concurrently; fails if any upload fails.
pub async fn upload_all<S: ObjectStore + ?Sized>(store: &S, uploads: Vec<Upload>) -> ApiResult<Vec<String>> {
    try_join_all(uploads.into_iter().map(|u| store.upload(u))).await
}

pub async fn delete_profile_picture<S: ObjectStore + ?Sized>(store: &S, image_url: &str) -> ApiResult<()> {
    store.delete(&[store.key_from_public_url(image_url)]).await
}

/// Replace the caller's profile picture. The object key is `<user id>_<file name>`;
/// a previous picture stored under a different URL is deleted first.
pub async fn change_profile_picture<P, S>(identity: &P, store: &S, token: &str, file: MediaFile) -> ApiResult<User>
where
    P: IdentityProvider + ?Sized,
    S: ObjectStore + ?Sized,
{
    validate_files(FileCategory::Image, std::slice::from_ref(&file))?;
    let session = identity
        .get_session(token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("no session".into()))?;
    let key = format!("{}_{}", session.user.id, file.name);
    let url = store.public_url(&key);
    if let Some(old) = session.user.image.as_deref().filter(|old| *old != url) {
        delete_profile_picture(store, old).await?;
    }
    let mut upload = Upload::from_file(key, &file);
    upload.public_read = true;
    store.upload(upload).await?;
    identity.update_user(token, UpdateUserRequest { name: None, image: Some(Some(url)) }).await
}

/// Delete the caller's profile picture (if any) and clear it on the account.
pub async fn remove_profile_picture<P, S>(identity: &P, store: &S, token: &str) -> ApiResult<User>
where
    P: IdentityProvider + ?Sized,
    S: ObjectStore + ?Sized,
{
    let session = identity
        .get_session(token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("no session".into()))?;
    if let Some(old) = session.user.image.as_deref() {
        delete_profile_picture(store, old).await?;
    }
    identity.update_user(token, UpdateUserRequest { name: None, image: Some(None) }).await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub public_read: bool,
}

/// Bucket kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    config: StorageConfig,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(config: StorageConfig) -> Self { Self { config, objects: RwLock::new(BTreeMap::new()) } }

    pub fn from_env() -> Self { Self::new(StorageConfig::from_env()) }

    pub fn config(&self) -> &StorageConfig { &self.config }

    pub async fn get(&self, key: &str) -> Option<StoredObject> { self.objects.read().await.get(key).cloned() }

    pub async fn keys(&self) -> Vec<String> { self.objects.read().await.keys().cloned().collect() }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, upload: Upload) -> ApiResult<String> {
        if upload.key.trim().is_empty() { return Err(ApiError::Validation("object key is empty".into())); }
        let size = upload.bytes.len();
        let obj = StoredObject { content_type: upload.content_type, bytes: upload.bytes, public_read: upload.public_read };
        self.objects.write().await.insert(upload.key.clone(), obj);
        metrics::counter!("storage_uploads_total", 1u64);
        info!(key = %upload.key, bytes = size, bucket = %self.config.bucket, "storage: uploaded");
        Ok(upload.key)
    }

    async fn delete(&self, keys: &[String]) -> ApiResult<()> {
        let mut objects = self.objects.write().await;
        let removed = keys.iter().filter(|k| objects.remove(k.as_str()).is_some()).count();
        metrics::counter!("storage_deletes_total", removed as u64);
        info!(requested = keys.len(), removed, "storage: deleted");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String { format!("{}{}", self.config.prefix(), key) }

    fn key_from_public_url(&self, url: &str) -> String { url.replacen(&self.config.prefix(), "", 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryObjectStore {
        InMemoryObjectStore::new(StorageConfig { endpoint: "https://s3.local".into(), bucket: "media".into() })
    }

    fn upload(key: &str) -> Upload {
        Upload { key: key.into(), content_type: "image/png".into(), bytes: vec![1, 2, 3], public_read: true }
    }

    #[test]
    fn public_urls_round_trip() {
        let s = store();
        let url = s.public_url("u1_avatar.png");
        assert_eq!(url, "https://s3.local/media/u1_avatar.png");
        assert_eq!(s.key_from_public_url(&url), "u1_avatar.png");
        assert_eq!(s.key_from_public_url("elsewhere.png"), "elsewhere.png");
    }

    #[tokio::test]
    async fn upload_all_then_delete() {
        let s = store();
        let keys = upload_all(&s, vec![upload("a"), upload("b")]).await.unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(s.get("a").await.unwrap().bytes, vec![1, 2, 3]);
        s.delete(&["a".into(), "missing".into()]).await.unwrap();
        assert_eq!(s.keys().await, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn upload_all_fails_as_a_whole() {
        let s = store();
        let err = upload_all(&s, vec![upload("ok"), upload(" ")]).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn profile_picture_is_deleted_by_url() {
        let s = store();
        s.upload(upload("u1_me.png")).await.unwrap();
        delete_profile_picture(&s, "https://s3.local/media/u1_me.png").await.unwrap();
        assert!(s.get("u1_me.png").await.is_none());
    }
}
