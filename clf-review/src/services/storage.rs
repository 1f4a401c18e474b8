//! Object storage
//!
//! Blobs are UTF-8 text addressed by bucket + key. Listing follows the
//! paged, lexicographic semantics of an `s3 list-objects-v2` call: keys in
//! order, at most [`LIST_PAGE_SIZE`] per page, continuation by last key.

use async_trait::async_trait;
use clf_common::{Error, ObjectUri, Result};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use walkdir::WalkDir;

/// Keys returned per listing page
pub const LIST_PAGE_SIZE: usize = 10;

const TEMP_SUFFIX: &str = ".clf-tmp";

/// One page of a prefix listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Continuation token; `None` on the last page
    pub next_token: Option<String>,
}

/// Storage collaborator
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn write(&self, uri: &ObjectUri, content: &str) -> Result<()>;

    async fn read(&self, uri: &ObjectUri) -> Result<String>;

    /// One page of keys under `prefix`, strictly after `token`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage>;

    /// Retrieval URL handed to users
    async fn presign(&self, uri: &ObjectUri) -> Result<String>;

    /// Keys under `prefix` whose extension is in `allowed_extensions`
    ///
    /// At most `max_pages` pages are examined; extension matching is
    /// case-insensitive.
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        max_pages: usize,
        allowed_extensions: &[String],
    ) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut token: Option<String> = None;

        for page_number in 1..=max_pages {
            let page = self
                .list_page(bucket, prefix, token.as_deref(), LIST_PAGE_SIZE)
                .await?;

            files.extend(
                page.keys
                    .into_iter()
                    .filter(|key| has_allowed_extension(key, allowed_extensions)),
            );

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }

            if page_number == max_pages {
                tracing::warn!(bucket, prefix, max_pages, "Listing stopped at page limit");
            }
        }

        Ok(files)
    }
}

/// Extension of the key's last segment, without the dot
///
/// A leading dot alone (`.jpg`) is a hidden file name, not an extension.
pub fn file_extension(key: &str) -> Option<&str> {
    let name = key.rsplit('/').next().unwrap_or(key);
    match name.rfind('.') {
        Some(idx) if idx > 0 => Some(&name[idx + 1..]),
        _ => None,
    }
}

fn has_allowed_extension(key: &str, allowed_extensions: &[String]) -> bool {
    match file_extension(key) {
        Some(ext) => {
            let ext = ext.to_lowercase();
            allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext))
        }
        None => false,
    }
}

/// Slice one page out of a sorted key sequence
fn page_of<'a>(
    sorted_keys: impl Iterator<Item = &'a str>,
    prefix: &str,
    token: Option<&str>,
    max_keys: usize,
) -> ListPage {
    let mut keys: Vec<String> = sorted_keys
        .filter(|k| k.starts_with(prefix))
        .filter(|k| token.map_or(true, |t| *k > t))
        .take(max_keys + 1)
        .map(str::to_string)
        .collect();

    let next_token = if keys.len() > max_keys {
        keys.truncate(max_keys);
        keys.last().cloned()
    } else {
        None
    };

    ListPage { keys, next_token }
}

/// Filesystem-backed store: `<root>/<bucket>/<key>`
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains('/') || bucket == "." || bucket == ".." {
            return Err(Error::InvalidInput(format!("Invalid bucket name: {:?}", bucket)));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, uri: &ObjectUri) -> Result<PathBuf> {
        let key_path = Path::new(&uri.key);
        let escapes = key_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if uri.key.is_empty() || escapes {
            return Err(Error::InvalidInput(format!("Invalid object key: {}", uri)));
        }
        Ok(self.bucket_dir(&uri.bucket)?.join(key_path))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn write(&self, uri: &ObjectUri, content: &str) -> Result<()> {
        let path = self.object_path(uri)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Create directory for {} failed: {}", uri, e)))?;
        }

        let temp_path = path.with_file_name(format!("{}{}", uri.file_name(), TEMP_SUFFIX));
        {
            let mut file = fs::File::create(&temp_path)
                .await
                .map_err(|e| Error::Storage(format!("Write {} failed: {}", uri, e)))?;
            file.write_all(content.as_bytes()).await.map_err(|e| {
                let _ = std::fs::remove_file(&temp_path);
                Error::Storage(format!("Write {} failed: {}", uri, e))
            })?;
            file.sync_all().await.map_err(|e| {
                let _ = std::fs::remove_file(&temp_path);
                Error::Storage(format!("Sync {} failed: {}", uri, e))
            })?;
        }

        fs::rename(&temp_path, &path).await.map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            Error::Storage(format!("Rename into {} failed: {}", uri, e))
        })?;

        tracing::debug!(%uri, bytes = content.len(), "Object written");
        Ok(())
    }

    async fn read(&self, uri: &ObjectUri) -> Result<String> {
        let path = self.object_path(uri)?;
        fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::Storage(format!("Object not found: {}", uri)),
            _ => Error::Storage(format!("Read {} failed: {}", uri, e)),
        })
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let bucket_dir = self.bucket_dir(bucket)?;
        if !bucket_dir.is_dir() {
            return Err(Error::Storage(format!("Bucket not found: {}", bucket)));
        }

        let walk_root = bucket_dir.clone();
        let mut keys = tokio::task::spawn_blocking(move || collect_keys(&walk_root))
            .await
            .map_err(|e| Error::Internal(format!("Listing task failed: {}", e)))??;
        keys.sort();

        Ok(page_of(keys.iter().map(String::as_str), prefix, token, max_keys))
    }

    async fn presign(&self, uri: &ObjectUri) -> Result<String> {
        let path = self.object_path(uri)?;
        let absolute = fs::canonicalize(&path)
            .await
            .map_err(|e| Error::Storage(format!("Presign {} failed: {}", uri, e)))?;
        Ok(format!("file://{}", absolute.display()))
    }
}

/// Every object key below `bucket_dir`, `/`-separated
fn collect_keys(bucket_dir: &Path) -> Result<Vec<String>> {
    let mut keys = Vec::new();

    for entry in WalkDir::new(bucket_dir).follow_links(false) {
        let entry = entry.map_err(|e| Error::Storage(format!("Listing failed: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.ends_with(TEMP_SUFFIX) {
            continue;
        }

        if let Ok(relative) = entry.path().strip_prefix(bucket_dir) {
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
    }

    Ok(keys)
}

/// In-memory store for tests and dry runs
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored URI, sorted
    pub async fn uris(&self) -> Vec<ObjectUri> {
        self.objects
            .read()
            .await
            .keys()
            .map(|(bucket, key)| ObjectUri::new(bucket.as_str(), key.as_str()))
            .collect()
    }

    pub async fn contains(&self, uri: &ObjectUri) -> bool {
        self.objects
            .read()
            .await
            .contains_key(&(uri.bucket.clone(), uri.key.clone()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn write(&self, uri: &ObjectUri, content: &str) -> Result<()> {
        self.objects
            .write()
            .await
            .insert((uri.bucket.clone(), uri.key.clone()), content.to_string());
        Ok(())
    }

    async fn read(&self, uri: &ObjectUri) -> Result<String> {
        self.objects
            .read()
            .await
            .get(&(uri.bucket.clone(), uri.key.clone()))
            .cloned()
            .ok_or_else(|| Error::Storage(format!("Object not found: {}", uri)))
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let objects = self.objects.read().await;
        let keys = objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.as_str());
        Ok(page_of(keys, prefix, token, max_keys))
    }

    async fn presign(&self, uri: &ObjectUri) -> Result<String> {
        if !self.contains(uri).await {
            return Err(Error::Storage(format!("Object not found: {}", uri)));
        }
        Ok(format!("memory://{}/{}", uri.bucket, uri.key))
    }
}
