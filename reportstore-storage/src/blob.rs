//! External object storage for relocated attachment payloads

use bytes::Bytes;
use object_store::{memory::InMemory, parse_url_opts, path::Path, ObjectStore, PutPayload};
use reportstore_config::BlobStorageConfig;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::{context::OperationContext, StorageError, StorageResult};

/// Key of an object below the store root
///
/// Segments are kept unencoded and each one becomes a single path part, so a
/// `/` inside a segment is escaped rather than starting a new level. Two keys
/// with different segments never address the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    segments: Vec<String>,
}

impl ObjectKey {
    /// Build a key from its segments; empty segments are rejected
    pub fn new<I, S>(segments: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return Err(StorageError::Other(format!(
                "object key segments must not be empty: {:?}",
                segments
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn append_to(&self, base: &Path) -> Path {
        self.segments
            .iter()
            .fold(base.clone(), |path, segment| path.child(segment.as_str()))
    }
}

/// Renders the encoded relative path, e.g. `a%2Fb/c.pdf`
impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.append_to(&Path::default()))
    }
}

/// Object store rooted at a base path plus key prefix
#[derive(Debug, Clone)]
pub struct BlobStorage {
    object_store: Arc<dyn ObjectStore>,
    root: Path,
}

impl BlobStorage {
    /// Build the store described by the configuration
    pub fn from_config(config: &BlobStorageConfig) -> StorageResult<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| StorageError::Configuration(format!("invalid blob storage url {}: {}", config.url, e)))?;

        // AWS_* variables take priority over instance metadata credentials
        let options: Vec<(String, String)> = std::env::vars()
            .filter(|(key, _)| key.starts_with("AWS_"))
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();

        let (object_store, base) = parse_url_opts(&url, options)
            .map_err(|e| StorageError::Configuration(format!("unsupported blob storage url {}: {}", config.url, e)))?;

        log::info!("using blob store at {} with prefix {}", config.url, config.key_prefix);
        Ok(Self::new(Arc::from(object_store), join_prefix(&base, &config.key_prefix)))
    }

    /// Purely in-memory store, used by the in-memory database adapter
    pub fn in_memory(key_prefix: &str) -> Self {
        Self::new(Arc::new(InMemory::new()), join_prefix(&Path::default(), key_prefix))
    }

    pub fn new(object_store: Arc<dyn ObjectStore>, root: Path) -> Self {
        Self { object_store, root }
    }

    /// Full object path for a key
    pub fn location(&self, key: &ObjectKey) -> Path {
        key.append_to(&self.root)
    }

    /// Write `payload` under `key`, overwriting any previous object
    pub async fn put(&self, ctx: &OperationContext, key: &ObjectKey, payload: Bytes) -> StorageResult<Path> {
        let location = self.location(key);
        let size = payload.len();

        ctx.guard(async {
            self.object_store
                .put(&location, PutPayload::from(payload))
                .await
                .map_err(StorageError::from)
        })
        .await?;

        log::debug!("stored {} bytes at {}", size, location);
        Ok(location)
    }

    /// Read back the object stored under `key`
    pub async fn get(&self, ctx: &OperationContext, key: &ObjectKey) -> StorageResult<Bytes> {
        let location = self.location(key);
        ctx.guard(async {
            let result = self.object_store.get(&location).await?;
            Ok::<_, StorageError>(result.bytes().await?)
        })
        .await
    }
}

/// Append a slash-separated key prefix to a path, one level per segment
fn join_prefix(base: &Path, prefix: &str) -> Path {
    prefix.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(base.clone(), |path, segment| path.child(segment))
}
