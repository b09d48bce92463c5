#![allow(missing_docs)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{MinioError, Result};
use crate::store::{ObjectStore, StoredObject};

#[derive(Debug, Clone)]
struct FakeObject {
    data: Bytes,
    content_type: String,
}

/// In-memory [`ObjectStore`] for tests.
///
/// Buckets must be created before objects can be written to them, mirroring a
/// real server. Backend failures and short reads can be injected.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    buckets: Arc<Mutex<HashMap<String, String>>>,
    objects: Arc<Mutex<BTreeMap<(String, String), FakeObject>>>,
    fail_all: Arc<Mutex<Option<String>>>,
    short_reads: Arc<Mutex<HashSet<(String, String)>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with `bucket` already created.
    pub async fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store
            .buckets
            .lock()
            .await
            .insert(bucket.to_string(), String::new());
        store
    }

    /// Every following call fails with a backend error carrying `message`.
    pub async fn fake_fail(&self, message: &str) {
        *self.fail_all.lock().await = Some(message.to_string());
    }

    /// Reads of this object report one byte more than the body holds.
    pub async fn fake_short_read(&self, bucket: &str, key: &str) {
        self.short_reads
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()));
    }

    /// Stored body and content type of an object.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<(Bytes, String)> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| (o.data.clone(), o.content_type.clone()))
    }

    /// Region a bucket was created with.
    pub async fn bucket_region(&self, bucket: &str) -> Option<String> {
        self.buckets.lock().await.get(bucket).cloned()
    }

    async fn check_failure(&self) -> Result<()> {
        match self.fail_all.lock().await.as_ref() {
            Some(message) => Err(MinioError::backend(message)),
            None => Ok(()),
        }
    }

    async fn require_bucket(&self, bucket: &str) -> Result<()> {
        if self.buckets.lock().await.contains_key(bucket) {
            Ok(())
        } else {
            Err(MinioError::backend(format!(
                "NoSuchBucket: The specified bucket does not exist: {}",
                bucket
            )))
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.check_failure().await?;
        Ok(self.buckets.lock().await.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        self.check_failure().await?;
        let mut buckets = self.buckets.lock().await;
        if buckets.contains_key(bucket) {
            return Err(MinioError::backend(format!(
                "BucketAlreadyOwnedByYou: {}",
                bucket
            )));
        }
        buckets.insert(bucket.to_string(), region.to_string());
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        self.check_failure().await?;
        self.require_bucket(bucket).await?;

        let id = (bucket.to_string(), key.to_string());
        let object = self.objects.lock().await.get(&id).cloned().ok_or_else(|| {
            MinioError::backend(format!("NoSuchKey: The specified key does not exist: {}", key))
        })?;

        let mut declared_size = object.data.len() as u64;
        if self.short_reads.lock().await.contains(&id) {
            declared_size += 1;
        }

        Ok(StoredObject {
            data: object.data,
            declared_size: Some(declared_size),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<u64> {
        self.check_failure().await?;
        self.require_bucket(bucket).await?;

        let size = data.len() as u64;
        self.objects.lock().await.insert(
            (bucket.to_string(), key.to_string()),
            FakeObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(size)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.check_failure().await?;
        self.require_bucket(bucket).await?;

        // Deleting a missing key succeeds, as it does on S3.
        self.objects
            .lock()
            .await
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
