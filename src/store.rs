#![allow(missing_docs)]

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Settings, DEFAULT_REGION};
use crate::error::{MinioError, Result};
use crate::tls;

/// Object body together with the length the server declared for it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub declared_size: Option<u64>,
}

/// Bucket and object operations the activity needs from a storage backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Creates `bucket`; an empty `region` leaves the location to the server.
    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject>;

    /// Stores `data` and returns the number of bytes written.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<u64>;

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        (**self).bucket_exists(bucket).await
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        (**self).make_bucket(bucket, region).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        (**self).get_object(bucket, key).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<u64> {
        (**self).put_object(bucket, key, data, content_type).await
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        (**self).remove_object(bucket, key).await
    }
}

/// [`ObjectStore`] backed by the AWS S3 SDK, pointed at a MinIO endpoint.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let endpoint = settings.endpoint_url()?;
        info!("Creating MinIO client for endpoint: {}", endpoint);

        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "elizaos-minio",
        );

        let mut s3_config = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region_or_default().to_string()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .force_path_style(true);

        if let Some(ssl) = settings
            .ssl_config
            .as_ref()
            .filter(|_| settings.uses_custom_transport())
        {
            debug!("Installing custom TLS transport with CA file: {}", ssl.ca_file);
            let http_client = HyperClientBuilder::new()
                .hyper_builder(tls::pool_builder(ssl))
                .build(tls::https_connector(ssl)?);
            s3_config = s3_config.http_client(http_client);
        }

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        debug!("Checking if bucket exists: {}", bucket);

        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(MinioError::backend(DisplayErrorContext(&service_error)))
                }
            }
        }
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        debug!("Creating bucket: {} (region: {:?})", bucket, region);

        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 is the implicit location and must not be sent as a constraint.
        if !region.is_empty() && region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| MinioError::backend(DisplayErrorContext(&e)))?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        debug!("Downloading object: {}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MinioError::backend(DisplayErrorContext(&e)))?;

        let declared_size = response
            .content_length()
            .and_then(|len| u64::try_from(len).ok());

        let data = response
            .body
            .collect()
            .await
            .map_err(MinioError::backend)?
            .into_bytes();

        Ok(StoredObject {
            data,
            declared_size,
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<u64> {
        debug!("Uploading {} bytes as: {}/{}", data.len(), bucket, key);

        let size = data.len() as u64;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size as i64)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| MinioError::backend(DisplayErrorContext(&e)))?;

        Ok(size)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        debug!("Deleting object: {}/{}", bucket, key);

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MinioError::backend(DisplayErrorContext(&e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;

    #[tokio::test]
    async fn test_client_builds_without_network() {
        let settings = Settings::new(
            "localhost:9000",
            "minioadmin",
            "minioadmin",
            "flogo",
            Method::BucketExists,
        );
        assert!(S3ObjectStore::new(&settings).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_config_error() {
        let settings = Settings::new("http://", "ak", "sk", "flogo", Method::BucketExists);
        assert!(matches!(
            S3ObjectStore::new(&settings).await.err(),
            Some(MinioError::Config(_))
        ));
    }
}
