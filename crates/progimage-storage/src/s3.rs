use crate::object;
use crate::traits::{ByteStream, ObjectInfo, ObjectReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use std::sync::Arc;

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible service.
#[derive(Clone, Debug, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (e.g. "http://localhost:9000" for MinIO)
    pub endpoint_url: Option<String>,
    /// Static credentials; `None` defers to the standard AWS environment/provider chain
    pub credentials: Option<(String, String)>,
}

/// S3 storage implementation
///
/// Object traffic goes through `object_store`; bucket administration, which
/// `object_store` does not cover, goes through the AWS SDK client.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    admin: aws_sdk_s3::Client,
    bucket: String,
    region: String,
}

impl S3Storage {
    pub async fn new(settings: S3Settings) -> StorageResult<Self> {
        let S3Settings {
            bucket,
            region,
            endpoint_url,
            credentials,
        } = settings;

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_virtual_hosted_style_request(false);

        if let Some((ref key_id, ref secret)) = credentials {
            builder = builder
                .with_access_key_id(key_id.clone())
                .with_secret_access_key(secret.clone());
        }

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;
        let mut admin_config = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
        if let Some(ref endpoint) = endpoint_url {
            admin_config = admin_config.endpoint_url(endpoint.clone());
        }
        if let Some((key_id, secret)) = credentials {
            admin_config = admin_config.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "progimage-config",
            ));
        }

        tracing::info!(
            bucket = %bucket,
            region = %region,
            endpoint = ?endpoint_url,
            "S3 storage configured"
        );

        Ok(S3Storage {
            store: Arc::new(store),
            admin: aws_sdk_s3::Client::from_conf(admin_config.build()),
            bucket,
            region,
        })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn bucket_exists(&self) -> StorageResult<bool> {
        match self.admin.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::BackendError(service_err.to_string()))
                }
            }
        }
    }

    async fn make_bucket(&self) -> StorageResult<()> {
        let mut request = self.admin.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, "S3 bucket created");
                Ok(())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_bucket_already_owned_by_you() {
                    Ok(())
                } else {
                    Err(StorageError::BackendError(service_err.to_string()))
                }
            }
        }
    }

    async fn put_object(
        &self,
        key: &str,
        reader: ObjectReader,
        size: Option<u64>,
        content_type: &str,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();

        let written = object::put_stream(&self.store, key, reader, content_type)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_hint = ?size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<ByteStream> {
        object::get_stream(&self.store, key).await
    }

    async fn stat_object(&self, key: &str) -> StorageResult<ObjectInfo> {
        object::stat(&self.store, key).await
    }

    async fn remove_object(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        object::remove(&self.store, key).await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
