//! MinIO/S3-compatible blob storage
//!
//! Uses rust-s3 for object operations and a hand-signed request for the bucket
//! policy that makes the upload prefix publicly readable.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use tracing::{debug, info, warn};

use super::sigv4::SigV4Signer;
use super::BlobStorage;
use crate::core::config::MinIOConfig;
use crate::core::error::{AppError, Result};

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    upload_prefix: String,
    access_key: String,
    secret_key: String,
    region_name: String,
    /// HTTP client for bucket policy operations
    http_client: Client,
}

impl MinIOClient {
    pub fn new(config: MinIOConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint,
            upload_prefix: config.upload_prefix,
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        })
    }

    /// Create the bucket if needed and open the upload prefix for anonymous reads.
    /// Neither step fails start-up: both can be done by hand by an operator.
    pub async fn prepare(&self) -> Result<()> {
        self.ensure_bucket_exists().await;
        self.set_public_read_policy().await;
        info!(
            "MinIO storage ready: endpoint={}, bucket={}, upload_prefix={}",
            self.endpoint,
            self.bucket.name(),
            self.upload_prefix
        );
        Ok(())
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    async fn ensure_bucket_exists(&self) {
        let created = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match created {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    async fn set_public_read_policy(&self) {
        let bucket_name = self.bucket.name();
        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": "*"},
                    "Action": ["s3:GetObject"],
                    "Resource": [format!("arn:aws:s3:::{}/{}/*", bucket_name, self.upload_prefix)]
                }
            ]
        })
        .to_string();

        match self.put_bucket_policy(&bucket_name, &policy).await {
            Ok(()) => info!(
                "Set public read policy for {}/{}/*",
                bucket_name, self.upload_prefix
            ),
            Err(e) => warn!(
                "Failed to set bucket policy for '{}': {}. \
                Set it manually with: mc anonymous set download minio/{}/{}",
                bucket_name, e, bucket_name, self.upload_prefix
            ),
        }
    }

    async fn put_bucket_policy(&self, bucket_name: &str, policy: &str) -> Result<()> {
        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| AppError::Internal("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let signer = SigV4Signer {
            access_key: &self.access_key,
            secret_key: &self.secret_key,
            region: &self.region_name,
            service: "s3",
        };
        let signed = signer.sign(
            "PUT",
            &host_header,
            &format!("/{}", bucket_name),
            "policy=",
            policy.as_bytes(),
            Utc::now(),
        )?;

        let response = self
            .http_client
            .put(format!("{}/{}?policy", self.endpoint, bucket_name))
            .header("Host", &host_header)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("Authorization", &signed.authorization)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to send policy request: {}", e))
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::ExternalServiceError(format!(
                "Failed to set bucket policy: {} - {}",
                status, body
            )))
        }
    }

    /// Public URL of an object under this client's bucket
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }
}

/// rust-s3 reports a missing object either as a 404 status or as an error,
/// depending on whether `fail-on-err` is enabled
fn is_missing_object(error: &S3Error) -> bool {
    let error_str = error.to_string();
    error_str.contains("404") || error_str.contains("NoSuchKey")
}

#[async_trait]
impl BlobStorage for MinIOClient {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to upload blob '{}': {}", key, e))
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::ExternalServiceError(format!(
                "Failed to upload blob '{}': status {}",
                key, status
            )));
        }

        debug!(
            "Uploaded blob '{}' ({} bytes) to bucket '{}'",
            key,
            data.len(),
            self.bucket.name()
        );
        Ok(self.object_url(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.bucket.get_object(key).await {
            Ok(response) if response.status_code() == 404 => Ok(None),
            Ok(response) if (200..300).contains(&response.status_code()) => {
                Ok(Some(response.to_vec()))
            }
            Ok(response) => Err(AppError::ExternalServiceError(format!(
                "Failed to download blob '{}': status {}",
                key,
                response.status_code()
            ))),
            Err(e) if is_missing_object(&e) => Ok(None),
            Err(e) => Err(AppError::ExternalServiceError(format!(
                "Failed to download blob '{}': {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.bucket.delete_object(key).await {
            Ok(response) if response.status_code() == 404 => {
                debug!("Blob '{}' already absent", key);
                Ok(())
            }
            Ok(response) if (200..300).contains(&response.status_code()) => {
                debug!(
                    "Deleted blob '{}' from bucket '{}'",
                    key,
                    self.bucket.name()
                );
                Ok(())
            }
            Ok(response) => Err(AppError::ExternalServiceError(format!(
                "Failed to delete blob '{}': status {}",
                key,
                response.status_code()
            ))),
            Err(e) if is_missing_object(&e) => {
                debug!("Blob '{}' already absent", key);
                Ok(())
            }
            Err(e) => Err(AppError::ExternalServiceError(format!(
                "Failed to delete blob '{}': {}",
                key, e
            ))),
        }
    }
}
