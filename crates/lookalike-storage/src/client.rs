//! R2 client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{join_public_url, BlobStore};

/// Configuration for R2 client.
#[derive(Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Base URL objects are publicly served from
    pub public_url: String,
    /// Region (usually "auto" for R2)
    pub region: String,
}

impl std::fmt::Debug for R2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket_name", &self.bucket_name)
            .field("public_url", &self.public_url)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl R2Config {
    /// Create config from environment variables.
    ///
    /// The endpoint is derived from `CLOUDFLARE_ACCOUNT_ID` unless
    /// `R2_ENDPOINT_URL` overrides it.
    pub fn from_env() -> StorageResult<Self> {
        let endpoint_url = match std::env::var("R2_ENDPOINT_URL") {
            Ok(url) => url,
            Err(_) => {
                let account_id = std::env::var("CLOUDFLARE_ACCOUNT_ID").map_err(|_| {
                    StorageError::config_error("CLOUDFLARE_ACCOUNT_ID not set")
                })?;
                endpoint_for_account(&account_id)
            }
        };

        Ok(Self {
            endpoint_url,
            access_key_id: std::env::var("CLOUDFLARE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("CLOUDFLARE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("CLOUDFLARE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("CLOUDFLARE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("CLOUDFLARE_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("CLOUDFLARE_BUCKET_NAME not set"))?,
            public_url: std::env::var("CLOUDFLARE_PUBLIC_URL")
                .map_err(|_| StorageError::config_error("CLOUDFLARE_PUBLIC_URL not set"))?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// S3 API endpoint of an R2 account.
pub fn endpoint_for_account(account_id: &str) -> String {
    format!("https://{}.r2.cloudflarestorage.com", account_id)
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_url: String,
}

impl R2Client {
    /// Create a new R2 client from configuration.
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_url: config.public_url,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    /// Upload bytes to R2.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {}", key);
        Ok(())
    }

    /// Download object as bytes.
    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Check connectivity to R2 by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for R2Client {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String> {
        self.upload_bytes(data, key, content_type).await?;
        Ok(self.public_url(key))
    }

    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.download_bytes(key).await
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(&self.public_url, key)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        R2Client::check_connectivity(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> R2Config {
        R2Config {
            endpoint_url: endpoint_for_account("abc123"),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "uploads".to_string(),
            public_url: "https://pub-abc.r2.dev".to_string(),
            region: "auto".to_string(),
        }
    }

    #[test]
    fn test_endpoint_for_account() {
        assert_eq!(endpoint_for_account("abc123"), "https://abc123.r2.cloudflarestorage.com");
    }

    #[test]
    fn test_debug_hides_credentials() {
        let rendered = format!("{:?}", config());
        assert!(rendered.contains("uploads"));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn test_public_url_is_base_plus_key() {
        let client = R2Client::new(config());
        assert_eq!(
            client.public_url("1700000000000-shirt.jpg"),
            "https://pub-abc.r2.dev/1700000000000-shirt.jpg"
        );
    }
}
