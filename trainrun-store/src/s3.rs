//! S3 implementation of the object store

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::debug;

use crate::ObjectStore;
use crate::error::{Result, StoreError};

/// Connection settings for the checkpoint bucket
///
/// Fields left as `None` fall back to the AWS SDK default provider chain
/// (profile files, instance metadata, ...).
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
}

impl S3Settings {
    /// Static credentials, only when both halves of the key pair are present
    pub fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => {
                Some(Credentials::new(id, secret, None, None, "trainrun-env"))
            }
            _ => None,
        }
    }
}

/// Object store backed by the AWS S3 SDK
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Builds an S3 client from the given settings
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(credentials) = settings.static_credentials() {
            loader = loader.credentials_provider(credentials);
        }

        let sdk_config = loader.load().await;
        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StoreError::Io {
                path: path.display().to_string(),
                source: std::io::Error::other(e),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::upload_failed(bucket, key, DisplayErrorContext(&e).to_string()))?;

        debug!("Stored {} as s3://{}/{}", path.display(), bucket, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials_need_both_halves() {
        let settings = S3Settings {
            access_key_id: Some("AKIA".to_string()),
            secret_access_key: None,
            region: Some("us-east-1".to_string()),
        };
        assert!(settings.static_credentials().is_none());

        let settings = S3Settings {
            secret_access_key: Some("secret".to_string()),
            ..settings
        };
        let credentials = settings.static_credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "AKIA");
        assert_eq!(credentials.secret_access_key(), "secret");
    }

    #[test]
    fn test_default_settings_use_provider_chain() {
        let settings = S3Settings::default();
        assert!(settings.static_credentials().is_none());
        assert!(settings.region.is_none());
    }
}
