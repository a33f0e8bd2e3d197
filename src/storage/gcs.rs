use crate::errors::{Result, DataHubError};
use crate::storage::base::ArtifactStore;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use std::time::Duration;

const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Google Cloud Storage 存储，通过 JSON API 检查对象并从内存缓冲区上传
pub struct GcsStore {
    client: Client,
    bucket: String,
    prefix: String,
    token: String,
}

impl GcsStore {
    pub fn new(bucket: &str, prefix: &str, token: &str, timeout: Duration) -> Result<Self> {
        if bucket.trim().is_empty() {
            return Err(DataHubError::ConfigError("GCS bucket name is empty".to_string()));
        }
        if token.trim().is_empty() {
            return Err(DataHubError::ConfigError(
                "GCS access token is missing (pass --gcs-token or set GCS_ACCESS_TOKEN)".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DataHubError::RequestError)?;

        Ok(Self {
            client,
            bucket: bucket.trim().to_string(),
            prefix: normalize_prefix(prefix),
            token: token.trim().to_string(),
        })
    }

    pub fn object_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn metadata_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            GCS_ENDPOINT,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(key)
        )
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/storage/v1/b/{}/o", GCS_ENDPOINT, urlencoding::encode(&self.bucket))
    }
}

#[async_trait]
impl ArtifactStore for GcsStore {
    fn describe(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.prefix)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let key = self.object_key(name);
        debug!("Checking gs://{}/{}", self.bucket, key);

        let response = self.client
            .get(self.metadata_url(&key))
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(DataHubError::StorageError(format!(
                "existence check for gs://{}/{} returned HTTP {}", self.bucket, key, status
            ))),
        }
    }

    async fn write(&self, name: &str, content: &[u8]) -> Result<()> {
        let key = self.object_key(name);

        // 单次 media 上传，对象只有在上传完成后才可见
        let response = self.client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key.as_str())])
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(content.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataHubError::StorageError(format!(
                "upload of gs://{}/{} failed with HTTP {}: {}", self.bucket, key, status, body
            )));
        }

        info!("Data uploaded to GCS bucket {} as {}", self.bucket, key);
        Ok(())
    }
}

/// 非空前缀统一以 `/` 结尾，去掉开头的 `/`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(prefix: &str) -> GcsStore {
        GcsStore::new("market-bucket", prefix, "token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn normalizes_prefixes() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("sp500_data"), "sp500_data/");
        assert_eq!(normalize_prefix("/daily/sp500/"), "daily/sp500/");
    }

    #[test]
    fn builds_object_keys_and_urls() {
        let gcs = store("sp500_data");
        let key = gcs.object_key("sp500_data_2024-03-12.csv");
        assert_eq!(key, "sp500_data/sp500_data_2024-03-12.csv");
        assert_eq!(
            gcs.metadata_url(&key),
            "https://storage.googleapis.com/storage/v1/b/market-bucket/o/sp500_data%2Fsp500_data_2024-03-12.csv"
        );
        assert_eq!(gcs.upload_url(), "https://storage.googleapis.com/upload/storage/v1/b/market-bucket/o");
        assert_eq!(gcs.describe(), "gs://market-bucket/sp500_data/");
    }

    #[test]
    fn requires_token_and_bucket() {
        let err = GcsStore::new("market-bucket", "", "  ", Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, DataHubError::ConfigError(_)));
        assert!(GcsStore::new("", "", "token", Duration::from_secs(5)).is_err());
    }
}
