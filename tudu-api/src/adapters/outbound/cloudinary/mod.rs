use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{
    config::BlobStoreSettings,
    domain::{
        models::{AssetId, RemoteAsset},
        ports::outbound::{BlobStore, BlobStoreError},
    },
};

/// Adapter for a Cloudinary-style content store, implementing the BlobStore
/// port over its signed HTTP upload/destroy API.
pub struct CloudinaryBlobStore {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    upload_folder: String,
}

impl CloudinaryBlobStore {
    pub fn new(settings: &BlobStoreSettings) -> Self {
        // A hung upload must surface as an upload fault, not block the
        // request forever.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            cloud_name: settings.cloud_name.clone(),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            upload_folder: settings.upload_folder.clone(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.cloud_name, action
        )
    }

    /// Request signature: parameters sorted by name, joined as
    /// `key=value&key=value`, with the API secret appended, hashed with
    /// SHA-256 (the account's configured signature algorithm). `file` and
    /// `api_key` are excluded from the signed string.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by_key(|(key, _)| *key);

        let joined = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[async_trait]
impl BlobStore for CloudinaryBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<RemoteAsset, BlobStoreError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = self.sign(&[
            ("folder", self.upload_folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let data_uri = format!("data:image/webp;base64,{}", BASE64.encode(bytes));
        let form = reqwest::multipart::Form::new()
            .text("file", data_uri)
            .text("folder", self.upload_folder.clone())
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| BlobStoreError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BlobStoreError::Provider(format!(
                "upload returned {status}: {body}"
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|err| BlobStoreError::Request(err.to_string()))?;

        Ok(RemoteAsset::new(uploaded.secure_url, uploaded.public_id))
    }

    async fn delete(&self, id: &AssetId) -> Result<(), BlobStoreError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", id.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|err| BlobStoreError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BlobStoreError::Provider(format!(
                "destroy returned {status}: {body}"
            )));
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|err| BlobStoreError::Request(err.to_string()))?;

        // "not found" counts as success: the id is gone either way, and
        // callers rely on delete being idempotent.
        match destroyed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(BlobStoreError::Provider(format!(
                "destroy returned result '{other}'"
            ))),
        }
    }
}
