use crate::errors::AppError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct UploadResult {
    location: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResult {
    url: String,
}

/// Client for the object-storage service holding applicant document images.
///
/// All failures surface as a generic storage error; individual requests carry
/// a 30s timeout and are never retried.
#[derive(Clone)]
pub struct ObjectStorageClient {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: String,
}

impl ObjectStorageClient {
    pub fn new(base_url: String, bucket: String, token: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::StorageError(format!("Failed to create storage client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            bucket,
            token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{}/{}", self.base_url, self.bucket, key)
    }

    /// Uploads one object and returns its public location URL.
    pub async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let url = self.object_url(key);
        tracing::info!("Uploading object {} ({} bytes)", key, bytes.len());

        let response = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::StorageError(format!(
                "Storage returned {}: {}",
                status, error_text
            )));
        }

        let result: UploadResult = response.json().await.map_err(|e| {
            AppError::StorageError(format!("Failed to parse upload response: {}", e))
        })?;

        tracing::info!("✓ Uploaded object {} -> {}", key, result.location);
        Ok(result.location)
    }

    /// Fetches an object's bytes and content type.
    pub async fn fetch(&self, key: &str) -> Result<(Vec<u8>, String), AppError> {
        let response = self
            .client
            .get(self.object_url(key))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Fetch request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::StorageError(format!(
                "Storage returned {} fetching {}",
                status, key
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to read object body: {}", e)))?;

        Ok((bytes.to_vec(), content_type))
    }

    /// Deletes an object.
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let response = self
            .client
            .delete(self.object_url(key))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::StorageError(format!(
                "Storage returned {} deleting {}",
                status, key
            )));
        }

        tracing::info!("✓ Deleted object {}", key);
        Ok(())
    }

    /// Requests a pre-signed URL for an object.
    pub async fn signed_url(&self, key: &str) -> Result<String, AppError> {
        let url = format!("{}/signed-url", self.object_url(key));
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Signed URL request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::StorageError(format!(
                "Storage returned {} signing {}",
                status, key
            )));
        }

        let result: SignedUrlResult = response.json().await.map_err(|e| {
            AppError::StorageError(format!("Failed to parse signed URL response: {}", e))
        })?;

        Ok(result.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ObjectStorageClient::new(
            "https://storage.example.com".to_string(),
            "documents".to_string(),
            "token".to_string(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn object_urls_include_bucket_and_key() {
        let client = ObjectStorageClient::new(
            "https://storage.example.com".to_string(),
            "documents".to_string(),
            "token".to_string(),
        )
        .unwrap();
        assert_eq!(
            client.object_url("ine-frontal.jpg"),
            "https://storage.example.com/objects/documents/ine-frontal.jpg"
        );
    }
}
