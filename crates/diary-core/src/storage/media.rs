//! Media API client that stores images through backend-issued presigned URLs.

use reqwest::Method;
use serde::Deserialize;

use super::ImageStorage;
use crate::error::{Error, Result};
use crate::util::{compact_text, normalize_http_base_url};

/// HTTP client for the media API, acting on behalf of one signed-in user.
#[derive(Clone)]
pub struct MediaApiClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for MediaApiClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MediaApiClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl MediaApiClient {
    pub fn new(base_url: impl AsRef<str>, access_token: impl Into<String>) -> Result<Self> {
        let base_url = normalize_http_base_url(base_url.as_ref(), "Media API base URL")
            .map_err(Error::InvalidInput)?;
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(Error::InvalidInput(
                "Media API access token must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Storage(format!("Failed to construct HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            access_token,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_presigned(
        &self,
        route: &str,
        body: &serde_json::Value,
    ) -> Result<PresignedOperation> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, route))
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|error| Error::Storage(format!("Failed to request signed URL: {error}")))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Signed URL request failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }
        let payload = response
            .json::<PresignResponse>()
            .await
            .map_err(|error| Error::Storage(format!("Failed to parse signed URL response: {error}")))?;
        Ok(payload.operation)
    }

    async fn perform(
        &self,
        operation: PresignedOperation,
        body: Option<Vec<u8>>,
        action: &str,
    ) -> Result<()> {
        let method = Method::from_bytes(operation.method.as_bytes())
            .map_err(|error| Error::Storage(format!("Unsupported HTTP method: {error}")))?;
        let mut request = self.client.request(method, &operation.url);
        for (name, value) in operation.headers {
            if name.eq_ignore_ascii_case("host") {
                continue;
            }
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| Error::Storage(format!("{action} request failed: {error}")))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "{action} request failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }
        Ok(())
    }
}

impl ImageStorage for MediaApiClient {
    async fn upload(&self, remote_path: &str, content_type: &str, bytes: &[u8]) -> Result<()> {
        let operation = self
            .request_presigned(
                "/v1/media/presign/upload",
                &serde_json::json!({
                    "object_key": remote_path,
                    "content_type": content_type,
                }),
            )
            .await?;
        self.perform(operation, Some(bytes.to_vec()), "Upload").await?;
        tracing::debug!("Uploaded {} ({} bytes)", remote_path, bytes.len());
        Ok(())
    }

    async fn download_url(&self, remote_path: &str) -> Result<String> {
        let url = format!(
            "{}/v1/media/presign/download?object_key={}",
            self.base_url,
            urlencoding::encode(remote_path)
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::Storage(format!("Failed to request download URL: {error}")))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Download URL request failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }
        let payload = response
            .json::<PresignResponse>()
            .await
            .map_err(|error| Error::Storage(format!("Failed to parse download URL response: {error}")))?;
        Ok(payload.operation.url)
    }

    async fn delete(&self, remote_path: &str) -> Result<()> {
        let operation = self
            .request_presigned(
                "/v1/media/presign/delete",
                &serde_json::json!({
                    "object_key": remote_path,
                }),
            )
            .await?;
        self.perform(operation, None, "Delete").await?;
        tracing::debug!("Deleted {}", remote_path);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PresignResponse {
    operation: PresignedOperation,
}

#[derive(Debug, Deserialize)]
struct PresignedOperation {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_base_url_and_token() {
        assert!(matches!(
            MediaApiClient::new("example.com", "token"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            MediaApiClient::new("https://api.example.com", " "),
            Err(Error::InvalidInput(_))
        ));

        let client = MediaApiClient::new("https://api.example.com/", "token").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[test]
    fn debug_redacts_access_token() {
        let client = MediaApiClient::new("https://api.example.com", "secret-token").unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn presign_response_parses_operation_headers() {
        let payload: PresignResponse = serde_json::from_str(
            r#"{"operation":{"method":"PUT","url":"https://bucket.example/x","headers":[["content-type","image/png"]]}}"#,
        )
        .unwrap();
        assert_eq!(payload.operation.method, "PUT");
        assert_eq!(payload.operation.headers.len(), 1);

        let bare: PresignResponse =
            serde_json::from_str(r#"{"operation":{"method":"GET","url":"https://bucket.example/x"}}"#)
                .unwrap();
        assert!(bare.operation.headers.is_empty());
    }
}
