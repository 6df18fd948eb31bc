use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;

/// Thin client for a hosted image API. The service only needs "upload bytes,
/// get back a public URL".
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    upload_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

impl ImageClient {
    pub fn new(upload_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            upload_url: upload_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Upload an image and return its public URL.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| format!("invalid content type: {e}"))?;
        let form = multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&self.upload_url)
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("image upload failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("image API error: {body}"));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| format!("image API returned unexpected body: {e}"))?;

        tracing::debug!(file_name = %file_name, url = %parsed.data.url, "image uploaded");
        Ok(parsed.data.url)
    }
}
