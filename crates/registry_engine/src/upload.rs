use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use registry_logging::{registry_info, registry_warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::server_message;
use crate::decode::safe_parse_json;
use crate::fetch::{fetch_with_timeout, Transport};
use crate::{FailureKind, FetchError, HttpRequest, Method, MultipartFile, RequestBody};

/// Keys the upload service may use for the hosted image URL.
pub const HOSTED_URL_KEYS: [&str; 3] = ["fileUrl", "url", "imageUrl"];

/// Posts images to the separate upload service.
#[derive(Clone)]
pub struct ImageUploader {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl ImageUploader {
    /// `base_url` is the upload service root; files go to `{base_url}/image`.
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut endpoint = Url::parse(base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, format!("{base_url}: {err}")))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| FetchError::new(FailureKind::InvalidUrl, base_url.to_string()))?
            .pop_if_empty()
            .push("image");
        Ok(Self {
            endpoint,
            transport,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Uploads one file and returns the hosted URL.
    pub async fn upload(
        &self,
        bytes: Bytes,
        filename: &str,
        mime: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let mut request = HttpRequest::new(Method::Post, self.endpoint.clone());
        request.body = RequestBody::Multipart(MultipartFile {
            field: "file".to_string(),
            filename: filename.to_string(),
            mime: mime.to_string(),
            bytes,
        });

        let response = fetch_with_timeout(self.transport.as_ref(), &request, self.timeout, cancel)
            .await?;
        if !response.is_success() {
            let message = server_message(&response)
                .unwrap_or_else(|| format!("upload of {filename} returned {}", response.status));
            registry_warn!("{}", message);
            return Err(FetchError::new(
                FailureKind::HttpStatus(response.status),
                message,
            ));
        }

        let hosted = safe_parse_json(&response.body, response.content_type()).and_then(|body| {
            HOSTED_URL_KEYS
                .iter()
                .filter_map(|key| body.get(key))
                .find_map(|value| value.as_str().map(str::to_string))
                .filter(|url| !url.is_empty())
        });
        match hosted {
            Some(url) => {
                registry_info!("uploaded {} to {}", filename, url);
                Ok(url)
            }
            None => Err(FetchError::new(
                FailureKind::Undecodable,
                "upload response has no image URL",
            )),
        }
    }
}
