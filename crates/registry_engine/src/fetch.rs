use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{FailureKind, FetchError, HttpRequest, HttpResponse, Method, RequestBody};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Issues a single HTTP request. Implementations do not retry.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ReqwestTransport {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        // Per-request deadlines are enforced by `fetch_with_timeout`.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }

    fn build(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder, FetchError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(file) => {
                let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
                    .file_name(file.filename.clone())
                    .mime_str(&file.mime)
                    .map_err(|err| {
                        FetchError::new(FailureKind::InvalidRequest, err.to_string())
                    })?;
                builder.multipart(reqwest::multipart::Form::new().part(file.field.clone(), part))
            }
        };
        Ok(builder)
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let response = self.build(request)?.send().await.map_err(map_reqwest_error)?;

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            url,
            headers,
            body: body.into(),
        })
    }
}

/// Sends `request`, giving up after `timeout` or as soon as `cancel` fires.
///
/// An already-cancelled token returns without touching the network. The
/// deadline timer and the child token are dropped on every exit path.
pub async fn fetch_with_timeout(
    transport: &dyn Transport,
    request: &HttpRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<HttpResponse, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::cancelled());
    }

    let child = cancel.child_token();
    tokio::select! {
        biased;
        _ = child.cancelled() => Err(FetchError::cancelled()),
        result = tokio::time::timeout(timeout, transport.send(request)) => match result {
            Ok(response) => response,
            Err(_) => Err(FetchError::new(
                FailureKind::Timeout,
                format!("{} {} exceeded {timeout:?}", request.method, request.url),
            )),
        },
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidRequest, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
