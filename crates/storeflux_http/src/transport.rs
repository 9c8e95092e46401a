use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use storeflux_core::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("timeout")]
    Timeout,
    #[error("not found")]
    NotFound,
    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout
        } else if err.is_decode() {
            HttpError::Decode(err.to_string())
        } else {
            HttpError::Request(err.to_string())
        }
    }
}

impl From<HttpError> for StoreError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::InvalidBaseUrl(msg) => StoreError::InvalidConfig(msg),
            HttpError::Request(msg) => StoreError::Transport(msg),
            HttpError::Timeout => StoreError::transport("request timed out"),
            HttpError::NotFound => StoreError::NotFound,
            HttpError::Status { status, body } => StoreError::Status { status, body },
            HttpError::Decode(msg) => StoreError::Decode(msg),
        }
    }
}

/// JSON-over-HTTP client bound to the service base URL.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HttpError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(HttpError::InvalidBaseUrl(base_url));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{segments...}` with each segment percent-encoded, followed by the
    /// query parameters that carry a value.
    pub fn url(&self, segments: &[&str], query: &[(&str, Option<&str>)]) -> String {
        let mut url = self.base_url.clone();

        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }

        let mut separator = '?';
        for (name, value) in query {
            if let Some(value) = value {
                url.push(separator);
                url.push_str(name);
                url.push('=');
                url.push_str(&urlencoding::encode(value));
                separator = '&';
            }
        }

        url
    }

    pub async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, HttpError> {
        self.send(self.client.request(Method::GET, url)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, HttpError> {
        self.send(self.client.request(Method::POST, url).json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: String) -> Result<T, HttpError> {
        self.send(self.client.request(Method::DELETE, url)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HttpError> {
        let response = request.send().await?;
        log::debug!("{} {}", response.status(), response.url());
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(HttpError::NotFound);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(HttpError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| HttpError::Decode(e.to_string()))
}
