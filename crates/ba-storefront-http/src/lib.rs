use anyhow::{Context, Result};
use async_trait::async_trait;
use ba_storefront_client::{ApiError, Method, RawResponse, StorefrontClient, Transport};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_STOREFRONT_URL: &str = "http://localhost:8000";
const STOREFRONT_URL_VAR: &str = "BRIGART_STOREFRONT_URL";

/// `reqwest` transport for native callers (smoke tools, integration tests).
///
/// Reads `BRIGART_STOREFRONT_URL` from the environment at construction time
/// (default: `http://localhost:8000`). The session cookie jar lives in the
/// underlying client, so a cart built through one transport stays with it.
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let base_url = base_url
            .or_else(|| std::env::var(STOREFRONT_URL_VAR).ok())
            .unwrap_or_else(|| DEFAULT_STOREFRONT_URL.to_owned());
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(15))
            .build()
            .context("building storefront http client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Typed client over HTTP, the usual way to talk to a running storefront.
pub fn connect(base_url: Option<String>) -> Result<StorefrontClient<HttpTransport>> {
    Ok(StorefrontClient::new(HttpTransport::new(base_url)?))
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<RawResponse, ApiError> {
        let url = self.url(path);
        let request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        let request = match body {
            Some(body) => request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Transport(format!("{} {url}: {err}", method.as_str())))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_else(|err| {
            warn!(%url, "storefront body unreadable: {err}");
            String::new()
        });
        debug!(%url, status, "storefront response");

        Ok(RawResponse { status, body })
    }
}
