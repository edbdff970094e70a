//! Browser transport for the storefront API.
//!
//! Requests go out through `fetch` with the session cookie attached; the
//! typed endpoints live in `ba-storefront-client`.

use crate::dom;
use async_trait::async_trait;
use ba_storefront_client::{ApiError, Method, RawResponse, StorefrontClient, Transport};
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestCredentials, RequestInit, Response};

pub type BrowserClient = StorefrontClient<FetchTransport>;

/// `fetch` against the storefront. An empty base means same-origin paths.
#[derive(Debug, Clone, Default)]
pub struct FetchTransport {
    base_url: String,
}

impl FetchTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn client(base_url: &str) -> BrowserClient {
    StorefrontClient::new(FetchTransport::new(base_url))
}

fn js_error(err: JsValue) -> ApiError {
    ApiError::Transport(format!("{err:?}"))
}

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = method.as_str(), %url, "fetch");

        let opts = RequestInit::new();
        opts.set_method(method.as_str());
        opts.set_credentials(RequestCredentials::SameOrigin);

        let headers = Headers::new().map_err(js_error)?;
        headers.set("Accept", "application/json").map_err(js_error)?;
        if let Some(ref b) = body {
            headers
                .set("Content-Type", "application/json")
                .map_err(js_error)?;
            opts.set_body(&JsValue::from_str(b));
        }
        opts.set_headers(&headers);

        let request = Request::new_with_str_and_init(&url, &opts).map_err(js_error)?;
        let window = dom::window().ok_or_else(|| ApiError::Transport("no window".into()))?;
        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?;
        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| ApiError::Transport("fetch did not yield a Response".into()))?;

        let text = JsFuture::from(resp.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;

        Ok(RawResponse {
            status: resp.status(),
            body: text.as_string().unwrap_or_default(),
        })
    }
}
