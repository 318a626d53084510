//! # HTTP Retrieval Utilities
//!
//! An asynchronous JSON client around `reqwest` with exponential backoff
//! retries on transient failures.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, AUTHORIZATION},
    Method, Url,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;

/// A response body together with the metadata of the HTTP exchange.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized body on success.
    pub data: Option<T>,
    /// The raw body when the status was not 2xx.
    pub error_body: Option<String>,
    pub status: u16,
    /// True for 2xx.
    pub success: bool,
    pub headers: HeaderMap,
}

/// Retrying client bound to a base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a client with up to `max_retries` retries per request.
    ///
    /// # Errors
    /// Fails if `base_url` is not an absolute URL or the underlying client
    /// cannot be built.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        max_retries: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid base URL '{}': {}", base_url, e))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let inner = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner,
            base_url,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues a GET of `path` (joined onto the base URL) with `query`
    /// appended as URL parameters.
    ///
    /// Non-2xx statuses are not errors; they come back with `success == false`
    /// and the body in `error_body`.
    ///
    /// # Errors
    /// Network failures, exhausted retries and undecodable 2xx bodies.
    pub async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let mut req = self.inner.request(Method::GET, url);
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            let error_body = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body,
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }
}
