//! Sticky-session HTTP client.
//!
//! [`SessionClient`] carries the cookies the service sets from one call to the
//! next, the way a browser session would. Every simulated session owns its own
//! client, so no session token or pooled connection is ever shared.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

/// HTTP client bound to one simulated session.
///
/// Cookies live in reqwest's store, which applies `Expires`, `Max-Age`,
/// `Path` and `Domain` the way a browser does.
#[derive(Debug)]
pub struct SessionClient {
    http: reqwest::Client,
    url: Url,
    cookies: Arc<Jar>,
}

impl SessionClient {
    /// Build a client with its own connection pool and an empty cookie store.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if the target is not a valid URL and
    /// [`HarnessError::Http`] if the underlying client cannot be built.
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let base_url = config.base_url();
        let url = Url::parse(&base_url)
            .map_err(|e| HarnessError::Config(format!("invalid target {}: {}", base_url, e)))?;
        let cookies = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .connect_timeout(config.timeouts.connect)
            .timeout(config.timeouts.request)
            .build()?;
        Ok(Self { http, url, cookies })
    }

    /// `GET path`, decoding the JSON body.
    pub async fn get(&mut self, step: &'static str, path: &str) -> Result<Value> {
        let request = self.request(Method::GET, path);
        self.json(step, request).await
    }

    /// `POST path` without a body, decoding the JSON body.
    pub async fn post(&mut self, step: &'static str, path: &str) -> Result<Value> {
        let request = self.request(Method::POST, path);
        self.json(step, request).await
    }

    /// `POST path` with a JSON body, decoding the JSON response.
    pub async fn post_json<B>(&mut self, step: &'static str, path: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path).json(body);
        self.json(step, request).await
    }

    /// `GET path`, returning only the status code and draining the body.
    pub async fn status(&mut self, path: &str) -> Result<u16> {
        let response = self.request(Method::GET, path).send().await?;
        let status = response.status().as_u16();
        response.bytes().await?;
        Ok(status)
    }

    /// `Cookie` header the store would send with a request to `path`.
    #[must_use]
    pub fn cookie_header(&self, path: &str) -> Option<String> {
        let url = self.url.join(path).ok()?;
        let value = self.cookies.cookies(&url)?;
        value.to_str().ok().map(str::to_string)
    }

    /// Current value of a cookie visible at the service root.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.cookie_header("/")?;
        header
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.url.as_str().trim_end_matches('/'), path);
        self.http.request(method, url)
    }

    async fn json(&mut self, step: &'static str, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        trace!(step, status, bytes = body.len(), "response");
        serde_json::from_slice(&body).map_err(|source| {
            if (200..300).contains(&status) {
                HarnessError::Decode { step, source }
            } else {
                HarnessError::Status { step, status }
            }
        })
    }
}
