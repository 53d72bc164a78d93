// SPDX-License-Identifier: MIT

//! Authenticated HTTP transport for the platform API

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Result, WmillError};

/// Query string pairs attached to a request
pub type Query<'a> = &'a [(&'a str, String)];

/// API-relative endpoint, kept as unencoded path segments
///
/// Segments are percent-encoded only when joined onto the API root, so a `?`,
/// `#` or `%` inside a user-supplied path or key stays part of that segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    segments: Vec<String>,
}

impl Endpoint {
    /// Fixed route such as `users/whoami`
    pub fn route(route: &str) -> Self {
        Self::default().then(route)
    }

    /// Append a fixed route; empty parts are skipped
    pub fn then(mut self, route: &str) -> Self {
        self.segments.extend(
            route
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Append an item path like `u/admin/db`; each `/` starts a new segment
    pub fn path(mut self, path: &str) -> Self {
        self.segments
            .extend(path.split('/').map(str::to_string));
        self
    }

    /// Append one opaque segment; a `/` inside it is encoded too
    pub fn segment(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// `reqwest::Client` bound to an API root with bearer auth preconfigured
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token()))
            .map_err(|_| WmillError::config("token contains characters not allowed in a header"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    /// Resolve an endpoint against the API root, encoding every segment
    pub fn url(&self, endpoint: &Endpoint) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WmillError::config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(endpoint.segments());
        Ok(url)
    }

    /// Send a request and return the response whatever its status
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &Endpoint,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = self.url(endpoint)?;
        log::debug!("{} {}", method, url);

        let mut req = self.client.request(method, url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        Ok(req.send().await?)
    }

    /// GET without status checking, for callers that branch on 404
    pub async fn get_unchecked(&self, endpoint: &Endpoint, query: Query<'_>) -> Result<Response> {
        self.send::<()>(Method::GET, endpoint, query, None).await
    }

    pub async fn get(&self, endpoint: &Endpoint, query: Query<'_>) -> Result<Response> {
        let resp = self.get_unchecked(endpoint, query).await?;
        ensure_success(resp).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: &B,
        query: Query<'_>,
    ) -> Result<Response> {
        let resp = self.post_unchecked(endpoint, body, query).await?;
        ensure_success(resp).await
    }

    pub async fn post_unchecked<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: &B,
        query: Query<'_>,
    ) -> Result<Response> {
        self.send(Method::POST, endpoint, query, Some(body)).await
    }

    /// POST with no request body
    pub async fn post_empty(&self, endpoint: &Endpoint, query: Query<'_>) -> Result<Response> {
        let resp = self
            .send::<()>(Method::POST, endpoint, query, None)
            .await?;
        ensure_success(resp).await
    }
}

/// Turn a non-2xx response into [`WmillError::Api`]
pub async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    let err = WmillError::api(status, url, body);
    log::error!("{}", err);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let cfg = ClientConfig::from_lookup(
            Some("t".into()),
            Some("demo".into()),
            Some(base.into()),
            |_| None,
        )
        .unwrap();
        ApiClient::new(&cfg).unwrap()
    }

    #[test]
    fn test_route_skips_empty_parts() {
        let api = client("http://localhost:8000");
        assert_eq!(
            api.url(&Endpoint::route("/version")).unwrap().as_str(),
            "http://localhost:8000/api/version"
        );
        assert_eq!(
            api.url(&Endpoint::route("w/demo/variables/get_value").path("u/admin/x"))
                .unwrap()
                .as_str(),
            "http://localhost:8000/api/w/demo/variables/get_value/u/admin/x"
        );
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        let api = client("http://localhost:8000");
        let url = api
            .url(
                &Endpoint::route("jobs/flow/user_states")
                    .segment("flow-root")
                    .segment("page?x=1#frag"),
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/jobs/flow/user_states/flow-root/page%3Fx=1%23frag"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_segment_encodes_slash_but_path_splits() {
        let api = client("http://localhost:8000");
        assert_eq!(
            api.url(&Endpoint::route("k").segment("a/b")).unwrap().path(),
            "/api/k/a%2Fb"
        );
        assert_eq!(
            api.url(&Endpoint::route("k").path("a/b")).unwrap().path(),
            "/api/k/a/b"
        );
    }

    #[test]
    fn test_unparsable_base_url_is_url_error() {
        let mut cfg = ClientConfig::from_lookup(
            Some("t".into()),
            Some("demo".into()),
            Some("http://localhost".into()),
            |_| None,
        )
        .unwrap();
        cfg.base_url = "localhost/api".into();
        assert!(matches!(ApiClient::new(&cfg), Err(WmillError::Url(_))));
    }

    #[test]
    fn test_endpoint_display() {
        let endpoint = Endpoint::route("jobs/run/p").path("u/admin/hello");
        assert_eq!(endpoint.to_string(), "jobs/run/p/u/admin/hello");
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let cfg = ClientConfig::from_lookup(
            Some("bad\ntoken".into()),
            Some("demo".into()),
            Some("http://localhost".into()),
            |_| None,
        )
        .unwrap();
        assert!(matches!(ApiClient::new(&cfg), Err(WmillError::Config(_))));
    }
}
