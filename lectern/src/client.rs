use crate::error::ApiError;
use crate::session::SessionStore;
use anyhow::Result;
use log::{debug, warn};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
pub use reqwest::multipart;
pub use reqwest::Method;
use serde_json::{json, Value};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Local development origin, used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        ApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Configured base URL, falling back to [`DEFAULT_API_URL`] when missing or blank
    pub fn from_setting(base_url: Option<&str>) -> Self {
        match base_url.map(str::trim) {
            Some(url) if !url.is_empty() => ApiConfig::new(url),
            _ => ApiConfig::new(DEFAULT_API_URL),
        }
    }

    /// Reads `LECTERN_API_URL` via [`ApiConfig::from_setting`]
    pub fn from_env() -> Self {
        ApiConfig::from_setting(std::env::var("LECTERN_API_URL").ok().as_deref())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig::new(DEFAULT_API_URL)
    }
}

#[derive(Debug)]
pub enum Body {
    Json(Value),
    /// Sent as-is; the transport picks the multipart content type (with boundary)
    Multipart(multipart::Form),
}

/// Per-call options for [`ApiClient::dispatch`]
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Body>,
    /// Overlaid on the default headers; an `Authorization` header here is replaced when a session
    /// token is present
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        RequestOptions {
            method,
            ..Default::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn multipart(mut self, form: multipart::Form) -> Self {
        self.body = Some(Body::Multipart(form));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn is_multipart(&self) -> bool {
        matches!(self.body, Some(Body::Multipart(_)))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::network(e)
    }
}

/// Single chokepoint for outbound API calls.
///
/// Every call is one independent attempt: no retries, no timeout, no caching. The bearer token is
/// read from the session's persisted record at the start of each call, so a login or logout that
/// races an in-flight call is only seen by later calls.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    config: ApiConfig,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: ApiConfig, session: SessionStore) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()?;
        Ok(ApiClient {
            http_client,
            config,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Header set for a call: JSON content type (unless multipart), then caller overrides, then
    /// the bearer token.
    fn compose_headers(&self, options: &RequestOptions) -> Result<HeaderMap, ApiError> {
        let multipart = options.is_multipart();
        let mut headers = HeaderMap::new();
        if !multipart {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        for (name, value) in options.headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ApiError::invalid_request(format!("invalid header name {name:?}: {e}"))
            })?;
            if multipart && name == header::CONTENT_TYPE {
                continue;
            }
            let value = HeaderValue::from_str(value).map_err(|e| {
                ApiError::invalid_request(format!("invalid value for header {name}: {e}"))
            })?;
            headers.insert(name, value);
        }
        if let Some(token) = self.session.persisted_token() {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut auth_value) => {
                    auth_value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, auth_value);
                }
                Err(_) => warn!("persisted token is not a valid header value; sending without it"),
            }
        }
        Ok(headers)
    }

    /// Issues one request to `base_url + endpoint` and returns the parsed JSON body.
    ///
    /// Every failure comes back as an [`ApiError`]: non-2xx responses carry the response status
    /// and the server's message, anything without a usable response has status 0.
    pub async fn dispatch(&self, endpoint: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let headers = self.compose_headers(&options)?;
        debug!(
            "API request method={} url={} headers={:?}",
            options.method, url, headers
        );

        let mut req = self
            .http_client
            .request(options.method, &url)
            .headers(headers);
        req = match options.body {
            Some(Body::Json(v)) => req.json(&v),
            Some(Body::Multipart(form)) => req.multipart(form),
            None => req,
        };

        let res = match req.send().await {
            Ok(res) => res,
            Err(e) => {
                let err = ApiError::network(&e);
                warn!("API request failed url={url}: {e}");
                return Err(err);
            }
        };

        let status = res.status();
        debug!("API response status={} headers={:?}", status, res.headers());

        if !status.is_success() {
            let body: Value = match res.bytes().await {
                Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({})),
                Err(_) => json!({}),
            };
            debug!("API error response body={}", body);
            let err = ApiError::from_response(status.as_u16(), body);
            warn!("API error url={url}: {err}");
            return Err(err);
        }

        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            debug!("API success response with empty body");
            return Ok(Value::Null);
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(val) => {
                debug!("API success response body={}", val);
                Ok(val)
            }
            Err(e) => {
                warn!("API success response was not JSON url={url}: {e}");
                Err(ApiError::network(e))
            }
        }
    }
}
