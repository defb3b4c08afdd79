//! HTTP transport to the backend, with timeouts and default headers
//!
//! The gateway and the session only see the [`Transport`] trait, so tests can
//! swap the network for a recording mock.

use crate::error::PanelError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// A request to one backend endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the backend base URL, e.g. `/dhcp/status`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Refuse to send without a credential
    pub requires_auth: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            requires_auth: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach the credential when one is present, but never require it
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body text of a backend response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Only transport failures are errors; any HTTP status
    /// comes back as a response.
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, PanelError>;
}

pub struct HttpClient {
    inner: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self, PanelError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("netpanel/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, PanelError> {
        let url = self.url(&request.path);
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self.inner.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!("{} {} -> {}", request.method, url, status);

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum MockReply {
        Status(u16, String),
        Unreachable,
    }

    /// Records every request and answers from a script, falling back to a
    /// fixed reply once the script runs out
    pub struct MockTransport {
        requests: Mutex<Vec<ApiRequest>>,
        script: Mutex<VecDeque<MockReply>>,
        fallback: MockReply,
    }

    impl MockTransport {
        pub fn new(fallback: MockReply) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
                fallback,
            }
        }

        pub fn ok(body: &str) -> Self {
            Self::new(MockReply::Status(200, body.to_string()))
        }

        pub fn unreachable() -> Self {
            Self::new(MockReply::Unreachable)
        }

        pub fn then(self, reply: MockReply) -> Self {
            self.script.lock().unwrap().push_back(reply);
            self
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: &ApiRequest) -> Result<RawResponse, PanelError> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            match reply {
                MockReply::Status(code, body) => Ok(RawResponse {
                    status: StatusCode::from_u16(code).unwrap(),
                    body,
                }),
                MockReply::Unreachable => {
                    Err(PanelError::Connectivity("connection refused".into()))
                }
            }
        }
    }
}
