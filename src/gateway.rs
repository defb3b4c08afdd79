//! Request gateway
//!
//! Every backend call goes through [`Gateway::send`]: it refuses to call
//! without a credential, attaches the credential header, classifies the
//! outcome and writes it to the output log.

use crate::config::AuthConfig;
use crate::error::PanelError;
use crate::health::{ConnectionIndicator, LinkState};
use crate::http::{ApiRequest, RawResponse, Transport};
use crate::output::OutputLog;
use crate::session::Session;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    Text(String),
}

/// A successful backend answer
#[derive(Debug, Clone)]
pub struct Reply {
    /// Order in which the request was issued
    pub seq: u64,
    pub status: StatusCode,
    pub body: ReplyBody,
}

impl Reply {
    /// Human-readable text: the backend's `output` field, else a file's
    /// `content`, else the whole body
    pub fn output(&self) -> String {
        match &self.body {
            ReplyBody::Json(value) => match ["output", "content"]
                .iter()
                .find_map(|field| value.get(*field).and_then(Value::as_str))
            {
                Some(text) => text.to_string(),
                None => serde_json::to_string_pretty(value).unwrap_or_default(),
            },
            ReplyBody::Text(text) => text.clone(),
        }
    }

    /// File contents: the `content` field, or the raw body for plain-text backends
    pub fn content(&self) -> String {
        match &self.body {
            ReplyBody::Json(value) => value
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            ReplyBody::Text(text) => text.clone(),
        }
    }
}

pub struct Gateway {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    log: Arc<OutputLog>,
    indicator: Arc<ConnectionIndicator>,
    auth_header: String,
    require_auth: bool,
    seq: AtomicU64,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
        log: Arc<OutputLog>,
        indicator: Arc<ConnectionIndicator>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            transport,
            session,
            log,
            indicator,
            auth_header: auth.header.clone(),
            require_auth: auth.required,
            seq: AtomicU64::new(0),
        }
    }

    pub fn log(&self) -> &Arc<OutputLog> {
        &self.log
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn indicator(&self) -> &Arc<ConnectionIndicator> {
        &self.indicator
    }

    /// Verify `key` with the backend and make it the session's credential
    pub async fn login(&self, key: &str) -> Result<(), PanelError> {
        self.session
            .login(self.transport.as_ref(), key)
            .await
            .inspect_err(|err| {
                if err.is_connectivity() {
                    self.indicator.set(LinkState::Disconnected);
                }
            })
    }

    /// Authenticated call with an optional JSON body
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Reply, PanelError> {
        let mut request = ApiRequest::new(method, endpoint);
        request.body = body;
        self.send(request).await
    }

    pub async fn send(&self, mut request: ApiRequest) -> Result<Reply, PanelError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;

        match self.session.current() {
            Some(credential) => request
                .headers
                .push((self.auth_header.clone(), credential.as_str().to_string())),
            None if request.requires_auth && self.require_auth => {
                let err = PanelError::Unauthenticated;
                self.log.error(Some(seq), err.to_string());
                return Err(err);
            }
            None => {}
        }

        self.log
            .info(Some(seq), format!("Executing: {} {}...", request.method, request.path));

        let resp = match self.transport.send(&request).await {
            Ok(resp) => resp,
            Err(err) => {
                self.indicator.set(LinkState::Disconnected);
                self.log.error(Some(seq), err.to_string());
                return Err(err);
            }
        };

        match classify(seq, resp) {
            Ok(reply) => {
                self.log.info(Some(seq), reply.output());
                Ok(reply)
            }
            Err(err) => {
                let message = match &err {
                    PanelError::Backend { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.log.error(Some(seq), message);
                Err(err)
            }
        }
    }
}

fn classify(seq: u64, resp: RawResponse) -> Result<Reply, PanelError> {
    let status = resp.status;
    let body = match serde_json::from_str::<Value>(&resp.body) {
        Ok(value) => ReplyBody::Json(value),
        Err(_) => ReplyBody::Text(resp.body),
    };

    let backend_message = |body: &ReplyBody| match body {
        ReplyBody::Json(value) => value
            .get("output")
            .and_then(Value::as_str)
            .map(str::to_string),
        ReplyBody::Text(_) => None,
    };

    if !status.is_success() {
        let message = backend_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
        return Err(PanelError::Backend {
            status: status.as_u16(),
            message,
        });
    }

    if let ReplyBody::Json(value) = &body {
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let message = backend_message(&body).unwrap_or_else(|| "request failed".to_string());
            return Err(PanelError::Backend {
                status: status.as_u16(),
                message,
            });
        }
    }

    Ok(Reply { seq, status, body })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::http::mock::MockTransport;

    pub fn gateway(transport: Arc<MockTransport>, key: Option<&str>) -> Gateway {
        let session = Arc::new(Session::in_memory());
        if let Some(key) = key {
            session.use_key(key).unwrap();
        }
        Gateway::new(
            transport,
            session,
            Arc::new(OutputLog::default()),
            Arc::new(ConnectionIndicator::new()),
            &AuthConfig::default(),
        )
    }
}
