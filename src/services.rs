//! Service buttons, the log viewer and the raw config editor

use crate::config::EditorConfig;
use crate::error::PanelError;
use crate::gateway::{Gateway, Reply};
use crate::http::ApiRequest;
use clap::ValueEnum;
use reqwest::Method;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceTarget {
    /// isc-dhcp-server
    Dhcp,
    /// bind9
    Dns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceAction {
    Status,
    Start,
    Stop,
    Restart,
    Install,
}

impl ServiceTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceTarget::Dhcp => "dhcp",
            ServiceTarget::Dns => "dns",
        }
    }
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Status => "status",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Install => "install",
        }
    }

    /// Status is read-only, everything else changes the host
    pub fn method(&self) -> Method {
        match self {
            ServiceAction::Status => Method::GET,
            _ => Method::POST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceCommand {
    pub target: ServiceTarget,
    pub action: ServiceAction,
}

impl ServiceCommand {
    pub fn new(target: ServiceTarget, action: ServiceAction) -> Self {
        Self { target, action }
    }

    pub fn endpoint(&self) -> String {
        format!("/{}/{}", self.target.as_str(), self.action.as_str())
    }
}

impl fmt::Display for ServiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target.as_str(), self.action.as_str())
    }
}

pub async fn run(gateway: &Gateway, command: ServiceCommand) -> Result<Reply, PanelError> {
    tracing::info!("Running service command: {}", command);
    gateway
        .call(&command.endpoint(), command.action.method(), None)
        .await
}

/// Recent backend output for both services
pub async fn logs(gateway: &Gateway) -> Result<Reply, PanelError> {
    gateway.send(ApiRequest::get("/logs").public()).await
}

/// Loads and saves raw configuration files through the backend
pub struct ConfigEditor<'a> {
    gateway: &'a Gateway,
    config: &'a EditorConfig,
}

impl<'a> ConfigEditor<'a> {
    pub fn new(gateway: &'a Gateway, config: &'a EditorConfig) -> Self {
        Self { gateway, config }
    }

    pub async fn load(&self, file: &str) -> Result<String, PanelError> {
        let request = ApiRequest::get(self.config.load_path.as_str())
            .query(self.config.query_param.as_str(), file);
        let reply = self.gateway.send(request).await?;
        Ok(reply.content())
    }

    pub async fn save(&self, file: &str, content: &str) -> Result<Reply, PanelError> {
        let mut body = Map::new();
        body.insert(self.config.body_field.clone(), Value::String(file.to_string()));
        body.insert("content".to_string(), Value::String(content.to_string()));

        self.gateway
            .call(&self.config.save_path, Method::POST, Some(Value::Object(body)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::gateway;
    use crate::http::mock::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_endpoints_and_methods() {
        let cmd = ServiceCommand::new(ServiceTarget::Dhcp, ServiceAction::Restart);
        assert_eq!(cmd.endpoint(), "/dhcp/restart");
        assert_eq!(cmd.action.method(), Method::POST);

        let cmd = ServiceCommand::new(ServiceTarget::Dns, ServiceAction::Status);
        assert_eq!(cmd.endpoint(), "/dns/status");
        assert_eq!(cmd.action.method(), Method::GET);
        assert_eq!(cmd.to_string(), "dns status");
    }

    #[tokio::test]
    async fn test_run_service_command() {
        let transport = Arc::new(MockTransport::ok(r#"{"output":"active (running)","success":true}"#));
        let gw = gateway(transport.clone(), Some("k"));

        let reply = run(&gw, ServiceCommand::new(ServiceTarget::Dns, ServiceAction::Install))
            .await
            .unwrap();

        assert_eq!(reply.output(), "active (running)");
        let req = &transport.requests()[0];
        assert_eq!(req.path, "/dns/install");
        assert_eq!(req.method, Method::POST);
    }

    #[tokio::test]
    async fn test_logs_without_key() {
        let transport = Arc::new(MockTransport::ok(r#"{"output":"=== syslog ===","success":true}"#));
        let gw = gateway(transport.clone(), None);
        let reply = logs(&gw).await.unwrap();
        assert_eq!(reply.output(), "=== syslog ===");
        assert!(transport.requests()[0].header("X-API-KEY").is_none());
    }

    #[tokio::test]
    async fn test_editor_load_and_save() {
        let transport = Arc::new(
            MockTransport::ok(r#"{"success":true,"output":"saved"}"#).then(
                crate::http::mock::MockReply::Status(200, r#"{"content":"option domain-name \"lab\";"}"#.into()),
            ),
        );
        let gw = gateway(transport.clone(), Some("k"));
        let cfg = EditorConfig::default();
        let editor = ConfigEditor::new(&gw, &cfg);

        let content = editor.load("dhcp").await.unwrap();
        assert_eq!(content, "option domain-name \"lab\";");

        let reply = editor.save("dhcp", "new contents").await.unwrap();
        assert_eq!(reply.output(), "saved");

        let requests = transport.requests();
        assert_eq!(requests[0].path, "/config");
        assert_eq!(requests[0].query, vec![("key".to_string(), "dhcp".to_string())]);
        assert_eq!(requests[0].header("X-API-KEY"), Some("k"));
        assert_eq!(requests[1].path, "/config/save");
        assert_eq!(
            requests[1].body,
            Some(json!({"path": "dhcp", "content": "new contents"}))
        );
    }

    #[tokio::test]
    async fn test_editor_load_shows_content_once() {
        let transport = Arc::new(MockTransport::ok(
            r#"{"success":true,"content":"subnet 10.0.0.0 netmask 255.255.255.0 {}"}"#,
        ));
        let gw = gateway(transport, Some("k"));
        let cfg = EditorConfig::default();

        ConfigEditor::new(&gw, &cfg).load("dhcp").await.unwrap();

        let rendered = gw.log().render();
        assert_eq!(rendered.matches("subnet 10.0.0.0").count(), 1);
        assert!(!rendered.contains("\"success\""));
    }

    #[tokio::test]
    async fn test_editor_legacy_layout() {
        let transport = Arc::new(MockTransport::ok("ddns-update-style none;"));
        let gw = gateway(transport.clone(), Some("k"));
        let cfg = EditorConfig {
            load_path: "/config/load".into(),
            query_param: "file".into(),
            body_field: "file".into(),
            ..EditorConfig::default()
        };
        let editor = ConfigEditor::new(&gw, &cfg);

        assert_eq!(editor.load("/etc/dhcp/dhcpd.conf").await.unwrap(), "ddns-update-style none;");
        editor.save("/etc/dhcp/dhcpd.conf", "x").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].path, "/config/load");
        assert_eq!(requests[0].query[0].0, "file");
        assert_eq!(requests[1].body, Some(json!({"file": "/etc/dhcp/dhcpd.conf", "content": "x"})));
    }
}
