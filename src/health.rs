//! Backend liveness probing and the connection indicator

use crate::http::{ApiRequest, Transport};
use crate::output::OutputLog;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unknown,
    Connected,
    Disconnected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Unknown => f.write_str("Backend: unknown"),
            LinkState::Connected => f.write_str("Backend: connected"),
            LinkState::Disconnected => f.write_str("Backend: disconnected"),
        }
    }
}

pub struct ConnectionIndicator {
    tx: watch::Sender<LinkState>,
}

impl ConnectionIndicator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LinkState::Unknown);
        Self { tx }
    }

    /// Returns true when the state actually changed
    pub fn set(&self, state: LinkState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    pub fn current(&self) -> LinkState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.tx.subscribe()
    }
}

impl Default for ConnectionIndicator {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HealthMonitor {
    transport: Arc<dyn Transport>,
    path: String,
    indicator: Arc<ConnectionIndicator>,
    log: Arc<OutputLog>,
}

impl HealthMonitor {
    pub fn new(
        transport: Arc<dyn Transport>,
        path: impl Into<String>,
        indicator: Arc<ConnectionIndicator>,
        log: Arc<OutputLog>,
    ) -> Self {
        Self {
            transport,
            path: path.into(),
            indicator,
            log,
        }
    }

    /// Probe the backend once. Never fails: anything but a 2xx answer counts
    /// as disconnected. The output log only hears about transitions.
    pub async fn check(&self) -> bool {
        let request = ApiRequest::get(self.path.as_str()).public();
        let reachable = match self.transport.send(&request).await {
            Ok(resp) if resp.status.is_success() => true,
            Ok(resp) => {
                tracing::debug!("Health probe answered {}", resp.status);
                false
            }
            Err(e) => {
                tracing::debug!("Health probe failed: {}", e);
                false
            }
        };

        let state = if reachable {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };

        if self.indicator.set(state) {
            if reachable {
                self.log.info(None, "Backend connected");
            } else {
                self.log
                    .error(None, "Cannot connect to the backend. Is the service running?");
            }
        }

        reachable
    }

    /// Probe every `every` until the returned handle is stopped or dropped
    pub fn spawn(self: Arc<Self>, every: Duration) -> MonitorHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.check().await;
            }
        });
        MonitorHandle { task }
    }
}

/// Owns the periodic probe task
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{MockReply, MockTransport};

    fn setup(transport: Arc<MockTransport>) -> (Arc<HealthMonitor>, Arc<ConnectionIndicator>, Arc<OutputLog>) {
        let indicator = Arc::new(ConnectionIndicator::new());
        let log = Arc::new(OutputLog::default());
        let monitor = Arc::new(HealthMonitor::new(
            transport,
            "/health",
            indicator.clone(),
            log.clone(),
        ));
        (monitor, indicator, log)
    }

    #[tokio::test]
    async fn test_failure_after_success_is_one_transition() {
        let transport = Arc::new(
            MockTransport::unreachable().then(MockReply::Status(200, r#"{"status":"ok"}"#.into())),
        );
        let (monitor, indicator, log) = setup(transport.clone());
        let mut rx = indicator.subscribe();

        assert!(monitor.check().await);
        assert_eq!(indicator.current(), LinkState::Connected);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        for _ in 0..3 {
            assert!(!monitor.check().await);
        }
        assert_eq!(indicator.current(), LinkState::Disconnected);
        assert!(rx.has_changed().unwrap());

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].message.contains("Cannot connect"));
        assert_eq!(transport.calls(), 4);
        assert!(transport.requests().iter().all(|r| r.path == "/health"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_disconnected() {
        let transport = Arc::new(MockTransport::new(MockReply::Status(503, String::new())));
        let (monitor, indicator, _) = setup(transport);
        assert!(!monitor.check().await);
        assert_eq!(indicator.current(), LinkState::Disconnected);
    }

    #[test]
    fn test_indicator_set_reports_change() {
        let indicator = ConnectionIndicator::new();
        assert_eq!(indicator.current(), LinkState::Unknown);
        assert!(indicator.set(LinkState::Connected));
        assert!(!indicator.set(LinkState::Connected));
        assert!(indicator.set(LinkState::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_monitor_stops_probing() {
        let transport = Arc::new(MockTransport::ok("{}"));
        let (monitor, _, _) = setup(transport.clone());

        let handle = monitor.spawn(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(11)).await;
        let probes = transport.calls();
        assert!(probes >= 2);

        handle.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.calls(), probes);
    }
}
