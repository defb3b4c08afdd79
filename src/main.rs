//! netpanel - control panel client for a DHCP/DNS management backend
//!
//! Starts, stops and installs the DHCP and DNS services, shows their logs,
//! edits their configuration files and runs the setup wizards, all through
//! the backend's REST API.

mod config;
mod error;
mod gateway;
mod health;
mod http;
mod output;
mod services;
mod session;
mod validate;
mod wizard;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use error::{PanelError, ValidationError};
use gateway::Gateway;
use health::{ConnectionIndicator, HealthMonitor, LinkState};
use output::OutputLog;
use services::{ConfigEditor, ServiceAction, ServiceCommand, ServiceTarget};
use session::Session;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wizard::{DhcpForm, DhcpWizardInput, DnsForm, DnsWizardInput, Wizard, WizardForm};

#[derive(Parser, Debug)]
#[command(name = "netpanel")]
#[command(about = "DHCP/DNS service control panel", long_about = None)]
struct Args {
    /// Config file path (default: search netpanel.toml, ~/.config, /etc)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify an access key with the backend and keep it for this session
    Login { key: String },

    /// Keep an access key without verifying it
    UseKey { key: String },

    /// Forget the access key
    Logout,

    /// Check once whether the backend is reachable
    Health,

    /// Keep checking the backend until interrupted
    Watch {
        /// Seconds between checks (default from config)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run a service command
    Service {
        #[arg(value_enum)]
        target: ServiceTarget,
        #[arg(value_enum)]
        action: ServiceAction,
    },

    /// Show recent service output
    Logs,

    /// Print a configuration file held by the backend
    ConfigShow { file: String },

    /// Replace a configuration file held by the backend
    ConfigSave {
        file: String,
        /// Read the new contents from this file instead of stdin
        #[arg(long = "from")]
        source: Option<PathBuf>,
    },

    /// Configure the DHCP server
    DhcpWizard(DhcpArgs),

    /// Configure a DNS zone
    DnsWizard(DnsArgs),

    /// Show the netmask the DHCP wizard derives for a network
    Netmask { cidr: String },
}

#[derive(clap::Args, Debug)]
struct DhcpArgs {
    /// Network in CIDR notation, e.g. 192.168.1.0/24
    #[arg(long, default_value = "")]
    network: String,
    #[arg(long, default_value = "")]
    router: String,
    #[arg(long, default_value = "")]
    iface: String,
    /// Comma-separated DNS servers for clients
    #[arg(long, default_value = "")]
    dns: String,
    /// Comma-separated addresses to keep out of the pool
    #[arg(long, default_value = "")]
    excluded: String,
    #[arg(long)]
    pool_size: Option<u32>,
    /// Seconds
    #[arg(long)]
    default_lease: Option<u32>,
    /// Seconds
    #[arg(long)]
    max_lease: Option<u32>,
}

impl From<DhcpArgs> for DhcpWizardInput {
    fn from(args: DhcpArgs) -> Self {
        Self {
            network_cidr: args.network,
            router_ip: args.router,
            iface: args.iface,
            dns_list: args.dns,
            excluded: args.excluded,
            pool_size: args.pool_size,
            default_lease: args.default_lease,
            max_lease: args.max_lease,
        }
    }
}

#[derive(clap::Args, Debug)]
struct DnsArgs {
    #[arg(long, default_value = "")]
    domain: String,
    #[arg(long, default_value = "")]
    server_ip: String,
    /// Name server host label, e.g. ns1
    #[arg(long, default_value = "")]
    ns_host: String,
    /// Upstream resolvers, separated by ',' or ';'
    #[arg(long, default_value = "")]
    forwarders: String,
}

impl From<DnsArgs> for DnsWizardInput {
    fn from(args: DnsArgs) -> Self {
        Self {
            domain: args.domain,
            server_ip: args.server_ip,
            ns_host: args.ns_host,
            forwarders: args.forwarders,
        }
    }
}

/// Everything a command needs, wired together once
struct Panel {
    cfg: config::Config,
    gateway: Arc<Gateway>,
    monitor: Arc<HealthMonitor>,
}

fn build_panel(cfg: config::Config) -> Result<Panel> {
    let transport: Arc<dyn http::Transport> = Arc::new(
        http::HttpClient::new(
            &cfg.backend.base_url(),
            cfg.backend.timeout(),
            cfg.backend.connect_timeout(),
        )
        .context("Failed to build HTTP client")?,
    );

    let session = Arc::new(Session::from_config(&cfg.auth));
    // A restored key is not re-verified with the backend
    if session.restore().context("Failed to read session")? {
        tracing::debug!("Using access key from previous login");
    }

    let log = Arc::new(OutputLog::new(cfg.output.max_entries));
    let indicator = Arc::new(ConnectionIndicator::new());
    let gateway = Arc::new(Gateway::new(
        transport.clone(),
        session,
        log.clone(),
        indicator.clone(),
        &cfg.auth,
    ));
    let monitor = Arc::new(HealthMonitor::new(
        transport,
        cfg.backend.health_path.clone(),
        indicator,
        log,
    ));

    Ok(Panel {
        cfg,
        gateway,
        monitor,
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let cfg = config::Config::load(args.config.as_deref())?;

    // Initialize logging; stdout is reserved for the output log
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Backend: {}", cfg.backend.base_url());

    let panel = build_panel(cfg)?;
    let outcome = execute(&panel, args.command).await;

    let log = panel.gateway.log();
    if !log.is_empty() {
        println!("{}", log.render());
    }

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{:#}", e);
            if e.downcast_ref::<PanelError>().is_some_and(PanelError::is_connectivity) {
                tracing::info!("Is the backend running at {}?", panel.cfg.backend.base_url());
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(panel: &Panel, command: Command) -> Result<()> {
    let gateway = &panel.gateway;
    let log = gateway.log();
    let session = gateway.session();

    match command {
        Command::Login { key } => {
            gateway
                .login(&key)
                .await
                .inspect_err(|e| log.error(None, login_message(e)))?;
            log.info(None, "Access key accepted");
        }
        Command::UseKey { key } => {
            session
                .use_key(&key)
                .inspect_err(|e| log.error(None, e.to_string()))?;
            log.info(None, "Access key saved");
        }
        Command::Logout => {
            if !session.is_authenticated() {
                tracing::debug!("No access key was set");
            }
            session
                .logout()
                .inspect_err(|e| log.error(None, e.to_string()))?;
            log.info(None, "Logged out");
        }
        Command::Health => {
            panel.monitor.check().await;
            let state = gateway.indicator().current();
            tracing::info!("{}", state);
            if state != LinkState::Connected {
                return Err(PanelError::Connectivity("health check failed".into()).into());
            }
        }
        Command::Watch { interval } => {
            let every = Duration::from_secs(interval.unwrap_or(panel.cfg.monitor.interval).max(1));
            watch(panel, every).await?;
        }
        Command::Service { target, action } => {
            let command = ServiceCommand::new(target, action);
            let reply = services::run(gateway, command).await?;
            tracing::info!("{} finished as #{} ({})", command, reply.seq, reply.status);
        }
        Command::Logs => {
            services::logs(gateway).await?;
        }
        Command::ConfigShow { file } => {
            let editor = ConfigEditor::new(gateway, &panel.cfg.editor);
            let content = editor.load(&file).await?;
            tracing::info!("Loaded {} ({} bytes)", file, content.len());
        }
        Command::ConfigSave { file, source } => {
            let content = match source {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read new contents from stdin")?;
                    buf
                }
            };
            let editor = ConfigEditor::new(gateway, &panel.cfg.editor);
            editor.save(&file, &content).await?;
        }
        Command::DhcpWizard(args) => {
            run_wizard(Wizard::<DhcpForm>::new(panel.cfg.wizard.validation), args.into(), gateway).await?;
        }
        Command::DnsWizard(args) => {
            run_wizard(Wizard::<DnsForm>::new(panel.cfg.wizard.validation), args.into(), gateway).await?;
        }
        Command::Netmask { cidr } => {
            if !validate::validate_cidr(cidr.trim()) {
                let err = ValidationError::new("cidr", format!("'{}' is not a valid CIDR", cidr));
                log.error(None, err.to_string());
                return Err(PanelError::from(err).into());
            }
            log.info(None, format!("{} -> {}", cidr.trim(), wizard::derive_netmask(&cidr)));
        }
    }

    Ok(())
}

/// One pass through a wizard; the CLI has no form to reopen, so a rejected
/// input is reported and the command fails
async fn run_wizard<F: WizardForm>(
    mut wizard: Wizard<F>,
    input: F::Input,
    gateway: &Gateway,
) -> Result<(), PanelError> {
    wizard.open();
    let outcome = wizard.submit(input, gateway).await;
    if let Some(message) = wizard.last_error() {
        tracing::info!("{} wizard not submitted: {}. Fix it and run the command again", F::NAME, message);
    }
    outcome.map(drop)
}

fn login_message(e: &PanelError) -> String {
    match e {
        PanelError::InvalidKey => "Wrong access key".to_string(),
        other => other.to_string(),
    }
}

/// Probe on an interval, streaming state changes until Ctrl-C
async fn watch(panel: &Panel, every: Duration) -> Result<()> {
    let log = panel.gateway.log();
    let mut changes = panel.gateway.indicator().subscribe();

    tracing::info!("Checking backend every {}s, Ctrl-C to stop", every.as_secs());
    let handle = panel.monitor.clone().spawn(every);

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl-C")?;
                break;
            }
            res = changes.changed() => {
                if res.is_err() {
                    break;
                }
                let state = *changes.borrow_and_update();
                println!("{}", state);
                for entry in log.drain_chronological() {
                    println!("{}\n", entry);
                }
            }
        }
    }

    handle.stop();
    Ok(())
}
