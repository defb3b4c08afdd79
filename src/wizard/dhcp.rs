//! DHCP setup wizard

use super::{require, ValidationLevel, WizardForm};
use crate::error::ValidationError;
use crate::validate::{first_invalid_ip, split_list, validate_cidr, validate_iface, validate_ip};
use serde::Serialize;

pub const DEFAULT_NETMASK: &str = "255.255.255.0";
pub const DEFAULT_LEASE: u32 = 600;
pub const DEFAULT_MAX_LEASE: u32 = 7200;

const MIN_POOL: u32 = 2;
const MAX_POOL: u32 = 65000;
const MIN_LEASE: u32 = 60;

const LIST_SEPARATORS: &[char] = &[','];

/// Netmask for the prefix of `cidr`.
///
/// Only /8, /16 and /24 through /30 are known. Every other prefix, and input
/// without a parsable prefix, gets `255.255.255.0`.
pub fn derive_netmask(cidr: &str) -> &'static str {
    let prefix = cidr
        .split_once('/')
        .and_then(|(_, prefix)| prefix.trim().parse::<u8>().ok());

    match prefix {
        Some(8) => "255.0.0.0",
        Some(16) => "255.255.0.0",
        Some(24) => "255.255.255.0",
        Some(25) => "255.255.255.128",
        Some(26) => "255.255.255.192",
        Some(27) => "255.255.255.224",
        Some(28) => "255.255.255.240",
        Some(29) => "255.255.255.248",
        Some(30) => "255.255.255.252",
        _ => DEFAULT_NETMASK,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DhcpWizardInput {
    pub network_cidr: String,
    pub router_ip: String,
    pub iface: String,
    /// Comma-separated DNS servers handed to clients
    pub dns_list: String,
    /// Comma-separated addresses kept out of the pool
    pub excluded: String,
    pub pool_size: Option<u32>,
    pub default_lease: Option<u32>,
    pub max_lease: Option<u32>,
}

impl DhcpWizardInput {
    fn leases(&self) -> (u32, u32) {
        (
            self.default_lease.unwrap_or(DEFAULT_LEASE),
            self.max_lease.unwrap_or(DEFAULT_MAX_LEASE),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpPayload {
    pub network_cidr: String,
    pub netmask: String,
    pub router_ip: String,
    pub iface: String,
    pub dns_list: String,
    pub excluded: String,
    pub pool_size: u32,
    pub default_lease: u32,
    pub max_lease: u32,
}

pub struct DhcpForm;

impl WizardForm for DhcpForm {
    type Input = DhcpWizardInput;
    type Payload = DhcpPayload;

    const NAME: &'static str = "DHCP";
    const ENDPOINT: &'static str = "/dhcp/configure";

    fn validate(input: &DhcpWizardInput, level: ValidationLevel) -> Result<(), ValidationError> {
        let cidr = input.network_cidr.trim();
        let router = input.router_ip.trim();
        let iface = input.iface.trim();

        // Required fields
        require(cidr, "network_cidr", "network (CIDR)")?;
        require(router, "router_ip", "router IP")?;
        require(iface, "iface", "interface")?;
        let pool_size = input
            .pool_size
            .ok_or_else(|| ValidationError::new("pool_size", "pool size is required"))?;

        if level == ValidationLevel::Basic {
            return Ok(());
        }

        // Format
        if !validate_cidr(cidr) {
            return Err(ValidationError::new(
                "network_cidr",
                format!("network '{cidr}' is not a valid CIDR (e.g. 192.168.1.0/24)"),
            ));
        }
        if !validate_ip(router) {
            return Err(ValidationError::new(
                "router_ip",
                format!("router IP '{router}' is not a valid IPv4 address"),
            ));
        }
        if !validate_iface(iface) {
            return Err(ValidationError::new(
                "iface",
                format!("interface '{iface}' must be 1-15 alphanumeric characters"),
            ));
        }

        // Range
        if !(MIN_POOL..=MAX_POOL).contains(&pool_size) {
            return Err(ValidationError::new(
                "pool_size",
                format!("pool size must be between {MIN_POOL} and {MAX_POOL}, got {pool_size}"),
            ));
        }
        let (default_lease, max_lease) = input.leases();
        if default_lease < MIN_LEASE {
            return Err(ValidationError::new(
                "default_lease",
                format!("default lease must be at least {MIN_LEASE} seconds"),
            ));
        }

        // Cross-field
        if max_lease < default_lease {
            return Err(ValidationError::new(
                "max_lease",
                format!("max lease ({max_lease}s) must not be shorter than default lease ({default_lease}s)"),
            ));
        }

        // List elements
        if let Some(bad) = first_invalid_ip(&input.dns_list, LIST_SEPARATORS) {
            return Err(ValidationError::new(
                "dns_list",
                format!("DNS server '{bad}' is not a valid IPv4 address"),
            ));
        }
        if let Some(bad) = first_invalid_ip(&input.excluded, LIST_SEPARATORS) {
            return Err(ValidationError::new(
                "excluded",
                format!("excluded address '{bad}' is not a valid IPv4 address"),
            ));
        }

        Ok(())
    }

    fn normalize(input: DhcpWizardInput) -> DhcpPayload {
        let (default_lease, max_lease) = input.leases();
        let network_cidr = input.network_cidr.trim().to_string();
        DhcpPayload {
            netmask: derive_netmask(&network_cidr).to_string(),
            network_cidr,
            router_ip: input.router_ip.trim().to_string(),
            iface: input.iface.trim().to_string(),
            dns_list: join_list(&input.dns_list),
            excluded: join_list(&input.excluded),
            pool_size: input.pool_size.unwrap_or_default(),
            default_lease,
            max_lease,
        }
    }
}

fn join_list(s: &str) -> String {
    split_list(s, LIST_SEPARATORS).collect::<Vec<_>>().join(",")
}
