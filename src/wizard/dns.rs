//! DNS zone wizard

use super::{require, ValidationLevel, WizardForm};
use crate::error::ValidationError;
use crate::validate::{first_invalid_ip, split_list, validate_domain, validate_hostname, validate_ip};
use serde::Serialize;

const FORWARDER_SEPARATORS: &[char] = &[',', ';'];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsWizardInput {
    pub domain: String,
    pub server_ip: String,
    /// Name server host label, e.g. `ns1`
    pub ns_host: String,
    /// Upstream resolvers, comma- or semicolon-separated
    pub forwarders: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsPayload {
    pub domain: String,
    pub server_ip: String,
    pub ns_host: String,
    pub forwarders: String,
}

pub struct DnsForm;

impl WizardForm for DnsForm {
    type Input = DnsWizardInput;
    type Payload = DnsPayload;

    const NAME: &'static str = "DNS";
    const ENDPOINT: &'static str = "/dns/configure";

    fn validate(input: &DnsWizardInput, level: ValidationLevel) -> Result<(), ValidationError> {
        let domain = input.domain.trim();
        let server_ip = input.server_ip.trim();
        let ns_host = input.ns_host.trim();

        require(domain, "domain", "domain")?;
        require(server_ip, "server_ip", "server IP")?;
        require(ns_host, "ns_host", "name server host")?;

        if level == ValidationLevel::Basic {
            return Ok(());
        }

        if !validate_domain(domain) {
            return Err(ValidationError::new(
                "domain",
                format!("domain '{domain}' is not valid (letters, digits, '-', '_' and '.', 2-254 characters)"),
            ));
        }
        if !validate_ip(server_ip) {
            return Err(ValidationError::new(
                "server_ip",
                format!("server IP '{server_ip}' is not a valid IPv4 address"),
            ));
        }
        if !validate_hostname(ns_host) {
            return Err(ValidationError::new(
                "ns_host",
                format!("name server host '{ns_host}' is not a valid host label"),
            ));
        }

        if let Some(bad) = first_invalid_ip(&input.forwarders, FORWARDER_SEPARATORS) {
            return Err(ValidationError::new(
                "forwarders",
                format!("forwarder '{bad}' is not a valid IPv4 address"),
            ));
        }

        Ok(())
    }

    fn normalize(input: DnsWizardInput) -> DnsPayload {
        DnsPayload {
            domain: input.domain.trim().to_string(),
            server_ip: input.server_ip.trim().to_string(),
            ns_host: input.ns_host.trim().to_string(),
            forwarders: split_list(&input.forwarders, FORWARDER_SEPARATORS)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}
