//! Syntactic checks for wizard input

use regex::Regex;
use std::sync::LazyLock;

const OCTET: &str = r"(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])";

static IP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({OCTET}\.){{3}}{OCTET}$")).expect("valid IPv4 pattern")
});

static CIDR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({OCTET}\.){{3}}{OCTET}/(3[0-2]|[12]?[0-9])$"))
        .expect("valid CIDR pattern")
});

static IFACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,15}$").expect("valid interface pattern"));

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*[A-Za-z0-9]$").expect("valid domain pattern")
});

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])$")
        .expect("valid hostname pattern")
});

/// Dotted quad, every octet 0-255
pub fn validate_ip(s: &str) -> bool {
    IP_RE.is_match(s)
}

/// Dotted quad followed by a `/0`..`/32` prefix
pub fn validate_cidr(s: &str) -> bool {
    CIDR_RE.is_match(s)
}

/// Alphanumeric, 1 to 15 characters
pub fn validate_iface(s: &str) -> bool {
    IFACE_RE.is_match(s)
}

pub fn validate_domain(s: &str) -> bool {
    s.len() > 1 && s.len() < 255 && DOMAIN_RE.is_match(s)
}

pub fn validate_hostname(s: &str) -> bool {
    !s.is_empty() && s.len() < 64 && HOSTNAME_RE.is_match(s)
}

/// Split a user-entered address list, dropping blank entries
pub fn split_list<'a>(s: &'a str, separators: &'a [char]) -> impl Iterator<Item = &'a str> + 'a {
    s.split(separators).map(str::trim).filter(|item| !item.is_empty())
}

/// First entry in the list that is not a valid address
pub fn first_invalid_ip<'a>(s: &'a str, separators: &'a [char]) -> Option<&'a str> {
    split_list(s, separators).find(|ip| !validate_ip(ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ip() {
        assert!(validate_ip("192.168.1.1"));
        assert!(validate_ip("0.0.0.0"));
        assert!(validate_ip("255.255.255.255"));
        assert!(!validate_ip("256.1.1.1"));
        assert!(!validate_ip("192.168.1"));
        assert!(!validate_ip("192.168.1.1.1"));
        assert!(!validate_ip("192.168.01.1"));
        assert!(!validate_ip("a.b.c.d"));
        assert!(!validate_ip(" 10.0.0.1"));
        assert!(!validate_ip(""));
    }

    #[test]
    fn test_validate_cidr() {
        assert!(validate_cidr("192.168.10.0/24"));
        assert!(validate_cidr("10.0.0.0/8"));
        assert!(validate_cidr("0.0.0.0/0"));
        assert!(validate_cidr("10.1.2.3/32"));
        assert!(!validate_cidr("192.168.10.0/33"));
        assert!(!validate_cidr("192.168.10.0"));
        assert!(!validate_cidr("192.168.10.0/"));
        assert!(!validate_cidr("300.168.10.0/24"));
    }

    #[test]
    fn test_validate_iface() {
        assert!(validate_iface("eth0"));
        assert!(validate_iface("enp0s3"));
        assert!(!validate_iface(""));
        assert!(!validate_iface("br-lan"));
        assert!(!validate_iface("abcdefghijklmnop"));
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("lab.local"));
        assert!(validate_domain("my_zone-1.example.org"));
        assert!(!validate_domain("a"));
        assert!(!validate_domain(".local"));
        assert!(!validate_domain("lab.local."));
        assert!(!validate_domain(&"a".repeat(255)));
    }

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("ns1"));
        assert!(validate_hostname("n"));
        assert!(!validate_hostname(""));
        assert!(!validate_hostname("-ns"));
        assert!(!validate_hostname("ns.lab"));
        assert!(!validate_hostname(&"a".repeat(64)));
    }

    #[test]
    fn test_lists() {
        let items: Vec<_> = split_list(" 8.8.8.8, ,1.1.1.1 ", &[',']).collect();
        assert_eq!(items, vec!["8.8.8.8", "1.1.1.1"]);
        assert_eq!(first_invalid_ip("8.8.8.8;9.9.9.999", &[',', ';']), Some("9.9.9.999"));
        assert_eq!(first_invalid_ip("", &[',']), None);
    }
}
