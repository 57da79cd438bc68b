//! Scan configuration.
//!
//! Loaded from YAML by [`crate::config_loader::load_config`] and turned
//! into [`DiscoveryOptions`] for the crawl.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fabric::{DiscoveryOptions, Probe, ScanProfile};
use crate::interface::NeighborDescriptor;
use crate::session::{Credential, TransportOptions};

/// Top-level scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Addresses or names the crawl starts from
    pub seeds: Vec<String>,
    /// Tried in order on every device
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub transports: Vec<TransportOptions>,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,
    #[serde(default)]
    pub scan: ScanSelection,
    #[serde(default)]
    pub neighbor_filter: NeighborFilterConfig,
    /// Directory of per-device snapshot files
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
}

fn default_parallelism() -> usize {
    10
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

/// Which probes to run. A whitelist wins over a blacklist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSelection {
    pub whitelist: Option<Vec<Probe>>,
    pub blacklist: Option<Vec<Probe>>,
}

impl ScanSelection {
    pub fn profile(&self) -> ScanProfile {
        match (&self.whitelist, &self.blacklist) {
            (Some(whitelist), _) => ScanProfile::whitelist(whitelist.iter().copied()),
            (None, Some(blacklist)) => ScanProfile::blacklist(blacklist.iter().copied()),
            (None, None) => ScanProfile::all(),
        }
    }
}

/// Neighbors matching any of these patterns are not crawled
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeighborFilterConfig {
    #[serde(default)]
    pub hostname: Vec<String>,
    #[serde(default)]
    pub platform: Vec<String>,
}

impl NeighborFilterConfig {
    pub fn compile(&self) -> Result<NeighborFilter, ValidationError> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).map_err(|e| ValidationError::InvalidFilter(format!("'{}': {}", p, e))))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(NeighborFilter {
            hostname: compile(&self.hostname)?,
            platform: compile(&self.platform)?,
        })
    }
}

/// Compiled neighbor exclusion rules
#[derive(Debug, Clone, Default)]
pub struct NeighborFilter {
    hostname: Vec<Regex>,
    platform: Vec<Regex>,
}

impl NeighborFilter {
    /// Whether the crawl should follow this neighbor
    pub fn allows(&self, neighbor: &NeighborDescriptor) -> bool {
        !self.hostname.iter().any(|r| r.is_match(&neighbor.hostname))
            && !self.platform.iter().any(|r| r.is_match(&neighbor.platform))
    }
}

impl ScanConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seeds.is_empty() {
            return Err(ValidationError::InvalidSeeds("at least one seed is required".to_string()));
        }
        if let Some(seed) = self.seeds.iter().find(|s| s.trim().is_empty()) {
            return Err(ValidationError::InvalidSeeds(format!("empty seed '{}'", seed)));
        }

        if self.credentials.is_empty() {
            return Err(ValidationError::InvalidCredentials(
                "at least one credential is required".to_string(),
            ));
        }
        if self.credentials.iter().any(|c| c.username.is_empty()) {
            return Err(ValidationError::InvalidCredentials("username cannot be empty".to_string()));
        }

        if self.parallelism == 0 {
            return Err(ValidationError::InvalidParallelism(
                "parallelism must be at least 1".to_string(),
            ));
        }

        if let Some(whitelist) = &self.scan.whitelist {
            if whitelist.is_empty() {
                return Err(ValidationError::InvalidScanProfile(
                    "whitelist cannot be an empty list".to_string(),
                ));
            }
        }

        self.neighbor_filter.compile()?;
        Ok(())
    }

    /// Crawl options for this configuration
    pub fn to_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            credentials: self.credentials.clone(),
            transports: self.transports.clone(),
            scan: self.scan.profile(),
            parallelism: self.parallelism,
            session_timeout: Some(self.session_timeout),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid seeds: {0}")]
    InvalidSeeds(String),
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Invalid parallelism: {0}")]
    InvalidParallelism(String),
    #[error("Invalid scan profile: {0}")]
    InvalidScanProfile(String),
    #[error("Invalid neighbor filter: {0}")]
    InvalidFilter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
seeds: [10.0.0.1, core-sw]
credentials:
  - username: admin
    password: secret
  - username: backup
    password: other
transports:
  - protocol: ssh
  - protocol: telnet
    port: 2323
session_timeout: 5s
scan:
  blacklist: [inventory, local_admins]
neighbor_filter:
  platform: ["(?i)phone", "AIR-"]
"#;

    fn sample() -> ScanConfig {
        serde_yaml::from_str(CONFIG).unwrap()
    }

    #[test]
    fn test_parse_and_defaults() {
        let config = sample();
        assert_eq!(config.seeds.len(), 2);
        assert_eq!(config.parallelism, 10);
        assert_eq!(config.session_timeout, Duration::from_secs(5));
        assert_eq!(config.snapshot_dir, PathBuf::from("snapshots"));
        assert_eq!(config.transports[1].port, Some(2323));
        config.validate().unwrap();
    }

    #[test]
    fn test_to_options() {
        let options = sample().to_options();
        assert_eq!(options.credentials[1].username, "backup");
        assert_eq!(options.session_timeout, Some(Duration::from_secs(5)));
        assert!(!options.scan.includes(Probe::Inventory));
        assert!(options.scan.includes(Probe::MacAddress));
    }

    #[test]
    fn test_whitelist_wins() {
        let selection = ScanSelection {
            whitelist: Some(vec![Probe::CdpNeighbors]),
            blacklist: Some(vec![Probe::CdpNeighbors]),
        };
        let profile = selection.profile();
        assert!(profile.includes(Probe::CdpNeighbors));
        assert_eq!(profile.probes().count(), 1);
    }

    #[test]
    fn test_neighbor_filter() {
        let filter = sample().neighbor_filter.compile().unwrap();
        let neighbor = |hostname: &str, platform: &str| NeighborDescriptor {
            hostname: hostname.to_string(),
            ip: None,
            platform: platform.to_string(),
            remote_interface: "Port 1".to_string(),
        };
        assert!(!filter.allows(&neighbor("SEP001122334455", "Cisco IP Phone 8845")));
        assert!(!filter.allows(&neighbor("ap-1", "cisco AIR-AP2802I")));
        assert!(filter.allows(&neighbor("sw2", "cisco WS-C2960X-48FPD-L")));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = sample();
        config.parallelism = 0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidParallelism(_))));

        let mut config = sample();
        config.seeds.clear();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidSeeds(_))));

        let mut config = sample();
        config.neighbor_filter.hostname.push("(".to_string());
        assert!(matches!(config.validate(), Err(ValidationError::InvalidFilter(_))));

        let mut config = sample();
        config.scan.whitelist = Some(Vec::new());
        assert!(matches!(config.validate(), Err(ValidationError::InvalidScanProfile(_))));
    }
}
