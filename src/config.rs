//! Proxy Configuration

use serde::{Deserialize, Serialize};

use crate::locality::{detector_from_config, IpFamily, LocalTrafficDetector, LocalityError};

/// Node proxy rule-generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Node name
    pub node_name: String,
    /// Address range holding this cluster's workload addresses; absent
    /// disables local traffic detection
    pub cluster_cidr: Option<String>,
    /// Whether the rule engine operates in IPv6 mode
    pub ipv6: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            cluster_cidr: None,
            ipv6: false,
        }
    }
}

impl ProxyConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save to file
    pub fn save(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Address family of the rule engine this proxy drives
    pub fn family(&self) -> IpFamily {
        if self.ipv6 {
            IpFamily::V6
        } else {
            IpFamily::V4
        }
    }

    /// Build the local traffic detector selected by this configuration
    pub fn local_detector(&self) -> Result<Box<dyn LocalTrafficDetector>, LocalityError> {
        detector_from_config(self.cluster_cidr.as_deref(), self.family())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_disables_detection() {
        let config = ProxyConfig::default();
        let detector = config.local_detector().unwrap();
        assert!(!detector.is_active());
        assert!(detector.if_local().is_empty());
    }

    #[test]
    fn configured_cidr_enables_detection() {
        let config = ProxyConfig {
            cluster_cidr: Some("10.244.0.0/16".into()),
            ..Default::default()
        };
        let detector = config.local_detector().unwrap();
        assert!(detector.is_active());
        assert_eq!(detector.if_local(), &["-s", "10.244.0.0/16"]);
    }

    #[test]
    fn family_follows_ipv6_flag() {
        assert_eq!(ProxyConfig::default().family(), IpFamily::V4);

        let config = ProxyConfig {
            ipv6: true,
            cluster_cidr: Some("10.244.0.0/16".into()),
            ..Default::default()
        };
        assert_eq!(config.family(), IpFamily::V6);
        // a v4 range against an IPv6-mode engine is a configuration error
        assert!(config.local_detector().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ProxyConfig {
            node_name: "node-a".into(),
            cluster_cidr: Some("10.244.0.0/16".into()),
            ipv6: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ProxyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.cluster_cidr.as_deref(), Some("10.244.0.0/16"));
        assert_eq!(parsed.node_name, "node-a");
    }
}
