//! Traffic Locality Detection
//!
//! Decides, for each NAT/firewall rule the proxy emits, whether the rule
//! should match traffic sourced from a workload on this node. A detector is
//! built once during (re)configuration, is immutable afterwards, and is
//! queried repeatedly while rules are emitted.

use std::fmt;

use ipnetwork::{IpNetwork, IpNetworkError};
use thiserror::Error;

/// IP address family of the rule-engine context a detector is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    /// IPv4 rule engine
    V4,
    /// IPv6 rule engine
    V6,
}

impl IpFamily {
    /// Family implied by a CIDR string's textual form.
    ///
    /// Only the address part is inspected, so a string that later fails to
    /// parse still has a well-defined textual family.
    pub fn of_cidr(cidr: &str) -> IpFamily {
        let addr = cidr.split_once('/').map(|(addr, _)| addr).unwrap_or(cidr);
        if addr.contains(':') {
            IpFamily::V6
        } else {
            IpFamily::V4
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "IPv4"),
            IpFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Errors rejecting a detector's configured address range.
///
/// Both variants are construction-time only; a constructed detector cannot
/// fail. Callers must treat either as fatal to the reconfiguration rather
/// than falling back to the no-op strategy.
#[derive(Debug, Error)]
pub enum LocalityError {
    /// The range's family differs from the rule-engine context family.
    #[error("CIDR {cidr} has wrong IP family: expected {expected}")]
    FamilyMismatch {
        /// The rejected range, as supplied
        cidr: String,
        /// The family the rule-engine context requires
        expected: IpFamily,
    },

    /// The range is not a valid address + prefix.
    #[error("invalid CIDR {cidr}: {source}")]
    MalformedCidr {
        /// The rejected range, as supplied
        cidr: String,
        /// Underlying parse failure
        source: IpNetworkError,
    },
}

/// The empty match predicate: imposes no constraint, so it matches all
/// traffic.
///
/// Inactive detectors return this from both predicate queries. Rule
/// emission must splice it in as "no additional match", never as "match
/// nothing".
pub static MATCH_ALL: [String; 0] = [];

/// Capability contract consulted while emitting locality-aware rules.
///
/// Implementations are immutable value objects: every operation is total,
/// side-effect-free, returns value-equal results on repeated calls, and is
/// safe to share across threads without locking.
pub trait LocalTrafficDetector: Send + Sync {
    /// Whether this detector performs real discrimination. When false,
    /// local and non-local traffic are indistinguishable and callers can
    /// skip emitting locality-specific rule variants.
    fn is_active(&self) -> bool;

    /// Match arguments selecting traffic that originated on this node.
    fn if_local(&self) -> &[String];

    /// Match arguments selecting traffic that did not originate on this
    /// node.
    fn if_not_local(&self) -> &[String];
}

/// Detector used when no locality detection mechanism is configured.
///
/// Reports itself inactive; both predicates are [`MATCH_ALL`], so every
/// rule treats local and non-local sources uniformly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLocalDetector;

impl NoOpLocalDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LocalTrafficDetector for NoOpLocalDetector {
    fn is_active(&self) -> bool {
        false
    }

    fn if_local(&self) -> &[String] {
        &MATCH_ALL
    }

    fn if_not_local(&self) -> &[String] {
        &MATCH_ALL
    }
}

/// Detects local traffic as traffic sourced from a single address range.
///
/// Suitable when one CIDR captures everything that counts as local on this
/// node, e.g. the cluster's workload allocation range.
#[derive(Debug)]
pub struct CidrLocalDetector {
    if_local: Vec<String>,
    if_not_local: Vec<String>,
}

impl CidrLocalDetector {
    /// Validate `cidr` against the rule-engine family and cache the match
    /// arguments.
    ///
    /// The supplied string is carried verbatim into the emitted arguments;
    /// `10.0.0.1/8` stays `10.0.0.1/8`, never a normalized form.
    pub fn new(cidr: &str, family: IpFamily) -> Result<Self, LocalityError> {
        if IpFamily::of_cidr(cidr) != family {
            return Err(LocalityError::FamilyMismatch {
                cidr: cidr.to_string(),
                expected: family,
            });
        }
        cidr.parse::<IpNetwork>()
            .map_err(|source| LocalityError::MalformedCidr {
                cidr: cidr.to_string(),
                source,
            })?;

        Ok(Self {
            if_local: vec!["-s".to_string(), cidr.to_string()],
            if_not_local: vec!["!".to_string(), "-s".to_string(), cidr.to_string()],
        })
    }
}

impl LocalTrafficDetector for CidrLocalDetector {
    fn is_active(&self) -> bool {
        true
    }

    fn if_local(&self) -> &[String] {
        &self.if_local
    }

    fn if_not_local(&self) -> &[String] {
        &self.if_not_local
    }
}

/// Build the detector selected by the proxy configuration.
///
/// An absent cluster CIDR selects the no-op strategy: every rule is emitted
/// in its uniform, non-discriminating form. A present CIDR selects
/// range-based detection; validation errors propagate to the caller.
pub fn detector_from_config(
    cluster_cidr: Option<&str>,
    family: IpFamily,
) -> Result<Box<dyn LocalTrafficDetector>, LocalityError> {
    match cluster_cidr {
        Some(cidr) => {
            let detector = CidrLocalDetector::new(cidr, family)?;
            tracing::info!(cidr = %cidr, "Detecting local traffic by cluster CIDR");
            Ok(Box::new(detector))
        }
        None => {
            tracing::info!("No cluster CIDR configured, local traffic detection disabled");
            Ok(Box::new(NoOpLocalDetector::new()))
        }
    }
}
