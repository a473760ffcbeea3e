//! Node Proxy - Traffic Locality Detection
//!
//! Building blocks for a node-local service proxy that emits firewall/NAT
//! rules. Some of those rules must behave differently depending on whether
//! the matched traffic originated from a workload on this node (e.g.
//! skipping source-NAT for node-local traffic). Detectors describe that
//! distinction as rule-engine match arguments; they never build or apply
//! rules themselves.
//!
//! ```text
//! ProxyConfig ──▶ detector_from_config ──▶ Box<dyn LocalTrafficDetector>
//!                                                     │
//!                         rule emission ◀─────────────┘
//!                 (if_local / if_not_local spliced into each
//!                  locality-aware rule's match conditions)
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod locality;

pub use config::ProxyConfig;
pub use locality::{
    detector_from_config, CidrLocalDetector, IpFamily, LocalTrafficDetector, LocalityError,
    NoOpLocalDetector, MATCH_ALL,
};
