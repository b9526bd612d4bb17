//! Fixed topic addresses carried over the bridge.

use crate::payload::PayloadKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical topic address on the remote bus.
///
/// The set is closed: the bridge only ever publishes to these five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Address {
    IntegrationInfoUpdated,
    ArtifactConfigUpdated,
    ArtifactStatusUpdated,
    ArtifactMetricUpdated,
    ArtifactTraceUpdated,
}

impl Address {
    /// Every known address, in a stable order.
    pub const ALL: [Address; 5] = [
        Address::IntegrationInfoUpdated,
        Address::ArtifactConfigUpdated,
        Address::ArtifactStatusUpdated,
        Address::ArtifactMetricUpdated,
        Address::ArtifactTraceUpdated,
    ];

    /// The wire string for this address.
    pub fn as_str(&self) -> &'static str {
        match self {
            Address::IntegrationInfoUpdated => "integration-info-updated",
            Address::ArtifactConfigUpdated => "artifact-config-updated",
            Address::ArtifactStatusUpdated => "artifact-status-updated",
            Address::ArtifactMetricUpdated => "artifact-metric-updated",
            Address::ArtifactTraceUpdated => "artifact-trace-updated",
        }
    }

    /// The payload kind published under this address.
    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            Address::IntegrationInfoUpdated => PayloadKind::IntegrationInfo,
            Address::ArtifactConfigUpdated => PayloadKind::ArtifactConfig,
            Address::ArtifactStatusUpdated => PayloadKind::ArtifactStatus,
            Address::ArtifactMetricUpdated => PayloadKind::ArtifactMetric,
            Address::ArtifactTraceUpdated => PayloadKind::ArtifactTrace,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Address {
    type Err = UnknownAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAddress(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = UnknownAddress;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.as_str().to_string()
    }
}

/// An address string outside the fixed table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bridge address: {0}")]
pub struct UnknownAddress(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known() {
        let a: Address = "artifact-metric-updated".parse().unwrap();
        assert_eq!(a, Address::ArtifactMetricUpdated);
        assert_eq!(a.payload_kind(), PayloadKind::ArtifactMetric);
    }

    #[test]
    fn parse_unknown() {
        let err = "unknown-topic".parse::<Address>().unwrap_err();
        assert_eq!(err, UnknownAddress("unknown-topic".into()));
    }

    #[test]
    fn wire_strings_are_distinct() {
        for a in Address::ALL {
            assert_eq!(a.as_str().parse::<Address>().unwrap(), a);
        }
    }
}
