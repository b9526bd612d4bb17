//! Addresses the tunnel registers on every connect.

use eventbridge_core::{Address, ClientFrame, PayloadKind};

/// An address the client declares interest in, with the payload it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub address: Address,
    pub kind: PayloadKind,
}

impl SubscriptionEntry {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            kind: address.payload_kind(),
        }
    }
}

/// Fixed, ordered set of registrations.
///
/// Replayed in full after every successful open. The server treats a repeat
/// registration as a no-op, so nothing is deduplicated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRegistry {
    entries: Vec<SubscriptionEntry>,
}

impl SubscriptionRegistry {
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            entries: addresses.into_iter().map(SubscriptionEntry::new).collect(),
        }
    }

    pub fn entries(&self) -> &[SubscriptionEntry] {
        &self.entries
    }

    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.iter().map(|e| e.address)
    }

    /// One register frame per entry, in registry order.
    pub fn register_frames(&self) -> impl Iterator<Item = (Address, ClientFrame)> + '_ {
        self.addresses()
            .map(|a| (a, ClientFrame::register(a.as_str())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SubscriptionRegistry {
    /// The artifact topics.
    ///
    /// `integration-info-updated` is dispatched when it arrives but is not
    /// registered here; the server pushes it without a registration.
    fn default() -> Self {
        Self::new([
            Address::ArtifactConfigUpdated,
            Address::ArtifactStatusUpdated,
            Address::ArtifactMetricUpdated,
            Address::ArtifactTraceUpdated,
        ])
    }
}
