//! Routing of inbound frames to the local sink.

use crate::error::DispatchError;
use crate::sink::LocalSink;
use eventbridge_core::{Address, Inbound, PayloadKind, ServerFrame, UnknownAddress};
use std::collections::HashMap;
use std::sync::Arc;

/// Where a publish on one address goes: its decoder and its local target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub address: Address,
    pub kind: PayloadKind,
}

/// Address string to route. A miss is a protocol violation.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<&'static str, Route>,
}

impl RoutingTable {
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        let routes = addresses
            .into_iter()
            .map(|address| {
                let route = Route {
                    address,
                    kind: address.payload_kind(),
                };
                (address.as_str(), route)
            })
            .collect();
        Self { routes }
    }

    pub fn lookup(&self, address: &str) -> Result<Route, UnknownAddress> {
        self.routes
            .get(address)
            .copied()
            .ok_or_else(|| UnknownAddress(address.to_string()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RoutingTable {
    /// Routes for every known address, including ones that are never registered.
    fn default() -> Self {
        Self::new(Address::ALL)
    }
}

/// Decodes inbound text frames and forwards payloads to the sink.
pub struct Dispatcher<S> {
    table: RoutingTable,
    sink: Arc<S>,
}

impl<S: LocalSink> Dispatcher<S> {
    pub fn new(table: RoutingTable, sink: Arc<S>) -> Self {
        Self { table, sink }
    }

    /// Handle one inbound frame.
    ///
    /// Returns the address published to, or `None` for control frames that
    /// need no delivery.
    pub fn dispatch(&self, text: &str) -> Result<Option<Address>, DispatchError> {
        match ServerFrame::parse(text)?.classify() {
            Inbound::Publish { address, body } => {
                let route = self.table.lookup(&address)?;
                let payload = route
                    .kind
                    .decode(body)
                    .map_err(|e| DispatchError::Decode {
                        address: route.address,
                        reason: e.to_string(),
                    })?;
                self.sink.publish(route.address, payload);
                Ok(Some(route.address))
            }
            Inbound::Pong => Ok(None),
            Inbound::Error { message } => Err(DispatchError::Server { message }),
            Inbound::Unaddressed => Err(DispatchError::MissingAddress),
        }
    }
}
