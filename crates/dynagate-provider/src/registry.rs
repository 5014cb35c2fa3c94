//! Connection registry.
//!
//! The single piece of mutable state shared across request tasks: a
//! process-wide map from connection ID to descriptor. Entries are created
//! by the gateway and read by the proxy/tunnel layer; expiry is driven by
//! an external sweeper calling [`ConnectionRegistry::sweep`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use dynagate_core::{ConnectionDescriptor, ConnectionId, GateError, GateResult};

/// Registry of provisioned dynamic connections.
///
/// Cheap to clone a handle to via `Arc`; all methods take `&self`. A reader
/// either sees no entry or a fully-populated descriptor — descriptors are
/// immutable once inserted.
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionDescriptor>>>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a descriptor under a freshly generated ID and return the ID.
    ///
    /// An ID collision (overwhelmingly improbable at 128 bits) fails the
    /// creation rather than clobbering the existing entry.
    pub async fn create(&self, descriptor: ConnectionDescriptor) -> GateResult<ConnectionId> {
        let id = ConnectionId::generate();
        let mut connections = self.connections.write().await;
        match connections.entry(id.clone()) {
            Entry::Occupied(_) => Err(GateError::Registry(format!(
                "connection id collision: {id}"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(descriptor);
                debug!(id = %id, "registered dynamic connection");
                Ok(id)
            }
        }
    }

    /// Fetch the descriptor registered under `id`.
    pub async fn get(&self, id: &ConnectionId) -> GateResult<ConnectionDescriptor> {
        let connections = self.connections.read().await;
        connections
            .get(id)
            .cloned()
            .ok_or_else(|| GateError::NotFound(id.to_string()))
    }

    /// Whether a connection is registered under `id`.
    pub async fn exists(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// IDs of all registered connections.
    pub async fn list_ids(&self) -> Vec<ConnectionId> {
        self.connections.read().await.keys().cloned().collect()
    }

    /// Snapshot of all registered connections at call time.
    pub async fn snapshot(&self) -> Vec<(ConnectionId, ConnectionDescriptor)> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(id, descriptor)| (id.clone(), descriptor.clone()))
            .collect()
    }

    /// Number of registered connections.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Remove connections older than `max_age`, returning the removed IDs.
    ///
    /// Expiry is a collaborator concern; the core flow never deletes.
    pub async fn sweep(&self, max_age: Duration) -> Vec<ConnectionId> {
        let mut connections = self.connections.write().await;
        let mut removed = Vec::new();

        connections.retain(|id, descriptor| {
            if descriptor.age() > max_age {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });

        if !removed.is_empty() {
            debug!(count = removed.len(), "swept expired dynamic connections");
        }

        removed
    }
}
