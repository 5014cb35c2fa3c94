//! Connection directory.
//!
//! Serves connection views to the host's session layer, backed by the
//! registry. Views are materialized lazily on first access and cached for
//! the owning session's lifetime; the registry stays authoritative — a
//! connection the registry no longer knows is never served from the cache.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use dynagate_core::{ConnectionDescriptor, ConnectionId, GateError, GateResult};

use crate::registry::ConnectionRegistry;

/// The single synthetic group every dynamic connection lives under.
/// The hierarchy is deliberately flat.
pub const ROOT_GROUP: &str = "ROOT";

/// Display-level view of a registered connection.
///
/// Carries no credentials: the session layer shows names, the proxy layer
/// reads full descriptors from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionView {
    pub id: ConnectionId,
    /// Derived display name, e.g. `Dynamic - SSH to bastion.example.com`.
    pub name: String,
    /// Always [`ROOT_GROUP`].
    pub parent: String,
    pub protocol: String,
    pub hostname: String,
}

/// Per-session directory of connection views.
pub struct ConnectionDirectory {
    registry: Arc<ConnectionRegistry>,
    views: RwLock<HashMap<ConnectionId, ConnectionView>>,
}

impl ConnectionDirectory {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            views: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the view for a connection.
    ///
    /// Consults the registry first and fails fast when the connection is
    /// gone, evicting any stale cached view, so an upstream invalidation is
    /// never papered over by this session's cache.
    pub async fn get(&self, id: &ConnectionId) -> GateResult<ConnectionView> {
        if !self.registry.exists(id).await {
            self.views.write().await.remove(id);
            return Err(GateError::NotFound(id.to_string()));
        }

        if let Some(view) = self.views.read().await.get(id) {
            return Ok(view.clone());
        }

        let descriptor = self.registry.get(id).await?;
        let view = materialize(id, &descriptor);
        debug!(id = %id, name = %view.name, "materialized connection view");
        self.views.write().await.insert(id.clone(), view.clone());
        Ok(view)
    }

    /// Views of every connection registered at call time.
    ///
    /// Each call re-enumerates the registry; the result is a snapshot, not
    /// a live cursor.
    pub async fn list(&self) -> Vec<ConnectionView> {
        self.registry
            .snapshot()
            .await
            .iter()
            .map(|(id, descriptor)| materialize(id, descriptor))
            .collect()
    }
}

fn materialize(id: &ConnectionId, descriptor: &ConnectionDescriptor) -> ConnectionView {
    ConnectionView {
        id: id.clone(),
        name: format!(
            "Dynamic - {} to {}",
            descriptor.protocol.to_uppercase(),
            descriptor.hostname
        ),
        parent: ROOT_GROUP.to_string(),
        protocol: descriptor.protocol.clone(),
        hostname: descriptor.hostname.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::{Duration, SystemTime};

    fn descriptor(protocol: &str, hostname: &str) -> ConnectionDescriptor {
        ConnectionDescriptor {
            protocol: protocol.to_string(),
            hostname: hostname.to_string(),
            port: 22,
            username: None,
            password: None,
            created_at: SystemTime::now(),
            extra_parameters: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn get_materializes_and_caches() {
        let registry = Arc::new(ConnectionRegistry::new());
        let id = registry.create(descriptor("ssh", "host-a")).await.unwrap();
        let directory = ConnectionDirectory::new(registry);

        let view = directory.get(&id).await.unwrap();
        assert_eq!(view.name, "Dynamic - SSH to host-a");
        assert_eq!(view.parent, ROOT_GROUP);

        // Second read hits the cache and agrees.
        assert_eq!(directory.get(&id).await.unwrap(), view);
    }

    #[tokio::test]
    async fn unknown_id_fails_fast() {
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = ConnectionDirectory::new(registry);
        let missing = ConnectionId::from("missing");
        assert!(matches!(
            directory.get(&missing).await,
            Err(GateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stale_cache_entry_never_outlives_the_registry() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut expired = descriptor("vnc", "host-b");
        expired.created_at = SystemTime::now() - Duration::from_secs(7200);
        let id = registry.create(expired).await.unwrap();

        let directory = ConnectionDirectory::new(registry.clone());
        directory.get(&id).await.unwrap();

        // The external sweeper removes the connection upstream.
        registry.sweep(Duration::from_secs(3600)).await;

        assert!(matches!(
            directory.get(&id).await,
            Err(GateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_reflects_registry_at_call_time() {
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = ConnectionDirectory::new(registry.clone());
        assert!(directory.list().await.is_empty());

        registry.create(descriptor("ssh", "a")).await.unwrap();
        registry.create(descriptor("rdp", "b")).await.unwrap();

        let mut names: Vec<String> =
            directory.list().await.into_iter().map(|v| v.name).collect();
        names.sort();
        assert_eq!(names, ["Dynamic - RDP to b", "Dynamic - SSH to a"]);
        assert!(directory
            .list()
            .await
            .iter()
            .all(|view| view.parent == ROOT_GROUP));
    }
}
