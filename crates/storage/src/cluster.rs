//! In-memory cluster and connections

use fsm_core::error::CommandResult;
use fsm_core::traits::{Client, Cluster, Database};
use fsm_core::types::Topology;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::database::MemoryDatabase;
use crate::server::{OpCounters, ServerState};

/// An in-process stand-in for a cluster under test
///
/// Every connection shares one [`ServerState`]. The reported topology only
/// changes what the harness believes about the cluster; storage behaves the
/// same either way.
///
/// # Example
///
/// ```
/// use fsm_storage::MemoryCluster;
/// use fsm_core::{Cluster, Topology};
///
/// let cluster = MemoryCluster::new();
/// let client = cluster.connect().unwrap();
/// assert_eq!(cluster.topology(), Topology::Standalone);
/// assert!(client.list_database_names().unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct MemoryCluster {
    server: Arc<ServerState>,
    topology: Topology,
    next_connection: AtomicU64,
}

impl MemoryCluster {
    /// Standalone cluster with empty state
    pub fn new() -> Self {
        Self::with_topology(Topology::Standalone)
    }

    /// Cluster reporting the given topology
    pub fn with_topology(topology: Topology) -> Self {
        MemoryCluster {
            server: Arc::new(ServerState::new()),
            topology,
            next_connection: AtomicU64::new(1),
        }
    }

    /// Shared server state, for inspection in tests
    pub fn server(&self) -> &Arc<ServerState> {
        &self.server
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl Cluster for MemoryCluster {
    fn connect(&self) -> CommandResult<Arc<dyn Client>> {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        self.server.total_connections.fetch_add(1, Ordering::Relaxed);
        self.server.current_connections.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(connection = id, "opened connection");
        Ok(Arc::new(MemoryClient {
            server: Arc::clone(&self.server),
            id,
        }))
    }

    fn topology(&self) -> Topology {
        self.topology
    }
}

/// One connection to a [`MemoryCluster`]
#[derive(Debug)]
pub struct MemoryClient {
    server: Arc<ServerState>,
    id: u64,
}

impl Client for MemoryClient {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn database(&self, name: &str) -> Arc<dyn Database> {
        Arc::new(MemoryDatabase::new(Arc::clone(&self.server), name))
    }

    fn list_database_names(&self) -> CommandResult<Vec<String>> {
        OpCounters::bump(&self.server.opcounters.command);
        self.server.failpoints.check("listDatabases")?;
        Ok(self.server.database_names())
    }

    fn drop_database(&self, name: &str) -> CommandResult<()> {
        self.database(name).drop_database()
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        self.server.current_connections.fetch_sub(1, Ordering::Relaxed);
        tracing::trace!(connection = self.id, "closed connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsm_core::doc;
    use fsm_core::traits::Collection;

    #[test]
    fn test_connections_are_distinct() {
        let cluster = MemoryCluster::new();
        let a = cluster.connect().unwrap();
        let b = cluster.connect().unwrap();
        assert_ne!(a.connection_id(), b.connection_id());
    }

    #[test]
    fn test_connection_counters() {
        let cluster = MemoryCluster::new();
        let a = cluster.connect().unwrap();
        {
            let _b = cluster.connect().unwrap();
            assert_eq!(cluster.server().current_connections.load(Ordering::Relaxed), 2);
        }
        assert_eq!(cluster.server().current_connections.load(Ordering::Relaxed), 1);
        assert_eq!(cluster.server().total_connections.load(Ordering::Relaxed), 2);
        drop(a);
    }

    #[test]
    fn test_connections_share_state() {
        let cluster = MemoryCluster::new();
        let a = cluster.connect().unwrap();
        let b = cluster.connect().unwrap();
        a.database("d").collection("c").insert_one(doc! { "x" => 1 }).unwrap();
        let seen = b.database("d").collection("c").count_documents(&doc! {}).unwrap();
        assert_eq!(seen, 1);
        assert_eq!(b.list_database_names().unwrap(), vec!["d".to_string()]);
    }

    #[test]
    fn test_drop_database_through_client() {
        let cluster = MemoryCluster::new();
        let client = cluster.connect().unwrap();
        client.database("d").collection("c").insert_one(doc! {}).unwrap();
        client.drop_database("d").unwrap();
        assert!(client.list_database_names().unwrap().is_empty());
    }

    #[test]
    fn test_reported_topology() {
        let cluster = MemoryCluster::with_topology(Topology::Sharded);
        assert!(cluster.topology().is_sharded());
    }
}
