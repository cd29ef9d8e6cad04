//! Shared network state: node set, epoch cache and agreed node config.
//!
//! Only the handshake writes here. Readers take cheap snapshots under a read
//! lock; writers hold the write lock just long enough to swap the fields.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::network::epoch::EpochCache;
use crate::network::handshake::CoreNodeConfig;
use crate::network::node_set::NodeSet;

/// Point-in-time copy of the network state.
#[derive(Debug, Clone, Default)]
pub struct NetworkSnapshot {
    pub node_set: NodeSet,
    pub epoch_cache: EpochCache,
    pub core_config: Option<CoreNodeConfig>,
    /// Incremented on every successful handshake.
    pub generation: u64,
}

impl NetworkSnapshot {
    pub fn is_connected(&self) -> bool {
        self.core_config.is_some()
    }
}

/// Single-writer, many-reader holder of [`NetworkSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct NetworkState {
    inner: Arc<RwLock<NetworkSnapshot>>,
    handshake_lock: Arc<Mutex<()>>,
    generation: Arc<AtomicU64>,
}

impl NetworkState {
    pub fn new(node_set: NodeSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(NetworkSnapshot {
                node_set,
                ..NetworkSnapshot::default()
            })),
            handshake_lock: Arc::new(Mutex::new(())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Last-known-good state.
    pub async fn snapshot(&self) -> NetworkSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn node_set(&self) -> NodeSet {
        self.inner.read().await.node_set.clone()
    }

    pub async fn epoch_cache(&self) -> EpochCache {
        self.inner.read().await.epoch_cache
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Serialize handshakes. Held for the whole handshake, not just the write.
    pub(crate) async fn lock_handshake(&self) -> MutexGuard<'_, ()> {
        self.handshake_lock.lock().await
    }

    /// Publish the result of a handshake. Returns the new generation.
    pub(crate) async fn publish(
        &self,
        node_set: Option<NodeSet>,
        epoch_cache: EpochCache,
        core_config: CoreNodeConfig,
    ) -> u64 {
        let mut guard = self.inner.write().await;
        if let Some(node_set) = node_set {
            guard.node_set = node_set;
        }
        guard.epoch_cache = epoch_cache;
        guard.core_config = Some(core_config);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        guard.generation = generation;
        generation
    }

    /// Drop everything learned from the network, keeping the node set.
    pub async fn reset(&self) {
        let _handshake = self.lock_handshake().await;
        let mut guard = self.inner.write().await;
        guard.epoch_cache = EpochCache::default();
        guard.core_config = None;
    }
}
