//! The server capability set: evaluate and store. Holds ciphertexts and the
//! public parameters, never a key.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::{EplqError, Result};
use crate::poe::QueryToken;
use crate::tree::{search, EncryptedMatch, SpatialTree};

/// Cooperative cancellation for an in-flight search. Cloneable; cancel from
/// any thread.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lifecycle of a single query on the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    TokenGenerated,
    Searching,
    Collecting,
    Completed,
    Failed,
}

/// Evaluation server configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineConfig {
    /// Worker threads for parallel subtree evaluation; `None` uses the
    /// default rayon pool sizing.
    pub worker_threads: Option<usize>,
}

/// Evaluator + Storage. Searches run against an atomically swapped tree
/// handle: a rebuild installs a new version without disturbing queries
/// already walking the old one.
pub struct Server {
    tree: RwLock<Arc<SpatialTree>>,
    pool: Option<rayon::ThreadPool>,
    query_counter: AtomicU64,
}

impl Server {
    pub fn new(tree: SpatialTree, cfg: EngineConfig) -> Result<Self> {
        let pool = match cfg.worker_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|_| EplqError::Setup("failed to build worker pool"))?,
            ),
            None => None,
        };
        Ok(Self {
            tree: RwLock::new(Arc::new(tree)),
            pool,
            query_counter: AtomicU64::new(0),
        })
    }

    /// Swap in a freshly built index. Readers that already hold the old
    /// `Arc` finish on the version they started with.
    pub fn install_tree(&self, tree: SpatialTree) {
        let tree = Arc::new(tree);
        info!(
            nodes = tree.node_count(),
            points = tree.point_count(),
            "installing new index version"
        );
        *self.tree.write().expect("tree lock poisoned") = tree;
    }

    /// Snapshot of the current index version.
    pub fn tree(&self) -> Arc<SpatialTree> {
        Arc::clone(&self.tree.read().expect("tree lock poisoned"))
    }

    /// Run one query to completion (or cancellation). Returns candidates in
    /// discovery order; ranking is the key holder's job after decryption.
    pub fn search(
        &self,
        token: &QueryToken,
        cancel: &CancelHandle,
    ) -> Result<Vec<EncryptedMatch>> {
        let query = self.query_counter.fetch_add(1, Ordering::Relaxed);
        let tree = self.tree();

        let mut state = QueryState::TokenGenerated;
        debug!(query, ?state, "query accepted");

        state = QueryState::Searching;
        debug!(query, ?state, "walking index");
        let outcome = match &self.pool {
            Some(pool) => pool.install(|| search(&tree, token, &cancel.0)),
            None => search(&tree, token, &cancel.0),
        };

        match outcome {
            Ok(matches) => {
                state = QueryState::Collecting;
                debug!(query, ?state, candidates = matches.len(), "merging results");
                state = QueryState::Completed;
                debug!(query, ?state, "query done");
                Ok(matches)
            }
            Err(err) => {
                state = QueryState::Failed;
                // Cancellation is a normal terminal state; anything else is
                // fatal to this query alone.
                debug!(query, ?state, %err, "query did not complete");
                Err(err)
            }
        }
    }
}
