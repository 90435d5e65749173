//! Process-Wide Cached Connection to the Shared Document Store
//!
//! Stateless handlers in recycled execution contexts cannot afford to open a
//! fresh database connection per invocation, but a cached connection may
//! have had its transport silently killed between invocations. This module
//! provides a single validated-before-reuse handle per process:
//!
//! - first acquisition opens and caches a handle
//! - later acquisitions race a cheap liveness probe against a short timer;
//!   a probe that wins keeps the cached handle, a probe that loses or errors
//!   marks the handle stale, closes it best-effort, and reconnects
//! - an explicit `shutdown()` closes the handle exactly once and leaves the
//!   cache permanently closed for the rest of the process lifetime
//!
//! The fail-fast probe-before-reuse policy is the one in force here. The
//! cheaper alternative (skip validation, discover staleness when a real
//! operation fails) is a valid simplification some deployments choose, but
//! it is not what this cache implements.
//!
//! Replacement is deliberately not serialized: concurrent callers that both
//! find the handle stale will both open a replacement. Opening is idempotent
//! and safe from the caller's perspective; the cost is duplicate connection
//! churn under bursty cold-starts, accepted in preference to head-of-line
//! blocking every request on the store's connect latency.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::errors::{FaceSearchResult, SearchError};

/// Driver boundary: opens handles to the shared document store
pub trait DocumentStoreConnector: Send + Sync + 'static {
    type Handle: ConnectionHandle;

    /// Open a new connection. Bounded externally by the cache's connect
    /// timeout; implementations need not enforce their own.
    fn connect(&self) -> impl Future<Output = FaceSearchResult<Self::Handle>> + Send;
}

/// Driver boundary: a live (or formerly live) connection handle
///
/// Handles are cheap clones of a shared underlying transport, as database
/// driver handles conventionally are.
pub trait ConnectionHandle: Clone + Send + Sync + 'static {
    /// Cheap liveness round-trip (an administrative ping)
    fn ping(&self) -> impl Future<Output = FaceSearchResult<()>> + Send;

    /// Release the underlying transport
    fn close(&self) -> impl Future<Output = FaceSearchResult<()>> + Send;
}

/// Timeout policy for probe and connect paths
#[derive(Debug, Clone)]
pub struct ConnectionCacheConfig {
    /// Bound on the liveness probe before the cached handle is declared stale
    pub probe_timeout_ms: u64,
    /// Bound on opening a fresh connection
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionCacheConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 1_500,
            connect_timeout_ms: 5_000,
        }
    }
}

/// The cached handle together with its last successful validation time
#[derive(Debug, Clone)]
struct CachedConnection<H> {
    handle: H,
    validated_at: DateTime<Utc>,
}

/// Process-wide cache of a single validated document-store handle
///
/// Constructed once at startup and passed to handlers as an explicit
/// capability object; there is no ambient global behind it.
pub struct ConnectionCache<C: DocumentStoreConnector> {
    connector: C,
    config: ConnectionCacheConfig,
    slot: Arc<RwLock<Option<CachedConnection<C::Handle>>>>,
    closed: Arc<AtomicBool>,
}

impl<C: DocumentStoreConnector> ConnectionCache<C> {
    /// Create a cache with default timeouts
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, ConnectionCacheConfig::default())
    }

    /// Create a cache with a custom timeout policy
    pub fn with_config(connector: C, config: ConnectionCacheConfig) -> Self {
        Self {
            connector,
            config,
            slot: Arc::new(RwLock::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether `shutdown()` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// When the cached handle last passed validation, if one is cached
    pub async fn validated_at(&self) -> Option<DateTime<Utc>> {
        self.slot.read().await.as_ref().map(|c| c.validated_at)
    }

    /// Acquire a validated handle, never one known to be dead
    ///
    /// May block while probing or (re)connecting, bounded by the configured
    /// timeouts. Fails with `ResourceUnavailable` when the initial connect
    /// or the reconnect-after-staleness path fails, or after `shutdown()`.
    pub async fn acquire(&self) -> FaceSearchResult<C::Handle> {
        if self.is_closed() {
            return Err(SearchError::resource("connection cache has been shut down"));
        }

        let cached = {
            let slot = self.slot.read().await;
            slot.as_ref().map(|c| c.handle.clone())
        };

        if let Some(handle) = cached {
            // Race the probe against the timer. The probe runs on its own
            // task so losing the race abandons it rather than cancelling
            // it: the underlying driver may not tolerate a forced cancel
            // mid-operation, so a late result is simply discarded.
            let probe_handle = handle.clone();
            let mut probe = tokio::spawn(async move { probe_handle.ping().await });

            let probe_timeout = Duration::from_millis(self.config.probe_timeout_ms);
            let live = tokio::select! {
                joined = &mut probe => matches!(joined, Ok(Ok(()))),
                _ = tokio::time::sleep(probe_timeout) => {
                    log::warn!(
                        "liveness probe exceeded {}ms; treating cached connection as stale",
                        self.config.probe_timeout_ms
                    );
                    false
                }
            };

            if live {
                let mut slot = self.slot.write().await;
                if let Some(cached) = slot.as_mut() {
                    cached.validated_at = Utc::now();
                }
                return Ok(handle);
            }

            log::info!("discarding stale document-store connection");
            self.discard(handle).await;
        }

        self.connect_and_cache().await
    }

    /// Close the handle and leave the cache permanently closed
    ///
    /// Idempotent; only the first call closes. After shutdown, `acquire()`
    /// fails for the remaining process lifetime.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let cached = self.slot.write().await.take();
        if let Some(cached) = cached {
            if let Err(e) = cached.handle.close().await {
                log::warn!("error closing document-store connection on shutdown: {}", e);
            }
        }
        log::info!("connection cache shut down");
    }

    /// Drop the cached reference and close the stale handle best-effort
    ///
    /// The close runs on a detached task: close errors are swallowed, and a
    /// close that hangs on a dead transport must not delay the reconnect.
    async fn discard(&self, stale: C::Handle) {
        {
            let mut slot = self.slot.write().await;
            *slot = None;
        }
        tokio::spawn(async move {
            let _ = stale.close().await;
        });
    }

    /// Open a fresh connection under the connect timeout and cache it
    async fn connect_and_cache(&self) -> FaceSearchResult<C::Handle> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let handle = match tokio::time::timeout(connect_timeout, self.connector.connect()).await
        {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                return Err(SearchError::resource(format!("connect failed: {}", e)));
            }
            Err(_) => {
                return Err(SearchError::resource(format!(
                    "connect timed out after {}ms",
                    self.config.connect_timeout_ms
                )));
            }
        };

        if self.is_closed() {
            // Shutdown raced the connect; don't cache a handle nobody will
            // ever tear down.
            let _ = handle.close().await;
            return Err(SearchError::resource("connection cache has been shut down"));
        }

        log::info!("opened document-store connection");
        let mut slot = self.slot.write().await;
        // Last writer wins when concurrent callers both reconnect; the
        // loser's handle is dropped for the driver to reap.
        *slot = Some(CachedConnection {
            handle: handle.clone(),
            validated_at: Utc::now(),
        });

        Ok(handle)
    }
}
