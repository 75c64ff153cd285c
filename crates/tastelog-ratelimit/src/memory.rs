//! Process-local counter store.
//!
//! Counters live in a mutex-guarded map, so they are only shared by the tasks of
//! this process. Expired windows are reset lazily on the next increment and evicted
//! by [`LocalStore::sweep`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::store::{Increment, RateLimitStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u64,
    window_start: Instant,
    window: Duration,
}

impl WindowRecord {
    fn ends_at(&self) -> Instant {
        self.window_start + self.window
    }
}

#[derive(Debug, Default)]
pub struct LocalStore {
    records: Mutex<HashMap<String, WindowRecord>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared store with a background sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn shared(sweep_interval: Duration) -> Arc<Self> {
        let store = Arc::new(Self::new());
        store.spawn_sweeper(sweep_interval);
        store
    }

    /// Removes every record whose window has ended. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, record| record.ends_at() > now);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs [`sweep`](Self::sweep) every `interval` until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.sweep();
                if evicted > 0 {
                    debug!(evicted, remaining = store.len(), "Swept expired rate limit windows");
                }
            }
        })
    }
}

#[async_trait]
impl RateLimitStore for LocalStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<Increment, StoreError> {
        let now = Instant::now();
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let record = records.entry(key.to_string()).or_insert(WindowRecord {
            count: 0,
            window_start: now,
            window,
        });

        if record.ends_at() <= now {
            *record = WindowRecord {
                count: 0,
                window_start: now,
                window,
            };
        }

        record.count += 1;

        Ok(Increment {
            count: record.count,
            reset: record.ends_at().saturating_duration_since(now),
        })
    }

    fn backend(&self) -> &'static str {
        "local"
    }

    fn is_process_local(&self) -> bool {
        true
    }
}
