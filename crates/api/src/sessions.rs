//! In-memory registry of live checkout sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use checkout::CheckoutSession;
use common::SessionId;

use crate::routes::checkouts::AppState;

#[derive(Debug)]
struct Entry {
    session: Arc<CheckoutSession>,
    last_seen: Instant,
}

/// Live sessions keyed by id. A session leaves the registry when it is
/// cancelled, redirected to sign-in or completed, or when it has been idle
/// longer than the sweep allows.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: CheckoutSession) -> Arc<CheckoutSession> {
        let session = Arc::new(session);
        let entry = Entry {
            session: session.clone(),
            last_seen: Instant::now(),
        };
        self.sessions.write().unwrap().insert(session.id(), entry);
        metrics::gauge!("checkout_sessions_active").increment(1.0);
        session
    }

    /// Looks a session up and marks it as active.
    pub fn get(&self, id: &SessionId) -> Option<Arc<CheckoutSession>> {
        let mut sessions = self.sessions.write().unwrap();
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<CheckoutSession>> {
        let removed = self.sessions.write().unwrap().remove(id);
        if removed.is_some() {
            metrics::gauge!("checkout_sessions_active").decrement(1.0);
        }
        removed.map(|entry| entry.session)
    }

    /// Drops sessions not looked up for longer than `max_idle`. Returns
    /// how many were dropped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() <= max_idle);
        let evicted = before - sessions.len();
        if evicted > 0 {
            metrics::gauge!("checkout_sessions_active").decrement(evicted as f64);
            metrics::counter!("checkout_sessions_evicted_total").increment(evicted as u64);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evicts sessions idle for longer than `max_idle`, checking every
/// `every`. Runs until the task is aborted.
pub async fn sweep_idle(state: Arc<AppState>, max_idle: Duration, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let evicted = state.sessions.evict_idle(max_idle);
        if evicted > 0 {
            tracing::info!(evicted, "evicted idle checkout sessions");
        }
    }
}
