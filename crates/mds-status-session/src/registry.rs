//! Session registry with idle-timeout (autoclose) eviction.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use mds_status_core::{
    Clock, ClientId, RegistryError, Session, SessionHandle, SessionState,
};
use uuid::Uuid;

use crate::events::{EventBus, RegistryEvent};

/// Registry tuning knobs.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// A session idle for at least this long is eviction-eligible.
    pub autoclose_timeout: Duration,
    /// Eviction never reduces the resident session count below this floor.
    pub min_sessions_floor: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            // Matches the upstream mds_session_autoclose default.
            autoclose_timeout: Duration::from_secs(300),
            min_sessions_floor: 1,
        }
    }
}

struct Slot {
    session: Session,
    seq: u64,
}

struct Inner {
    sessions: HashMap<ClientId, Slot>,
    next_seq: u64,
}

/// Tracks client sessions and applies autoclose eviction.
///
/// All state lives behind one mutex: a sweep runs to completion against the
/// sessions it observed at entry, and a concurrent renew is either fully
/// visible to that sweep or deferred to the next one. Time comes from the
/// injected [`Clock`], never from a wall-clock call.
pub struct SessionRegistry {
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    events: EventBus,
}

impl SessionRegistry {
    /// Create a registry with the given config and time source.
    #[must_use]
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                next_seq: 0,
            }),
            events: EventBus::new(),
        }
    }

    /// The registry's config.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Lifecycle event bus for this registry.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a new session.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateSession`] if `id` is already
    /// connected, stale or not.
    pub fn connect(&self, id: impl Into<ClientId>) -> Result<SessionHandle, RegistryError> {
        let id = id.into();
        let now = self.clock.now_ms();

        let mut inner = self.inner.lock().unwrap();
        if inner.sessions.contains_key(&id) {
            return Err(RegistryError::DuplicateSession(id));
        }

        let session = Session {
            id: id.clone(),
            gid: Uuid::new_v4(),
            connected_at: now,
            last_renewed_at: now,
            state: SessionState::Active,
        };
        let handle = SessionHandle {
            id: id.clone(),
            gid: session.gid,
            connected_at: now,
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.sessions.insert(id.clone(), Slot { session, seq });
        let count = inner.sessions.len();
        drop(inner);

        tracing::info!(client = %id, count, "session connected");
        self.events.push(RegistryEvent::Connected { id });

        Ok(handle)
    }

    /// Record a heartbeat for an existing session.
    ///
    /// Resets the idle timer and returns a stale session to active.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownSession`] if `id` is absent.
    pub fn renew(&self, id: impl Into<ClientId>) -> Result<(), RegistryError> {
        let id = id.into();
        let now = self.clock.now_ms();

        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .sessions
            .get_mut(&id)
            .ok_or_else(|| RegistryError::UnknownSession(id.clone()))?;
        slot.session.last_renewed_at = now;
        slot.session.state = SessionState::Active;
        drop(inner);

        tracing::debug!(client = %id, "session renewed");
        self.events.push(RegistryEvent::Renewed { id });
        Ok(())
    }

    /// Remove a session unconditionally (graceful close).
    ///
    /// Works regardless of timeout state; the returned snapshot carries
    /// state [`SessionState::Disconnected`].
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownSession`] if `id` is absent.
    pub fn disconnect(&self, id: impl Into<ClientId>) -> Result<Session, RegistryError> {
        let id = id.into();

        let mut inner = self.inner.lock().unwrap();
        let mut slot = inner
            .sessions
            .remove(&id)
            .ok_or_else(|| RegistryError::UnknownSession(id.clone()))?;
        let count = inner.sessions.len();
        drop(inner);

        slot.session.state = SessionState::Disconnected;
        tracing::info!(client = %id, count, "session disconnected");
        self.events.push(RegistryEvent::Disconnected { id });
        Ok(slot.session)
    }

    /// Run one eviction pass at the current clock time.
    pub fn sweep(&self) -> Vec<ClientId> {
        self.sweep_at(self.clock.now_ms())
    }

    /// Run one eviction pass as of `now_ms`.
    ///
    /// Every session idle for at least the autoclose timeout is marked
    /// stale; stale sessions are then evicted, longest-idle first
    /// (tie-break: insertion order), except that the resident count never
    /// drops below the floor. Never fails, and repeated calls with the same
    /// `now_ms` evict nothing further.
    pub fn sweep_at(&self, now_ms: u64) -> Vec<ClientId> {
        let timeout_ms = u64::try_from(self.config.autoclose_timeout.as_millis())
            .unwrap_or(u64::MAX);

        let mut inner = self.inner.lock().unwrap();

        let mut eligible: Vec<(ClientId, u64, u64)> = inner
            .sessions
            .iter()
            .filter(|(_, slot)| {
                now_ms.saturating_sub(slot.session.last_renewed_at) >= timeout_ms
            })
            .map(|(id, slot)| (id.clone(), slot.session.last_renewed_at, slot.seq))
            .collect();

        for (id, _, _) in &eligible {
            if let Some(slot) = inner.sessions.get_mut(id) {
                slot.session.state = SessionState::Stale;
            }
        }

        // Longest idle first; insertion order breaks ties.
        eligible.sort_by_key(|(_, last_renewed, seq)| (*last_renewed, *seq));

        let quota = inner
            .sessions
            .len()
            .saturating_sub(self.config.min_sessions_floor)
            .min(eligible.len());

        let mut evicted = Vec::with_capacity(quota);
        for (id, last_renewed, _) in eligible.into_iter().take(quota) {
            if inner.sessions.remove(&id).is_some() {
                let idle_ms = now_ms.saturating_sub(last_renewed);
                evicted.push((id, idle_ms));
            }
        }
        let count = inner.sessions.len();
        drop(inner);

        let mut ids = Vec::with_capacity(evicted.len());
        for (id, idle_ms) in evicted {
            tracing::info!(client = %id, idle_ms, count, "session evicted by autoclose");
            self.events.push(RegistryEvent::Evicted {
                id: id.clone(),
                idle_ms,
            });
            ids.push(id);
        }
        ids
    }

    /// Number of resident (active or stale) sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    /// Snapshot of all resident sessions, in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Session> {
        let inner = self.inner.lock().unwrap();
        let mut slots: Vec<(&u64, &Session)> = inner
            .sessions
            .values()
            .map(|slot| (&slot.seq, &slot.session))
            .collect();
        slots.sort_by_key(|(seq, _)| **seq);
        slots.into_iter().map(|(_, s)| s.clone()).collect()
    }

    /// Snapshot of one session, if resident.
    #[must_use]
    pub fn get(&self, id: &ClientId) -> Option<Session> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(id)
            .map(|slot| slot.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mds_status_core::ManualClock;

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn registry(floor: usize) -> (Arc<ManualClock>, SessionRegistry) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = RegistryConfig {
            autoclose_timeout: TIMEOUT,
            min_sessions_floor: floor,
        };
        let registry = SessionRegistry::new(config, Arc::clone(&clock) as Arc<dyn Clock>);
        (clock, registry)
    }

    #[test]
    fn no_eviction_before_timeout() {
        let (clock, registry) = registry(1);
        registry.connect("client.a").unwrap();
        registry.connect("client.b").unwrap();

        clock.advance(TIMEOUT / 2);
        assert!(registry.sweep().is_empty());
        assert_eq!(registry.count(), 2);

        registry.disconnect("client.a").unwrap();
        assert!(registry.sweep().is_empty());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn lone_session_survives_past_timeout() {
        let (clock, registry) = registry(1);
        registry.connect("client.b").unwrap();

        clock.advance(TIMEOUT.mul_f64(1.5));
        for _ in 0..3 {
            assert!(registry.sweep().is_empty());
            assert_eq!(registry.count(), 1);
        }

        // Retained by the floor, but flagged as idle.
        let sessions = registry.list();
        assert_eq!(sessions[0].state, SessionState::Stale);
    }

    #[test]
    fn idle_session_evicted_once_second_exists() {
        let (clock, registry) = registry(1);
        registry.connect("client.a").unwrap();
        registry.connect("client.b").unwrap();

        clock.advance(TIMEOUT.mul_f64(1.5));
        registry.renew("client.a").unwrap();

        let evicted = registry.sweep();
        assert_eq!(evicted, vec![ClientId::from("client.b")]);
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.list()[0].id, ClientId::from("client.a"));
    }

    #[test]
    fn sweep_is_idempotent_at_same_instant() {
        let (clock, registry) = registry(1);
        registry.connect("client.a").unwrap();
        registry.connect("client.b").unwrap();

        clock.advance(TIMEOUT.mul_f64(2.0));
        let now = clock.now_ms();

        assert_eq!(registry.sweep_at(now).len(), 1);
        assert!(registry.sweep_at(now).is_empty());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn floor_caps_evictions_longest_idle_first() {
        let (clock, registry) = registry(2);
        for name in ["client.a", "client.b", "client.c", "client.d"] {
            registry.connect(name).unwrap();
            clock.advance(Duration::from_secs(1));
        }

        clock.advance(TIMEOUT.mul_f64(2.0));
        let evicted = registry.sweep();

        // All four are eligible; quota is count - floor = 2, and the two
        // earliest-renewed go first.
        assert_eq!(
            evicted,
            vec![ClientId::from("client.a"), ClientId::from("client.b")]
        );
        assert_eq!(registry.count(), 2);

        let survivors: Vec<_> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(
            survivors,
            vec![ClientId::from("client.c"), ClientId::from("client.d")]
        );
    }

    #[test]
    fn ties_broken_by_insertion_order() {
        let (clock, registry) = registry(1);
        registry.connect("client.a").unwrap();
        registry.connect("client.b").unwrap();

        clock.advance(TIMEOUT.mul_f64(1.5));
        let evicted = registry.sweep();
        assert_eq!(evicted, vec![ClientId::from("client.a")]);
    }

    #[test]
    fn evict_client_scenario() {
        // Mirrors the originating cluster test: a slow client session is
        // not evicted while it is the only session, and is evicted once a
        // second, fresher session exists.
        let (clock, registry) = registry(1);

        registry.connect("client.b").unwrap();
        assert_eq!(registry.count(), 1);

        clock.advance(TIMEOUT.mul_f64(1.5));
        registry.sweep();
        assert_eq!(registry.count(), 1);

        registry.connect("client.a").unwrap();
        assert_eq!(registry.count(), 2);

        clock.advance(TIMEOUT.mul_f64(1.5));
        registry.sweep();
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.list()[0].id, ClientId::from("client.a"));
    }

    #[test]
    fn duplicate_connect_is_rejected() {
        let (_clock, registry) = registry(1);
        registry.connect("client.a").unwrap();

        let err = registry.connect("client.a").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateSession(_)));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn renew_and_disconnect_unknown_session() {
        let (_clock, registry) = registry(1);

        assert!(matches!(
            registry.renew("client.x").unwrap_err(),
            RegistryError::UnknownSession(_)
        ));
        assert!(matches!(
            registry.disconnect("client.x").unwrap_err(),
            RegistryError::UnknownSession(_)
        ));
    }

    #[test]
    fn disconnect_ignores_timeout_state() {
        let (clock, registry) = registry(1);
        registry.connect("client.a").unwrap();

        clock.advance(TIMEOUT.mul_f64(3.0));
        let session = registry.disconnect("client.a").unwrap();
        assert_eq!(session.state, SessionState::Disconnected);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn renew_restores_stale_session() {
        let (clock, registry) = registry(1);
        registry.connect("client.a").unwrap();

        clock.advance(TIMEOUT.mul_f64(1.5));
        registry.sweep();
        assert_eq!(registry.list()[0].state, SessionState::Stale);

        registry.renew("client.a").unwrap();
        let session = registry.get(&ClientId::from("client.a")).unwrap();
        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.last_renewed_at, clock.now_ms());

        // Fresh again: not eligible until another full window passes.
        clock.advance(TIMEOUT / 2);
        registry.connect("client.b").unwrap();
        assert!(registry.sweep().is_empty());
    }

    #[test]
    fn list_preserves_insertion_order() {
        let (clock, registry) = registry(1);
        for name in ["client.c", "client.a", "client.b"] {
            registry.connect(name).unwrap();
            clock.advance(Duration::from_secs(1));
        }

        let ids: Vec<_> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                ClientId::from("client.c"),
                ClientId::from("client.a"),
                ClientId::from("client.b"),
            ]
        );
    }

    #[test]
    fn handle_matches_session_snapshot() {
        let (clock, registry) = registry(1);
        let handle = registry.connect("client.a").unwrap();

        let session = registry.get(&ClientId::from("client.a")).unwrap();
        assert_eq!(session.gid, handle.gid);
        assert_eq!(session.connected_at, clock.now_ms());
        assert_eq!(session.state, SessionState::Active);
    }
}
