//! In-memory ceremony storage
//!
//! Pending ceremony state is keyed by employee; inserting for an employee
//! who already has a pending ceremony of the same kind replaces it, so only
//! the most recently issued challenge can complete. Consumption removes the
//! entry before checking expiry, which makes double-consume impossible even
//! under concurrent completes.

use chrono::Utc;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;
use webauthn_rs::prelude::*;

use super::{StoredCredential, TakenState, CHALLENGE_TTL_SECS};

/// A pending ceremony state with its deadline
struct Pending<T> {
    state: T,
    expires_at: Instant,
}

/// Pending ceremony states of one kind, keyed by employee
pub struct PendingMap<T> {
    entries: DashMap<Uuid, Pending<T>>,
}

impl<T> PendingMap<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Store a pending state, replacing any previous one for this employee.
    pub fn insert(&self, employee_id: Uuid, state: T) {
        self.entries.insert(
            employee_id,
            Pending {
                state,
                expires_at: Instant::now() + Duration::from_secs(CHALLENGE_TTL_SECS),
            },
        );
    }

    /// Remove and return the pending state for this employee.
    ///
    /// The removal happens unconditionally, so an expired entry is gone
    /// after this call and a second take reports `Missing`.
    pub fn take(&self, employee_id: Uuid) -> TakenState<T> {
        match self.entries.remove(&employee_id) {
            None => TakenState::Missing,
            Some((_, entry)) => {
                if entry.expires_at > Instant::now() {
                    TakenState::Valid(entry.state)
                } else {
                    TakenState::Expired
                }
            }
        }
    }

    /// Drop expired entries (called periodically)
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for PendingMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory credential and ceremony state storage
pub struct MemoryStore {
    pub(super) registrations: PendingMap<PasskeyRegistration>,
    pub(super) authentications: PendingMap<PasskeyAuthentication>,
    /// credential_id -> credential
    credentials: DashMap<String, StoredCredential>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            registrations: PendingMap::new(),
            authentications: PendingMap::new(),
            credentials: DashMap::new(),
        }
    }

    pub fn insert_credential(&self, credential: StoredCredential) {
        self.credentials
            .insert(credential.credential_id.clone(), credential);
    }

    pub fn credentials_for(&self, employee_id: Uuid) -> Vec<StoredCredential> {
        let mut credentials: Vec<StoredCredential> = self
            .credentials
            .iter()
            .filter(|entry| entry.employee_id == employee_id && entry.active)
            .map(|entry| entry.value().clone())
            .collect();
        credentials.sort_by_key(|c| c.created_at);
        credentials
    }

    pub fn find_credential(&self, credential_id: &str) -> Option<StoredCredential> {
        self.credentials
            .get(credential_id)
            .filter(|entry| entry.active)
            .map(|entry| entry.value().clone())
    }

    /// Compare-and-swap counter advance under the map entry guard.
    pub fn advance_counter(&self, credential_id: &str, passkey: &Passkey, new_counter: u32) -> bool {
        match self.credentials.get_mut(credential_id) {
            Some(mut entry) if entry.active && entry.counter < new_counter => {
                entry.counter = new_counter;
                entry.passkey = passkey.clone();
                entry.last_used_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    pub fn touch_last_used(&self, credential_id: &str) {
        if let Some(mut entry) = self.credentials.get_mut(credential_id) {
            entry.last_used_at = Some(Utc::now());
        }
    }

    pub fn revoke_credential(&self, employee_id: Uuid, credential_id: &str) -> bool {
        match self.credentials.get_mut(credential_id) {
            Some(mut entry) if entry.employee_id == employee_id && entry.active => {
                entry.active = false;
                true
            }
            _ => false,
        }
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // PendingMap is generic, so expiry and consume-once semantics are
    // testable without fabricating library ceremony state.

    #[test]
    fn test_take_consumes_exactly_once() {
        let map: PendingMap<String> = PendingMap::new();
        let employee = Uuid::new_v4();

        map.insert(employee, "state".to_string());
        assert!(matches!(map.take(employee), TakenState::Valid(s) if s == "state"));
        assert!(matches!(map.take(employee), TakenState::Missing));
    }

    #[test]
    fn test_take_unknown_employee_is_missing() {
        let map: PendingMap<String> = PendingMap::new();
        assert!(matches!(map.take(Uuid::new_v4()), TakenState::Missing));
    }

    #[test]
    fn test_insert_replaces_pending_state() {
        let map: PendingMap<String> = PendingMap::new();
        let employee = Uuid::new_v4();

        map.insert(employee, "first".to_string());
        map.insert(employee, "second".to_string());

        assert_eq!(map.len(), 1);
        assert!(matches!(map.take(employee), TakenState::Valid(s) if s == "second"));
    }

    #[test]
    fn test_employees_do_not_share_pending_state() {
        let map: PendingMap<String> = PendingMap::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        map.insert(alice, "alice".to_string());
        assert!(matches!(map.take(bob), TakenState::Missing));
        assert!(matches!(map.take(alice), TakenState::Valid(_)));
    }

    #[test]
    fn test_cleanup_keeps_live_entries() {
        let map: PendingMap<String> = PendingMap::new();
        let employee = Uuid::new_v4();

        map.insert(employee, "state".to_string());
        map.cleanup_expired();
        assert_eq!(map.len(), 1);
    }
}
