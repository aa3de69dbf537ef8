//! Persisted open/closed flags for panels.
//!
//! Flags are stored under the panel's container id (e.g. `seg-panel`) as a
//! JSON boolean. "Open" writes expire after [`VISIBILITY_EXPIRY_DAYS`]; "close"
//! writes never expire since absent and `false` mean the same thing here.
//! The store only seeds initial visibility; afterwards the panel owns it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::constants::{VISIBILITY_EXPIRY_DAYS, panels};
use crate::error::EditorError;
use crate::observer::{SubscriptionId, Subscribers};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Durable client-side key-value storage.
pub trait KeyValueStore {
    /// Read a value; expired entries read as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, optionally expiring after `expires_in`.
    fn set(&mut self, key: &str, value: &str, expires_in: Option<Duration>)
    -> Result<(), EditorError>;
}

/// A stored value with its optional expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    #[serde(default)]
    pub expires_at_ms: Option<u64>,
}

impl StoredEntry {
    pub fn new(value: &str, expires_in: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at_ms: expires_in.map(|d| now_ms().saturating_add(d.as_millis() as u64)),
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|at| now_ms >= at)
    }
}

/// In-memory store, used when no durable backend is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, StoredEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|e| !e.is_expired(now_ms()))
            .map(|e| e.value.clone())
    }

    fn set(
        &mut self,
        key: &str,
        value: &str,
        expires_in: Option<Duration>,
    ) -> Result<(), EditorError> {
        self.entries
            .insert(key.to_string(), StoredEntry::new(value, expires_in));
        Ok(())
    }
}

/// A visibility flag change, delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityChange {
    pub panel: String,
    pub open: bool,
}

/// Panel name -> open flag, backed by a [`KeyValueStore`].
///
/// Methods take `&self` so the store can be shared between panels.
pub struct PanelVisibilityStore {
    backend: RefCell<Box<dyn KeyValueStore>>,
    expiry: Duration,
    subscribers: RefCell<Subscribers<VisibilityChange>>,
}

impl PanelVisibilityStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self::with_expiry_days(backend, VISIBILITY_EXPIRY_DAYS)
    }

    pub fn with_expiry_days(backend: Box<dyn KeyValueStore>, days: u64) -> Self {
        Self {
            backend: RefCell::new(backend),
            expiry: Duration::from_secs(days * 24 * 60 * 60),
            subscribers: RefCell::new(Subscribers::new()),
        }
    }

    /// Store backed by memory only.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Persisted flag for a panel, if any.
    pub fn get(&self, name: &str) -> Option<bool> {
        let key = panels::container_id(name);
        let raw = self.backend.borrow().get(&key)?;
        match serde_json::from_str::<bool>(&raw) {
            Ok(open) => Some(open),
            Err(e) => {
                log::warn!("Ignoring invalid visibility flag '{}' for {}: {}", raw, key, e);
                None
            }
        }
    }

    /// Persisted flag, absent reading as closed.
    pub fn is_open(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    /// Persist a flag and notify subscribers.
    ///
    /// Subscribers hear about the change even when the backend write fails;
    /// the write error is returned afterwards. Subscribers must not write to
    /// the store from inside the callback.
    pub fn set(&self, name: &str, open: bool) -> Result<(), EditorError> {
        let key = panels::container_id(name);
        let expires_in = open.then_some(self.expiry);
        let value = if open { "true" } else { "false" };
        let written = self.backend.borrow_mut().set(&key, value, expires_in);
        match &written {
            Ok(()) => log::trace!("Persisted {} = {}", key, value),
            Err(e) => log::warn!("Could not persist {} = {}: {}", key, value, e),
        }

        self.subscribers.borrow_mut().notify(&VisibilityChange {
            panel: name.to_string(),
            open,
        });
        written
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&VisibilityChange) + 'static,
    {
        self.subscribers.borrow_mut().subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow_mut().unsubscribe(id)
    }
}

impl std::fmt::Debug for PanelVisibilityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelVisibilityStore")
            .field("expiry", &self.expiry)
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}
