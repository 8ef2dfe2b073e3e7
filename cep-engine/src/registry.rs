//! Registry of live flows
//!
//! The map of flow id to flow is guarded by a single mutex that is only held
//! for insert, remove and snapshot. Each flow sits behind its own lock so a
//! dispatch can evaluate it without holding the map lock.

use crate::flow::{Context, Flow};
use crate::types::{CepError, Result, Timestamp};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a registered flow
pub type FlowHandle = Arc<Mutex<Box<dyn Flow>>>;

struct Entry {
    pattern: String,
    expires_at: Timestamp,
    flow: FlowHandle,
}

impl Entry {
    fn new(flow: Box<dyn Flow>) -> Self {
        Self {
            pattern: flow.pattern().to_string(),
            expires_at: flow.expires_at(),
            flow: Arc::new(Mutex::new(flow)),
        }
    }

    fn expired_at(&self, now: Timestamp) -> bool {
        self.expires_at != 0 && self.expires_at < now
    }
}

/// Flows by id, plus the ids of each pattern's flows
#[derive(Default)]
struct Flows {
    by_id: HashMap<String, Entry>,
    by_pattern: HashMap<String, HashSet<String>>,
}

impl Flows {
    fn insert(&mut self, id: String, entry: Entry) {
        self.by_pattern
            .entry(entry.pattern.clone())
            .or_default()
            .insert(id.clone());
        self.by_id.insert(id, entry);
    }

    fn remove(&mut self, id: &str) -> bool {
        let Some(entry) = self.by_id.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_pattern.get_mut(&entry.pattern) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_pattern.remove(&entry.pattern);
            }
        }
        true
    }

    /// Does `pattern` have a flow whose window is still open at `now`
    fn has_live(&self, pattern: &str, now: Timestamp) -> bool {
        self.by_pattern.get(pattern).is_some_and(|ids| {
            ids.iter()
                .filter_map(|id| self.by_id.get(id))
                .any(|entry| !entry.expired_at(now))
        })
    }
}

/// Set of live flows keyed by id
#[derive(Default)]
pub struct Registry {
    flows: Mutex<Flows>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the map; a poisoned lock still guards a consistent map, since
    /// every critical section is a single insert, remove or read.
    fn lock(&self) -> MutexGuard<'_, Flows> {
        self.flows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a flow; fails with `AlreadyExists` if its id is taken
    pub fn register(&self, flow: Box<dyn Flow>) -> Result<()> {
        let id = flow.id().to_string();
        let entry = Entry::new(flow);

        let mut flows = self.lock();
        if flows.by_id.contains_key(&id) {
            return Err(CepError::AlreadyExists(id));
        }
        flows.insert(id, entry);
        Ok(())
    }

    /// Insert a flow unless another flow of the same pattern is live at `now`
    ///
    /// Returns `Ok(false)` when the flow was dropped because its pattern
    /// already has a live instance. A flow whose deadline is before `now`
    /// has expired and does not count, even though it stays registered
    /// until the next event reaches it. The check and the insert happen
    /// under one lock, so concurrent dispatches cannot both win.
    pub fn register_exclusive(&self, flow: Box<dyn Flow>, now: Timestamp) -> Result<bool> {
        let mut flows = self.lock();
        if flows.has_live(flow.pattern(), now) {
            return Ok(false);
        }
        let id = flow.id().to_string();
        if flows.by_id.contains_key(&id) {
            return Err(CepError::AlreadyExists(id));
        }
        flows.insert(id, Entry::new(flow));
        Ok(true)
    }

    /// Remove a flow; returns whether anything was removed
    pub fn unregister(&self, id: &str) -> bool {
        self.lock().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_id.is_empty()
    }

    /// Ids of every live flow, in no particular order
    pub fn ids(&self) -> Vec<String> {
        self.lock().by_id.keys().cloned().collect()
    }

    /// Number of live flows spawned from `pattern`
    pub fn count_pattern(&self, pattern: &str) -> usize {
        self.lock().by_pattern.get(pattern).map_or(0, HashSet::len)
    }

    /// Ids and handles of every live flow at this instant
    pub fn snapshot(&self) -> Vec<(String, FlowHandle)> {
        self.lock()
            .by_id
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(&entry.flow)))
            .collect()
    }

    /// Record a flow's current deadline so `sweep` can see it
    pub(crate) fn update_deadline(&self, id: &str, expires_at: Timestamp) {
        if let Some(entry) = self.lock().by_id.get_mut(id) {
            entry.expires_at = expires_at;
        }
    }

    /// Remove every flow whose deadline is set and strictly before `now`
    ///
    /// Returns the number of flows removed.
    pub fn sweep(&self, now: Timestamp) -> usize {
        let mut flows = self.lock();
        let overdue: Vec<String> = flows
            .by_id
            .iter()
            .filter(|(_, entry)| entry.expired_at(now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &overdue {
            flows.remove(id);
        }
        overdue.len()
    }
}

impl Context for Registry {
    fn unregister(&self, id: &str) -> bool {
        Registry::unregister(self, id)
    }
}
