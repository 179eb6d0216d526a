//! Weak side tables keyed by node or function identity.
//!
//! Entries are only observable while their key target (a backing node or an
//! installed function) is still alive. Dead entries are swept once the number
//! of inserts since the last sweep reaches the table's threshold, the same
//! threshold-driven scheme the heap collector uses, so tables do not retain
//! bookkeeping for trees that test code has dropped.

use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::function::{MockFunction, WeakFunction};
use crate::value::{Id, NodeRef, WeakNodeRef};

/// Default number of inserts between automatic sweeps
pub const DEFAULT_SWEEP_THRESHOLD: usize = 256;

/// Non-owning reference to the object an entry is keyed by
#[derive(Clone)]
pub enum WeakTarget {
    Node(WeakNodeRef),
    Function(WeakFunction),
}

impl WeakTarget {
    pub fn is_alive(&self) -> bool {
        match self {
            WeakTarget::Node(node) => node.is_alive(),
            WeakTarget::Function(func) => func.is_alive(),
        }
    }
}

impl From<&NodeRef> for WeakTarget {
    fn from(node: &NodeRef) -> Self {
        WeakTarget::Node(node.downgrade())
    }
}

impl From<&MockFunction> for WeakTarget {
    fn from(func: &MockFunction) -> Self {
        WeakTarget::Function(func.downgrade())
    }
}

/// Values that can die independently of their key (weak handles)
pub trait Liveness {
    fn is_live(&self) -> bool {
        true
    }
}

impl<T: ?Sized> Liveness for Weak<T> {
    fn is_live(&self) -> bool {
        self.strong_count() > 0
    }
}

impl<T: ?Sized> Liveness for Rc<T> {}

struct Entry<V> {
    target: WeakTarget,
    value: V,
}

impl<V: Liveness> Entry<V> {
    fn is_alive(&self) -> bool {
        self.target.is_alive() && self.value.is_live()
    }
}

/// Statistics about a side table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    /// Entries whose target and value are alive
    pub live_entries: usize,
    /// Entries waiting for the next sweep
    pub dead_entries: usize,
}

/// Map from identity to value that forgets entries whose key object died
pub struct WeakTable<V: Liveness> {
    name: &'static str,
    entries: FxHashMap<Id, Entry<V>>,
    inserts_since_sweep: usize,
    /// 0 disables automatic sweeping
    threshold: usize,
}

impl<V: Liveness> WeakTable<V> {
    pub fn new(name: &'static str, threshold: usize) -> Self {
        Self {
            name,
            entries: FxHashMap::default(),
            inserts_since_sweep: 0,
            threshold,
        }
    }

    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    /// Insert or replace the entry for `id`, returning the previous live value
    pub fn insert(&mut self, id: Id, target: WeakTarget, value: V) -> Option<V> {
        let previous = self
            .entries
            .insert(id, Entry { target, value })
            .filter(|entry| entry.is_alive())
            .map(|entry| entry.value);

        self.inserts_since_sweep += 1;
        if self.threshold > 0 && self.inserts_since_sweep >= self.threshold {
            self.sweep();
        }
        previous
    }

    pub fn get(&self, id: Id) -> Option<&V> {
        self.entries
            .get(&id)
            .filter(|entry| entry.is_alive())
            .map(|entry| &entry.value)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: Id) -> Option<V> {
        self.entries
            .remove(&id)
            .filter(|entry| entry.is_alive())
            .map(|entry| entry.value)
    }

    /// Drop every dead entry. Returns the number of entries removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_alive());
        self.inserts_since_sweep = 0;
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(table = self.name, removed, live = self.entries.len(), "swept dead entries");
        }
        removed
    }

    pub fn stats(&self) -> TableStats {
        let live_entries = self.entries.values().filter(|e| e.is_alive()).count();
        TableStats {
            live_entries,
            dead_entries: self.entries.len() - live_entries,
        }
    }
}
