//! Node metadata store: where each node or installed function is attached.
//!
//! Detaching removes the value from its parent but keeps the record, so the
//! same value can be put back later. Roots never have a record.
//!
//! The parent is held weakly: a record must not keep alive the tree that
//! owns the very node it is keyed by.
//!
//! A record also remembers the parent's shape generation. Once the parent
//! is converted between object and array the record is orphaned: it no
//! longer owns a slot, and writes through it leave the live tree alone.

use crate::error::MockError;
use crate::table::{Liveness, WeakTable, WeakTarget};
use crate::value::{Id, Key, MockValue, NodeRef, WeakNodeRef};

/// Parent container and key a value is installed under
#[derive(Clone)]
pub struct Attachment {
    parent: WeakNodeRef,
    generation: u64,
    pub key: Key,
}

impl Liveness for Attachment {}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.parent() {
            Some(parent) if self.is_orphaned() => {
                write!(f, "Attachment(<orphaned {}>[{}])", parent.id(), self.key)
            }
            Some(parent) => write!(f, "Attachment({}[{}])", parent.id(), self.key),
            None => write!(f, "Attachment(<dropped>[{}])", self.key),
        }
    }
}

impl Attachment {
    pub fn new(parent: &NodeRef, key: &Key) -> Self {
        Self {
            parent: parent.downgrade(),
            generation: parent.generation(),
            key: key.clone(),
        }
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.upgrade()
    }

    /// Check if the parent changed shape after this record was made
    pub fn is_orphaned(&self) -> bool {
        self.parent()
            .is_some_and(|parent| parent.generation() != self.generation)
    }

    /// Parent whose slot this record still owns.
    ///
    /// `Ok(None)` when the parent was converted since; writing there would
    /// clobber the new contents.
    pub fn slot_parent(&self) -> Result<Option<NodeRef>, MockError> {
        let parent = self.parent().ok_or(MockError::Detached)?;
        if parent.generation() != self.generation {
            return Ok(None);
        }
        Ok(Some(parent))
    }

    /// Value the parent currently holds at this slot
    pub fn current(&self) -> Option<MockValue> {
        self.slot_parent().ok().flatten()?.child(&self.key)
    }

    /// Check if the slot holds exactly `value`
    pub fn holds(&self, value: &MockValue) -> bool {
        self.current()
            .is_some_and(|current| current.strict_equals(value))
    }

    /// Check if the slot now holds some other value.
    ///
    /// An empty slot means the value was detached, not displaced.
    pub fn is_displaced(&self, value: &MockValue) -> bool {
        self.current()
            .is_some_and(|current| !current.strict_equals(value))
    }
}

pub struct AttachmentStore {
    table: WeakTable<Attachment>,
}

impl AttachmentStore {
    pub fn new(threshold: usize) -> Self {
        Self {
            table: WeakTable::new("attachments", threshold),
        }
    }

    /// Record (or move) the attachment of the value identified by `id`
    pub fn record(&mut self, id: Id, target: WeakTarget, attachment: Attachment) {
        self.table.insert(id, target, attachment);
    }

    pub fn get(&self, id: Id) -> Option<Attachment> {
        self.table.get(id).cloned()
    }

    pub fn forget(&mut self, id: Id) -> Option<Attachment> {
        self.table.remove(id)
    }

    pub fn table(&self) -> &WeakTable<Attachment> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut WeakTable<Attachment> {
        &mut self.table
    }
}
