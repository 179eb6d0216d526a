//! Handle registry: at most one live handle per node or installed function.

use std::rc::{Rc, Weak};

use crate::handle::HandleState;
use crate::table::{WeakTable, WeakTarget};
use crate::value::Id;

pub struct HandleRegistry {
    table: WeakTable<Weak<HandleState>>,
}

impl HandleRegistry {
    pub fn new(threshold: usize) -> Self {
        Self {
            table: WeakTable::new("handles", threshold),
        }
    }

    pub fn lookup(&self, id: Id) -> Option<Rc<HandleState>> {
        self.table.get(id).and_then(Weak::upgrade)
    }

    pub fn register(&mut self, id: Id, target: WeakTarget, state: &Rc<HandleState>) {
        self.table.insert(id, target, Rc::downgrade(state));
    }

    /// Drop the entry for `id` if it still points at `state`
    pub fn unregister(&mut self, id: Id, state: &Rc<HandleState>) {
        let registered = self
            .lookup(id)
            .is_some_and(|current| Rc::ptr_eq(&current, state));
        if registered {
            self.table.remove(id);
        }
    }

    pub fn table(&self) -> &WeakTable<Weak<HandleState>> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut WeakTable<Weak<HandleState>> {
        &mut self.table
    }
}
