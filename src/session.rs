//! Mock session: the explicit context that owns configuration and the
//! bookkeeping tables. Every handle carries a reference to its session.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::attachment::{Attachment, AttachmentStore};
use crate::config::Config;
use crate::error::MockError;
use crate::function::{ContainerRef, FunctionStore, Implementation, MockFunction};
use crate::handle::{Binding, Handle, HandleState};
use crate::registry::HandleRegistry;
use crate::spy::SpyRef;
use crate::table::{TableStats, WeakTarget};
use crate::value::{Id, Key, NodeRef};

/// Entry point for building mocks.
///
/// ```
/// use lazymock::{Config, Session};
/// use serde_json::json;
///
/// let session = Session::with_config(Config::new().with_recorder());
/// let mock = session.create_handle();
/// mock.get("a").get("b").assign("c", 5).unwrap();
/// mock.get("fetch").set_returns(json!({"ok": true})).unwrap();
///
/// let module = mock.value();
/// assert_eq!(module.get("a").to_json(), json!({"b": {"c": 5}}));
/// assert_eq!(module.get("fetch").call(&[]).unwrap().to_json(), json!({"ok": true}));
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

/// Live/dead entry counts of the session tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub handles: TableStats,
    pub attachments: TableStats,
    pub functions: TableStats,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let threshold = config.sweep_threshold;
        Self {
            inner: Rc::new(SessionInner {
                config: RefCell::new(config),
                handles: RefCell::new(HandleRegistry::new(threshold)),
                attachments: RefCell::new(AttachmentStore::new(threshold)),
                functions: RefCell::new(FunctionStore::new(threshold)),
            }),
        }
    }

    /// Replace the configuration. Functions already installed keep their spies.
    pub fn configure(&self, config: Config) {
        let threshold = config.sweep_threshold;
        self.inner.handles.borrow_mut().table_mut().set_threshold(threshold);
        self.inner.attachments.borrow_mut().table_mut().set_threshold(threshold);
        self.inner.functions.borrow_mut().table_mut().set_threshold(threshold);
        debug!(?config, "session reconfigured");
        *self.inner.config.borrow_mut() = config;
    }

    pub fn config(&self) -> Config {
        self.inner.config.borrow().clone()
    }

    /// Handle for a fresh, empty root object
    pub fn create_handle(&self) -> Handle {
        self.handle_for(&NodeRef::new_object())
    }

    /// Handle for an existing root object; the same root yields the same
    /// handle for as long as that handle is alive
    pub fn handle_for(&self, root: &NodeRef) -> Handle {
        self.inner.handle_for(Binding::Node(root.clone()))
    }

    /// Drop bookkeeping for nodes, functions and handles that are gone.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.inner.handles.borrow_mut().table_mut().sweep()
            + self.inner.attachments.borrow_mut().table_mut().sweep()
            + self.inner.functions.borrow_mut().table_mut().sweep()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            handles: self.inner.handles.borrow().table().stats(),
            attachments: self.inner.attachments.borrow().table().stats(),
            functions: self.inner.functions.borrow().table().stats(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct SessionInner {
    config: RefCell<Config>,
    handles: RefCell<HandleRegistry>,
    attachments: RefCell<AttachmentStore>,
    functions: RefCell<FunctionStore>,
}

impl SessionInner {
    /// Registered handle for `binding`, or a new one
    pub(crate) fn handle_for(self: &Rc<Self>, binding: Binding) -> Handle {
        let id = binding.id();
        let existing = self.handles.borrow().lookup(id);
        if let Some(state) = existing {
            return Handle::from_parts(state, self.clone());
        }
        let target = binding.target();
        let state = Rc::new(HandleState::new(binding));
        self.handles.borrow_mut().register(id, target, &state);
        Handle::from_parts(state, self.clone())
    }

    /// Point an existing handle at a new binding, moving its registration
    pub(crate) fn rebind(&self, state: &Rc<HandleState>, binding: Binding) {
        let previous = state.binding();
        {
            let mut handles = self.handles.borrow_mut();
            handles.unregister(previous.id(), state);
            handles.register(binding.id(), binding.target(), state);
        }
        state.set_binding(binding);
    }

    pub(crate) fn attach(&self, child: &NodeRef, parent: &NodeRef, key: &Key) {
        self.attachments.borrow_mut().record(
            child.id(),
            WeakTarget::from(child),
            Attachment::new(parent, key),
        );
    }

    pub(crate) fn attach_function(&self, function: &MockFunction, parent: &NodeRef, key: &Key) {
        self.attachments.borrow_mut().record(
            function.id(),
            WeakTarget::from(function),
            Attachment::new(parent, key),
        );
    }

    /// Carry an existing record over to `binding`, e.g. when it replaces
    /// a value whose slot was already orphaned
    pub(crate) fn keep_attachment(&self, binding: &Binding, attachment: Attachment) {
        self.attachments
            .borrow_mut()
            .record(binding.id(), binding.target(), attachment);
    }

    pub(crate) fn attachment(&self, id: Id) -> Option<Attachment> {
        self.attachments.borrow().get(id)
    }

    pub(crate) fn forget_attachment(&self, id: Id) {
        self.attachments.borrow_mut().forget(id);
    }

    pub(crate) fn register_function(&self, function: &MockFunction, container: &ContainerRef) {
        self.functions.borrow_mut().insert(function, container);
    }

    pub(crate) fn function_container(&self, function: &MockFunction) -> Option<ContainerRef> {
        self.functions.borrow_mut().container(function)
    }

    /// Build a spy around `body` with the configured constructor
    pub(crate) fn construct_spy(&self, body: Implementation) -> Result<SpyRef, MockError> {
        let constructor = self
            .config
            .borrow()
            .spy_constructor
            .clone()
            .ok_or(MockError::SpyNotConfigured)?;
        Ok(constructor(body))
    }
}
