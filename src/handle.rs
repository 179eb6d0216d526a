//! Interception engine: the handle test code drives.
//!
//! A handle stands in for one backing node. Navigation creates missing
//! children on demand, assignment writes data with merge-or-replace rules,
//! and the operator methods install functions, spies and lifecycle changes.
//! Operators are plain methods; [`Operator`] and [`Handle::apply`] offer the
//! same behavior through a single token-dispatched surface.
//!
//! A handle is bound either to a backing node or, once a function has been
//! installed at its path, to that function's return-value container. In the
//! second case navigation and writes go into the value the function returns.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::attachment::Attachment;
use crate::error::MockError;
use crate::function::{
    ContainerRef, MockFunction, ReturnContainer, return_value_body, set_return_value,
};
use crate::session::SessionInner;
use crate::spy::SpyRef;
use crate::table::WeakTarget;
use crate::value::{Id, Key, MockValue, NodeRef};

/// The distinguished operator keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Returns,
    ReturnsSpy,
    Spy,
    Set,
    Reset,
    Detach,
    Reattach,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Returns,
        Operator::ReturnsSpy,
        Operator::Spy,
        Operator::Set,
        Operator::Reset,
        Operator::Detach,
        Operator::Reattach,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Returns => "returns",
            Operator::ReturnsSpy => "returnsSpy",
            Operator::Spy => "spy",
            Operator::Set => "set",
            Operator::Reset => "reset",
            Operator::Detach => "detach",
            Operator::Reattach => "reattach",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of reading an operator through [`Handle::apply`]
pub enum Outcome {
    Handle(Handle),
    Spy(SpyRef),
    Done,
}

impl Outcome {
    pub fn into_handle(self) -> Option<Handle> {
        match self {
            Outcome::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn into_spy(self) -> Option<SpyRef> {
        match self {
            Outcome::Spy(spy) => Some(spy),
            _ => None,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Handle(handle) => f.debug_tuple("Handle").field(handle).finish(),
            Outcome::Spy(spy) => write!(f, "Spy({} calls)", spy.call_count()),
            Outcome::Done => f.write_str("Done"),
        }
    }
}

/// What a handle currently stands for
#[derive(Clone)]
pub(crate) enum Binding {
    /// A backing node in (or detached from) the tree
    Node(NodeRef),
    /// The return value of an installed function
    Returned {
        function: MockFunction,
        container: ContainerRef,
    },
}

impl Binding {
    /// Registry key: the node id, or the function id for return values
    pub(crate) fn id(&self) -> Id {
        match self {
            Binding::Node(node) => node.id(),
            Binding::Returned { function, .. } => function.id(),
        }
    }

    pub(crate) fn target(&self) -> WeakTarget {
        match self {
            Binding::Node(node) => WeakTarget::from(node),
            Binding::Returned { function, .. } => WeakTarget::from(function),
        }
    }

    /// Value installed in the parent slot for this binding
    pub(crate) fn value(&self) -> MockValue {
        match self {
            Binding::Node(node) => MockValue::Object(node.clone()),
            Binding::Returned { function, .. } => MockValue::Function(function.clone()),
        }
    }
}

pub(crate) struct HandleState {
    binding: RefCell<Binding>,
}

impl HandleState {
    pub(crate) fn new(binding: Binding) -> Self {
        Self {
            binding: RefCell::new(binding),
        }
    }

    pub(crate) fn binding(&self) -> Binding {
        self.binding.borrow().clone()
    }

    pub(crate) fn set_binding(&self, binding: Binding) {
        *self.binding.borrow_mut() = binding;
    }
}

/// Capability object standing in for a backing node.
///
/// Cloning a handle yields the same handle; [`Handle::ptr_eq`] tells
/// whether two handles are one.
#[derive(Clone)]
pub struct Handle {
    state: Rc<HandleState>,
    session: Rc<SessionInner>,
}

impl Handle {
    pub(crate) fn from_parts(state: Rc<HandleState>, session: Rc<SessionInner>) -> Self {
        Self { state, session }
    }

    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// The backing value this handle stands for: the node, or the
    /// installed function once one has replaced it
    pub fn value(&self) -> MockValue {
        self.state.binding().value()
    }

    /// Check if this handle is bound to a node with no parent
    pub fn is_root(&self) -> bool {
        match self.state.binding() {
            Binding::Node(node) => self.session.attachment(node.id()).is_none(),
            Binding::Returned { .. } => false,
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Handle for the child at `key`, creating an empty object there when
    /// the slot is empty or holds a primitive. An index key turns an object
    /// into an array and a name key turns an array into an object; the
    /// previous entries are discarded.
    pub fn get(&self, key: impl Into<Key>) -> Handle {
        let key = key.into();
        let node = self.writable_node();
        if node.convert(key.shape_kind()) {
            debug!(node = %node.id(), shape = %key.shape_kind(), "converted node shape");
        }

        match node.child(&key) {
            Some(MockValue::Object(child)) => {
                self.session.attach(&child, &node, &key);
                self.session.handle_for(Binding::Node(child))
            }
            Some(MockValue::Function(function)) => match self.session.function_container(&function) {
                Some(container) => {
                    self.session.attach_function(&function, &node, &key);
                    self.session.handle_for(Binding::Returned { function, container })
                }
                None => self.create_child(&node, key),
            },
            _ => self.create_child(&node, key),
        }
    }

    fn create_child(&self, node: &NodeRef, key: Key) -> Handle {
        let child = NodeRef::new_object();
        node.insert(key.clone(), MockValue::Object(child.clone()));
        self.session.attach(&child, node, &key);
        trace!(parent = %node.id(), child = %child.id(), %key, "created child");
        self.session.handle_for(Binding::Node(child))
    }

    /// Write `value` at `key`.
    ///
    /// An index key writes directly (converting an object to an array
    /// first). A name key merges a composite value into an existing
    /// composite of the same shape, keeping its identity; anything else
    /// replaces the slot, and handles for the previous value go stale.
    pub fn assign(&self, key: impl Into<Key>, value: impl Into<MockValue>) -> Result<(), MockError> {
        let key = key.into();
        let value = value.into();
        if value.is_callable() {
            return Err(MockError::assignment(format!(
                "cannot assign a function to `{key}`; use returns(), returns_spy() or call()"
            )));
        }

        let node = self.writable_node();
        if !key.is_index() {
            if let (Some(MockValue::Object(existing)), MockValue::Object(incoming)) =
                (node.child(&key), &value)
            {
                if existing.kind() == incoming.kind() {
                    existing.replace_entries(incoming);
                    trace!(node = %existing.id(), %key, "merged assigned value");
                    return Ok(());
                }
            }
        }
        self.install(&node, key, value);
        Ok(())
    }

    fn install(&self, node: &NodeRef, key: Key, value: MockValue) {
        if node.convert(key.shape_kind()) {
            debug!(node = %node.id(), shape = %key.shape_kind(), "converted node shape");
        }
        if let MockValue::Object(child) = &value {
            self.session.attach(child, node, &key);
        }
        node.insert(key.clone(), value);
        trace!(node = %node.id(), %key, "installed value");
    }

    /// Node that navigation and writes act on. A return value that is not
    /// a composite is replaced by a fresh empty object first.
    fn writable_node(&self) -> NodeRef {
        match self.state.binding() {
            Binding::Node(node) => node,
            Binding::Returned { container, .. } => {
                let current = container.borrow().value.clone();
                if let MockValue::Object(node) = current {
                    return node;
                }
                let node = NodeRef::new_object();
                set_return_value(&container, MockValue::Object(node.clone()));
                node
            }
        }
    }

    // ------------------------------------------------------------------
    // Function installation
    // ------------------------------------------------------------------

    /// Install (or find) the function at this path, optionally as a spy.
    ///
    /// The first install wraps the current node as the return value, puts
    /// the function in the node's parent slot and rebinds this handle to
    /// the return value. If the parent has changed shape since, the
    /// function is created but the live tree is left alone. Asking for a
    /// spy on a plain function upgrades it in place.
    fn ensure_function(
        &self,
        operator: Operator,
        spied: bool,
    ) -> Result<(MockFunction, ContainerRef), MockError> {
        match self.state.binding() {
            Binding::Returned { function, container } => {
                if spied && !function.is_spy() {
                    let spy = self.session.construct_spy(return_value_body(&container))?;
                    container.borrow_mut().spy = Some(spy.clone());
                    function.upgrade_to_spy(spy);
                    debug!(function = %function.id(), "upgraded function to spy");
                }
                Ok((function, container))
            }
            Binding::Node(node) => {
                let attachment = self.session.attachment(node.id()).ok_or_else(|| {
                    MockError::usage(
                        operator,
                        "cannot install a function on a root handle; navigate to a property first",
                    )
                })?;
                let slot = attachment.slot_parent()?;

                let container = ReturnContainer::new(MockValue::Object(node.clone()));
                let function = if spied {
                    let spy = self.session.construct_spy(return_value_body(&container))?;
                    container.borrow_mut().spy = Some(spy.clone());
                    MockFunction::spied(&container, spy)
                } else {
                    MockFunction::returning(&container)
                };

                let binding = Binding::Returned {
                    function: function.clone(),
                    container: container.clone(),
                };
                match &slot {
                    Some(parent) => {
                        parent.insert(attachment.key.clone(), binding.value());
                        self.session.attach_function(&function, parent, &attachment.key);
                    }
                    None => self.session.keep_attachment(&binding, attachment.clone()),
                }
                self.session.forget_attachment(node.id());
                self.session.register_function(&function, &container);
                self.session.rebind(&self.state, binding);
                debug!(
                    key = %attachment.key,
                    function = %function.id(),
                    spied,
                    in_tree = slot.is_some(),
                    "installed function"
                );
                Ok((function, container))
            }
        }
    }

    fn ensure_spy(&self, operator: Operator) -> Result<SpyRef, MockError> {
        let (function, _) = self.ensure_function(operator, true)?;
        function.spy().ok_or(MockError::SpyNotConfigured)
    }

    /// Install a plain function at this path. The returned handle (this
    /// one) writes into the value the function returns.
    ///
    /// Parents are held weakly, so the tree above this handle must still be
    /// alive (keep the root handle or its value around). Otherwise this
    /// fails with [`MockError::Detached`] and nothing is installed. The
    /// same holds for every operator that installs a function.
    pub fn returns(&self) -> Result<Handle, MockError> {
        self.ensure_function(Operator::Returns, false)?;
        Ok(self.clone())
    }

    /// Install a function at this path and make it return `value`
    pub fn set_returns(&self, value: impl Into<MockValue>) -> Result<(), MockError> {
        let value = value.into();
        let (_, container) = self.ensure_function(Operator::Returns, false)?;
        set_return_value(&container, value);
        Ok(())
    }

    /// Like [`Handle::returns`], with the function wrapped in a spy
    pub fn returns_spy(&self) -> Result<Handle, MockError> {
        self.ensure_function(Operator::ReturnsSpy, true)?;
        Ok(self.clone())
    }

    /// Install a spied function at this path and make it return `value`.
    /// The spy is told about the new return value.
    pub fn set_returns_spy(&self, value: impl Into<MockValue>) -> Result<(), MockError> {
        let value = value.into();
        let (_, container) = self.ensure_function(Operator::ReturnsSpy, true)?;
        set_return_value(&container, value);
        Ok(())
    }

    /// Call syntax: same as [`Handle::returns_spy`]
    pub fn call(&self) -> Result<Handle, MockError> {
        self.returns_spy()
    }

    /// Spy of the function at this path, installing or upgrading as needed
    pub fn spy(&self) -> Result<SpyRef, MockError> {
        self.ensure_spy(Operator::Spy)
    }

    // ------------------------------------------------------------------
    // Spy passthroughs
    // ------------------------------------------------------------------

    pub fn mock_return_value(&self, value: impl Into<MockValue>) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_return_value(value.into());
        Ok(spy)
    }

    pub fn mock_return_value_once(&self, value: impl Into<MockValue>) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_return_value_once(value.into());
        Ok(spy)
    }

    pub fn mock_resolved_value(&self, value: impl Into<MockValue>) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_resolved_value(value.into());
        Ok(spy)
    }

    pub fn mock_resolved_value_once(
        &self,
        value: impl Into<MockValue>,
    ) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_resolved_value_once(value.into());
        Ok(spy)
    }

    pub fn mock_rejected_value(&self, value: impl Into<MockValue>) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_rejected_value(value.into());
        Ok(spy)
    }

    pub fn mock_rejected_value_once(
        &self,
        value: impl Into<MockValue>,
    ) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_rejected_value_once(value.into());
        Ok(spy)
    }

    pub fn mock_implementation(
        &self,
        implementation: impl Fn(&[MockValue]) -> MockValue + 'static,
    ) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_implementation(Rc::new(implementation));
        Ok(spy)
    }

    pub fn mock_implementation_once(
        &self,
        implementation: impl Fn(&[MockValue]) -> MockValue + 'static,
    ) -> Result<SpyRef, MockError> {
        let spy = self.spy()?;
        spy.mock_implementation_once(Rc::new(implementation));
        Ok(spy)
    }

    // ------------------------------------------------------------------
    // In-place replacement and lifecycle
    // ------------------------------------------------------------------

    /// Overwrite the value this handle stands for.
    ///
    /// A composite of the same shape is merged in place. Anything else is
    /// written to the parent slot; a composite written that way becomes
    /// what this handle is bound to from then on. Once the parent has
    /// changed shape the slot is gone and the live tree is not touched.
    pub fn set(&self, value: impl Into<MockValue>) -> Result<(), MockError> {
        let value = value.into();
        if value.is_callable() {
            return Err(MockError::usage(
                Operator::Set,
                "cannot set a function; use returns(), returns_spy() or call()",
            ));
        }

        match self.state.binding() {
            Binding::Returned { container, .. } => {
                let current = container.borrow().value.clone();
                match (&current, &value) {
                    (MockValue::Object(existing), MockValue::Object(incoming))
                        if existing.kind() == incoming.kind() =>
                    {
                        existing.replace_entries(incoming);
                    }
                    _ => set_return_value(&container, value),
                }
                Ok(())
            }
            Binding::Node(node) => {
                let attachment = self.session.attachment(node.id()).ok_or_else(|| {
                    MockError::usage(Operator::Set, "cannot set a root handle; assign its properties instead")
                })?;

                if let MockValue::Object(incoming) = &value {
                    let current = MockValue::Object(node.clone());
                    if incoming.kind() == node.kind() && !attachment.is_displaced(&current) {
                        node.replace_entries(incoming);
                        trace!(node = %node.id(), "merged value in place");
                        return Ok(());
                    }
                }

                let Some(parent) = attachment.slot_parent()? else {
                    if let MockValue::Object(incoming) = value {
                        let binding = Binding::Node(incoming);
                        self.session.keep_attachment(&binding, attachment.clone());
                        self.session.rebind(&self.state, binding);
                    }
                    debug!(key = %attachment.key, "parent changed shape; set left the tree alone");
                    return Ok(());
                };
                parent.insert(attachment.key.clone(), value.clone());
                if let MockValue::Object(incoming) = value {
                    self.session.attach(&incoming, &parent, &attachment.key);
                    self.session.rebind(&self.state, Binding::Node(incoming.clone()));
                    debug!(
                        parent = %parent.id(),
                        key = %attachment.key,
                        node = %incoming.id(),
                        "replaced node at its slot"
                    );
                }
                Ok(())
            }
        }
    }

    /// Remove every entry. A node also leaves its parent; a return value
    /// stays, so the function then returns an empty object.
    pub fn reset(&self) {
        match self.state.binding() {
            Binding::Returned { function, .. } => {
                self.writable_node().clear();
                debug!(function = %function.id(), "reset return value");
            }
            Binding::Node(node) => {
                node.clear();
                if let Some(attachment) = self.session.attachment(node.id()) {
                    self.remove_from_slot(&attachment, &MockValue::Object(node.clone()));
                }
                debug!(node = %node.id(), "reset node");
            }
        }
    }

    /// Remove this value from its parent, remembering where it was
    pub fn detach(&self) -> Result<(), MockError> {
        let binding = self.state.binding();
        let attachment = self.session.attachment(binding.id()).ok_or_else(|| {
            MockError::usage(Operator::Detach, "cannot detach a root handle; it has no parent")
        })?;
        self.remove_from_slot(&attachment, &binding.value());
        Ok(())
    }

    fn remove_from_slot(&self, attachment: &Attachment, value: &MockValue) {
        if !attachment.holds(value) {
            return;
        }
        if let Ok(Some(parent)) = attachment.slot_parent() {
            parent.remove(&attachment.key);
            debug!(parent = %parent.id(), key = %attachment.key, "detached");
        }
    }

    /// Put this value back where it was last attached.
    ///
    /// Does nothing if the parent has changed shape since; the slot it
    /// was detached from no longer exists.
    pub fn reattach(&self) -> Result<(), MockError> {
        let binding = self.state.binding();
        let attachment = self.session.attachment(binding.id()).ok_or_else(|| {
            MockError::usage(
                Operator::Reattach,
                "cannot reattach a handle that was never attached to a parent",
            )
        })?;
        let Some(parent) = attachment.slot_parent()? else {
            debug!(key = %attachment.key, "parent changed shape; nothing to reattach to");
            return Ok(());
        };
        parent.insert(attachment.key.clone(), binding.value());
        debug!(parent = %parent.id(), key = %attachment.key, "reattached");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token dispatch
    // ------------------------------------------------------------------

    /// Read an operator key
    pub fn apply(&self, operator: Operator) -> Result<Outcome, MockError> {
        match operator {
            Operator::Returns => self.returns().map(Outcome::Handle),
            Operator::ReturnsSpy => self.returns_spy().map(Outcome::Handle),
            Operator::Spy => self.spy().map(Outcome::Spy),
            Operator::Set => Ok(Outcome::Handle(self.clone())),
            Operator::Reset => {
                self.reset();
                Ok(Outcome::Done)
            }
            Operator::Detach => self.detach().map(|()| Outcome::Done),
            Operator::Reattach => self.reattach().map(|()| Outcome::Done),
        }
    }

    /// Assign to an operator key
    pub fn apply_assign(
        &self,
        operator: Operator,
        value: impl Into<MockValue>,
    ) -> Result<(), MockError> {
        match operator {
            Operator::Returns => self.set_returns(value),
            Operator::ReturnsSpy => self.set_returns_spy(value),
            Operator::Set => self.set(value),
            Operator::Spy | Operator::Reset | Operator::Detach | Operator::Reattach => {
                Err(MockError::usage(operator, "operator cannot be assigned"))
            }
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.binding() {
            Binding::Node(node) => f.debug_tuple("Handle").field(&node).finish(),
            Binding::Returned {
                function,
                container,
            } => f
                .debug_struct("Handle")
                .field("function", &function)
                .field("returns", &container.borrow().value)
                .finish(),
        }
    }
}
