//! Installed functions and the function-mock store
//!
//! A function produced by the engine owns a [`ReturnContainer`] holding the
//! value it returns (and the spy wrapping it, if any). The store maps a
//! function back to that container so repeated access to the same mocked
//! path reuses it instead of installing a new function.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::spy::SpyRef;
use crate::table::{WeakTable, WeakTarget};
use crate::value::{CheapClone, Id, MockValue};

/// Function body signature
pub type Implementation = Rc<dyn Fn(&[MockValue]) -> MockValue>;

/// How an installed function runs when called
#[derive(Clone)]
pub enum Callable {
    /// Runs the body directly
    Plain(Implementation),
    /// Runs through a spy that records the call
    Spied(SpyRef),
}

/// Current return value and optional spy of an installed function
#[derive(Default)]
pub struct ReturnContainer {
    pub value: MockValue,
    pub spy: Option<SpyRef>,
}

pub type ContainerRef = Rc<RefCell<ReturnContainer>>;

type WeakContainer = Weak<RefCell<ReturnContainer>>;

impl ReturnContainer {
    pub fn new(value: MockValue) -> ContainerRef {
        Rc::new(RefCell::new(ReturnContainer { value, spy: None }))
    }
}

impl fmt::Debug for ReturnContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnContainer")
            .field("value", &self.value)
            .field("spied", &self.spy.is_some())
            .finish()
    }
}

/// Replace the container's return value, keeping an attached spy in sync.
///
/// The spy is told after the container borrow is released.
pub fn set_return_value(container: &ContainerRef, value: MockValue) {
    let spy = {
        let mut inner = container.borrow_mut();
        inner.value = value.clone();
        inner.spy.clone()
    };
    if let Some(spy) = spy {
        spy.mock_return_value(value);
    }
}

/// Body that returns whatever the container currently holds.
///
/// Holds the container weakly: the function owning the container keeps it
/// alive, and the spy wrapping this body must not.
pub fn return_value_body(container: &ContainerRef) -> Implementation {
    let container = Rc::downgrade(container);
    Rc::new(move |_args| {
        container
            .upgrade()
            .map(|c| c.borrow().value.clone())
            .unwrap_or_default()
    })
}

struct FunctionCell {
    id: Id,
    callable: RefCell<Callable>,
    returns: Option<ContainerRef>,
}

/// A callable value stored in the backing tree
#[derive(Clone)]
pub struct MockFunction(Rc<FunctionCell>);

impl CheapClone for MockFunction {}

/// Non-owning reference to an installed function
#[derive(Clone)]
pub struct WeakFunction(Weak<FunctionCell>);

impl WeakFunction {
    pub fn upgrade(&self) -> Option<MockFunction> {
        self.0.upgrade().map(MockFunction)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl MockFunction {
    fn with_parts(callable: Callable, returns: Option<ContainerRef>) -> Self {
        MockFunction(Rc::new(FunctionCell {
            id: Id::next(),
            callable: RefCell::new(callable),
            returns,
        }))
    }

    /// Function running an arbitrary body, not managed by any session
    pub fn from_fn(body: impl Fn(&[MockValue]) -> MockValue + 'static) -> Self {
        Self::with_parts(Callable::Plain(Rc::new(body)), None)
    }

    /// Function returning the container's current value
    pub fn returning(container: &ContainerRef) -> Self {
        Self::with_parts(
            Callable::Plain(return_value_body(container)),
            Some(container.cheap_clone()),
        )
    }

    /// Function returning the container's value through `spy`
    pub fn spied(container: &ContainerRef, spy: SpyRef) -> Self {
        Self::with_parts(Callable::Spied(spy), Some(container.cheap_clone()))
    }

    pub fn id(&self) -> Id {
        self.0.id
    }

    /// Check if two references point to the same function
    pub fn ptr_eq(a: &MockFunction, b: &MockFunction) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn downgrade(&self) -> WeakFunction {
        WeakFunction(Rc::downgrade(&self.0))
    }

    pub fn call(&self, args: &[MockValue]) -> MockValue {
        // Cloned out so the body can re-enter this function
        let callable = self.0.callable.borrow().clone();
        match callable {
            Callable::Plain(body) => body(args),
            Callable::Spied(spy) => spy.call(args),
        }
    }

    pub fn spy(&self) -> Option<SpyRef> {
        match &*self.0.callable.borrow() {
            Callable::Spied(spy) => Some(spy.clone()),
            Callable::Plain(_) => None,
        }
    }

    pub fn is_spy(&self) -> bool {
        matches!(&*self.0.callable.borrow(), Callable::Spied(_))
    }

    /// Container this function returns from, if the engine built it
    pub fn return_container(&self) -> Option<ContainerRef> {
        self.0.returns.clone()
    }

    /// Route future calls through `spy`, keeping this function's identity
    pub(crate) fn upgrade_to_spy(&self, spy: SpyRef) {
        *self.0.callable.borrow_mut() = Callable::Spied(spy);
    }
}

impl fmt::Debug for MockFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_spy() { "spy" } else { "mock" };
        write!(f, "[Function: {} {}]", kind, self.id())
    }
}

/// Function-mock store: installed function -> return-value container.
///
/// The function owns its container; the store only points at it.
pub struct FunctionStore {
    table: WeakTable<WeakContainer>,
}

impl FunctionStore {
    pub fn new(threshold: usize) -> Self {
        Self {
            table: WeakTable::new("functions", threshold),
        }
    }

    pub fn insert(&mut self, function: &MockFunction, container: &ContainerRef) {
        self.table.insert(
            function.id(),
            WeakTarget::from(function),
            Rc::downgrade(container),
        );
    }

    /// Container for `function`, adopting engine-built functions this
    /// store has not seen yet (for example ones built by another session)
    pub fn container(&mut self, function: &MockFunction) -> Option<ContainerRef> {
        if let Some(container) = self.table.get(function.id()).and_then(Weak::upgrade) {
            return Some(container);
        }
        let container = function.return_container()?;
        self.insert(function, &container);
        Some(container)
    }

    pub fn table(&self) -> &WeakTable<WeakContainer> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut WeakTable<WeakContainer> {
        &mut self.table
    }
}
