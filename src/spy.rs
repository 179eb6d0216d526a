//! Spy capability injected into a session.
//!
//! The engine never records calls itself. It asks the configured
//! [`SpyConstructor`] to wrap a function body and forwards call tracking
//! and return-value overrides to the resulting [`Spy`]. [`Recorder`] is a
//! complete spy with the precedence rules test authors expect from
//! framework spies, for use when no host framework provides one.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::function::Implementation;
use crate::value::MockValue;

/// Call-tracking wrapper around a function body
pub trait Spy {
    /// Record the call and produce its result
    fn call(&self, args: &[MockValue]) -> MockValue;

    /// Arguments of every call so far, oldest first
    fn calls(&self) -> Vec<Vec<MockValue>>;

    fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn last_call(&self) -> Option<Vec<MockValue>> {
        self.calls().pop()
    }

    fn mock_return_value(&self, value: MockValue);

    fn mock_return_value_once(&self, value: MockValue);

    fn mock_resolved_value(&self, value: MockValue) {
        self.mock_return_value(MockValue::resolved(value));
    }

    fn mock_resolved_value_once(&self, value: MockValue) {
        self.mock_return_value_once(MockValue::resolved(value));
    }

    fn mock_rejected_value(&self, value: MockValue) {
        self.mock_return_value(MockValue::rejected(value));
    }

    fn mock_rejected_value_once(&self, value: MockValue) {
        self.mock_return_value_once(MockValue::rejected(value));
    }

    fn mock_implementation(&self, implementation: Implementation);

    fn mock_implementation_once(&self, implementation: Implementation);

    /// Forget recorded calls, keeping configured behavior
    fn mock_clear(&self);
}

pub type SpyRef = Rc<dyn Spy>;

/// Builds a spy around the given function body
pub type SpyConstructor = Rc<dyn Fn(Implementation) -> SpyRef>;

/// Check if two spy references point to the same spy
pub fn same_spy(a: &SpyRef, b: &SpyRef) -> bool {
    Rc::ptr_eq(a, b)
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<Vec<MockValue>>,
    results: Vec<MockValue>,
    once: VecDeque<Implementation>,
    persistent: Option<Implementation>,
}

/// Reference spy.
///
/// A call uses the oldest queued once-implementation, else the latest
/// persistent override, else the wrapped body.
pub struct Recorder {
    body: Implementation,
    state: RefCell<RecorderState>,
}

impl Recorder {
    pub fn new(body: Implementation) -> Self {
        Self {
            body,
            state: RefCell::new(RecorderState::default()),
        }
    }

    /// Constructor suitable for `Config::with_spy_constructor`
    pub fn constructor() -> SpyConstructor {
        Rc::new(|body| Rc::new(Recorder::new(body)) as SpyRef)
    }

    /// Values returned by every call so far, oldest first
    pub fn results(&self) -> Vec<MockValue> {
        self.state.borrow().results.clone()
    }
}

fn constant(value: MockValue) -> Implementation {
    Rc::new(move |_| value.clone())
}

impl Spy for Recorder {
    fn call(&self, args: &[MockValue]) -> MockValue {
        let implementation = {
            let mut state = self.state.borrow_mut();
            state.calls.push(args.to_vec());
            match state.once.pop_front() {
                Some(once) => once,
                None => state
                    .persistent
                    .clone()
                    .unwrap_or_else(|| self.body.clone()),
            }
        };
        // Borrow released: the body may read state that calls back into us
        let result = implementation(args);
        self.state.borrow_mut().results.push(result.clone());
        result
    }

    fn calls(&self) -> Vec<Vec<MockValue>> {
        self.state.borrow().calls.clone()
    }

    fn call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    fn mock_return_value(&self, value: MockValue) {
        self.state.borrow_mut().persistent = Some(constant(value));
    }

    fn mock_return_value_once(&self, value: MockValue) {
        self.state.borrow_mut().once.push_back(constant(value));
    }

    fn mock_implementation(&self, implementation: Implementation) {
        self.state.borrow_mut().persistent = Some(implementation);
    }

    fn mock_implementation_once(&self, implementation: Implementation) {
        self.state.borrow_mut().once.push_back(implementation);
    }

    fn mock_clear(&self) {
        let mut state = self.state.borrow_mut();
        state.calls.clear();
        state.results.clear();
    }
}

impl fmt::Debug for dyn Spy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("calls", &self.call_count())
            .finish()
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Recorder")
            .field("calls", &state.calls.len())
            .field("queued_once", &state.once.len())
            .field("overridden", &state.persistent.is_some())
            .finish()
    }
}
