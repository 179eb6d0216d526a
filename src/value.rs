//! Mock value representation
//!
//! The backing data that code under test eventually observes: primitives,
//! ordinary objects, arrays, installed functions and settled promises.
//! Composite values are reference-counted nodes with a stable identity so
//! the engine can keep side tables keyed by node.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHasher;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::MockError;
use crate::function::MockFunction;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This makes it explicit when a clone only bumps a reference count
/// (`NodeRef`, `MockString`, `MockFunction`) instead of copying data.
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// Insertion-ordered map with Fx hashing, used for ordinary object entries
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Process-unique identity of a backing node or installed function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u64);

impl Id {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Id(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value stored in the backing tree
#[derive(Clone, Default)]
pub enum MockValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(MockString),
    Object(NodeRef),
    Function(MockFunction),
    Promise(Rc<Settlement>),
}

/// Outcome carried by an already settled promise
#[derive(Debug, Clone)]
pub enum Settlement {
    Resolved(MockValue),
    Rejected(MockValue),
}

impl MockValue {
    /// Fresh empty ordinary object
    pub fn object() -> Self {
        MockValue::Object(NodeRef::new_object())
    }

    /// Fresh empty array
    pub fn array() -> Self {
        MockValue::Object(NodeRef::new_array())
    }

    pub fn resolved(value: impl Into<MockValue>) -> Self {
        MockValue::Promise(Rc::new(Settlement::Resolved(value.into())))
    }

    pub fn rejected(value: impl Into<MockValue>) -> Self {
        MockValue::Promise(Rc::new(Settlement::Rejected(value.into())))
    }

    /// Check if this value is an object or an array
    pub fn is_composite(&self) -> bool {
        matches!(self, MockValue::Object(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, MockValue::Undefined)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, MockValue::Function(_))
    }

    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            MockValue::Object(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&MockFunction> {
        match self {
            MockValue::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MockValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MockValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MockValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            MockValue::Undefined => "undefined",
            MockValue::Null => "object",
            MockValue::Boolean(_) => "boolean",
            MockValue::Number(_) => "number",
            MockValue::String(_) => "string",
            MockValue::Object(_) | MockValue::Promise(_) => "object",
            MockValue::Function(_) => "function",
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn is_truthy(&self) -> bool {
        match self {
            MockValue::Undefined | MockValue::Null => false,
            MockValue::Boolean(b) => *b,
            MockValue::Number(n) => *n != 0.0 && !n.is_nan(),
            MockValue::String(s) => !s.is_empty(),
            MockValue::Object(_) | MockValue::Function(_) | MockValue::Promise(_) => true,
        }
    }

    /// Plain property read, as performed by code under test.
    ///
    /// Missing entries, holes and reads on primitives yield `Undefined`.
    pub fn get(&self, key: impl Into<Key>) -> MockValue {
        match self {
            MockValue::Object(node) => node.child(&key.into()).unwrap_or_default(),
            _ => MockValue::Undefined,
        }
    }

    /// Invoke this value as a function
    pub fn call(&self, args: &[MockValue]) -> Result<MockValue, MockError> {
        match self {
            MockValue::Function(func) => Ok(func.call(args)),
            other => Err(MockError::not_callable(other.type_of())),
        }
    }

    /// Identity comparison (===): composites and functions compare by reference
    pub fn strict_equals(&self, other: &MockValue) -> bool {
        match (self, other) {
            (MockValue::Undefined, MockValue::Undefined) => true,
            (MockValue::Null, MockValue::Null) => true,
            (MockValue::Boolean(a), MockValue::Boolean(b)) => a == b,
            (MockValue::Number(a), MockValue::Number(b)) => a == b,
            (MockValue::String(a), MockValue::String(b)) => a == b,
            (MockValue::Object(a), MockValue::Object(b)) => NodeRef::ptr_eq(a, b),
            (MockValue::Function(a), MockValue::Function(b)) => MockFunction::ptr_eq(a, b),
            (MockValue::Promise(a), MockValue::Promise(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Structural equality in the sense of a test framework's `toEqual`.
    ///
    /// Undefined-valued properties are ignored, holes equal `Undefined`,
    /// `NaN` equals `NaN`, functions compare by identity.
    pub fn deep_equals(&self, other: &MockValue) -> bool {
        match (self, other) {
            (MockValue::Number(a), MockValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (MockValue::Object(a), MockValue::Object(b)) => {
                NodeRef::ptr_eq(a, b) || shapes_deep_equal(&a.borrow(), &b.borrow())
            }
            (MockValue::Promise(a), MockValue::Promise(b)) => match (a.as_ref(), b.as_ref()) {
                (Settlement::Resolved(x), Settlement::Resolved(y))
                | (Settlement::Rejected(x), Settlement::Rejected(y)) => x.deep_equals(y),
                _ => false,
            },
            _ => self.strict_equals(other),
        }
    }

    /// Build a fresh backing tree from JSON
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => MockValue::Null,
            serde_json::Value::Bool(b) => MockValue::Boolean(*b),
            serde_json::Value::Number(n) => MockValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => MockValue::from(s.as_str()),
            serde_json::Value::Array(items) => {
                let entries = items.iter().map(MockValue::from_json);
                MockValue::Object(NodeRef::with_shape(Shape::Array(entries.collect())))
            }
            serde_json::Value::Object(map) => {
                let mut entries = IndexMap::default();
                for (key, item) in map {
                    entries.insert(MockString::from(key.as_str()), MockValue::from_json(item));
                }
                MockValue::Object(NodeRef::with_shape(Shape::Ordinary(entries)))
            }
        }
    }

    /// Render like `JSON.stringify` followed by `JSON.parse`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn shapes_deep_equal(a: &Shape, b: &Shape) -> bool {
    match (a, b) {
        (Shape::Ordinary(a), Shape::Ordinary(b)) => {
            let defined = |map: &IndexMap<MockString, MockValue>| {
                map.values().filter(|v| !v.is_undefined()).count()
            };
            defined(a) == defined(b)
                && a.iter().filter(|(_, v)| !v.is_undefined()).all(|(key, value)| {
                    b.get(key).is_some_and(|other| value.deep_equals(other))
                })
        }
        (Shape::Array(a), Shape::Array(b)) => {
            a.len() == b.len()
                && a.indices().chain(b.indices()).all(|idx| {
                    let x = a.get(idx).unwrap_or(&MockValue::Undefined);
                    let y = b.get(idx).unwrap_or(&MockValue::Undefined);
                    x.deep_equals(y)
                })
        }
        _ => false,
    }
}

impl PartialEq for MockValue {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equals(other)
    }
}

impl fmt::Debug for MockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockValue::Undefined => write!(f, "undefined"),
            MockValue::Null => write!(f, "null"),
            MockValue::Boolean(b) => write!(f, "{}", b),
            MockValue::Number(n) => write!(f, "{}", n),
            MockValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            MockValue::Object(node) => write!(f, "{:?}", node),
            MockValue::Function(func) => write!(f, "{:?}", func),
            MockValue::Promise(settled) => match settled.as_ref() {
                Settlement::Resolved(v) => write!(f, "Promise {{<resolved>: {:?}}}", v),
                Settlement::Rejected(v) => write!(f, "Promise {{<rejected>: {:?}}}", v),
            },
        }
    }
}

impl Serialize for MockValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MockValue::Undefined | MockValue::Null | MockValue::Function(_) => {
                serializer.serialize_unit()
            }
            MockValue::Boolean(b) => serializer.serialize_bool(*b),
            MockValue::Number(n) => {
                // Integral numbers serialize as integers so they compare equal to json!(12)
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            MockValue::String(s) => serializer.serialize_str(s.as_str()),
            MockValue::Object(node) => node.serialize(serializer),
            MockValue::Promise(settled) => {
                let mut map = serializer.serialize_map(Some(1))?;
                match settled.as_ref() {
                    Settlement::Resolved(v) => map.serialize_entry("resolved", v)?,
                    Settlement::Rejected(v) => map.serialize_entry("rejected", v)?,
                }
                map.end()
            }
        }
    }
}

// Conversions from Rust types

impl From<bool> for MockValue {
    fn from(b: bool) -> Self {
        MockValue::Boolean(b)
    }
}

impl From<f64> for MockValue {
    fn from(n: f64) -> Self {
        MockValue::Number(n)
    }
}

impl From<i32> for MockValue {
    fn from(n: i32) -> Self {
        MockValue::Number(n as f64)
    }
}

impl From<i64> for MockValue {
    fn from(n: i64) -> Self {
        MockValue::Number(n as f64)
    }
}

impl From<u32> for MockValue {
    fn from(n: u32) -> Self {
        MockValue::Number(n as f64)
    }
}

impl From<&str> for MockValue {
    fn from(s: &str) -> Self {
        MockValue::String(MockString::from(s))
    }
}

impl From<String> for MockValue {
    fn from(s: String) -> Self {
        MockValue::String(MockString::from(s))
    }
}

impl From<MockString> for MockValue {
    fn from(s: MockString) -> Self {
        MockValue::String(s)
    }
}

impl From<NodeRef> for MockValue {
    fn from(node: NodeRef) -> Self {
        MockValue::Object(node)
    }
}

impl From<MockFunction> for MockValue {
    fn from(func: MockFunction) -> Self {
        MockValue::Function(func)
    }
}

impl From<serde_json::Value> for MockValue {
    fn from(json: serde_json::Value) -> Self {
        MockValue::from_json(&json)
    }
}

impl From<&serde_json::Value> for MockValue {
    fn from(json: &serde_json::Value) -> Self {
        MockValue::from_json(json)
    }
}

/// Reference-counted string for property names and string values
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockString(Rc<str>);

impl CheapClone for MockString {}

impl MockString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<str> for MockString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for MockString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for MockString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for MockString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for MockString {
    fn from(s: &str) -> Self {
        MockString(s.into())
    }
}

impl From<String> for MockString {
    fn from(s: String) -> Self {
        MockString(s.into())
    }
}

impl fmt::Debug for MockString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for MockString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Property key: a name or an array index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(MockString),
    Index(u32),
}

impl Key {
    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }

    /// Shape a node must have to hold this key
    pub fn shape_kind(&self) -> ShapeKind {
        match self {
            Key::Name(_) => ShapeKind::Ordinary,
            Key::Index(_) => ShapeKind::Array,
        }
    }
}

/// Parse a canonical array index ("0", "12", but not "01" or "-1")
fn canonical_index(s: &str) -> Option<u32> {
    let first = s.bytes().next()?;
    if !first.is_ascii_digit() {
        return None;
    }
    let idx = s.parse::<u32>().ok()?;
    (idx.to_string() == s).then_some(idx)
}

impl From<&str> for Key {
    #[inline]
    fn from(s: &str) -> Self {
        match canonical_index(s) {
            Some(idx) => Key::Index(idx),
            None => Key::Name(MockString::from(s)),
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::from(s.as_str())
    }
}

impl From<MockString> for Key {
    fn from(s: MockString) -> Self {
        match canonical_index(s.as_str()) {
            Some(idx) => Key::Index(idx),
            None => Key::Name(s),
        }
    }
}

impl From<u32> for Key {
    fn from(idx: u32) -> Self {
        Key::Index(idx)
    }
}

impl From<usize> for Key {
    fn from(idx: usize) -> Self {
        match u32::try_from(idx) {
            Ok(idx) => Key::Index(idx),
            Err(_) => Key::Name(MockString::from(idx.to_string())),
        }
    }
}

impl From<i32> for Key {
    fn from(idx: i32) -> Self {
        match u32::try_from(idx) {
            Ok(idx) => Key::Index(idx),
            Err(_) => Key::Name(MockString::from(idx.to_string())),
        }
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(s) => write!(f, "{}", s),
            Key::Index(i) => write!(f, "{}", i),
        }
    }
}

/// The two composite shapes a backing node can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Ordinary,
    Array,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Ordinary => write!(f, "object"),
            ShapeKind::Array => write!(f, "array"),
        }
    }
}

/// Sparse array storage.
///
/// Only defined entries are stored; every index below `len` without an
/// entry is a hole.
#[derive(Debug, Clone, Default)]
pub struct ArrayEntries {
    len: usize,
    items: BTreeMap<u32, MockValue>,
}

impl ArrayEntries {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, idx: u32) -> Option<&MockValue> {
        self.items.get(&idx)
    }

    /// Store `value` at `idx`, growing the length past it
    pub fn set(&mut self, idx: u32, value: MockValue) {
        self.len = self.len.max(idx as usize + 1);
        self.items.insert(idx, value);
    }

    /// Take the entry at `idx`, leaving a hole
    pub fn take(&mut self, idx: u32) -> Option<MockValue> {
        self.items.remove(&idx)
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.items.clear();
    }

    /// Indices of defined entries, ascending
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.items.keys().copied()
    }

    /// Every position below the length; `None` marks a hole
    pub fn slots(&self) -> impl Iterator<Item = Option<&MockValue>> + '_ {
        (0..self.len).map(|idx| u32::try_from(idx).ok().and_then(|idx| self.items.get(&idx)))
    }
}

impl FromIterator<MockValue> for ArrayEntries {
    fn from_iter<I: IntoIterator<Item = MockValue>>(iter: I) -> Self {
        let mut entries = ArrayEntries::default();
        for (idx, value) in iter.into_iter().enumerate() {
            if let Ok(idx) = u32::try_from(idx) {
                entries.set(idx, value);
            }
        }
        entries
    }
}

/// Entries of a backing node
#[derive(Debug)]
pub enum Shape {
    /// Ordinary object, insertion ordered
    Ordinary(IndexMap<MockString, MockValue>),
    /// Array, possibly with holes
    Array(ArrayEntries),
}

impl Shape {
    pub fn empty(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Ordinary => Shape::Ordinary(IndexMap::default()),
            ShapeKind::Array => Shape::Array(ArrayEntries::default()),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Ordinary(_) => ShapeKind::Ordinary,
            Shape::Array(_) => ShapeKind::Array,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Shape::Ordinary(map) => map.len(),
            Shape::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct NodeCell {
    id: Id,
    generation: Cell<u64>,
    shape: RefCell<Shape>,
}

/// Reference to a backing node (ordinary object or array).
///
/// Cloning shares the node; identity is the node's `Id`.
#[derive(Clone)]
pub struct NodeRef(Rc<NodeCell>);

impl CheapClone for NodeRef {}

/// Non-owning reference to a backing node
#[derive(Clone)]
pub struct WeakNodeRef(Weak<NodeCell>);

impl WeakNodeRef {
    pub fn upgrade(&self) -> Option<NodeRef> {
        self.0.upgrade().map(NodeRef)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl NodeRef {
    pub fn with_shape(shape: Shape) -> Self {
        NodeRef(Rc::new(NodeCell {
            id: Id::next(),
            generation: Cell::new(0),
            shape: RefCell::new(shape),
        }))
    }

    pub fn new_object() -> Self {
        Self::with_shape(Shape::empty(ShapeKind::Ordinary))
    }

    pub fn new_array() -> Self {
        Self::with_shape(Shape::empty(ShapeKind::Array))
    }

    pub fn id(&self) -> Id {
        self.0.id
    }

    /// Check if two references point to the same node
    pub fn ptr_eq(a: &NodeRef, b: &NodeRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn downgrade(&self) -> WeakNodeRef {
        WeakNodeRef(Rc::downgrade(&self.0))
    }

    /// Number of shape conversions this node has gone through.
    ///
    /// A conversion stands for a brand new container in the slot, so
    /// anything recorded against an earlier generation is orphaned.
    pub fn generation(&self) -> u64 {
        self.0.generation.get()
    }

    pub fn borrow(&self) -> Ref<'_, Shape> {
        self.0.shape.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Shape> {
        self.0.shape.borrow_mut()
    }

    pub fn kind(&self) -> ShapeKind {
        self.borrow().kind()
    }

    pub fn is_array(&self) -> bool {
        self.kind() == ShapeKind::Array
    }

    pub fn len(&self) -> usize {
        self.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.borrow().is_empty()
    }

    /// Read the entry at `key`. Keys of the other shape never match.
    pub fn child(&self, key: &Key) -> Option<MockValue> {
        match (&*self.borrow(), key) {
            (Shape::Ordinary(map), Key::Name(name)) => map.get(name).cloned(),
            (Shape::Array(items), Key::Index(idx)) => items.get(*idx).cloned(),
            _ => None,
        }
    }

    /// Check if the entry at `key` is exactly `value` (by identity)
    pub fn holds(&self, key: &Key, value: &MockValue) -> bool {
        self.child(key).is_some_and(|current| current.strict_equals(value))
    }

    /// Switch to an empty shape of `kind`, dropping all entries.
    /// Returns true if the shape actually changed.
    pub fn convert(&self, kind: ShapeKind) -> bool {
        let mut shape = self.borrow_mut();
        if shape.kind() == kind {
            return false;
        }
        *shape = Shape::empty(kind);
        self.0.generation.set(self.0.generation.get() + 1);
        true
    }

    /// Store `value` at `key`, converting the shape first when the key
    /// belongs to the other shape. Array writes past the end leave holes.
    /// Returns true if a shape conversion happened.
    pub fn insert(&self, key: Key, value: MockValue) -> bool {
        let converted = self.convert(key.shape_kind());
        match (&mut *self.borrow_mut(), key) {
            (Shape::Ordinary(map), Key::Name(name)) => {
                map.insert(name, value);
            }
            (Shape::Array(items), Key::Index(idx)) => items.set(idx, value),
            // convert() above guarantees the shape matches the key
            _ => {}
        }
        converted
    }

    /// Delete the entry at `key`. Array deletion leaves a hole.
    pub fn remove(&self, key: &Key) -> Option<MockValue> {
        match (&mut *self.borrow_mut(), key) {
            (Shape::Ordinary(map), Key::Name(name)) => map.shift_remove(name),
            (Shape::Array(items), Key::Index(idx)) => items.take(*idx),
            _ => None,
        }
    }

    /// Remove every own entry, keeping the shape
    pub fn clear(&self) {
        match &mut *self.borrow_mut() {
            Shape::Ordinary(map) => map.clear(),
            Shape::Array(items) => items.clear(),
        }
    }

    /// Replace all entries with those of `source`, keeping this node's
    /// identity. Both nodes must have the same shape.
    pub fn replace_entries(&self, source: &NodeRef) {
        if NodeRef::ptr_eq(self, source) {
            return;
        }
        let entries = match &*source.borrow() {
            Shape::Ordinary(map) => Shape::Ordinary(map.clone()),
            Shape::Array(items) => Shape::Array(items.clone()),
        };
        *self.borrow_mut() = entries;
    }

    /// Own keys in order; holes are skipped
    pub fn keys(&self) -> Vec<Key> {
        match &*self.borrow() {
            Shape::Ordinary(map) => map.keys().cloned().map(Key::Name).collect(),
            Shape::Array(items) => items.indices().map(Key::Index).collect(),
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        NodeRef::ptr_eq(self, other)
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.borrow() {
            Shape::Ordinary(map) => {
                let mut out = f.debug_map();
                for (key, value) in map {
                    out.entry(&format_args!("{}", key), value);
                }
                out.finish()
            }
            Shape::Array(items) => {
                let mut out = f.debug_list();
                for slot in items.slots() {
                    match slot {
                        Some(value) => out.entry(value),
                        None => out.entry(&format_args!("<empty>")),
                    };
                }
                out.finish()
            }
        }
    }
}

impl Serialize for NodeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &*self.borrow() {
            Shape::Ordinary(map) => {
                let visible = map
                    .iter()
                    .filter(|(_, v)| !matches!(v, MockValue::Undefined | MockValue::Function(_)));
                let mut out = serializer.serialize_map(None)?;
                for (key, value) in visible {
                    out.serialize_entry(key.as_str(), value)?;
                }
                out.end()
            }
            Shape::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for slot in items.slots() {
                    match slot {
                        Some(value) => out.serialize_element(value)?,
                        None => out.serialize_element(&MockValue::Null)?,
                    }
                }
                out.end()
            }
        }
    }
}
