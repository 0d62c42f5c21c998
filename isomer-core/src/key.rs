use std::any::Any;
use std::cell::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::canonical::{self, CborValue, Fingerprint};
use crate::capability::EqualTo;
use crate::deep_equal::{DeepEqual, Visited};
use crate::kind::Kind;
use crate::value::Value;

/// A map keyed by wrapped values.
pub type KeyMap<V> = IndexMap<ValueKey, V>;

/// How a key finds its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Identity {
    /// Primitive payload, hashed directly.
    Native,
    /// Composite payload, hashed through its canonical form.
    Fingerprint(Fingerprint),
    /// Composite payload without a canonical form; matched by scanning.
    Opaque,
}

/// Wraps a [`Value`] so it can be used as a map key.
///
/// Primitives (booleans, integers, floats, strings) are hashable and looked
/// up directly. Composite payloads are looked up by the fingerprint of their
/// canonical form when they have one, and by a linear scan with
/// [`DeepEqual`] otherwise.
///
/// The identity is computed lazily on first use and cached, so it is a
/// snapshot of the payload at that moment.
#[derive(Clone)]
pub struct ValueKey {
    payload: Value,
    identity: OnceCell<Identity>,
}

impl ValueKey {
    /// Wraps a value. Never fails.
    pub fn new(payload: impl Into<Value>) -> Self {
        ValueKey {
            payload: payload.into(),
            identity: OnceCell::new(),
        }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    pub fn kind(&self) -> Kind {
        self.payload.kind()
    }

    /// Returns true if the payload has a native key identity.
    pub fn is_hashable(&self) -> bool {
        self.identity() == Identity::Native
    }

    /// Returns the fingerprint of a composite payload, if it has one.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        match self.identity() {
            Identity::Fingerprint(fingerprint) => Some(fingerprint),
            _ => None,
        }
    }

    fn identity(&self) -> Identity {
        *self.identity.get_or_init(|| classify(&self.payload))
    }

    /// Whether hashed lookup finds this key. False means scanning.
    fn is_indexed(&self) -> bool {
        self.identity() != Identity::Opaque
    }

    /// Compares the payloads of two keys. Keys of different kinds are unequal.
    pub fn equal(&self, other: &ValueKey) -> bool {
        self.equal_in(other, &mut Visited::new())
    }

    fn equal_in(&self, other: &ValueKey, visited: &mut Visited) -> bool {
        self.kind() == other.kind() && self.payload.deep_equal_in(&other.payload, visited)
    }

    /// Like [`ValueKey::equal`], for a value of unknown type. Anything that is
    /// not a `ValueKey` is unequal.
    pub fn equal_any(&self, other: &dyn Any) -> bool {
        match other.downcast_ref::<ValueKey>() {
            Some(other) => self.equal(other),
            None => false,
        }
    }

    /// Position of the entry whose key equals this one.
    ///
    /// A fingerprinted key can still equal an opaque key of the same kind,
    /// for example one holding a declared-equality value, and the two hash
    /// apart. A hashed miss is therefore followed by a scan of the opaque keys.
    fn find_index<V>(&self, map: &KeyMap<V>) -> Option<usize> {
        match self.identity() {
            Identity::Native => map.get_index_of(self),
            Identity::Fingerprint(_) => map
                .get_index_of(self)
                .or_else(|| self.scan(map, |key| !key.is_indexed())),
            Identity::Opaque => self.scan(map, |_| true),
        }
    }

    /// First key accepted by `filter` that equals this one. The stored key is
    /// on the left-hand side of the comparison.
    fn scan<V>(&self, map: &KeyMap<V>, filter: impl Fn(&ValueKey) -> bool) -> Option<usize> {
        map.keys()
            .position(|key| key.kind() == self.kind() && filter(key) && key.equal(self))
    }

    /// Looks up the value stored under a key equal to this one.
    pub fn get_from_map<'m, V>(&self, map: &'m KeyMap<V>) -> Option<&'m V> {
        let index = self.find_index(map)?;
        map.get_index(index).map(|(_, value)| value)
    }

    pub fn get_mut_from_map<'m, V>(&self, map: &'m mut KeyMap<V>) -> Option<&'m mut V> {
        let index = self.find_index(map)?;
        map.get_index_mut(index).map(|(_, value)| value)
    }

    /// Stores `value` under this key.
    ///
    /// If the map already holds an equal key, that entry's value is replaced
    /// and the key already in the map is kept.
    pub fn set_to_map<V>(self, map: &mut KeyMap<V>, value: V) {
        match self.find_index(map) {
            Some(index) => {
                if let Some((_, slot)) = map.get_index_mut(index) {
                    *slot = value;
                }
            }
            None => {
                map.insert(self, value);
            }
        }
    }

    /// Removes the entry under a key equal to this one and returns its value.
    ///
    /// A missing key is a no-op. The last entry takes the place of the removed
    /// one.
    pub fn delete_from_map<V>(&self, map: &mut KeyMap<V>) -> Option<V> {
        let index = self.find_index(map)?;
        map.swap_remove_index(index).map(|(_, value)| value)
    }
}

fn classify(payload: &Value) -> Identity {
    if payload.kind().is_hashable() {
        return Identity::Native;
    }
    match canonical::fingerprint(payload) {
        Ok(fingerprint) => Identity::Fingerprint(fingerprint),
        Err(err) => {
            log::debug!("key falls back to scanning: {}", err);
            Identity::Opaque
        }
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl Eq for ValueKey {}

/// Floats hash their normalized bits, composite payloads their fingerprint,
/// and opaque payloads only their kind, which puts them all in one bucket per
/// kind. Keys that are equal but hash apart are reconciled by the map
/// operations of [`ValueKey`], which scan the opaque keys after a hashed miss.
impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self.identity() {
            Identity::Native => match &self.payload {
                Value::Bool(b) => b.hash(state),
                Value::U8(n) => n.hash(state),
                Value::U16(n) => n.hash(state),
                Value::U32(n) => n.hash(state),
                Value::U64(n) => n.hash(state),
                Value::I8(n) => n.hash(state),
                Value::I16(n) => n.hash(state),
                Value::I32(n) => n.hash(state),
                Value::I64(n) => n.hash(state),
                Value::F32(x) => canonical::float_bits(f64::from(*x)).hash(state),
                Value::F64(x) => canonical::float_bits(*x).hash(state),
                Value::Str(s) => s.hash(state),
                _ => {}
            },
            Identity::Fingerprint(fingerprint) => fingerprint.hash(state),
            Identity::Opaque => {}
        }
    }
}

impl DeepEqual for ValueKey {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        self.equal_in(other, visited)
    }

    fn canonical(&self) -> Option<CborValue> {
        self.payload.canonical()
    }

    fn requires_scan(&self) -> bool {
        !self.is_indexed()
    }
}

/// A key wrapped in [`Value::Custom`] equals only keys with an equal payload.
impl EqualTo for ValueKey {
    fn equal_to(&self, other: &Value) -> bool {
        match other {
            Value::Custom(other) => self.equal_any((**other).as_any()),
            _ => false,
        }
    }
}

impl fmt::Debug for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueKey")
            .field("payload", &self.payload)
            .field("identity", &self.identity.get())
            .finish()
    }
}
