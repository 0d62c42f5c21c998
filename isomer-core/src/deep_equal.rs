use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::canonical::{self, CborValue};

/// Structural equality, threaded with the cycle-tracking state of one
/// top-level comparison.
///
/// Implemented for primitives, std containers and [`Value`](crate::Value).
/// Aggregates normally get it through `#[derive(DeepEqual)]`, where members
/// marked `#[deep_equal(ignore)]` take no part in the comparison. Implementing
/// it by hand is how a type declares its own notion of equality.
pub trait DeepEqual {
    /// Compares `self` with `other`, recording visited shared nodes in `visited`.
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool;

    /// Compares `self` with `other` using fresh cycle-tracking state.
    fn deep_equal(&self, other: &Self) -> bool {
        self.deep_equal_in(other, &mut Visited::new())
    }

    /// Returns the canonical CBOR tree of this value, if it has one.
    ///
    /// Two values that compare equal must produce identical trees. Values
    /// without a stable structural identity (shared mutable nodes, custom
    /// equality) return `None`.
    fn canonical(&self) -> Option<CborValue> {
        None
    }

    /// Whether this value, used as a map key, has to be matched by scanning
    /// instead of by hashed lookup.
    fn requires_scan(&self) -> bool {
        false
    }
}

/// Compares two values structurally.
///
/// Never fails: mismatched types, lengths or keys simply compare unequal.
pub fn deep_equal<T: DeepEqual + ?Sized>(a: &T, b: &T) -> bool {
    a.deep_equal(b)
}

/// A pair of shared nodes reached at corresponding positions of both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge {
    from: usize,
    to: usize,
}

/// Edge set of one comparison.
///
/// Shared nodes are identified by their allocation, which stays put for as
/// long as the comparison borrows them.
///
/// Edges are also kept in insertion order, so a tentative comparison can be
/// undone with [`Visited::checkpoint`] and [`Visited::rollback`].
#[derive(Debug, Default)]
pub struct Visited {
    edges: HashSet<Edge>,
    log: Vec<Edge>,
}

impl Visited {
    /// Creates an empty edge set for a new top-level comparison.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the edge between two shared nodes.
    ///
    /// Returns false if the edge was already recorded, in which case the
    /// caller treats the pair as equal without descending again.
    pub fn enter<T: ?Sized>(&mut self, a: &Rc<T>, b: &Rc<T>) -> bool {
        let edge = Edge {
            from: Rc::as_ptr(a).cast::<()>() as usize,
            to: Rc::as_ptr(b).cast::<()>() as usize,
        };
        let inserted = self.edges.insert(edge);
        if inserted {
            self.log.push(edge);
        }
        inserted
    }

    /// Marks the current state, to be restored with [`Visited::rollback`].
    pub fn checkpoint(&self) -> usize {
        self.log.len()
    }

    /// Forgets every edge recorded since `mark` was taken.
    pub fn rollback(&mut self, mark: usize) {
        for edge in self.log.drain(mark.min(self.log.len())..) {
            self.edges.remove(&edge);
        }
    }

    /// Returns the number of edges recorded so far.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if no edge has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Checks that every entry of `a` has a structurally equal key in `b` whose
/// value is equal too.
///
/// Extra keys in `b` go unnoticed, so callers run it in both directions. The
/// cost is O(n*m); it is only meant for keys that cannot be hashed.
pub fn contains_all<'a, K, V, A, B>(a: A, b: B, visited: &mut Visited) -> bool
where
    K: DeepEqual + ?Sized + 'a,
    V: DeepEqual + ?Sized + 'a,
    A: IntoIterator<Item = (&'a K, &'a V)>,
    B: IntoIterator<Item = (&'a K, &'a V)> + Clone,
{
    a.into_iter().all(|(ka, va)| {
        // Only the edges of the matching key may outlive its trial.
        let found = b.clone().into_iter().find(|(kb, _)| {
            let mark = visited.checkpoint();
            let matched = ka.deep_equal_in(*kb, visited);
            if !matched {
                visited.rollback(mark);
            }
            matched
        });
        match found {
            Some((_, vb)) => va.deep_equal_in(vb, visited),
            None => false,
        }
    })
}

/// Bidirectional version of [`contains_all`]. Sizes must already match.
fn scan_equal<'a, K, V, M>(a: M, b: M, visited: &mut Visited) -> bool
where
    K: DeepEqual + 'a,
    V: DeepEqual + 'a,
    M: IntoIterator<Item = (&'a K, &'a V)> + Copy,
{
    contains_all(a, b, visited) && contains_all(b, a, visited)
}

// Primitive implementations

macro_rules! impl_deep_equal_int {
    ($($t:ty),*) => {
        $(
            impl DeepEqual for $t {
                fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
                    self == other
                }

                fn canonical(&self) -> Option<CborValue> {
                    Some(CborValue::Integer((*self).into()))
                }
            }
        )*
    };
}

impl_deep_equal_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl DeepEqual for usize {
    fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
        self == other
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Integer((*self as u64).into()))
    }
}

impl DeepEqual for isize {
    fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
        self == other
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Integer((*self as i64).into()))
    }
}

macro_rules! impl_deep_equal_float {
    ($($t:ty),*) => {
        $(
            /// NaN equals NaN, so NaN-bearing values stay usable as keys.
            impl DeepEqual for $t {
                fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
                    self == other || (self.is_nan() && other.is_nan())
                }

                fn canonical(&self) -> Option<CborValue> {
                    Some(canonical::float(f64::from(*self)))
                }
            }
        )*
    };
}

impl_deep_equal_float!(f32, f64);

impl DeepEqual for bool {
    fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
        self == other
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Bool(*self))
    }
}

impl DeepEqual for char {
    fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
        self == other
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Text(self.to_string()))
    }
}

impl DeepEqual for () {
    fn deep_equal_in(&self, _other: &Self, _visited: &mut Visited) -> bool {
        true
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Null)
    }
}

impl DeepEqual for str {
    fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
        self == other
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Text(self.to_owned()))
    }
}

impl DeepEqual for String {
    fn deep_equal_in(&self, other: &Self, _visited: &mut Visited) -> bool {
        self == other
    }

    fn canonical(&self) -> Option<CborValue> {
        Some(CborValue::Text(self.clone()))
    }
}

// Sequences

impl<T: DeepEqual> DeepEqual for [T] {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|(a, b)| a.deep_equal_in(b, visited))
    }

    fn canonical(&self) -> Option<CborValue> {
        self.iter()
            .map(DeepEqual::canonical)
            .collect::<Option<Vec<_>>>()
            .map(CborValue::Array)
    }
}

impl<T: DeepEqual> DeepEqual for Vec<T> {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        self.as_slice().deep_equal_in(other.as_slice(), visited)
    }

    fn canonical(&self) -> Option<CborValue> {
        self.as_slice().canonical()
    }
}

impl<T: DeepEqual, const N: usize> DeepEqual for [T; N] {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        self[..].deep_equal_in(&other[..], visited)
    }

    fn canonical(&self) -> Option<CborValue> {
        self[..].canonical()
    }
}

macro_rules! impl_deep_equal_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: DeepEqual),+> DeepEqual for ($($name,)+) {
            fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
                $(self.$idx.deep_equal_in(&other.$idx, visited))&&+
            }

            fn canonical(&self) -> Option<CborValue> {
                Some(CborValue::Array(vec![$(self.$idx.canonical()?),+]))
            }
        }
    };
}

impl_deep_equal_tuple!(A: 0);
impl_deep_equal_tuple!(A: 0, B: 1);
impl_deep_equal_tuple!(A: 0, B: 1, C: 2);
impl_deep_equal_tuple!(A: 0, B: 1, C: 2, D: 3);

// Indirections

/// `None` stands for a null indirection and equals only another `None`.
impl<T: DeepEqual> DeepEqual for Option<T> {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.deep_equal_in(b, visited),
            (None, None) => true,
            _ => false,
        }
    }

    fn canonical(&self) -> Option<CborValue> {
        match self {
            None => Some(CborValue::Null),
            Some(inner) => Some(CborValue::Array(vec![inner.canonical()?])),
        }
    }

    fn requires_scan(&self) -> bool {
        self.as_ref().is_some_and(DeepEqual::requires_scan)
    }
}

impl<T: DeepEqual + ?Sized> DeepEqual for Box<T> {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        (**self).deep_equal_in(&**other, visited)
    }

    fn canonical(&self) -> Option<CborValue> {
        (**self).canonical()
    }

    fn requires_scan(&self) -> bool {
        (**self).requires_scan()
    }
}

/// Shared nodes are where cycles can close, so the pair is recorded before
/// descending; a pair seen before is taken as equal.
impl<T: DeepEqual + ?Sized> DeepEqual for Rc<T> {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        if !visited.enter(self, other) {
            log::trace!("edge already visited, assuming equal");
            return true;
        }
        (**self).deep_equal_in(&**other, visited)
    }

    fn canonical(&self) -> Option<CborValue> {
        (**self).canonical()
    }

    fn requires_scan(&self) -> bool {
        (**self).requires_scan()
    }
}

/// Mutable cells have no canonical form and force scanning when used as keys.
impl<T: DeepEqual + ?Sized> DeepEqual for RefCell<T> {
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        match (self.try_borrow(), other.try_borrow()) {
            (Ok(a), Ok(b)) => a.deep_equal_in(&b, visited),
            _ => {
                log::debug!("cell is mutably borrowed during comparison");
                false
            }
        }
    }

    fn requires_scan(&self) -> bool {
        true
    }
}

// Mappings

impl<K, V, S> DeepEqual for HashMap<K, V, S>
where
    K: Eq + Hash + DeepEqual,
    V: DeepEqual,
    S: BuildHasher,
{
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.keys().chain(other.keys()).any(|k| k.requires_scan()) {
            return scan_equal(self, other, visited);
        }
        self.iter().all(|(k, va)| match other.get(k) {
            Some(vb) => va.deep_equal_in(vb, visited),
            None => false,
        })
    }

    fn canonical(&self) -> Option<CborValue> {
        canonical::map(self)
    }
}

impl<K, V, S> DeepEqual for IndexMap<K, V, S>
where
    K: Eq + Hash + DeepEqual,
    V: DeepEqual,
    S: BuildHasher,
{
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.keys().chain(other.keys()).any(|k| k.requires_scan()) {
            return scan_equal(self, other, visited);
        }
        self.iter().all(|(k, va)| match other.get(k) {
            Some(vb) => va.deep_equal_in(vb, visited),
            None => false,
        })
    }

    fn canonical(&self) -> Option<CborValue> {
        canonical::map(self)
    }
}

impl<K, V> DeepEqual for BTreeMap<K, V>
where
    K: Ord + DeepEqual,
    V: DeepEqual,
{
    fn deep_equal_in(&self, other: &Self, visited: &mut Visited) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.keys().chain(other.keys()).any(|k| k.requires_scan()) {
            return scan_equal(self, other, visited);
        }
        self.iter().all(|(k, va)| match other.get(k) {
            Some(vb) => va.deep_equal_in(vb, visited),
            None => false,
        })
    }

    fn canonical(&self) -> Option<CborValue> {
        canonical::map(self)
    }
}
