use std::any::Any;
use std::fmt::Debug;

use crate::canonical::CborValue;
use crate::deep_equal::{DeepEqual, Visited};
use crate::value::Value;

/// Upcast to `Any`, so type-erased values can be downcast again.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value that decides for itself what it is equal to.
///
/// Stored behind [`Value::Custom`]. When such a value is on the left-hand side
/// of a comparison, the decision is delegated to [`EqualTo::equal_to`] before
/// any structural check, so it may accept values of another kind.
pub trait EqualTo: AsAny + Debug {
    fn equal_to(&self, other: &Value) -> bool;
}

/// A user-defined aggregate stored behind [`Value::Aggregate`].
///
/// Every `DeepEqual` type is an aggregate: two aggregates are equal when they
/// have the same concrete type and its `DeepEqual` implementation says so.
pub trait Aggregate: AsAny + Debug {
    fn equal_aggregate(&self, other: &dyn Aggregate, visited: &mut Visited) -> bool;

    fn canonical_aggregate(&self) -> Option<CborValue>;
}

impl<T: DeepEqual + Debug + 'static> Aggregate for T {
    fn equal_aggregate(&self, other: &dyn Aggregate, visited: &mut Visited) -> bool {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self.deep_equal_in(other, visited),
            None => false,
        }
    }

    fn canonical_aggregate(&self) -> Option<CborValue> {
        self.canonical()
    }
}
