//! Isomer compares dynamically-typed values by structure.
//!
//! Core concepts:
//! - **Value**: A dynamically-typed value: primitives, sequences, mappings,
//!   shared pointers and user-defined aggregates
//! - **DeepEqual**: Recursive structural equality that terminates on cyclic data
//! - **Aggregate**: A user-defined type compared field by field, usually through
//!   `#[derive(DeepEqual)]`
//! - **EqualTo**: A value that declares its own notion of equality
//! - **ValueKey**: Wraps a value, composite ones included, so it can key a map
//! - **Fingerprint**: A Blake3 hash of a value's canonical CBOR form
//!
//! # Example
//!
//! ```
//! use isomer_core::{DeepEqual, KeyMap, Value, ValueKey};
//!
//! let a = Value::dict([("a", 3)]);
//! let b = Value::dict([("a", 3)]);
//! assert!(a.deep_equal(&b));
//!
//! // Composite keys built independently find the same entry
//! let key = || ValueKey::new(Value::dict([("a", Value::from("b")), ("c", Value::U64(4))]));
//! let mut map = KeyMap::new();
//! key().set_to_map(&mut map, "foo");
//! assert_eq!(key().get_from_map(&map), Some(&"foo"));
//! ```
//!
//! # Derived equality
//!
//! ```
//! use isomer_core::DeepEqual;
//!
//! #[derive(Debug, DeepEqual)]
//! struct Document {
//!     title: String,
//!     #[deep_equal(ignore)]
//!     revision: u64,
//! }
//!
//! let a = Document { title: "notes".into(), revision: 1 };
//! let b = Document { title: "notes".into(), revision: 2 };
//! assert!(a.deep_equal(&b));
//! ```

extern crate self as isomer_core;

pub mod canonical;
mod capability;
mod deep_equal;
mod key;
mod kind;
mod value;

pub use canonical::{CanonicalError, CborValue, Fingerprint};
pub use capability::{Aggregate, AsAny, EqualTo};
pub use deep_equal::{DeepEqual, Visited, contains_all, deep_equal};
pub use key::{KeyMap, ValueKey};
pub use kind::{FloatType, IntType, Kind};
pub use value::{ByteString, Pointer, Shared, Value};

#[cfg(feature = "derive")]
pub use isomer_derive::DeepEqual;
