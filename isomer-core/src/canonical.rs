//! Canonical CBOR form of values and the fingerprints derived from it.
//!
//! The canonical tree follows the deterministic encoding rules of RFC 8949
//! §4.2.1: map entries are ordered by the bytewise order of their encoded
//! keys. Floats are normalized so that the tree agrees with
//! [`DeepEqual`]: every NaN maps to one quiet NaN and `-0.0` maps to `0.0`.

use std::fmt;

use thiserror::Error;

use crate::deep_equal::DeepEqual;
use crate::kind::Kind;
use crate::value::Value;

pub use ciborium::Value as CborValue;

/// Error produced while deriving a fingerprint.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("{0} value has no canonical form")]
    Opaque(Kind),
    #[error("canonical encoding failed: {0}")]
    Encode(String),
}

/// A 32-byte Blake3 hash of a canonical encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Computes the fingerprint of the given encoded data.
    pub fn from_data(data: &[u8]) -> Self {
        Fingerprint(*blake3::hash(data).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Fingerprint(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Computes the fingerprint of a value.
///
/// Fails with [`CanonicalError::Opaque`] when the value, or anything nested
/// in it, has no canonical form.
pub fn fingerprint(value: &Value) -> Result<Fingerprint, CanonicalError> {
    let tree = value
        .canonical()
        .ok_or(CanonicalError::Opaque(value.kind()))?;
    let bytes = encode(&tree)?;
    Ok(Fingerprint::from_data(&bytes))
}

/// Encodes a canonical tree to CBOR bytes.
pub fn encode(tree: &CborValue) -> Result<Vec<u8>, CanonicalError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(tree, &mut bytes)
        .map_err(|e| CanonicalError::Encode(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Normalized float: all NaNs collapse to one, negative zero becomes zero.
pub fn float(x: f64) -> CborValue {
    CborValue::Float(f64::from_bits(float_bits(x)))
}

/// Bit pattern of a float after the normalization applied by [`float`].
pub fn float_bits(x: f64) -> u64 {
    if x.is_nan() {
        f64::NAN.to_bits()
    } else if x == 0.0 {
        0
    } else {
        x.to_bits()
    }
}

/// Wraps a payload with the tag of its kind: `[tag, payload]`.
pub fn tagged(kind: Kind, payload: CborValue) -> CborValue {
    CborValue::Array(vec![CborValue::Integer(kind.tag().into()), payload])
}

/// Canonical form of an aggregate: its name followed by its members in
/// declaration order.
pub fn record(name: &str, members: Vec<(&str, CborValue)>) -> CborValue {
    CborValue::Array(vec![
        CborValue::Text(name.to_owned()),
        CborValue::Map(
            members
                .into_iter()
                .map(|(member, value)| (CborValue::Text(member.to_owned()), value))
                .collect(),
        ),
    ])
}

/// Canonical form of a mapping, or `None` if any key or value lacks one.
pub fn map<'a, K, V, I>(entries: I) -> Option<CborValue>
where
    K: DeepEqual + ?Sized + 'a,
    V: DeepEqual + ?Sized + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let entries = entries
        .into_iter()
        .map(|(k, v)| Some((k.canonical()?, v.canonical()?)))
        .collect::<Option<Vec<_>>>()?;
    sorted_map(entries)
}

/// Orders map entries by their encoded keys.
pub fn sorted_map(entries: Vec<(CborValue, CborValue)>) -> Option<CborValue> {
    let mut keyed = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        match encode(&key) {
            Ok(bytes) => keyed.push((bytes, key, value)),
            Err(err) => {
                log::trace!("cannot order map entry: {}", err);
                return None;
            }
        }
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Some(CborValue::Map(
        keyed.into_iter().map(|(_, key, value)| (key, value)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_deterministic() {
        let f1 = Fingerprint::from_data(b"hello world");
        let f2 = Fingerprint::from_data(b"hello world");
        assert_eq!(f1, f2);
        assert_ne!(f1, Fingerprint::from_data(b"hello"));
    }

    #[test]
    fn fingerprint_display() {
        let f = Fingerprint::from_data(b"test");
        let s = format!("{}", f);
        assert_eq!(s.len(), 64);
        assert!(format!("{:?}", f).starts_with("Fingerprint("));
    }

    #[test]
    fn floats_are_normalized() {
        assert_eq!(float_bits(f64::NAN), float_bits(-f64::NAN));
        assert_eq!(float_bits(-0.0), float_bits(0.0));
        assert_ne!(float_bits(1.0), float_bits(-1.0));
    }

    #[test]
    fn map_order_is_independent_of_insertion() {
        let a = sorted_map(vec![
            (CborValue::Text("b".into()), CborValue::Bool(true)),
            (CborValue::Text("a".into()), CborValue::Bool(false)),
        ]);
        let b = sorted_map(vec![
            (CborValue::Text("a".into()), CborValue::Bool(false)),
            (CborValue::Text("b".into()), CborValue::Bool(true)),
        ]);
        let (Some(a), Some(b)) = (a, b) else {
            panic!("text keys always encode");
        };
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn kinds_keep_fingerprints_apart() {
        let a = fingerprint(&Value::U32(3)).unwrap();
        let b = fingerprint(&Value::U64(3)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn pointers_are_opaque() {
        let err = fingerprint(&Value::pointer(Value::Bool(true))).unwrap_err();
        assert!(matches!(err, CanonicalError::Opaque(Kind::Pointer)));
        assert_eq!(err.to_string(), "Pointer value has no canonical form");
    }
}
