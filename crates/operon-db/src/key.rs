//! Key codecs.
//!
//! Encoded keys must preserve the component ordering under byte-wise
//! comparison, because prefix scans rely on the store's key order: integers
//! are big-endian, strings are prefixed by a 2-byte big-endian length, and
//! composites concatenate their components in declaration order.

use crate::column::ColumnFamily;
use crate::error::{StoreError, StoreResult};
use crate::txn::Transaction;

/// A value usable as (part of) a column key.
pub trait TableKey: Sized {
    /// Append the encoded form to `out`.
    fn write_to(&self, out: &mut Vec<u8>) -> StoreResult<()>;

    /// Decode a key from the front of `input`, advancing it past the
    /// consumed bytes.
    fn read_from(input: &mut &[u8]) -> StoreResult<Self>;

    /// Encode into a fresh buffer.
    fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> StoreResult<&'a [u8]> {
    if input.len() < n {
        return Err(StoreError::KeyEncoding(format!(
            "truncated key: wanted {n} bytes, {} left",
            input.len()
        )));
    }
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}

macro_rules! int_key {
    ($ty:ty, $width:expr) => {
        impl TableKey for $ty {
            fn write_to(&self, out: &mut Vec<u8>) -> StoreResult<()> {
                out.extend_from_slice(&self.to_be_bytes());
                Ok(())
            }

            fn read_from(input: &mut &[u8]) -> StoreResult<Self> {
                let bytes = take(input, $width)?;
                Ok(<$ty>::from_be_bytes(bytes.try_into().expect("sized slice")))
            }
        }
    };
}

int_key!(u64, 8);
int_key!(i64, 8);
int_key!(u32, 4);
int_key!(i32, 4);

impl TableKey for String {
    fn write_to(&self, out: &mut Vec<u8>) -> StoreResult<()> {
        let bytes = self.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| {
            StoreError::KeyEncoding(format!(
                "string key of {} bytes exceeds the 2-byte length prefix",
                bytes.len()
            ))
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(bytes);
        Ok(())
    }

    fn read_from(input: &mut &[u8]) -> StoreResult<Self> {
        let len = u16::from_be_bytes(take(input, 2)?.try_into().expect("sized slice"));
        let bytes = take(input, len as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StoreError::KeyEncoding(format!("string key is not UTF-8: {e}")))
    }
}

// Unit key for single-row families (e.g. the key generator).
impl TableKey for () {
    fn write_to(&self, _out: &mut Vec<u8>) -> StoreResult<()> {
        Ok(())
    }

    fn read_from(_input: &mut &[u8]) -> StoreResult<Self> {
        Ok(())
    }
}

impl<A: TableKey, B: TableKey> TableKey for (A, B) {
    fn write_to(&self, out: &mut Vec<u8>) -> StoreResult<()> {
        self.0.write_to(out)?;
        self.1.write_to(out)
    }

    fn read_from(input: &mut &[u8]) -> StoreResult<Self> {
        Ok((A::read_from(input)?, B::read_from(input)?))
    }
}

/// A reference to a primary key in another column family.
///
/// The wrapper encodes exactly like the inner key; its extra behavior is
/// [`ForeignKey::verify`], which confirms the referenced row exists. The
/// check runs only when the transaction has consistency checks enabled, so
/// production paths pay nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey<K> {
    references: ColumnFamily,
    key: K,
}

impl<K: TableKey> ForeignKey<K> {
    pub fn new(references: ColumnFamily, key: K) -> Self {
        Self { references, key }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn into_key(self) -> K {
        self.key
    }

    /// Verify that the referenced row exists.
    pub fn verify(&self, txn: &Transaction) -> StoreResult<()> {
        if !txn.consistency_checks() {
            return Ok(());
        }
        if txn.contains(self.references, &self.key)? {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation {
                family: self.references,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<K: TableKey>(key: &K) -> Vec<u8> {
        key.encode().unwrap()
    }

    #[test]
    fn integers_are_big_endian() {
        assert_eq!(encoded(&0x0102_0304u32), [1, 2, 3, 4]);
        assert_eq!(encoded(&1i64)[..7], [0; 7]);
    }

    #[test]
    fn integer_encoding_preserves_order() {
        let mut keys: Vec<u64> = vec![0, 1, 255, 256, u64::MAX, 42];
        keys.sort_unstable();
        let encodings: Vec<_> = keys.iter().map(encoded).collect();
        let mut sorted = encodings.clone();
        sorted.sort();
        assert_eq!(encodings, sorted);
    }

    #[test]
    fn string_is_length_prefixed() {
        let bytes = encoded(&"ab".to_string());
        assert_eq!(bytes, [0, 2, b'a', b'b']);
    }

    #[test]
    fn oversized_string_key_is_rejected() {
        let huge = "x".repeat(u16::MAX as usize + 1);
        assert!(matches!(
            huge.write_to(&mut Vec::new()),
            Err(StoreError::KeyEncoding(_))
        ));
    }

    #[test]
    fn composite_roundtrip() {
        let key = ("decision-x".to_string(), 3i32);
        let bytes = encoded(&key);
        let mut input = bytes.as_slice();
        let decoded = <(String, i32)>::read_from(&mut input).unwrap();
        assert_eq!(decoded, key);
        assert!(input.is_empty());
    }

    #[test]
    fn composite_prefix_matches_full_key_encoding() {
        // A scan prefix of just the first component must be a byte prefix of
        // the composite encoding.
        let full = encoded(&("id".to_string(), 7i32));
        let prefix = encoded(&"id".to_string());
        assert!(full.starts_with(&prefix));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut input: &[u8] = &[0, 0, 0];
        assert!(matches!(
            i64::read_from(&mut input),
            Err(StoreError::KeyEncoding(_))
        ));
    }
}
