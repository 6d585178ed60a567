use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// Identifier naming one ingested artifact's manifest and events.
///
/// Derived from the object's digest: `"rcpt_"` followed by the first 16 hex
/// characters of the digest. Identical content always yields the same id.
///
/// Two different digests sharing the same 16-character prefix would map to
/// the same id. Nothing in the store detects that case.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Namespace tag prepended to every receipt id.
    pub const PREFIX: &'static str = "rcpt_";
    /// Number of digest hex characters kept in the id.
    pub const DIGEST_CHARS: usize = 16;

    /// Derive the receipt id for a digest. Pure and total.
    pub fn derive(digest: &Digest) -> Self {
        let hex = digest.to_hex();
        Self(format!("{}{}", Self::PREFIX, &hex[..Self::DIGEST_CHARS]))
    }

    /// Parse a user-supplied receipt id.
    ///
    /// Accepts exactly the shape produced by [`ReceiptId::derive`], so a
    /// parsed id can be joined onto a store path safely.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let tail = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypeError::InvalidReceiptId(s.to_string()))?;
        let well_formed = tail.len() == Self::DIGEST_CHARS
            && tail
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(TypeError::InvalidReceiptId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `digest` derives to this id.
    pub fn matches(&self, digest: &Digest) -> bool {
        *self == Self::derive(digest)
    }
}

impl fmt::Debug for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiptId({})", self.0)
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReceiptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derive_takes_sixteen_hex_chars() {
        let digest = Digest::from_hash([0xab; 32]);
        let id = ReceiptId::derive(&digest);
        assert_eq!(id.as_str(), "rcpt_abababababababab");
        assert!(id.matches(&digest));
    }

    #[test]
    fn parse_accepts_derived_ids() {
        let id = ReceiptId::derive(&Digest::from_hash([7; 32]));
        assert_eq!(ReceiptId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_foreign_shapes() {
        for bad in [
            "rcpt_missing",
            "receipt_0123456789abcdef",
            "rcpt_0123456789ABCDEF",
            "rcpt_0123456789abcde",
            "rcpt_../../../etc/pa",
            "",
        ] {
            assert!(ReceiptId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ReceiptId::derive(&Digest::from_hash([1; 32]));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"rcpt_0101010101010101\"");
    }

    proptest! {
        #[test]
        fn derive_depends_only_on_digest(bytes in proptest::array::uniform32(any::<u8>())) {
            let a = ReceiptId::derive(&Digest::from_hash(bytes));
            let b = ReceiptId::derive(&Digest::from_hash(bytes));
            prop_assert_eq!(&a, &b);
            prop_assert!(ReceiptId::parse(a.as_str()).is_ok());
        }
    }
}
