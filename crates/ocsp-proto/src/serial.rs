//! Certificate serial numbers

use num_bigint::BigUint;
use std::fmt;

/// A non-negative certificate serial number
///
/// Serials are arbitrary-precision integers (RFC 5280 allows up to 20 octets),
/// so they are kept as a big integer rather than a machine word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(BigUint);

impl SerialNumber {
    /// Build a serial from big-endian magnitude bytes
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    /// Big-endian magnitude bytes (no sign padding)
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    /// Decimal text form
    pub fn to_decimal(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// Lowercase hexadecimal text form without padding
    pub fn to_hex(&self) -> String {
        self.0.to_str_radix(16)
    }
}

impl From<u64> for SerialNumber {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
