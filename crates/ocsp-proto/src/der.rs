//! Minimal DER encoding helpers
//!
//! OCSP responses are small and fixed in shape, so they are assembled from
//! these TLV primitives instead of a full ASN.1 schema compiler. Every helper
//! returns a complete, self-contained TLV.

use chrono::{DateTime, Utc};

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_ENUMERATED: u8 = 0x0A;
const TAG_GENERALIZED_TIME: u8 = 0x18;
const TAG_SEQUENCE: u8 = 0x30;

/// Encode a SEQUENCE
pub fn der_sequence(contents: &[u8]) -> Vec<u8> {
    der_tlv(TAG_SEQUENCE, contents)
}

/// Encode a SEQUENCE from already-encoded elements
pub fn der_sequence_of(elements: &[&[u8]]) -> Vec<u8> {
    der_sequence(&elements.concat())
}

/// Encode an OCTET STRING
pub fn der_octet_string(contents: &[u8]) -> Vec<u8> {
    der_tlv(TAG_OCTET_STRING, contents)
}

/// Encode a BIT STRING with no unused bits
pub fn der_bit_string(contents: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(contents.len() + 1);
    value.push(0x00);
    value.extend_from_slice(contents);
    der_tlv(TAG_BIT_STRING, &value)
}

/// Encode a non-negative INTEGER from big-endian magnitude bytes
pub fn der_integer(value: &[u8]) -> Vec<u8> {
    // Strip redundant leading zeros, keep at least one byte
    let first_significant = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    let mut int_value = if first_significant == value.len() {
        vec![0x00]
    } else {
        value[first_significant..].to_vec()
    };

    // High bit set would read as negative
    if int_value[0] & 0x80 != 0 {
        int_value.insert(0, 0x00);
    }
    der_tlv(TAG_INTEGER, &int_value)
}

/// Encode an ENUMERATED holding a small value
pub fn der_enumerated(value: u8) -> Vec<u8> {
    if value & 0x80 != 0 {
        der_tlv(TAG_ENUMERATED, &[0x00, value])
    } else {
        der_tlv(TAG_ENUMERATED, &[value])
    }
}

/// Encode an OBJECT IDENTIFIER
pub fn der_oid(components: &[u64]) -> Vec<u8> {
    if components.len() < 2 {
        return der_tlv(TAG_OID, &[]);
    }

    let mut encoded = encode_base128(40 * components[0] + components[1]);
    for &component in &components[2..] {
        encoded.extend_from_slice(&encode_base128(component));
    }

    der_tlv(TAG_OID, &encoded)
}

/// Encode NULL
pub fn der_null() -> Vec<u8> {
    vec![0x05, 0x00]
}

/// Encode a GeneralizedTime (`YYYYMMDDHHMMSSZ`, second precision)
pub fn der_generalized_time(time: &DateTime<Utc>) -> Vec<u8> {
    let formatted = time.format("%Y%m%d%H%M%SZ").to_string();
    der_tlv(TAG_GENERALIZED_TIME, formatted.as_bytes())
}

/// Encode context-specific explicit tag
pub fn der_explicit_context(tag: u8, contents: &[u8]) -> Vec<u8> {
    // Context-specific, constructed, tag number
    der_tlv(0xA0 | tag, contents)
}

/// Encode context-specific implicit primitive tag
pub fn der_implicit_primitive(tag: u8, contents: &[u8]) -> Vec<u8> {
    der_tlv(0x80 | tag, contents)
}

/// Encode Tag-Length-Value
pub fn der_tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let length = der_length(contents.len());
    let mut result = Vec::with_capacity(1 + length.len() + contents.len());
    result.push(tag);
    result.extend_from_slice(&length);
    result.extend_from_slice(contents);
    result
}

/// Encode DER length
fn der_length(length: usize) -> Vec<u8> {
    if length < 128 {
        vec![length as u8]
    } else {
        let mut length_bytes = Vec::new();
        let mut len = length;
        while len > 0 {
            length_bytes.insert(0, (len & 0xFF) as u8);
            len >>= 8;
        }
        let mut result = vec![0x80 | length_bytes.len() as u8];
        result.extend_from_slice(&length_bytes);
        result
    }
}

/// Encode value in base-128 (for OID components)
fn encode_base128(mut value: u64) -> Vec<u8> {
    let mut result = vec![(value & 0x7F) as u8];
    value >>= 7;

    while value > 0 {
        result.insert(0, (value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    result
}
