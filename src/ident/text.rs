//! Attribute text decoding
//!
//! Attribute payloads carry no encoding tag, so the wire form has to be
//! inferred from the bytes themselves.

use alloc::string::String;

use crate::ucs2;

/// Maximum number of bytes copied when decoding a narrow-text payload
pub const MAX_NARROW_TEXT: usize = 256;

/// Decode an attribute payload of unknown encoding into text
///
/// A buffer of at least two bytes whose final 16-bit unit is zero is treated
/// as a null-terminated UCS-2 string; anything else is copied as narrow
/// bytes (up to [`MAX_NARROW_TEXT`], stopping at the first NUL).
///
/// This is a heuristic, not a format tag: a narrow ASCII value whose last
/// two bytes happen to be zero decodes as UCS-2. The legacy behavior is
/// kept intentionally; callers must tolerate garbled output (it simply fails
/// to match) rather than treat it as an error.
pub fn decode_attribute_text(bytes: &[u8]) -> String {
    if looks_wide(bytes) {
        let units: alloc::vec::Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        return ucs2::decode_lossy(&units);
    }

    bytes
        .iter()
        .take(MAX_NARROW_TEXT)
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Wide-text classification: even length of at least 2 with a zero final
/// 16-bit unit
fn looks_wide(bytes: &[u8]) -> bool {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return false;
    }
    let last = &bytes[bytes.len() - 2..];
    u16::from_le_bytes([last[0], last[1]]) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(s: &str) -> alloc::vec::Vec<u8> {
        crate::ucs2::encode(s)
            .iter()
            .flat_map(|u| u.to_le_bytes())
            .collect()
    }

    #[test]
    fn decodes_wide_text() {
        assert_eq!(decode_attribute_text(&wide("SN-001")), "SN-001");
    }

    #[test]
    fn decodes_narrow_text() {
        assert_eq!(decode_attribute_text(b"ABC123"), "ABC123");
        assert_eq!(decode_attribute_text(b"ABC\0junk"), "ABC");
    }

    #[test]
    fn empty_payload_decodes_empty() {
        assert_eq!(decode_attribute_text(&[]), "");
    }

    #[test]
    fn odd_length_is_narrow() {
        // Odd-length buffers have no complete final 16-bit unit.
        assert_eq!(decode_attribute_text(&[b'A', b'B', b'C']), "ABC");
    }

    #[test]
    fn narrow_with_trailing_null_pair_misclassifies_as_wide() {
        // Known ambiguity, preserved for compatibility: "AB\0\0" decodes as
        // the UCS-2 string U+4241 rather than narrow "AB".
        let decoded = decode_attribute_text(&[b'A', b'B', 0, 0]);
        assert_eq!(decoded, "\u{4241}");
    }
}
