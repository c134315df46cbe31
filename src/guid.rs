//! GUID text handling
//!
//! Variable namespaces are 128-bit GUIDs. Operators may hand the tool a
//! truncated textual prefix instead of a full identifier; the prefix is
//! padded out to the canonical 36-character layout (dashes at offsets 8, 13,
//! 18 and 23, zero digits everywhere else) and then parsed as a full GUID.
//! Padding is a convenience, not a wildcard: it always yields exactly one
//! concrete namespace to query.

use core::fmt::Write;

use heapless::String;
use r_efi::efi::Guid;

/// Length of the canonical textual GUID form
pub const CANONICAL_LEN: usize = 36;

/// Offsets of the dash separators in the canonical form
const DASH_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Errors from GUID text parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidError {
    /// Input was empty
    Empty,
    /// Input was not a valid canonical GUID after padding
    InvalidFormat,
}

/// Result type for GUID parsing
pub type Result<T> = core::result::Result<T, GuidError>;

fn hex_val(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(GuidError::InvalidFormat),
    }
}

fn hex_field(text: &[u8]) -> Result<u64> {
    let mut value = 0u64;
    for &c in text {
        value = (value << 4) | u64::from(hex_val(c)?);
    }
    Ok(value)
}

/// Parse a full 36-character canonical GUID string
pub fn parse_guid(text: &str) -> Result<Guid> {
    let bytes = text.as_bytes();
    if bytes.len() != CANONICAL_LEN {
        return Err(GuidError::InvalidFormat);
    }
    for pos in DASH_POSITIONS {
        if bytes[pos] != b'-' {
            return Err(GuidError::InvalidFormat);
        }
    }

    let time_low = hex_field(&bytes[0..8])? as u32;
    let time_mid = hex_field(&bytes[9..13])? as u16;
    let time_hi = hex_field(&bytes[14..18])? as u16;
    let clk_hi = hex_field(&bytes[19..21])? as u8;
    let clk_lo = hex_field(&bytes[21..23])? as u8;

    let mut node = [0u8; 6];
    for (i, chunk) in bytes[24..36].chunks_exact(2).enumerate() {
        node[i] = hex_field(chunk)? as u8;
    }

    Ok(Guid::from_fields(
        time_low, time_mid, time_hi, clk_hi, clk_lo, &node,
    ))
}

/// Pad a truncated GUID prefix to the canonical 36-character layout
///
/// Missing trailing positions are filled with `-` at the fixed dash offsets
/// and `0` everywhere else. Padding a full canonical string is a no-op.
pub fn pad_prefix(prefix: &str) -> Result<String<CANONICAL_LEN>> {
    if prefix.is_empty() {
        return Err(GuidError::Empty);
    }

    let bytes = prefix.as_bytes();
    let mut padded: String<CANONICAL_LEN> = String::new();
    for i in 0..CANONICAL_LEN {
        let c = if i < bytes.len() {
            bytes[i] as char
        } else if DASH_POSITIONS.contains(&i) {
            '-'
        } else {
            '0'
        };
        padded.push(c).map_err(|_| GuidError::InvalidFormat)?;
    }
    Ok(padded)
}

/// Parse a GUID from a possibly-truncated textual prefix
///
/// A full canonical string parses directly; a shorter prefix is padded
/// first. Zero-length input is rejected.
pub fn parse_guid_prefix(prefix: &str) -> Result<Guid> {
    if prefix.len() >= CANONICAL_LEN {
        parse_guid(prefix)
    } else {
        let padded = pad_prefix(prefix)?;
        parse_guid(padded.as_str())
    }
}

/// Format a GUID in the canonical uppercase textual form
pub fn format_guid(guid: &Guid) -> String<CANONICAL_LEN> {
    // GUID byte layout is mixed-endian: the first three fields are
    // little-endian, the remaining eight bytes are stored as-is.
    let b = guid.as_bytes();
    let time_low = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    let time_mid = u16::from_le_bytes([b[4], b[5]]);
    let time_hi = u16::from_le_bytes([b[6], b[7]]);

    let mut out: String<CANONICAL_LEN> = String::new();
    // Capacity is exactly one canonical form; write! cannot fail.
    let _ = write!(
        out,
        "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        time_low, time_mid, time_hi, b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "12345678-1234-1234-1234-123456789ABC";

    #[test]
    fn parse_full_guid() {
        let guid = parse_guid(CANONICAL).unwrap();
        assert_eq!(format_guid(&guid).as_str(), CANONICAL);
    }

    #[test]
    fn padding_full_string_is_noop() {
        let padded = pad_prefix(CANONICAL).unwrap();
        assert_eq!(padded.as_str(), CANONICAL);
    }

    #[test]
    fn padding_reproduces_dash_positions_and_zero_fill() {
        // Every truncated prefix of a well-formed canonical string must pad
        // to dashes at {8, 13, 18, 23} and zero digits elsewhere.
        for k in 1..CANONICAL_LEN {
            let prefix = &CANONICAL[..k];
            let padded = pad_prefix(prefix).unwrap();
            let bytes = padded.as_str().as_bytes();

            assert_eq!(padded.len(), CANONICAL_LEN);
            assert_eq!(&padded.as_str()[..k], prefix);
            for i in k..CANONICAL_LEN {
                if [8, 13, 18, 23].contains(&i) {
                    assert_eq!(bytes[i], b'-', "prefix len {} offset {}", k, i);
                } else {
                    assert_eq!(bytes[i], b'0', "prefix len {} offset {}", k, i);
                }
            }

            // The padded form must parse as a concrete GUID.
            assert!(parse_guid(padded.as_str()).is_ok(), "prefix len {}", k);
        }
    }

    #[test]
    fn short_prefix_parses_to_zero_filled_guid() {
        let guid = parse_guid_prefix("12345678").unwrap();
        assert_eq!(
            format_guid(&guid).as_str(),
            "12345678-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn empty_prefix_rejected() {
        assert_eq!(parse_guid_prefix(""), Err(GuidError::Empty));
    }

    #[test]
    fn garbage_rejected() {
        assert_eq!(
            parse_guid_prefix("not-a-guid!"),
            Err(GuidError::InvalidFormat)
        );
        assert_eq!(
            parse_guid("12345678_1234_1234_1234_123456789ABC"),
            Err(GuidError::InvalidFormat)
        );
    }
}
