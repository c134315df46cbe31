//! UCS-2 string utilities
//!
//! UEFI variable names, load options, and console output are all
//! null-terminated UCS-2. These helpers convert between Rust strings and the
//! `u16` code-unit form used at the protocol boundary.

use alloc::string::String;
use alloc::vec::Vec;

/// Get the effective length of a UCS-2 string slice (not including the null
/// terminator)
///
/// Returns the position of the first null terminator, or the slice length if
/// no null is found.
#[inline]
pub fn ucs2_len(s: &[u16]) -> usize {
    s.iter().position(|&c| c == 0).unwrap_or(s.len())
}

/// Compare two UCS-2 string slices for equality
///
/// Compares up to the first null terminator in each string.
#[inline]
pub fn ucs2_eq(a: &[u16], b: &[u16]) -> bool {
    let a_len = ucs2_len(a);
    let b_len = ucs2_len(b);

    if a_len != b_len {
        return false;
    }

    a[..a_len] == b[..b_len]
}

/// Encode a Rust string as a null-terminated UCS-2 buffer
///
/// Characters outside the Basic Multilingual Plane are replaced with `?`;
/// variable names and file paths never contain them in practice.
pub fn encode(s: &str) -> Vec<u16> {
    let mut out = Vec::with_capacity(s.len() + 1);
    for c in s.chars() {
        let cp = c as u32;
        if cp <= 0xFFFF {
            out.push(cp as u16);
        } else {
            out.push(b'?' as u16);
        }
    }
    out.push(0);
    out
}

/// Decode a UCS-2 slice into a Rust string, stopping at the first null
///
/// Unpaired surrogates are replaced with U+FFFD rather than rejected; the
/// result is for display and comparison, not round-tripping.
pub fn decode_lossy(units: &[u16]) -> String {
    let len = ucs2_len(units);
    char::decode_utf16(units[..len].iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
