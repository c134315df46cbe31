//! Dump formatting for the display mode
//!
//! Renders a variable payload the three ways an operator wants to see it:
//! a 16-byte-per-row hex dump, a printable-ASCII rendering, and a UCS-2
//! rendering. Pure formatting; the console layer does the printing.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

/// Bytes per hex dump row
const HEX_ROW: usize = 16;

/// Format a payload as hex dump rows
pub fn hex_dump_lines(data: &[u8]) -> Vec<String> {
    data.chunks(HEX_ROW)
        .map(|row| {
            let mut line = String::with_capacity(HEX_ROW * 3);
            for (i, b) in row.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                let _ = write!(line, "{:02X}", b);
            }
            line
        })
        .collect()
}

/// Render a payload as printable ASCII
///
/// Stops at the first NUL; non-printable bytes become `.`.
pub fn ascii_string(data: &[u8]) -> String {
    let mut out = String::new();
    for &b in data {
        if b == 0 {
            break;
        }
        if (0x20..=0x7E).contains(&b) {
            out.push(b as char);
        } else {
            out.push('.');
        }
    }
    out
}

/// Render a payload as a UCS-2 string
///
/// Buffers shorter than one 16-bit unit cannot hold a UCS-2 string.
pub fn ucs_string(data: &[u8]) -> String {
    if data.len() < 2 {
        return String::from("(too small for UCS-2 string)");
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    crate::ucs2::decode_lossy(&units)
}
