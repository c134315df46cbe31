//! Identity value normalization
//!
//! Firmware vendors store identity attributes in several wire encodings:
//! null-terminated UCS-2, narrow ASCII, or raw bytes. This module decodes
//! attribute payloads to a canonical text form and provides MAC address
//! normalization and tolerant equivalence.

pub mod mac;
pub mod text;

pub use mac::{mac_equals, normalize_mac, MacAddress};
pub use text::decode_attribute_text;
