//! System and baseboard identity views
//!
//! Decodes the two structure kinds the verification engine cares about:
//! System Information (Type 1) and Baseboard Information (Type 2). Field
//! offsets follow the structure definitions; fields beyond a structure's
//! declared length are treated as absent, since older tables are shorter.

use alloc::format;
use alloc::string::String;
use core::fmt;

use bitflags::bitflags;

use super::{Record, Result, SmbiosError, Tables, TYPE_BASEBOARD, TYPE_SYSTEM};

bitflags! {
    /// Baseboard feature flag bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BoardFeatures: u8 {
        const HOSTING_BOARD = 1 << 0;
        const REQUIRES_DAUGHTER_BOARD = 1 << 1;
        const REMOVABLE = 1 << 2;
        const REPLACEABLE = 1 << 3;
        const HOT_SWAPPABLE = 1 << 4;
    }
}

/// Board type enumerant with its raw value preserved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardType(pub u8);

/// Names for the defined board type values, indexed by `raw - 1`
static BOARD_TYPE_NAMES: [&str; 13] = [
    "Unknown",
    "Other",
    "Server Blade",
    "Connectivity Switch",
    "System Management Module",
    "Processor Module",
    "I/O Module",
    "Memory Module",
    "Daughter Board",
    "Motherboard",
    "Processor/Memory Module",
    "Processor/IO Module",
    "Interconnect Board",
];

impl BoardType {
    /// The defined name for this value, if it is in range
    pub fn name(&self) -> Option<&'static str> {
        let idx = (self.0 as usize).checked_sub(1)?;
        BOARD_TYPE_NAMES.get(idx).copied()
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Unknown ({:#04x})", self.0),
        }
    }
}

/// Identity fields from the System Information structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemIdentity {
    pub manufacturer: String,
    pub product: String,
    pub version: String,
    pub serial_number: String,
    pub uuid: Option<[u8; 16]>,
}

impl SystemIdentity {
    /// Decode from a Type 1 record
    pub fn parse(record: &Record<'_>) -> Result<Self> {
        if record.kind() != TYPE_SYSTEM {
            return Err(SmbiosError::InvalidArgument);
        }

        let uuid = record
            .bytes_at(0x08, 16)
            .map(|b| {
                let mut uuid = [0u8; 16];
                uuid.copy_from_slice(b);
                uuid
            })
            // All-zero and all-FF mean "not set" / "not present".
            .filter(|u| !u.iter().all(|&b| b == 0) && !u.iter().all(|&b| b == 0xFF));

        Ok(Self {
            manufacturer: string_or_empty(record, 0x04),
            product: string_or_empty(record, 0x05),
            version: string_or_empty(record, 0x06),
            serial_number: string_or_empty(record, 0x07),
            uuid,
        })
    }

    /// UUID in the canonical mixed-endian display form
    pub fn uuid_string(&self) -> Option<String> {
        self.uuid.map(|u| {
            format!(
                "{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
                u[3], u[2], u[1], u[0], u[5], u[4], u[7], u[6],
                u[8], u[9], u[10], u[11], u[12], u[13], u[14], u[15]
            )
        })
    }
}

/// Identity fields from the Baseboard Information structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardIdentity {
    pub manufacturer: String,
    pub product: String,
    pub version: String,
    pub serial_number: String,
    pub asset_tag: String,
    pub features: BoardFeatures,
    pub location_in_chassis: String,
    pub board_type: Option<BoardType>,
}

impl BoardIdentity {
    /// Decode from a Type 2 record
    pub fn parse(record: &Record<'_>) -> Result<Self> {
        if record.kind() != TYPE_BASEBOARD {
            return Err(SmbiosError::InvalidArgument);
        }

        Ok(Self {
            manufacturer: string_or_empty(record, 0x04),
            product: string_or_empty(record, 0x05),
            version: string_or_empty(record, 0x06),
            serial_number: string_or_empty(record, 0x07),
            asset_tag: string_or_empty(record, 0x08),
            features: record
                .byte_at(0x09)
                .map(BoardFeatures::from_bits_truncate)
                .unwrap_or_default(),
            location_in_chassis: string_or_empty(record, 0x0A),
            board_type: record.byte_at(0x0D).map(BoardType),
        })
    }
}

/// Decode the serial numbers of both identity records from a table
///
/// A platform may populate only one of the two records; absent records or
/// empty serial fields yield `None` for that side.
pub fn inventory_serials(table: &[u8]) -> (Option<String>, Option<String>) {
    let tables = Tables::new(table);

    let system = tables
        .find_record(TYPE_SYSTEM)
        .ok()
        .and_then(|r| SystemIdentity::parse(&r).ok())
        .map(|id| id.serial_number)
        .filter(|s| !s.is_empty());

    let board = tables
        .find_record(TYPE_BASEBOARD)
        .ok()
        .and_then(|r| BoardIdentity::parse(&r).ok())
        .map(|id| id.serial_number)
        .filter(|s| !s.is_empty());

    (system, board)
}

/// Read a string field, treating index 0 or an absent/short field as empty
fn string_or_empty(record: &Record<'_>, offset: usize) -> String {
    match record.byte_at(offset) {
        None | Some(0) => String::new(),
        Some(idx) => record.field_string(idx).unwrap_or_default(),
    }
}
