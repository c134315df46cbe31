//! Live network adapter enumeration
//!
//! The MAC check compares the stored attribute against the hardware
//! addresses of the adapters actually present. The trait keeps the engine
//! testable; the UEFI implementation walks the Simple Network Protocol
//! handle list.

use alloc::vec::Vec;

use crate::ident::MacAddress;

/// Errors from adapter enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// No network stack bound, or protocol lookup failed
    Unavailable,
}

/// Result type for adapter enumeration
pub type Result<T> = core::result::Result<T, NetError>;

/// One live network adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NicInfo {
    pub mac: MacAddress,
    pub media_present: bool,
}

/// Accessor for the set of live network adapters
pub trait NicEnumerator {
    fn adapters(&mut self) -> Result<Vec<NicInfo>>;
}

#[cfg(target_os = "uefi")]
pub use snp::SnpEnumerator;

#[cfg(target_os = "uefi")]
mod snp {
    use super::{NetError, NicInfo, Result};
    use crate::ident::MacAddress;
    use crate::platform;
    use alloc::vec::Vec;
    use core::ffi::c_void;
    use r_efi::efi::{Handle, Status};
    use r_efi::protocols::simple_network;

    /// Enumerator over Simple Network Protocol instances
    pub struct SnpEnumerator;

    impl SnpEnumerator {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for SnpEnumerator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl super::NicEnumerator for SnpEnumerator {
        fn adapters(&mut self) -> Result<Vec<NicInfo>> {
            let bs = platform::boot_services();
            let mut guid = simple_network::PROTOCOL_GUID;

            let mut count: usize = 0;
            let mut handles: *mut Handle = core::ptr::null_mut();
            let status = unsafe {
                ((*bs).locate_handle_buffer)(
                    platform::LOCATE_BY_PROTOCOL,
                    &mut guid,
                    core::ptr::null_mut(),
                    &mut count,
                    &mut handles,
                )
            };
            if status != Status::SUCCESS {
                return Err(NetError::Unavailable);
            }

            let mut nics = Vec::with_capacity(count);
            let handle_slice = unsafe { core::slice::from_raw_parts(handles, count) };
            for &handle in handle_slice {
                let mut proto: *mut c_void = core::ptr::null_mut();
                let status = unsafe {
                    ((*bs).handle_protocol)(handle, &mut guid, &mut proto)
                };
                if status != Status::SUCCESS || proto.is_null() {
                    continue;
                }

                let snp = proto as *mut simple_network::Protocol;
                let mode = unsafe { (*snp).mode };
                if mode.is_null() {
                    continue;
                }

                // Only Ethernet-sized hardware addresses are identity
                // candidates.
                let hw_size = unsafe { (*mode).hw_address_size };
                if hw_size < 6 {
                    continue;
                }

                let mut octets = [0u8; 6];
                octets.copy_from_slice(unsafe { &(*mode).current_address.addr[..6] });
                let media_present = unsafe { (*mode).media_present }.into();

                nics.push(NicInfo {
                    mac: MacAddress::new(octets),
                    media_present,
                });
            }

            let _ = unsafe { ((*bs).free_pool)(handles as *mut c_void) };

            Ok(nics)
        }
    }
}
