//! Runtime-services-backed variable store
//!
//! Thin adapter over `GetVariable`/`GetNextVariableName`/`SetVariable` using
//! the usual size-probe-then-fetch pattern. Names cross the boundary as
//! null-terminated UCS-2.

use alloc::vec::Vec;
use core::ffi::c_void;

use r_efi::efi::{Guid, Status};

use super::{AttributeValue, EntryId, Result, VarError, VariableStore};
use crate::{platform, ucs2};

/// Initial name buffer size for enumeration, in UCS-2 units
const NAME_BUF_UNITS: usize = 256;

/// Variable store over the firmware's runtime services
pub struct RuntimeStore;

impl RuntimeStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuntimeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_status(status: Status) -> VarError {
    if status == Status::NOT_FOUND {
        VarError::NotFound
    } else if status == Status::INVALID_PARAMETER {
        VarError::InvalidParameter
    } else if status == Status::OUT_OF_RESOURCES {
        VarError::OutOfResources
    } else if status == Status::WRITE_PROTECTED {
        VarError::WriteProtected
    } else if status == Status::UNSUPPORTED {
        VarError::Unsupported
    } else {
        VarError::DeviceError
    }
}

impl VariableStore for RuntimeStore {
    fn get(&mut self, name: &str, namespace: &Guid) -> Result<AttributeValue> {
        let rt = platform::runtime_services();
        let mut name_u16 = ucs2::encode(name);
        let mut guid = *namespace;
        let mut attrs: u32 = 0;
        let mut size: usize = 0;

        // Probe for the payload size first.
        let status = unsafe {
            ((*rt).get_variable)(
                name_u16.as_mut_ptr(),
                &mut guid,
                &mut attrs,
                &mut size,
                core::ptr::null_mut(),
            )
        };

        if status == Status::SUCCESS {
            // Zero-length payload.
            return Ok(AttributeValue {
                bytes: Vec::new(),
                attributes: attrs,
            });
        }
        if status != Status::BUFFER_TOO_SMALL {
            return Err(map_status(status));
        }

        let mut bytes = alloc::vec![0u8; size];
        let status = unsafe {
            ((*rt).get_variable)(
                name_u16.as_mut_ptr(),
                &mut guid,
                &mut attrs,
                &mut size,
                bytes.as_mut_ptr() as *mut c_void,
            )
        };
        if status != Status::SUCCESS {
            return Err(map_status(status));
        }

        bytes.truncate(size);
        Ok(AttributeValue {
            bytes,
            attributes: attrs,
        })
    }

    fn get_next(&mut self, cursor: Option<&EntryId>) -> Result<Option<EntryId>> {
        let rt = platform::runtime_services();
        let mut name_buf: Vec<u16> = alloc::vec![0u16; NAME_BUF_UNITS];
        let mut guid = Guid::from_fields(0, 0, 0, 0, 0, &[0; 6]);

        if let Some(prev) = cursor {
            let prev_units = ucs2::encode(&prev.name);
            if prev_units.len() > name_buf.len() {
                name_buf.resize(prev_units.len(), 0);
            }
            name_buf[..prev_units.len()].copy_from_slice(&prev_units);
            guid = prev.namespace;
        }

        loop {
            let mut size = name_buf.len() * 2;
            let status = unsafe {
                ((*rt).get_next_variable_name)(&mut size, name_buf.as_mut_ptr(), &mut guid)
            };

            if status == Status::SUCCESS {
                return Ok(Some(EntryId {
                    name: ucs2::decode_lossy(&name_buf),
                    namespace: guid,
                }));
            }
            if status == Status::NOT_FOUND {
                // End of store.
                return Ok(None);
            }
            if status == Status::BUFFER_TOO_SMALL {
                // `size` now holds the required byte count; the cursor name
                // in the buffer is preserved across the resize.
                let needed = size.div_ceil(2) + 1;
                name_buf.resize(needed.max(name_buf.len() + NAME_BUF_UNITS), 0);
                continue;
            }
            return Err(map_status(status));
        }
    }

    fn set(&mut self, name: &str, namespace: &Guid, attrs: u32, data: &[u8]) -> Result<()> {
        let rt = platform::runtime_services();
        let mut name_u16 = ucs2::encode(name);
        let mut guid = *namespace;

        let status = unsafe {
            ((*rt).set_variable)(
                name_u16.as_mut_ptr(),
                &mut guid,
                attrs,
                data.len(),
                data.as_ptr() as *mut c_void,
            )
        };
        if status != Status::SUCCESS {
            return Err(map_status(status));
        }
        Ok(())
    }
}
