//! External remediation tool invocation
//!
//! Serial remediation shells out to a vendor DMI-edit EFI executable. The
//! tool is opaque: only the invocation result matters, verification happens
//! by re-reading the identity attribute afterwards. The UEFI implementation
//! finds the tool on any simple-file-system volume, loads it with
//! `/SS <serial> /BS <serial>` load options, and starts it.

/// Errors from tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolError {
    /// Tool binary not found on any volume
    NotFound,
    /// Image load was rejected
    LoadFailed,
    /// Image started but reported failure, or could not be started
    StartFailed,
}

/// Result type for tool invocation
pub type Result<T> = core::result::Result<T, ToolError>;

/// Adapter for the external provisioning tool
pub trait RemediationTool {
    /// Invoke the tool to rewrite the serial number to `expected_serial`
    fn invoke(&mut self, expected_serial: &str) -> Result<()>;
}

#[cfg(target_os = "uefi")]
pub use launcher::ImageLauncher;

#[cfg(target_os = "uefi")]
mod launcher {
    use super::{Result, ToolError};
    use crate::{platform, ucs2};
    use alloc::vec::Vec;
    use core::ffi::c_void;
    use r_efi::efi::{Boolean, Handle, Status};
    use r_efi::protocols::{file, loaded_image, simple_file_system};

    /// Read chunk size for pulling the tool image off its volume
    const READ_CHUNK: usize = 16 * 1024;

    /// Launches the remediation tool as a child EFI image
    pub struct ImageLauncher {
        path: heapless::String<128>,
    }

    impl ImageLauncher {
        /// Create a launcher for the tool at `path` (a volume-relative EFI
        /// path, e.g. `\EFI\TOOLS\AMIDEEFIx64.efi`)
        pub fn new(path: &str) -> Self {
            let mut owned: heapless::String<128> = heapless::String::new();
            let _ = owned.push_str(path);
            Self { path: owned }
        }

        /// Search every simple-file-system volume for the tool and read it
        fn read_tool_image(&self) -> Result<Vec<u8>> {
            let bs = platform::boot_services();
            let mut guid = simple_file_system::PROTOCOL_GUID;

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
                return Err(ToolError::NotFound);
            }

            let mut path_u16 = ucs2::encode(self.path.as_str());
            let handle_slice = unsafe { core::slice::from_raw_parts(handles, count) };
            let mut image = Err(ToolError::NotFound);

            for &handle in handle_slice {
                let mut proto: *mut c_void = core::ptr::null_mut();
                let status = unsafe { ((*bs).handle_protocol)(handle, &mut guid, &mut proto) };
                if status != Status::SUCCESS || proto.is_null() {
                    continue;
                }

                let sfs = proto as *mut simple_file_system::Protocol;
                let mut root: *mut file::Protocol = core::ptr::null_mut();
                if unsafe { ((*sfs).open_volume)(sfs, &mut root) } != Status::SUCCESS {
                    continue;
                }

                let mut handle_file: *mut file::Protocol = core::ptr::null_mut();
                let status = unsafe {
                    ((*root).open)(
                        root,
                        &mut handle_file,
                        path_u16.as_mut_ptr(),
                        file::MODE_READ,
                        0,
                    )
                };
                let _ = unsafe { ((*root).close)(root) };

                if status != Status::SUCCESS {
                    continue;
                }

                image = read_all(handle_file);
                let _ = unsafe { ((*handle_file).close)(handle_file) };
                if image.is_ok() {
                    break;
                }
            }

            let _ = unsafe { ((*bs).free_pool)(handles as *mut c_void) };
            image
        }
    }

    /// Read an open file to the end
    fn read_all(file_proto: *mut file::Protocol) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut chunk = alloc::vec![0u8; READ_CHUNK];
        loop {
            let mut size = chunk.len();
            let status = unsafe {
                ((*file_proto).read)(file_proto, &mut size, chunk.as_mut_ptr() as *mut c_void)
            };
            if status != Status::SUCCESS {
                return Err(ToolError::LoadFailed);
            }
            if size == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..size]);
        }
        Ok(data)
    }

    impl super::RemediationTool for ImageLauncher {
        fn invoke(&mut self, expected_serial: &str) -> Result<()> {
            let bs = platform::boot_services();
            let mut image = self.read_tool_image()?;

            let mut child: Handle = core::ptr::null_mut();
            let status = unsafe {
                ((*bs).load_image)(
                    Boolean::FALSE,
                    platform::image_handle(),
                    core::ptr::null_mut(),
                    image.as_mut_ptr() as *mut c_void,
                    image.len(),
                    &mut child,
                )
            };
            if status != Status::SUCCESS {
                log::warn!("remediation tool load failed: {:?}", status);
                return Err(ToolError::LoadFailed);
            }

            // Hand the expected serial to the tool as load options. The
            // buffer must stay alive until StartImage returns.
            let mut options = heapless::String::<192>::new();
            let _ = options.push_str("/SS ");
            let _ = options.push_str(expected_serial);
            let _ = options.push_str(" /BS ");
            let _ = options.push_str(expected_serial);
            let mut options_u16 = ucs2::encode(options.as_str());

            let mut li_guid = loaded_image::PROTOCOL_GUID;
            let mut proto: *mut c_void = core::ptr::null_mut();
            let status = unsafe { ((*bs).handle_protocol)(child, &mut li_guid, &mut proto) };
            if status == Status::SUCCESS && !proto.is_null() {
                let li = proto as *mut loaded_image::Protocol;
                unsafe {
                    (*li).load_options = options_u16.as_mut_ptr() as *mut c_void;
                    (*li).load_options_size = (options_u16.len() * 2) as u32;
                }
            }

            let status = unsafe {
                ((*bs).start_image)(child, core::ptr::null_mut(), core::ptr::null_mut())
            };
            if status != Status::SUCCESS {
                log::warn!("remediation tool exited with {:?}", status);
                let _ = unsafe { ((*bs).unload_image)(child) };
                return Err(ToolError::StartFailed);
            }

            Ok(())
        }
    }
}
