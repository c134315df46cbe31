//! UEFI application plumbing
//!
//! Holds the image handle and system table handed to the entry point, backs
//! the `alloc` crate with boot-services pool memory, and hosts the panic
//! handler. Everything here assumes the single-threaded boot-services
//! environment the application runs in.

use core::alloc::{GlobalAlloc, Layout};
use core::ffi::c_void;

use r_efi::efi::{BootServices, Guid, Handle, RuntimeServices, Status, SystemTable};
use spin::Once;

/// EFI_LOCATE_SEARCH_TYPE::ByProtocol
pub const LOCATE_BY_PROTOCOL: u32 = 2;

/// EFI_MEMORY_TYPE::EfiLoaderData
const LOADER_DATA: u32 = 2;

static IMAGE_HANDLE: Once<usize> = Once::new();
static SYSTEM_TABLE: Once<usize> = Once::new();

/// Record the entry-point arguments
///
/// # Safety
///
/// `st` must be the system table pointer the firmware passed to the entry
/// point; it stays valid for the lifetime of the application.
pub unsafe fn init(image: Handle, st: *mut SystemTable) {
    IMAGE_HANDLE.call_once(|| image as usize);
    SYSTEM_TABLE.call_once(|| st as usize);
}

/// The application's image handle
pub fn image_handle() -> Handle {
    *IMAGE_HANDLE.get().expect("platform not initialized") as Handle
}

/// The EFI system table
pub fn system_table() -> *mut SystemTable {
    *SYSTEM_TABLE.get().expect("platform not initialized") as *mut SystemTable
}

/// Boot services table
pub fn boot_services() -> *mut BootServices {
    unsafe { (*system_table()).boot_services }
}

/// Runtime services table
pub fn runtime_services() -> *mut RuntimeServices {
    unsafe { (*system_table()).runtime_services }
}

/// SMBIOS 3.x configuration table vendor GUID
pub const SMBIOS3_TABLE_GUID: Guid = Guid::from_fields(
    0xf2fd1544,
    0x9794,
    0x4a2c,
    0x99,
    0x2e,
    &[0xe5, 0xbb, 0xcf, 0x20, 0xe3, 0x94],
);

/// SMBIOS 2.x configuration table vendor GUID
pub const SMBIOS_TABLE_GUID: Guid = Guid::from_fields(
    0xeb9d2d31,
    0x2d88,
    0x11d3,
    0x9a,
    0x16,
    &[0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d],
);

/// Size of the entry-point window handed to the parser; covers both anchors
const ENTRY_POINT_WINDOW: usize = 32;

/// Locate the SMBIOS structure table through the EFI configuration table
///
/// Prefers the 64-bit entry point. The returned slice borrows firmware
/// memory that outlives the application.
pub fn find_smbios_table() -> Option<&'static [u8]> {
    let st = system_table();
    let count = unsafe { (*st).number_of_table_entries };
    let entries = unsafe { core::slice::from_raw_parts((*st).configuration_table, count) };

    for wanted in [SMBIOS3_TABLE_GUID, SMBIOS_TABLE_GUID] {
        let Some(entry) = entries.iter().find(|e| e.vendor_guid == wanted) else {
            continue;
        };
        if entry.vendor_table.is_null() {
            continue;
        }

        let window = unsafe {
            core::slice::from_raw_parts(entry.vendor_table as *const u8, ENTRY_POINT_WINDOW)
        };
        if let Some(location) = crate::smbios::parse_entry_point(window) {
            log::debug!(
                "SMBIOS structure table at {:#x}, {} bytes",
                location.address,
                location.length
            );
            return Some(unsafe {
                core::slice::from_raw_parts(location.address as *const u8, location.length)
            });
        }
    }

    log::warn!("no SMBIOS entry point in the configuration table");
    None
}

/// Global allocator over boot-services pool memory
///
/// Pool allocations are 8-byte aligned; larger alignments over-allocate and
/// stash the original pointer just below the aligned block.
struct PoolAllocator;

const POOL_ALIGN: usize = 8;

unsafe impl GlobalAlloc for PoolAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let bs = boot_services();
        let align = layout.align();

        let (size, adjust) = if align <= POOL_ALIGN {
            (layout.size(), 0)
        } else {
            (layout.size() + align + core::mem::size_of::<usize>(), align)
        };

        let mut raw: *mut c_void = core::ptr::null_mut();
        let status = ((*bs).allocate_pool)(LOADER_DATA, size, &mut raw);
        if status != Status::SUCCESS || raw.is_null() {
            return core::ptr::null_mut();
        }

        if adjust == 0 {
            return raw as *mut u8;
        }

        let base = raw as usize + core::mem::size_of::<usize>();
        let aligned = (base + align - 1) & !(align - 1);
        core::ptr::write((aligned as *mut usize).sub(1), raw as usize);
        aligned as *mut u8
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if ptr.is_null() {
            return;
        }
        let bs = boot_services();
        let raw = if layout.align() <= POOL_ALIGN {
            ptr as *mut c_void
        } else {
            core::ptr::read((ptr as *mut usize).sub(1)) as *mut c_void
        };
        let _ = ((*bs).free_pool)(raw);
    }
}

#[cfg(not(test))]
#[global_allocator]
static ALLOCATOR: PoolAllocator = PoolAllocator;

/// Global panic handler
#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    if let Some(location) = info.location() {
        log::error!(
            "PANIC at {}:{}: {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        log::error!("PANIC: {}", info.message());
    }

    loop {
        core::hint::spin_loop();
    }
}

/// Make the EFI watchdog stand down for long interactive sessions
pub fn disable_watchdog() {
    let bs = boot_services();
    let status =
        unsafe { ((*bs).set_watchdog_timer)(0, 0, 0, core::ptr::null_mut()) };
    if status != Status::SUCCESS {
        log::debug!("watchdog disable returned {:?}", status);
    }
}
