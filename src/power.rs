//! System power handoff
//!
//! Two terminal actions reach this module: a warm reboot into the standard
//! removable-media boot path (where a second-stage updater fixes what this
//! tool cannot, i.e. the MAC), and a plain shutdown. Staging the handoff
//! writes a boot option plus boot order through the variable store; the
//! reset itself goes through runtime services and does not return.

use crate::ucs2;
use crate::varstore::{attributes, resolver, Result, VariableStore};

/// Name of the boot option variable staged for the second-stage pass
pub const HANDOFF_OPTION_NAME: &str = "IdentEfiReboot";

/// Boot path the second-stage pass is loaded from
pub const HANDOFF_IMAGE_PATH: &str = "\\EFI\\BOOT\\BOOTX64.EFI";

/// Stage the second-stage handoff variables
///
/// Writes the handoff path under the global namespace and forces it first in
/// the boot order. Performed before the reset so a failed write surfaces as
/// an error instead of a wedged boot loop.
pub fn stage_handoff<S: VariableStore>(store: &mut S) -> Result<()> {
    let attrs =
        attributes::NON_VOLATILE | attributes::BOOTSERVICE_ACCESS | attributes::RUNTIME_ACCESS;

    let path_units = ucs2::encode(HANDOFF_IMAGE_PATH);
    let path_bytes: alloc::vec::Vec<u8> =
        path_units.iter().flat_map(|u| u.to_le_bytes()).collect();

    store.set(
        HANDOFF_OPTION_NAME,
        &resolver::GLOBAL_NAMESPACE,
        attrs,
        &path_bytes,
    )?;

    let boot_order: u16 = 0;
    store.set(
        "BootOrder",
        &resolver::GLOBAL_NAMESPACE,
        attrs,
        &boot_order.to_le_bytes(),
    )
}

/// Warm-reset into the second-stage boot path
///
/// Stages the handoff variables, emits the final report, and resets. Does
/// not return; a handoff staging failure falls through to the reset anyway,
/// since the mismatch report has already been emitted and a reboot is still
/// the documented remedy.
#[cfg(target_os = "uefi")]
pub fn reboot_second_stage<S: VariableStore>(store: &mut S) -> ! {
    if let Err(e) = stage_handoff(store) {
        log::warn!("failed to stage second-stage handoff: {:?}", e);
    }
    log::info!("rebooting into {}", HANDOFF_IMAGE_PATH);
    reset(r_efi::efi::RESET_WARM)
}

/// Power the machine down. Does not return.
#[cfg(target_os = "uefi")]
pub fn shutdown() -> ! {
    log::info!("powering down");
    reset(r_efi::efi::RESET_SHUTDOWN)
}

#[cfg(target_os = "uefi")]
fn reset(reset_type: r_efi::efi::ResetType) -> ! {
    let rt = crate::platform::runtime_services();
    unsafe {
        ((*rt).reset_system)(
            reset_type,
            r_efi::efi::Status::SUCCESS,
            0,
            core::ptr::null_mut(),
        );
    }
    // ResetSystem does not return on conforming firmware; halt if it does.
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varstore::{MemStore, VariableStore};

    #[test]
    fn staging_writes_option_and_boot_order() {
        let mut store = MemStore::new();
        stage_handoff(&mut store).unwrap();

        let option = store
            .get(HANDOFF_OPTION_NAME, &resolver::GLOBAL_NAMESPACE)
            .unwrap();
        // Null-terminated UCS-2 of the handoff path.
        assert_eq!(option.bytes.len(), (HANDOFF_IMAGE_PATH.len() + 1) * 2);
        assert_eq!(option.bytes[0], b'\\');
        assert_eq!(option.bytes[1], 0);
        assert!(option.attributes & attributes::NON_VOLATILE != 0);

        let order = store
            .get("BootOrder", &resolver::GLOBAL_NAMESPACE)
            .unwrap();
        assert_eq!(order.bytes, 0u16.to_le_bytes());
    }
}
