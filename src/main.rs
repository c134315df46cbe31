//! IdentEFI application entry point
//!
//! Fetches the shell argument list, dispatches between the display mode and
//! the verification-remediation pass, and applies the terminal power policy
//! (exit, shutdown, or reboot into the second-stage path).

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]

#[cfg(target_os = "uefi")]
extern crate alloc;

#[cfg(target_os = "uefi")]
mod app {
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::ffi::c_void;

    use r_efi::efi::{Guid, Handle, Status, SystemTable};
    use r_efi::protocols::shell_parameters;

    use identefi::cli::{self, CliError, Command, OutputFormat};
    use identefi::engine::{self, CheckConfig, Engine, ErrorKind, TerminalAction, VerificationOutcome};
    use identefi::net::SnpEnumerator;
    use identefi::remedy::ImageLauncher;
    use identefi::smbios::FirmwareInventory;
    use identefi::varstore::runtime::RuntimeStore;
    use identefi::varstore::{resolver, VarError};
    use identefi::{console, display, efi_println, guid, logger, platform, power, ucs2};

    #[no_mangle]
    pub extern "efiapi" fn efi_main(image: Handle, st: *mut SystemTable) -> Status {
        // SAFETY: firmware hands us a valid image handle and system table.
        unsafe { platform::init(image, st) };
        logger::init();
        platform::disable_watchdog();
        console::clear_screen();

        let args = shell_args();
        let arg_refs: Vec<&str> = args.iter().map(|a| a.as_str()).collect();

        if arg_refs.is_empty() {
            print_usage();
            efi_println!();
            efi_println!("Using default values...");
            efi_println!();
        }

        let command = match cli::parse(&arg_refs) {
            Ok(command) => command,
            Err(e) => {
                report_cli_error(e);
                print_usage();
                return Status::INVALID_PARAMETER;
            }
        };

        match command {
            Command::Help => {
                print_usage();
                Status::SUCCESS
            }
            Command::Display {
                name,
                namespace,
                format,
            } => {
                let status = run_display(name.as_str(), namespace, format);
                if format == OutputFormat::All {
                    efi_println!();
                    efi_println!("Press any key to exit...");
                    console::wait_for_key();
                }
                status
            }
            Command::Check(config) => run_check(&config),
        }
    }

    /// Fetch the argument list from the shell parameters protocol
    ///
    /// Returns an empty list when not launched from a shell; the defaults
    /// then apply.
    fn shell_args() -> Vec<String> {
        let bs = platform::boot_services();
        let mut guid = shell_parameters::PROTOCOL_GUID;
        let mut proto: *mut c_void = core::ptr::null_mut();

        let status = unsafe {
            ((*bs).handle_protocol)(platform::image_handle(), &mut guid, &mut proto)
        };
        if status != Status::SUCCESS || proto.is_null() {
            log::debug!("shell parameters protocol unavailable");
            return Vec::new();
        }

        let sp = proto as *mut shell_parameters::Protocol;
        let argc = unsafe { (*sp).argc };
        let argv = unsafe { (*sp).argv };

        let mut args = Vec::new();
        // argv[0] is the program path.
        for i in 1..argc {
            let p = unsafe { *argv.add(i) };
            if p.is_null() {
                continue;
            }
            let mut len = 0usize;
            while unsafe { *p.add(len) } != 0 {
                len += 1;
            }
            let units = unsafe { core::slice::from_raw_parts(p, len) };
            args.push(ucs2::decode_lossy(units));
        }
        args
    }

    fn print_usage() {
        for line in cli::USAGE {
            efi_println!("{}", line);
        }
    }

    fn report_cli_error(error: CliError) {
        match error {
            CliError::MissingValue(flag) => efi_println!("Error: missing value for {}", flag),
            CliError::UnknownFormat => {
                efi_println!("Error: invalid rawtype value, must be 'hex', 'ascii', or 'ucs'")
            }
            CliError::BadNamespace => efi_println!("Error: invalid GUID prefix"),
        }
        efi_println!();
    }

    /// Resolve and print one variable
    fn run_display(name: &str, namespace: Option<Guid>, format: OutputFormat) -> Status {
        let mut store = RuntimeStore::new();

        let resolved = match resolver::resolve(&mut store, name, namespace) {
            Ok(resolved) => resolved,
            Err(VarError::NotFound) => {
                efi_println!(
                    "Variable '{}' not found{}",
                    name,
                    if namespace.is_some() {
                        " with specified GUID"
                    } else {
                        ""
                    }
                );
                return Status::NOT_FOUND;
            }
            Err(e) => {
                efi_println!("Error: failed to read variable '{}': {:?}", name, e);
                return var_status(e);
            }
        };

        let bytes = &resolved.value.bytes;
        match format {
            OutputFormat::All => {
                efi_println!("Variable Name: {}", name);
                match resolved.label {
                    Some(label) => efi_println!("GUID: {}", label),
                    None => efi_println!("GUID: {}", guid::format_guid(&resolved.namespace).as_str()),
                }
                efi_println!("Size: {} bytes", bytes.len());
                efi_println!("Attributes: {:#010X}", resolved.value.attributes);
                efi_println!();
                efi_println!("Hexadecimal dump:");
                for line in display::hex_dump_lines(bytes) {
                    efi_println!("{}", line);
                }
                efi_println!();
                efi_println!("As string (UCS-2): {}", display::ucs_string(bytes));
                efi_println!("As string (ASCII): {}", display::ascii_string(bytes));
            }
            OutputFormat::Hex => {
                for line in display::hex_dump_lines(bytes) {
                    efi_println!("{}", line);
                }
            }
            OutputFormat::Ascii => efi_println!("{}", display::ascii_string(bytes)),
            OutputFormat::Ucs => efi_println!("{}", display::ucs_string(bytes)),
        }

        Status::SUCCESS
    }

    /// Run the verification-remediation pass and apply the terminal policy
    fn run_check(config: &CheckConfig) -> Status {
        let mut store = RuntimeStore::new();
        let inventory = FirmwareInventory::locate();
        let mut nics = SnpEnumerator::new();
        let mut tool = ImageLauncher::new(config.tool_path.as_str());

        efi_println!("Starting identity verification...");
        efi_println!();

        let outcome =
            Engine::new(config, &mut store, &inventory, &mut nics, &mut tool).run();
        report_outcome(&outcome);

        match engine::terminal_action(&outcome, config) {
            TerminalAction::ExitSuccess => Status::SUCCESS,
            TerminalAction::ExitFailure => outcome_status(&outcome),
            TerminalAction::Shutdown => power::shutdown(),
            TerminalAction::RebootSecondStage => power::reboot_second_stage(&mut store),
        }
    }

    fn report_outcome(outcome: &VerificationOutcome) {
        efi_println!();
        match outcome {
            VerificationOutcome::AllMatch => {
                efi_println!("Success: all checked values match the hardware.")
            }
            VerificationOutcome::SerialRemediated => {
                efi_println!("Success: serial number was remediated and verified.")
            }
            VerificationOutcome::SerialFailedAfterRetries => efi_println!(
                "CRITICAL ERROR: failed to remediate the serial number after {} attempts!",
                engine::RETRY_LIMIT
            ),
            VerificationOutcome::MacMismatchOnly => {
                efi_println!("MAC address needs the second-stage update path.")
            }
            VerificationOutcome::Error(kind) => {
                efi_println!("Error: verification aborted ({:?}).", kind)
            }
        }
    }

    fn var_status(error: VarError) -> Status {
        match error {
            VarError::NotFound => Status::NOT_FOUND,
            VarError::InvalidParameter => Status::INVALID_PARAMETER,
            VarError::OutOfResources => Status::OUT_OF_RESOURCES,
            VarError::WriteProtected => Status::WRITE_PROTECTED,
            VarError::Unsupported => Status::UNSUPPORTED,
            VarError::DeviceError => Status::DEVICE_ERROR,
        }
    }

    fn outcome_status(outcome: &VerificationOutcome) -> Status {
        match outcome {
            VerificationOutcome::AllMatch
            | VerificationOutcome::SerialRemediated
            | VerificationOutcome::MacMismatchOnly => Status::SUCCESS,
            VerificationOutcome::SerialFailedAfterRetries => Status::DEVICE_ERROR,
            VerificationOutcome::Error(ErrorKind::NoInventorySerial) => Status::NOT_FOUND,
            VerificationOutcome::Error(ErrorKind::SerialMismatch) => Status::DEVICE_ERROR,
            VerificationOutcome::Error(ErrorKind::SerialVariable(e))
            | VerificationOutcome::Error(ErrorKind::MacVariable(e)) => var_status(*e),
        }
    }
}

#[cfg(not(target_os = "uefi"))]
fn main() {
    eprintln!("identefi is a UEFI application; build it with `cargo build --target x86_64-unknown-uefi`");
    std::process::exit(1);
}
