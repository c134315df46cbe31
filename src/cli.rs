//! Command-line surface
//!
//! The first non-flag token names a variable to display; `--check` switches
//! into the verification-remediation mode. Parsing is plain-slice based so
//! it stays independent of the shell-parameters protocol plumbing.

use r_efi::efi::Guid;

use crate::engine::CheckConfig;
use crate::guid;
use crate::varstore::{AttributeKey, MAX_NAME_LEN};

/// Variable displayed (or checked) when no name is given
pub const DEFAULT_SERIAL_VARIABLE: &str = "SerialNumber";

/// Remediation tool looked up when `--tool` is not given
pub const DEFAULT_TOOL_PATH: &str = "AMIDEEFIx64.efi";

/// Raw output selection for the display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Header plus every rendering, interactive
    All,
    Hex,
    Ascii,
    Ucs,
}

/// Parsed invocation
#[derive(Debug, Clone)]
pub enum Command {
    Help,
    /// Resolve and print one variable
    Display {
        name: heapless::String<MAX_NAME_LEN>,
        namespace: Option<Guid>,
        format: OutputFormat,
    },
    /// Run the verification-remediation pass
    Check(CheckConfig),
}

/// Argument errors, reported with usage text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliError {
    /// Flag requires a value that was not supplied
    MissingValue(&'static str),
    /// `--rawtype` value was not hex/ascii/ucs
    UnknownFormat,
    /// `--guid` value did not parse as a GUID prefix
    BadNamespace,
}

/// Result type for argument parsing
pub type Result<T> = core::result::Result<T, CliError>;

/// Consume the value following a flag
fn take_value<'a>(args: &[&'a str], i: &mut usize, flag: &'static str) -> Result<&'a str> {
    *i += 1;
    args.get(*i).copied().ok_or(CliError::MissingValue(flag))
}

/// Parse the argument list (program name already stripped)
pub fn parse(args: &[&str]) -> Result<Command> {
    let mut display_name = DEFAULT_SERIAL_VARIABLE;
    let mut namespace_hint: Option<&str> = None;
    let mut format = OutputFormat::All;
    let mut check_mode = false;
    let mut check_only = false;
    let mut power_down = false;
    let mut serial_name: Option<&str> = None;
    let mut mac_name: Option<&str> = None;
    let mut tool_path: Option<&str> = None;

    if let Some(first) = args.first() {
        if !first.starts_with('-') {
            display_name = first;
        }
    }

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "--help" | "-h" => return Ok(Command::Help),
            "--guid" => namespace_hint = Some(take_value(args, &mut i, "--guid")?),
            "--rawtype" => {
                format = match take_value(args, &mut i, "--rawtype")? {
                    "hex" => OutputFormat::Hex,
                    "ascii" => OutputFormat::Ascii,
                    "ucs" => OutputFormat::Ucs,
                    _ => return Err(CliError::UnknownFormat),
                };
            }
            "--check" => check_mode = true,
            "--check-only" => {
                check_mode = true;
                check_only = true;
            }
            "--power-down" => power_down = true,
            "--vsn" => serial_name = Some(take_value(args, &mut i, "--vsn")?),
            "--vmac" => mac_name = Some(take_value(args, &mut i, "--vmac")?),
            "--tool" => tool_path = Some(take_value(args, &mut i, "--tool")?),
            _ => {}
        }
        i += 1;
    }

    let namespace = match namespace_hint {
        Some(text) => Some(guid::parse_guid_prefix(text).map_err(|_| CliError::BadNamespace)?),
        None => None,
    };

    if !check_mode {
        return Ok(Command::Display {
            name: AttributeKey::new(display_name, None).name,
            namespace,
            format,
        });
    }

    let mut config = CheckConfig::new();
    config.serial_key = AttributeKey::new(
        serial_name.unwrap_or(DEFAULT_SERIAL_VARIABLE),
        namespace,
    );
    if let Some(mac) = mac_name {
        config.mac_key = AttributeKey::new(mac, namespace);
    } else {
        config.mac_key.namespace = namespace;
    }
    // The serial check runs unless the invocation names only a MAC
    // variable; the MAC check runs only when a MAC variable is named.
    config.check_serial = serial_name.is_some() || mac_name.is_none();
    config.check_mac = mac_name.is_some();
    config.check_only = check_only;
    config.power_down = power_down;
    config.set_tool_path(tool_path.unwrap_or(DEFAULT_TOOL_PATH));

    Ok(Command::Check(config))
}

/// Usage text, one line per write so the console layer can wrap it
pub const USAGE: &[&str] = &[
    "IdentEFI - UEFI Serial Number and MAC Address Tool",
    "Usage: identefi [variable_name] [options]",
    "",
    "Display options:",
    "  --guid GUID      : GUID prefix or full GUID to qualify the variable",
    "  --rawtype TYPE   : Output only in the given format (hex, ascii, ucs)",
    "",
    "Verification and remediation options:",
    "  --check          : Verify identity against the hardware inventory,",
    "                     remediating the serial number if needed",
    "  --check-only     : Verify and report, never remediate",
    "  --vsn VARNAME    : Serial number variable (default: SerialNumber)",
    "  --vmac VARNAME   : MAC address variable (enables the MAC check)",
    "  --tool PATH      : Path to the DMI-edit tool (default: AMIDEEFIx64.efi)",
    "  --power-down     : Shut down on success, reboot when a second pass",
    "                     is required",
    "",
    "Examples:",
    "  identefi SerialNumber",
    "  identefi SerialNumber --guid 12345678",
    "  identefi --check --vmac MacAddress",
    "  identefi --check --tool \\EFI\\TOOLS\\AMIDEEFIx64.efi --power-down",
];
