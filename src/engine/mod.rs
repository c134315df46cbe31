//! Verification-remediation engine
//!
//! Drives the check pass as an explicit state machine:
//!
//! ```text
//! Start -> CheckSerial -> CheckMac -> Decide -> { Done,
//!                                                 RemediateSerial,
//!                                                 AwaitSecondPass,
//!                                                 Fatal }
//! ```
//!
//! The serial number stored in the variable store is verified against the
//! SMBIOS ground truth (system record serial, baseboard serial as the
//! alternate); the stored MAC against the live adapter set. A serial
//! mismatch is remediated by invoking the external tool up to
//! [`RETRY_LIMIT`] times, re-verifying after each invocation through the
//! namespace discovered by the first lookup. A MAC mismatch cannot be fixed
//! here; its documented remedy is a reboot into the second-stage update
//! path.

use alloc::string::String;

use r_efi::efi::Guid;

use crate::ident::{decode_attribute_text, normalize_mac, MacAddress};
use crate::net::NicEnumerator;
use crate::remedy::RemediationTool;
use crate::smbios::ident::inventory_serials;
use crate::smbios::HardwareInventory;
use crate::varstore::{resolver, AttributeKey, VarError, VariableStore};

/// Fixed upper bound on remediation attempts
pub const RETRY_LIMIT: usize = 3;

/// Per-run configuration, built once from CLI input
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub serial_key: AttributeKey,
    pub mac_key: AttributeKey,
    pub check_serial: bool,
    pub check_mac: bool,
    /// Report only; never invoke the remediation tool
    pub check_only: bool,
    /// Power down (or reboot, for the second-stage path) after the verdict
    pub power_down: bool,
    pub tool_path: heapless::String<128>,
}

impl CheckConfig {
    /// Configuration with the conventional variable names and tool path
    pub fn new() -> Self {
        let mut config = Self {
            serial_key: AttributeKey::new("SerialNumber", None),
            mac_key: AttributeKey::new("MacAddress", None),
            check_serial: true,
            check_mac: false,
            check_only: false,
            power_down: false,
            tool_path: heapless::String::new(),
        };
        config.set_tool_path("AMIDEEFIx64.efi");
        config
    }

    /// Replace the remediation tool path, truncating at capacity
    pub fn set_tool_path(&mut self, path: &str) {
        self.tool_path.clear();
        for c in path.chars() {
            if self.tool_path.push(c).is_err() {
                break;
            }
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a run ended without a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The serial attribute could not be resolved or read
    SerialVariable(VarError),
    /// Hard store failure on the MAC path while the serial was fine
    MacVariable(VarError),
    /// Neither inventory record carries a serial to verify against
    NoInventorySerial,
    /// Serial mismatch reported in check-only mode
    SerialMismatch,
}

/// Result of one verification run; drives the terminal action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Every enabled check matched
    AllMatch,
    /// Serial was rewritten and verified; nothing else outstanding
    SerialRemediated,
    /// Remediation attempts exhausted without a verified match
    SerialFailedAfterRetries,
    /// Serial is fine (or was just fixed) but the MAC needs the
    /// second-stage update path
    MacMismatchOnly,
    /// Hard failure before a verdict
    Error(ErrorKind),
}

/// What the application layer does after the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalAction {
    ExitSuccess,
    ExitFailure,
    Shutdown,
    RebootSecondStage,
}

/// Map an outcome to its terminal action under the configured power policy
///
/// An exhausted remediation never triggers a power action: rebooting past an
/// unverified identity is the one thing this tool must not do.
pub fn terminal_action(outcome: &VerificationOutcome, config: &CheckConfig) -> TerminalAction {
    match outcome {
        VerificationOutcome::AllMatch | VerificationOutcome::SerialRemediated => {
            if config.power_down {
                TerminalAction::Shutdown
            } else {
                TerminalAction::ExitSuccess
            }
        }
        VerificationOutcome::MacMismatchOnly => {
            // check-only reports; it never hands control to the second stage.
            if config.power_down && !config.check_only {
                TerminalAction::RebootSecondStage
            } else {
                TerminalAction::ExitSuccess
            }
        }
        VerificationOutcome::SerialFailedAfterRetries => TerminalAction::ExitFailure,
        VerificationOutcome::Error(_) => TerminalAction::ExitFailure,
    }
}

/// Ground-truth serials pulled from the hardware inventory
///
/// A platform may populate only one of the two records; the check passes
/// when the stored attribute equals either one.
struct GroundTruth {
    system: Option<String>,
    board: Option<String>,
}

impl GroundTruth {
    fn matches(&self, text: &str) -> bool {
        self.system.as_deref() == Some(text) || self.board.as_deref() == Some(text)
    }

    /// The serial handed to the remediation tool
    fn expected(&self) -> &str {
        self.system
            .as_deref()
            .or(self.board.as_deref())
            .unwrap_or("")
    }
}

/// Outcome of the serial check
enum SerialCheck {
    Skipped,
    Matched,
    Mismatched { current: String, truth: GroundTruth },
}

impl SerialCheck {
    fn is_ok(&self) -> bool {
        matches!(self, SerialCheck::Skipped | SerialCheck::Matched)
    }
}

/// Outcome of the MAC check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MacCheck {
    Skipped,
    Matched,
    Mismatched,
    /// Store failed hard while probing the MAC variable; distinct from a
    /// missing variable, which is a plain mismatch
    ProbeFailed(VarError),
}

impl MacCheck {
    fn is_ok(&self) -> bool {
        matches!(self, MacCheck::Skipped | MacCheck::Matched)
    }
}

enum State {
    Start,
    CheckSerial,
    CheckMac { serial: SerialCheck },
    Decide { serial: SerialCheck, mac: MacCheck },
    RemediateSerial { truth: GroundTruth, mac: MacCheck },
}

enum Transition {
    Terminal(VerificationOutcome),
    Remediate { truth: GroundTruth, mac: MacCheck },
}

/// The verification-remediation engine
///
/// Borrows its adapters for a single run; the only state carried across
/// retry iterations is the concrete namespace the serial attribute was
/// discovered under.
pub struct Engine<'a, S, H, N, T>
where
    S: VariableStore,
    H: HardwareInventory,
    N: NicEnumerator,
    T: RemediationTool,
{
    config: &'a CheckConfig,
    store: &'a mut S,
    inventory: &'a H,
    nics: &'a mut N,
    tool: &'a mut T,
    /// Namespace the serial attribute was found under, cached after the
    /// first successful resolution so retries never repeat the store scan
    /// (and can never silently land on a different namespace)
    serial_namespace: Option<Guid>,
}

impl<'a, S, H, N, T> Engine<'a, S, H, N, T>
where
    S: VariableStore,
    H: HardwareInventory,
    N: NicEnumerator,
    T: RemediationTool,
{
    pub fn new(
        config: &'a CheckConfig,
        store: &'a mut S,
        inventory: &'a H,
        nics: &'a mut N,
        tool: &'a mut T,
    ) -> Self {
        Self {
            config,
            store,
            inventory,
            nics,
            tool,
            serial_namespace: None,
        }
    }

    /// Run the full verification pass to a terminal outcome
    pub fn run(&mut self) -> VerificationOutcome {
        let mut state = State::Start;
        loop {
            state = match state {
                State::Start => State::CheckSerial,

                State::CheckSerial => {
                    if !self.config.check_serial {
                        State::CheckMac {
                            serial: SerialCheck::Skipped,
                        }
                    } else {
                        match self.check_serial() {
                            Ok(serial) => State::CheckMac { serial },
                            Err(kind) => return VerificationOutcome::Error(kind),
                        }
                    }
                }

                State::CheckMac { serial } => {
                    let mac = if self.config.check_mac {
                        self.check_mac()
                    } else {
                        MacCheck::Skipped
                    };
                    State::Decide { serial, mac }
                }

                State::Decide { serial, mac } => match self.decide(serial, mac) {
                    Transition::Terminal(outcome) => return outcome,
                    Transition::Remediate { truth, mac } => {
                        State::RemediateSerial { truth, mac }
                    }
                },

                State::RemediateSerial { truth, mac } => {
                    return self.remediate(&truth, mac);
                }
            };
        }
    }

    /// Resolve the serial attribute and compare it against the inventory
    ///
    /// Failure to resolve the attribute at all is a hard error, not a
    /// mismatch.
    fn check_serial(&mut self) -> Result<SerialCheck, ErrorKind> {
        let table = self
            .inventory
            .structure_table()
            .ok_or(ErrorKind::NoInventorySerial)?;
        let (system, board) = inventory_serials(table);
        if system.is_none() && board.is_none() {
            log::error!("hardware inventory carries no serial number");
            return Err(ErrorKind::NoInventorySerial);
        }
        let truth = GroundTruth { system, board };

        let key = &self.config.serial_key;
        let resolved = resolver::resolve(self.store, key.name.as_str(), key.namespace)
            .map_err(|e| {
                log::error!("cannot read serial variable '{}': {:?}", key.name.as_str(), e);
                ErrorKind::SerialVariable(e)
            })?;
        self.serial_namespace = Some(resolved.namespace);

        let current = decode_attribute_text(&resolved.value.bytes);
        log::info!(
            "serial number: stored '{}', inventory '{}'",
            current,
            truth.expected()
        );

        if truth.matches(&current) {
            log::info!("serial number matches the hardware inventory");
            Ok(SerialCheck::Matched)
        } else {
            log::warn!("serial number does NOT match the hardware inventory");
            Ok(SerialCheck::Mismatched { current, truth })
        }
    }

    /// Resolve the MAC attribute and compare it against live adapters
    ///
    /// A missing variable, unparseable value, or empty adapter set is a
    /// plain mismatch; only a hard store failure is reported upward.
    fn check_mac(&mut self) -> MacCheck {
        let key = &self.config.mac_key;
        let resolved = match resolver::resolve(self.store, key.name.as_str(), key.namespace) {
            Ok(r) => r,
            Err(VarError::NotFound) => {
                log::warn!("MAC variable '{}' not present", key.name.as_str());
                return MacCheck::Mismatched;
            }
            Err(e) => {
                log::error!("cannot read MAC variable '{}': {:?}", key.name.as_str(), e);
                return MacCheck::ProbeFailed(e);
            }
        };

        let stored = if resolved.value.bytes.len() == 6 {
            // Raw 6-byte payloads format directly to canonical form.
            let mut octets = [0u8; 6];
            octets.copy_from_slice(&resolved.value.bytes);
            Some(MacAddress::new(octets))
        } else {
            let text = decode_attribute_text(&resolved.value.bytes);
            normalize_mac(&text)
        };

        let Some(stored) = stored else {
            log::warn!("stored MAC value does not normalize; treating as mismatch");
            return MacCheck::Mismatched;
        };

        let adapters = match self.nics.adapters() {
            Ok(adapters) => adapters,
            Err(e) => {
                log::warn!("adapter enumeration failed: {:?}", e);
                alloc::vec::Vec::new()
            }
        };
        if adapters.is_empty() {
            log::warn!("no live network adapters to compare against");
            return MacCheck::Mismatched;
        }

        log::info!("stored MAC {}", stored);
        for nic in &adapters {
            log::info!(
                "  adapter {} (media {})",
                nic.mac,
                if nic.media_present { "up" } else { "down" }
            );
        }

        if adapters.iter().any(|nic| nic.mac == stored) {
            log::info!("MAC address matches a live adapter");
            MacCheck::Matched
        } else {
            log::warn!("MAC address does NOT match any live adapter");
            MacCheck::Mismatched
        }
    }

    fn decide(&mut self, serial: SerialCheck, mac: MacCheck) -> Transition {
        // A hard MAC probe failure with a healthy serial is a real error.
        // With the serial mismatched, remediation proceeds anyway; the probe
        // failure keeps the second-stage path on the table afterwards.
        if let MacCheck::ProbeFailed(err) = mac {
            if serial.is_ok() {
                return Transition::Terminal(VerificationOutcome::Error(ErrorKind::MacVariable(
                    err,
                )));
            }
            log::warn!("continuing with serial remediation despite MAC probe failure");
        }

        match serial {
            SerialCheck::Skipped | SerialCheck::Matched => {
                if mac.is_ok() {
                    log::info!("all enabled checks match");
                    Transition::Terminal(VerificationOutcome::AllMatch)
                } else {
                    Transition::Terminal(VerificationOutcome::MacMismatchOnly)
                }
            }
            SerialCheck::Mismatched { current, truth } => {
                if self.config.check_only {
                    log::error!(
                        "check-only: serial '{}' != inventory '{}', not remediating",
                        current,
                        truth.expected()
                    );
                    Transition::Terminal(VerificationOutcome::Error(ErrorKind::SerialMismatch))
                } else {
                    Transition::Remediate { truth, mac }
                }
            }
        }
    }

    /// Bounded-retry serial remediation
    ///
    /// Each attempt is one full tool invocation followed by a re-run of the
    /// serial comparison only, through the cached namespace.
    fn remediate(&mut self, truth: &GroundTruth, mac: MacCheck) -> VerificationOutcome {
        let expected = truth.expected();

        for attempt in 1..=RETRY_LIMIT {
            log::info!("remediation attempt {}/{}", attempt, RETRY_LIMIT);

            match self.tool.invoke(expected) {
                Ok(()) => match self.verify_serial(truth) {
                    Ok(true) => {
                        log::info!("serial number verified after remediation");
                        return if mac.is_ok() {
                            VerificationOutcome::SerialRemediated
                        } else {
                            log::warn!("MAC still requires the second-stage update path");
                            VerificationOutcome::MacMismatchOnly
                        };
                    }
                    Ok(false) => {
                        log::warn!("serial still wrong after attempt {}", attempt);
                    }
                    Err(e) => {
                        log::warn!("re-reading serial after attempt {} failed: {:?}", attempt, e);
                    }
                },
                Err(e) => {
                    log::warn!("remediation tool invocation failed: {:?}", e);
                }
            }
        }

        log::error!(
            "serial number remediation failed after {} attempts",
            RETRY_LIMIT
        );
        VerificationOutcome::SerialFailedAfterRetries
    }

    /// Re-run the serial comparison against a fresh read
    ///
    /// Uses the namespace discovered by the initial lookup; searching again
    /// could silently resolve to a different namespace when the name exists
    /// under several.
    fn verify_serial(&mut self, truth: &GroundTruth) -> Result<bool, VarError> {
        let namespace = self.serial_namespace.ok_or(VarError::NotFound)?;
        let value = self
            .store
            .get(self.config.serial_key.name.as_str(), &namespace)?;
        let current = decode_attribute_text(&value.bytes);
        Ok(truth.matches(&current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{NetError, NicInfo};
    use crate::remedy::ToolError;
    use crate::smbios::testutil::{push_end, push_record};
    use crate::smbios::TYPE_SYSTEM;
    use crate::varstore::MemStore;
    use alloc::vec::Vec;

    const VENDOR_NS: Guid = Guid::from_fields(
        0xfeedf00d,
        0x1111,
        0x4222,
        0x93,
        0x44,
        &[9, 8, 7, 6, 5, 4],
    );

    struct VecInventory {
        table: Vec<u8>,
    }

    impl VecInventory {
        /// Inventory whose Type 1 record carries `serial`
        fn with_system_serial(serial: &str) -> Self {
            let mut table = Vec::new();
            let mut fields = alloc::vec![1, 2, 0, 3];
            fields.extend_from_slice(&[0; 19]); // uuid + wake-up + sku + family
            push_record(&mut table, TYPE_SYSTEM, &fields, &["Acme", "Box", serial]);
            push_end(&mut table);
            Self { table }
        }
    }

    impl HardwareInventory for VecInventory {
        fn structure_table(&self) -> Option<&[u8]> {
            Some(&self.table)
        }
    }

    struct MockNics {
        adapters: Vec<NicInfo>,
        fail: bool,
    }

    impl MockNics {
        fn with_mac(octets: [u8; 6]) -> Self {
            Self {
                adapters: alloc::vec![NicInfo {
                    mac: MacAddress::new(octets),
                    media_present: true,
                }],
                fail: false,
            }
        }

        fn none() -> Self {
            Self {
                adapters: Vec::new(),
                fail: false,
            }
        }
    }

    impl NicEnumerator for MockNics {
        fn adapters(&mut self) -> crate::net::Result<Vec<NicInfo>> {
            if self.fail {
                return Err(NetError::Unavailable);
            }
            Ok(self.adapters.clone())
        }
    }

    struct MockTool {
        result: core::result::Result<(), ToolError>,
        invocations: usize,
    }

    impl MockTool {
        fn succeeding() -> Self {
            Self {
                result: Ok(()),
                invocations: 0,
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(ToolError::NotFound),
                invocations: 0,
            }
        }
    }

    impl RemediationTool for MockTool {
        fn invoke(&mut self, _expected_serial: &str) -> crate::remedy::Result<()> {
            self.invocations += 1;
            self.result
        }
    }

    fn wide(s: &str) -> Vec<u8> {
        crate::ucs2::encode(s)
            .iter()
            .flat_map(|u| u.to_le_bytes())
            .collect()
    }

    fn serial_only_config() -> CheckConfig {
        CheckConfig::new()
    }

    fn both_checks_config() -> CheckConfig {
        let mut config = CheckConfig::new();
        config.check_mac = true;
        config
    }

    #[test]
    fn all_match_with_no_remediation() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("ABC123"),
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let config = serial_only_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::AllMatch);
        assert_eq!(tool.invocations, 0);
    }

    #[test]
    fn retry_exhaustion_invokes_exactly_three_times() {
        // The tool reports success every time but the store never changes.
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("WRONG"),
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let mut config = serial_only_config();
        config.power_down = true;
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::SerialFailedAfterRetries);
        assert_eq!(tool.invocations, RETRY_LIMIT);
        // Never a power action past an unverified identity, regardless of
        // the power-down flag.
        assert_eq!(
            terminal_action(&outcome, &config),
            TerminalAction::ExitFailure
        );
    }

    #[test]
    fn remediation_verifies_through_cached_namespace() {
        // First read mismatches, the read after the second invocation sees
        // the corrected value.
        let mut store = MemStore::new();
        store.insert_sequence(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &[&wide("WRONG"), &wide("WRONG"), &wide("ABC123")],
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let config = serial_only_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::SerialRemediated);
        assert_eq!(tool.invocations, 2);
    }

    #[test]
    fn serial_found_by_enumeration_fallback() {
        // Variable lives under a namespace outside the well-known list.
        let mut store = MemStore::new();
        store.insert("Boot0001", resolver::GLOBAL_NAMESPACE, 0, b"x");
        store.insert("SerialNumber", VENDOR_NS, 0, &wide("ABC123"));
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let config = serial_only_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::AllMatch);
    }

    #[test]
    fn missing_serial_variable_is_a_hard_error() {
        let mut store = MemStore::new();
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let config = serial_only_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(
            outcome,
            VerificationOutcome::Error(ErrorKind::SerialVariable(VarError::NotFound))
        );
        assert_eq!(tool.invocations, 0);
    }

    #[test]
    fn check_only_reports_without_remediating() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("WRONG"),
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let mut config = serial_only_config();
        config.check_only = true;
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(
            outcome,
            VerificationOutcome::Error(ErrorKind::SerialMismatch)
        );
        assert_eq!(tool.invocations, 0);
    }

    #[test]
    fn mac_match_against_live_adapter() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("ABC123"),
        );
        store.insert(
            "MacAddress",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("aa:bb:cc:dd:ee:ff"),
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::with_mac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let mut tool = MockTool::succeeding();

        let config = both_checks_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::AllMatch);
    }

    #[test]
    fn raw_six_byte_mac_payload_matches() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("ABC123"),
        );
        store.insert(
            "MacAddress",
            resolver::CUSTOM_NAMESPACE,
            0,
            &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::with_mac([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let mut tool = MockTool::succeeding();

        let config = both_checks_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::AllMatch);
    }

    #[test]
    fn mac_mismatch_alone_awaits_second_pass() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("ABC123"),
        );
        store.insert(
            "MacAddress",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("00:00:00:00:00:01"),
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::with_mac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let mut tool = MockTool::succeeding();

        let mut config = both_checks_config();
        config.power_down = true;
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::MacMismatchOnly);
        assert_eq!(tool.invocations, 0);
        assert_eq!(
            terminal_action(&outcome, &config),
            TerminalAction::RebootSecondStage
        );
    }

    #[test]
    fn check_only_never_reboots_for_a_mac_mismatch() {
        let mut config = both_checks_config();
        config.check_only = true;
        config.power_down = true;
        assert_eq!(
            terminal_action(&VerificationOutcome::MacMismatchOnly, &config),
            TerminalAction::ExitSuccess
        );
    }

    #[test]
    fn missing_mac_variable_is_a_plain_mismatch() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("ABC123"),
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::with_mac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let mut tool = MockTool::succeeding();

        let config = both_checks_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::MacMismatchOnly);
    }

    #[test]
    fn mac_probe_failure_with_bad_serial_still_remediates() {
        // The original jumped straight from the MAC error path into serial
        // flashing; here it is an explicit transition.
        let mut store = MemStore::new();
        store.insert_sequence(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &[&wide("WRONG"), &wide("ABC123")],
        );
        store.insert("MacAddress", resolver::CUSTOM_NAMESPACE, 0, &wide("x"));
        store.fail_reads_of("MacAddress", VarError::DeviceError);
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let config = both_checks_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        // Serial gets fixed, but the MAC path still needs the second stage.
        assert_eq!(outcome, VerificationOutcome::MacMismatchOnly);
        assert_eq!(tool.invocations, 1);
    }

    #[test]
    fn mac_probe_failure_with_good_serial_is_an_error() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("ABC123"),
        );
        store.insert("MacAddress", resolver::CUSTOM_NAMESPACE, 0, &wide("x"));
        store.fail_reads_of("MacAddress", VarError::DeviceError);
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let config = both_checks_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(
            outcome,
            VerificationOutcome::Error(ErrorKind::MacVariable(VarError::DeviceError))
        );
        assert_eq!(tool.invocations, 0);
    }

    #[test]
    fn disabled_checks_always_pass() {
        let mut store = MemStore::new();
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let mut config = serial_only_config();
        config.check_serial = false;
        config.check_mac = false;
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::AllMatch);
        assert_eq!(tool.invocations, 0);
        assert_eq!(store.reads_of("SerialNumber"), 0);
    }

    #[test]
    fn failing_tool_exhausts_retries() {
        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("WRONG"),
        );
        let inventory = VecInventory::with_system_serial("ABC123");
        let mut nics = MockNics::none();
        let mut tool = MockTool::failing();

        let config = serial_only_config();
        let outcome =
            Engine::new(&config, &mut store, &inventory, &mut nics, &mut tool).run();

        assert_eq!(outcome, VerificationOutcome::SerialFailedAfterRetries);
        assert_eq!(tool.invocations, RETRY_LIMIT);
    }

    #[test]
    fn missing_inventory_is_a_hard_error() {
        struct NoInventory;
        impl HardwareInventory for NoInventory {
            fn structure_table(&self) -> Option<&[u8]> {
                None
            }
        }

        let mut store = MemStore::new();
        store.insert(
            "SerialNumber",
            resolver::CUSTOM_NAMESPACE,
            0,
            &wide("ABC123"),
        );
        let mut nics = MockNics::none();
        let mut tool = MockTool::succeeding();

        let config = serial_only_config();
        let outcome =
            Engine::new(&config, &mut store, &NoInventory, &mut nics, &mut tool).run();

        assert_eq!(
            outcome,
            VerificationOutcome::Error(ErrorKind::NoInventorySerial)
        );
    }
}
