//! QEMU/OVMF launch helpers

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Firmware locations probed when --ovmf is not given
const OVMF_CANDIDATES: &[&str] = &[
    "/usr/share/OVMF/OVMF_CODE.fd",
    "/usr/share/ovmf/OVMF.fd",
    "/usr/share/edk2/x64/OVMF_CODE.4m.fd",
    "/usr/share/qemu/OVMF.fd",
];

/// Boot the staged ESP directory under QEMU
pub fn run(esp: &Path, ovmf: Option<&str>, headless: bool) -> Result<()> {
    let firmware = match ovmf {
        Some(path) => path.to_string(),
        None => OVMF_CANDIDATES
            .iter()
            .find(|p| Path::new(p).exists())
            .map(|p| p.to_string())
            .context("no OVMF firmware found; pass --ovmf")?,
    };

    let mut cmd = Command::new("qemu-system-x86_64");
    cmd.args(["-machine", "q35", "-m", "512M"])
        .args(["-bios", &firmware])
        .arg("-drive")
        .arg(format!(
            "format=raw,file=fat:rw:{}",
            esp.display()
        ))
        // An emulated NIC so the SNP-based MAC check has something to see.
        .args(["-netdev", "user,id=net0"])
        .args(["-device", "e1000,netdev=net0,mac=52:54:00:12:34:56"])
        .args(["-serial", "mon:stdio"]);

    if headless {
        cmd.args(["-display", "none"]);
    }

    println!("Launching QEMU with {}...", firmware);
    let status = cmd.status().context("failed to launch qemu-system-x86_64")?;
    if !status.success() {
        bail!("qemu exited with {}", status);
    }
    Ok(())
}
