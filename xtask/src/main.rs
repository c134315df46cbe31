//! IdentEFI build and test automation
//!
//! Builds the application for the UEFI target, stages it into an ESP
//! directory tree, and boots it under QEMU/OVMF.
//!
//! # Usage
//!
//! ```bash
//! cargo xtask build              # Build identefi.efi
//! cargo xtask esp                # Build and stage an ESP directory
//! cargo xtask run                # Boot the staged ESP under QEMU/OVMF
//! cargo xtask run -- --check     # Pass arguments via startup.nsh
//! ```

mod qemu;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

/// UEFI build target
const TARGET: &str = "x86_64-unknown-uefi";

#[derive(Parser)]
#[command(name = "xtask", about = "IdentEFI build and test automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build identefi.efi for the UEFI target
    Build {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },

    /// Build and stage an ESP directory tree
    Esp {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },

    /// Boot the staged ESP under QEMU with OVMF
    Run {
        /// Path to the OVMF firmware image
        #[arg(long)]
        ovmf: Option<String>,

        /// Run without a graphical display (serial only)
        #[arg(long)]
        headless: bool,

        /// Arguments passed to identefi via startup.nsh
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { release } => {
            build(release)?;
        }
        Commands::Esp { release } => {
            let efi = build(release)?;
            stage_esp(&efi, &[])?;
        }
        Commands::Run {
            ovmf,
            headless,
            args,
        } => {
            let efi = build(true)?;
            let esp = stage_esp(&efi, &args)?;
            qemu::run(&esp, ovmf.as_deref(), headless)?;
        }
    }

    Ok(())
}

/// Project root (the workspace directory)
fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("xtask lives under the workspace root")
        .to_path_buf()
}

/// Build the EFI application, returning the path to identefi.efi
fn build(release: bool) -> Result<PathBuf> {
    let root = project_root();
    let mut cmd = Command::new("cargo");
    cmd.current_dir(&root)
        .args(["build", "-p", "identefi", "--target", TARGET]);
    if release {
        cmd.arg("--release");
    }

    println!("Building identefi for {}...", TARGET);
    let status = cmd.status().context("failed to run cargo")?;
    if !status.success() {
        bail!("cargo build failed");
    }

    let profile = if release { "release" } else { "debug" };
    let efi = root
        .join("target")
        .join(TARGET)
        .join(profile)
        .join("identefi.efi");
    if !efi.exists() {
        bail!("expected build output at {}", efi.display());
    }
    Ok(efi)
}

/// Stage an ESP directory: the app as BOOTX64.EFI plus a startup script
fn stage_esp(efi: &Path, app_args: &[String]) -> Result<PathBuf> {
    let esp = project_root().join("target").join("esp");
    let boot_dir = esp.join("EFI").join("BOOT");
    fs::create_dir_all(&boot_dir).context("failed to create ESP directories")?;

    fs::copy(efi, boot_dir.join("BOOTX64.EFI")).context("failed to copy identefi.efi")?;

    if !app_args.is_empty() {
        let script = format!("\\EFI\\BOOT\\BOOTX64.EFI {}\r\n", app_args.join(" "));
        fs::write(esp.join("startup.nsh"), script).context("failed to write startup.nsh")?;
    }

    println!("ESP staged at {}", esp.display());
    Ok(esp)
}
