//! vhdxmeta CLI - Dump VHDX/AVHDX metadata.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use vhdxmeta_core::{decode_file, inspect_file, DecodeOptions, Metadata};

/// Decode the metadata region of VHDX and AVHDX virtual disks.
#[derive(Parser)]
#[command(name = "vhdxmeta")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the metadata of a VHDX/AVHDX file.
    Decode {
        /// Path to the container file.
        file: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Decode metadata items in parallel.
        #[arg(long)]
        parallel: bool,

        /// Accept a metadata table without the `metadata` signature.
        #[arg(long)]
        no_verify_signature: bool,
    },

    /// List the region table and metadata table entries.
    Inspect {
        /// Path to the container file.
        file: PathBuf,

        /// Accept a metadata table without the `metadata` signature.
        #[arg(long)]
        no_verify_signature: bool,
    },
}

/// Output format for decoded metadata.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON document.
    Json,
    /// Indented JSON document.
    Pretty,
    /// Human-readable summary.
    Text,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Decode {
            file,
            format,
            parallel,
            no_verify_signature,
        } => {
            let options = DecodeOptions::new(!no_verify_signature, parallel);
            run_decode(&file, format, &options)?;
        }
        Commands::Inspect {
            file,
            no_verify_signature,
        } => {
            let options = DecodeOptions::new(!no_verify_signature, false);
            show_layout(&file, &options)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_decode(file: &Path, format: OutputFormat, options: &DecodeOptions) -> Result<()> {
    let metadata = decode_file(file, options)
        .with_context(|| format!("failed to decode {}", file.display()))?;

    match format {
        OutputFormat::Json => println!("{}", metadata.to_json()?),
        OutputFormat::Pretty => println!("{}", metadata.to_json_pretty()?),
        OutputFormat::Text => print_summary(file, &metadata),
    }

    Ok(())
}

fn print_summary(file: &Path, metadata: &Metadata) {
    println!("VHDX Metadata");
    println!("=============");
    println!();
    println!("File:             {}", file.display());
    println!(
        "Virtual size:     {} ({} bytes)",
        human_size(metadata.virtual_disk_size),
        metadata.virtual_disk_size
    );
    println!(
        "Block size:       {}",
        human_size(u64::from(metadata.block_size))
    );
    println!("Logical sector:   {} B", metadata.logical_sector_size);
    println!("Physical sector:  {} B", metadata.physical_sector_size);
    println!("Leave allocated:  {}", metadata.leave_block_allocated);
    println!("Has parent:       {}", metadata.has_parent);

    if let Some(locator) = metadata.parent_locator() {
        println!();
        println!("Parent locator:   {}", locator.locator_type);
        for (key, value) in &locator.entries {
            println!("  {:<22} {}", key, value);
        }
    }
}

fn show_layout(file: &Path, options: &DecodeOptions) -> Result<()> {
    let layout = inspect_file(file, options)
        .with_context(|| format!("failed to inspect {}", file.display()))?;

    println!("VHDX Layout");
    println!("===========");
    println!();
    println!("File:      {}", file.display());
    println!("Size:      {}", human_size(layout.file_size));
    println!();

    println!(
        "Regions ({} declared):",
        layout.regions.header.entry_count
    );
    for (i, region) in layout.regions.entries.iter().enumerate() {
        println!(
            "  {}. {:<8} {}  offset {:#x}  length {}{}",
            i + 1,
            region.kind(),
            region.guid,
            region.file_offset,
            human_size(u64::from(region.length)),
            if region.required { "  required" } else { "" }
        );
    }
    println!();

    println!(
        "Metadata table at {:#x} (signature {:?}, {} entries):",
        layout.table.region_offset,
        String::from_utf8_lossy(&layout.table.header.signature),
        layout.table.header.entry_count
    );
    for (i, detail) in layout.entries.iter().enumerate() {
        let name = detail
            .field
            .map(|field| field.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let entry = &detail.entry;
        println!(
            "  {}. {:<21} {}  offset {:#x}  length {}  [{}{}{}]",
            i + 1,
            name,
            entry.item_id,
            detail.payload_offset,
            entry.length,
            if entry.is_user { "U" } else { "-" },
            if entry.is_virtual_disk { "V" } else { "-" },
            if entry.is_required { "R" } else { "-" },
        );
    }

    Ok(())
}

/// Render a byte count with a binary unit, whole values without decimals.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if value.fract() == 0.0 {
        format!("{} {}", value as u64, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size_whole_units() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(32 * 1024 * 1024), "32 MiB");
        assert_eq!(human_size(5_368_709_120), "5 GiB");
    }

    #[test]
    fn test_human_size_fractional() {
        assert_eq!(human_size(1536), "1.50 KiB");
        assert_eq!(human_size(127 * 1024 * 1024 * 1024 + 512 * 1024 * 1024), "127.50 GiB");
    }

    #[test]
    fn test_human_size_caps_at_largest_unit() {
        assert_eq!(human_size(2048 * 1024 * 1024 * 1024 * 1024), "2048 TiB");
    }
}
