#![forbid(unsafe_code)]

use anyhow::{Context, Result, bail};
use sbinfo_core::error::SbError;
use sbinfo_core::{Ext4Superblock, ReportEntry, SuperblockDecoder, produce_report};
use serde::Serialize;
use std::env;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directive.
const LOG_ENV: &str = "SBINFO_LOG";

#[derive(Debug, Serialize)]
struct InspectOutput<'a> {
    source: &'a str,
    report: &'a [ReportEntry],
    superblock: &'a Ext4Superblock,
}

fn main() {
    init_tracing();
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        let code = error
            .downcast_ref::<SbError>()
            .map_or(1, SbError::to_errno);
        std::process::exit(code);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "inspect" => {
            let Some(path) = args.next() else {
                bail!("inspect requires a path argument");
            };
            let json = args.any(|arg| arg == "--json");
            inspect(Path::new(&path), json)
        }
        "dump" => {
            let Some(path) = args.next() else {
                bail!("dump requires a path argument");
            };
            dump(Path::new(&path))
        }
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            bail!("unknown command: {command}")
        }
    }
}

fn print_usage() {
    println!("sbinfo\n");
    println!("USAGE:");
    println!("  sbinfo inspect <image-path> [--json]");
    println!("  sbinfo dump <image-path>");
    println!();
    println!("Set {LOG_ENV}=debug for diagnostic logging on stderr.");
}

fn open(path: &Path) -> Result<SuperblockDecoder> {
    let decoder = SuperblockDecoder::open(path)
        .with_context(|| format!("failed to read ext4 superblock from {}", path.display()))?;
    debug!(source = decoder.source_id(), "superblock ready");
    Ok(decoder)
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let decoder = open(path)?;
    let report = produce_report(&decoder).context("assemble superblock report")?;

    if json {
        let output = InspectOutput {
            source: &report.source,
            report: &report.entries,
            superblock: decoder.superblock(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("serialize output")?
        );
    } else {
        print!("{report}");
    }

    Ok(())
}

/// Hex dump of the raw superblock, 16 bytes per line, offsets relative to
/// the superblock start.
fn dump(path: &Path) -> Result<()> {
    let decoder = open(path)?;
    for (line, chunk) in decoder.raw_superblock().chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    char::from(b)
                } else {
                    '.'
                }
            })
            .collect();
        println!("{:04x}: {}  {ascii}", line * 16, hex.join(" "));
    }
    Ok(())
}
