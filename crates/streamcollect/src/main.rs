// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! streamcollect CLI
//!
//! Subscribe to aggregators and print admitted samples as tab-separated
//! records on stdout. Diagnostics go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Decimal output from two aggregators
//! streamcollect ids.txt 10.0.0.5 7008 10.0.0.6 7008
//!
//! # Hex identifiers, physical layer 1, records to a rotated file
//! streamcollect --hex --phy 1 -o samples.tsv --rotate 100M ids.txt localhost 7008
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use streamcollect::{
    create_formatter, create_output, parse_size, CollectorConfig, Endpoint, FileRotation,
    HexTimestamp, IdentifierLists, LineTransport, OutputConfig, OutputMode, StopHandle,
    SubscriptionDispatcher,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "streamcollect")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect sensor samples from aggregators, filtered by transmitter and receiver")]
#[command(long_about = None)]
struct Cli {
    /// Identifier file: transmitters on the first line, receivers on the second
    id_file: PathBuf,

    /// Aggregator endpoints as <HOST> <PORT> pairs
    #[arg(value_name = "HOST PORT", required = true, num_args = 2..)]
    endpoints: Vec<String>,

    /// Hexadecimal identifiers (output and identifier file)
    #[arg(long)]
    hex: bool,

    /// Physical layer to request (0 = all)
    #[arg(long, default_value = "0")]
    phy: u8,

    /// Update interval hint sent to aggregators, in milliseconds
    #[arg(long, default_value = "0")]
    update_interval_ms: u64,

    /// In hex mode, print the sample timestamp instead of the current time
    #[arg(long)]
    hex_sample_time: bool,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable file rotation with max size (e.g., 10M, 100K, 1G)
    #[arg(long, requires = "output")]
    rotate: Option<String>,

    /// Maximum number of rotated files to keep
    #[arg(long, default_value = "5")]
    rotate_keep: u32,

    /// Connect timeout per endpoint, in milliseconds
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    /// Verbose mode (debug diagnostics)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "streamcollect=debug"
    } else {
        "streamcollect=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout carries records only
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&cli)?;

    let lists = IdentifierLists::from_file(&cli.id_file, config.mode)
        .with_context(|| format!("Failed to read identifier file {}", cli.id_file.display()))?;

    tracing::info!(
        physical_layer = config.physical_layer,
        mode = ?config.mode,
        transmitters = lists.transmitters.len(),
        receivers = lists.receivers.len(),
        endpoints = config.endpoints.len(),
        "Starting streamcollect"
    );

    let (rule, filter) = lists.into_subscription(config.physical_layer);
    let rule = rule.with_update_interval(config.update_interval);

    let output = create_output(&config.output).context("Failed to open output")?;
    let mut dispatcher = SubscriptionDispatcher::new(
        rule,
        filter,
        create_formatter(config.mode, config.hex_timestamp),
        output,
    );

    ctrlc_handler(dispatcher.stop_handle());

    let transport =
        LineTransport::new().with_connect_timeout(Duration::from_millis(cli.connect_timeout_ms));
    dispatcher
        .start(&transport, &config.endpoints)
        .context("Failed to subscribe")?;

    dispatcher.wait().context("Failed to flush output")?;

    let stats = dispatcher.stats();
    tracing::info!(
        received = stats.received,
        accepted = stats.accepted,
        rejected = stats.rejected,
        write_errors = stats.write_errors,
        "Shutdown complete"
    );

    Ok(())
}

fn build_config(cli: &Cli) -> Result<CollectorConfig> {
    let endpoints = Endpoint::parse_pairs(&cli.endpoints)?;

    let output = match cli.output {
        Some(ref path) => {
            let rotation = match cli.rotate {
                Some(ref size) => {
                    let Some(max_size) = parse_size(size) else {
                        bail!("Invalid rotation size {:?}", size);
                    };
                    Some(FileRotation {
                        max_size,
                        max_files: cli.rotate_keep,
                    })
                }
                None => None,
            };
            OutputConfig::File {
                path: path.clone(),
                rotation,
            }
        }
        None => OutputConfig::Stdout,
    };

    let config = CollectorConfig::builder()
        .mode(if cli.hex {
            OutputMode::Hex
        } else {
            OutputMode::Decimal
        })
        .hex_timestamp(if cli.hex_sample_time {
            HexTimestamp::Sample
        } else {
            HexTimestamp::Current
        })
        .physical_layer(cli.phy)
        .update_interval(Duration::from_millis(cli.update_interval_ms))
        .endpoints(endpoints)
        .output(output)
        .build();

    config.validate()?;
    Ok(config)
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop_handle: StopHandle) {
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        stop_handle.stop();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_minimal_args() {
        let cli = parse(&["streamcollect", "ids.txt", "localhost", "7008"]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.mode, OutputMode::Decimal);
        assert_eq!(config.physical_layer, 0);
        assert_eq!(config.update_interval, Duration::ZERO);
        assert_eq!(config.endpoints, vec![Endpoint::new("localhost", 7008)]);
        assert!(matches!(config.output, OutputConfig::Stdout));
    }

    #[test]
    fn test_hex_and_phy() {
        let cli = parse(&[
            "streamcollect",
            "--hex",
            "--phy",
            "2",
            "ids.txt",
            "10.0.0.5",
            "7008",
            "10.0.0.6",
            "7009",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.mode, OutputMode::Hex);
        assert_eq!(config.hex_timestamp, HexTimestamp::Current);
        assert_eq!(config.physical_layer, 2);
        assert_eq!(config.endpoints.len(), 2);
    }

    #[test]
    fn test_file_output_with_rotation() {
        let cli = parse(&[
            "streamcollect",
            "-o",
            "out/samples.tsv",
            "--rotate",
            "10M",
            "--rotate-keep",
            "3",
            "ids.txt",
            "localhost",
            "7008",
        ]);
        match build_config(&cli).unwrap().output {
            OutputConfig::File { path, rotation } => {
                assert_eq!(path, PathBuf::from("out/samples.tsv"));
                let rotation = rotation.unwrap();
                assert_eq!(rotation.max_size, 10 * 1024 * 1024);
                assert_eq!(rotation.max_files, 3);
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(Cli::try_parse_from(["streamcollect", "ids.txt"]).is_err());
        assert!(Cli::try_parse_from(["streamcollect", "ids.txt", "localhost"]).is_err());

        let cli = parse(&["streamcollect", "ids.txt", "a", "1", "b"]);
        assert!(build_config(&cli).is_err());

        let cli = parse(&["streamcollect", "ids.txt", "a", "port"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_rejects_bad_rotation_size() {
        let cli = parse(&[
            "streamcollect",
            "-o",
            "x.tsv",
            "--rotate",
            "huge",
            "ids.txt",
            "localhost",
            "7008",
        ]);
        assert!(build_config(&cli).is_err());

        let cli = parse(&[
            "streamcollect",
            "-o",
            "x.tsv",
            "--rotate",
            "99999999999G",
            "ids.txt",
            "localhost",
            "7008",
        ]);
        assert!(build_config(&cli).is_err());
    }
}
