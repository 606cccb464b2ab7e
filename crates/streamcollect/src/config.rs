// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collector configuration.
//!
//! The identifier file lists transmitters on its first line and receivers on
//! its second, whitespace separated:
//!
//! ```text
//! 101 102 205
//! 9001 9002
//! ```
//!
//! With hexadecimal mode every token is read as hex (`0x` prefix optional).
//! A missing or blank line leaves that side unrestricted.

use crate::filter::AdmissionFilter;
use crate::formatter::{HexTimestamp, OutputMode};
use crate::ident::{Identifier, IdentifierSet};
use crate::output::OutputConfig;
use crate::rule::SubscriptionRule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid identifier {token:?} on line {line}")]
    InvalidIdentifier { line: usize, token: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Aggregator address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a flat `host port host port ...` argument list.
    pub fn parse_pairs<S: AsRef<str>>(args: &[S]) -> Result<Vec<Self>, ConfigError> {
        if args.is_empty() {
            return Err(ConfigError::InvalidEndpoint(
                "at least one <host> <port> pair is required".into(),
            ));
        }
        if args.len() % 2 != 0 {
            return Err(ConfigError::InvalidEndpoint(format!(
                "host {:?} has no port",
                args[args.len() - 1].as_ref()
            )));
        }

        args.chunks(2)
            .map(|pair| {
                let host = pair[0].as_ref();
                let port = pair[1].as_ref();
                let port = port.parse::<u16>().map_err(|_| {
                    ConfigError::InvalidEndpoint(format!("bad port {:?} for host {}", port, host))
                })?;
                Ok(Self::new(host, port))
            })
            .collect()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    /// Parse `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidEndpoint(format!("expected host:port, got {:?}", s)))?;
        if host.is_empty() {
            return Err(ConfigError::InvalidEndpoint(format!("empty host in {:?}", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidEndpoint(format!("bad port in {:?}", s)))?;
        Ok(Self::new(host, port))
    }
}

/// Parse one identifier token in the given mode.
pub fn parse_identifier(token: &str, mode: OutputMode) -> Option<Identifier> {
    match mode {
        OutputMode::Decimal => token.parse::<Identifier>().ok(),
        OutputMode::Hex => {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            Identifier::from_str_radix(digits, 16).ok()
        }
    }
}

/// Transmitter and receiver identifiers read from the identifier file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierLists {
    pub transmitters: Vec<Identifier>,
    pub receivers: Vec<Identifier>,
}

impl IdentifierLists {
    /// Read the identifier file.
    pub fn from_file<P: AsRef<Path>>(path: P, mode: OutputMode) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, mode)
    }

    /// Parse identifier file contents. Lines past the second are ignored.
    pub fn parse(content: &str, mode: OutputMode) -> Result<Self, ConfigError> {
        let mut lines = content.lines();
        let transmitters = parse_line(lines.next(), 1, mode)?;
        let receivers = parse_line(lines.next(), 2, mode)?;
        Ok(Self {
            transmitters,
            receivers,
        })
    }

    /// Build the subscription rule and the matching local filter.
    ///
    /// Transmitters go to both (exact-mask selectors remotely, allow-list
    /// locally); receivers only to the local filter.
    pub fn into_subscription(self, physical_layer: u8) -> (SubscriptionRule, AdmissionFilter) {
        let rule = SubscriptionRule::for_transmitters(physical_layer, &self.transmitters);
        let filter = AdmissionFilter::new(
            IdentifierSet::build(self.transmitters),
            IdentifierSet::build(self.receivers),
        );
        (rule, filter)
    }
}

fn parse_line(
    line: Option<&str>,
    line_no: usize,
    mode: OutputMode,
) -> Result<Vec<Identifier>, ConfigError> {
    let Some(line) = line else {
        return Ok(Vec::new());
    };
    line.split_whitespace()
        .map(|token| {
            parse_identifier(token, mode).ok_or_else(|| ConfigError::InvalidIdentifier {
                line: line_no,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Identifier representation in the output and the identifier file.
    pub mode: OutputMode,
    /// Second-field source in hex mode.
    pub hex_timestamp: HexTimestamp,
    /// Physical layer to request (0 = all).
    pub physical_layer: u8,
    /// Update interval hint sent with the rule.
    pub update_interval: Duration,
    /// Aggregators to subscribe to.
    pub endpoints: Vec<Endpoint>,
    /// Output destination.
    pub output: OutputConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Decimal,
            hex_timestamp: HexTimestamp::Current,
            physical_layer: 0,
            update_interval: Duration::ZERO,
            endpoints: Vec::new(),
            output: OutputConfig::Stdout,
        }
    }
}

impl CollectorConfig {
    /// Create a new builder.
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::Invalid("No endpoints configured".into()));
        }
        Ok(())
    }
}

/// Builder for CollectorConfig.
#[derive(Debug, Default)]
pub struct CollectorConfigBuilder {
    mode: Option<OutputMode>,
    hex_timestamp: Option<HexTimestamp>,
    physical_layer: Option<u8>,
    update_interval: Option<Duration>,
    endpoints: Vec<Endpoint>,
    output: Option<OutputConfig>,
}

impl CollectorConfigBuilder {
    /// Set identifier representation.
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set hex-mode time source.
    pub fn hex_timestamp(mut self, source: HexTimestamp) -> Self {
        self.hex_timestamp = Some(source);
        self
    }

    /// Set physical layer.
    pub fn physical_layer(mut self, phy: u8) -> Self {
        self.physical_layer = Some(phy);
        self
    }

    /// Set update interval hint.
    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = Some(interval);
        self
    }

    /// Add an aggregator endpoint.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Add several aggregator endpoints.
    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// Set output destination.
    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CollectorConfig {
        CollectorConfig {
            mode: self.mode.unwrap_or_default(),
            hex_timestamp: self.hex_timestamp.unwrap_or_default(),
            physical_layer: self.physical_layer.unwrap_or(0),
            update_interval: self.update_interval.unwrap_or(Duration::ZERO),
            endpoints: self.endpoints,
            output: self.output.unwrap_or_default(),
        }
    }
}
