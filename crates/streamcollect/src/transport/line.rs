// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP transport reading canonical record lines.
//!
//! Connects to each endpoint and reads decimal-mode record lines, as written
//! by another collector (for example one exposed through `socat` or `nc`).
//! The upstream cannot take a rule, so the transmitter selectors are applied
//! here before delivery, the way an aggregator would apply them remotely.
//!
//! One connection attempt per endpoint; a dropped stream is logged and its
//! delivery thread ends.

use super::{SampleSink, Transport, TransportError};
use crate::config::Endpoint;
use crate::ident::Identifier;
use crate::rule::SubscriptionRule;
use crate::sample::SampleRecord;
use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of fixed fields before the sense values.
const FIXED_FIELDS: usize = 7;

/// Record line parse errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("expected at least 7 fields, found {0}")]
    TooFewFields(usize),

    #[error("invalid {name} field: {value:?}")]
    InvalidField { name: &'static str, value: String },

    #[error("Extra count {expected} does not match {found} trailing values")]
    CountMismatch { expected: usize, found: usize },
}

fn field<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, LineError> {
    value.parse::<T>().map_err(|_| LineError::InvalidField {
        name,
        value: value.to_string(),
    })
}

fn literal(name: &'static str, value: &str, expected: &str) -> Result<(), LineError> {
    if value == expected {
        Ok(())
    } else {
        Err(LineError::InvalidField {
            name,
            value: value.to_string(),
        })
    }
}

/// Parse a decimal-mode record line back into a sample.
pub fn parse_line(line: &str) -> Result<SampleRecord, LineError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < FIXED_FIELDS {
        return Err(LineError::TooFewFields(fields.len()));
    }

    let rx_id: Identifier = field("rx_id", fields[0])?;
    let rx_timestamp: i64 = field("timestamp", fields[1])?;
    let tx_id: Identifier = field("tx_id", fields[2])?;
    literal("reserved", fields[3], "0")?;
    let rss: f32 = field("rss", fields[4])?;
    literal("reserved", fields[5], "0x00")?;

    let count = fields[6]
        .strip_prefix("Extra:")
        .ok_or_else(|| LineError::InvalidField {
            name: "Extra",
            value: fields[6].to_string(),
        })?;
    let expected: usize = field("Extra", count)?;

    let trailing = &fields[FIXED_FIELDS..];
    if trailing.len() != expected {
        return Err(LineError::CountMismatch {
            expected,
            found: trailing.len(),
        });
    }
    let sense_data = trailing
        .iter()
        .map(|v| field::<u8>("sense", v))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SampleRecord {
        tx_id,
        rx_id,
        rx_timestamp,
        rss,
        sense_data,
    })
}

/// TCP line transport.
pub struct LineTransport {
    connect_timeout: Duration,
    registered: Mutex<HashSet<Endpoint>>,
    active: Arc<AtomicUsize>,
}

impl Default for LineTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LineTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            registered: Mutex::new(HashSet::new()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the per-endpoint connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Number of delivery threads still running.
    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Claim `endpoint`; false if it is already taken.
    fn claim(&self, endpoint: &Endpoint) -> bool {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.clone())
    }

    fn release(&self, endpoint: &Endpoint) {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(endpoint);
    }
}

impl Transport for LineTransport {
    fn register(
        &self,
        endpoint: &Endpoint,
        rule: &SubscriptionRule,
        sink: Arc<dyn SampleSink>,
    ) -> Result<(), TransportError> {
        if !self.claim(endpoint) {
            return Err(TransportError::AlreadyRegistered(endpoint.to_string()));
        }

        let target = endpoint.clone();
        let rule = rule.clone();
        let timeout = self.connect_timeout;
        let active = self.active.clone();

        active.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name(format!("line-{}", endpoint))
            .spawn(move || {
                run_stream(&target, &rule, timeout, sink.as_ref());
                active.fetch_sub(1, Ordering::SeqCst);
            });

        if let Err(e) = spawned {
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.release(endpoint);
            return Err(e.into());
        }
        Ok(())
    }
}

fn connect(endpoint: &Endpoint, timeout: Duration) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (endpoint.host.as_str(), endpoint.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
    }))
}

fn run_stream(
    endpoint: &Endpoint,
    rule: &SubscriptionRule,
    timeout: Duration,
    sink: &dyn SampleSink,
) {
    let stream = match connect(endpoint, timeout) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(%endpoint, "Connection failed: {}", e);
            return;
        }
    };
    stream.set_nodelay(true).ok();

    tracing::info!(
        %endpoint,
        physical_layer = rule.physical_layer,
        txers = rule.txers.len(),
        "Connected to line stream"
    );

    let mut delivered = 0u64;
    let mut skipped = 0u64;
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(%endpoint, "Read failed: {}", e);
                break;
            }
        };
        if line.is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(sample) => {
                if rule.matches_transmitter(sample.tx_id) {
                    sink.deliver(sample);
                    delivered += 1;
                }
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(%endpoint, "Skipping malformed record: {}", e);
            }
        }
    }

    tracing::info!(%endpoint, delivered, skipped, "Line stream closed");
}
