// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription dispatcher - registers the rule with every endpoint and
//! turns admitted samples into output lines.

use crate::config::Endpoint;
use crate::filter::AdmissionFilter;
use crate::formatter::RecordFormatter;
use crate::output::SampleOutput;
use crate::rule::SubscriptionRule;
use crate::sample::SampleRecord;
use crate::transport::{SampleSink, Transport};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Dispatcher errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatcher already running")]
    AlreadyRunning,

    #[error("No endpoints to subscribe to")]
    NoEndpoints,

    #[error("Registration failed on all {0} endpoints")]
    AllRegistrationsFailed(usize),
}

/// Dispatcher lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Rule and filter fixed, nothing registered yet.
    Created,
    /// Subscriptions registered; samples are flowing.
    Running,
}

/// Dispatch statistics.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Samples delivered by the transport.
    pub received: AtomicU64,
    /// Samples that passed the filter and were written.
    pub accepted: AtomicU64,
    /// Samples dropped by the filter.
    pub rejected: AtomicU64,
    /// Output write failures.
    pub write_errors: AtomicU64,
}

impl DispatchStats {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub write_errors: u64,
}

/// The callback target handed to transports.
///
/// Filtering runs without locks; the output mutex is held for one whole line
/// so concurrent delivery threads never interleave partial records.
struct DispatchSink {
    filter: AdmissionFilter,
    formatter: Box<dyn RecordFormatter + Send + Sync>,
    output: Mutex<Box<dyn SampleOutput>>,
    stats: DispatchStats,
}

impl DispatchSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        output.write(line)
    }

    fn flush(&self) -> io::Result<()> {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        output.flush()
    }
}

impl SampleSink for DispatchSink {
    fn deliver(&self, sample: SampleRecord) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        if !self.filter.matches(&sample) {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(tx_id = %sample.tx_id, rx_id = %sample.rx_id, "Sample rejected");
            return;
        }

        let line = self.formatter.format(&sample);
        match self.write_line(&line) {
            Ok(()) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Record output failed: {}", e);
            }
        }
    }
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

/// Handle to stop a running dispatcher from another thread.
#[derive(Clone)]
pub struct StopHandle {
    signal: Arc<StopSignal>,
}

impl StopHandle {
    /// Wake every thread blocked in [`SubscriptionDispatcher::wait`].
    pub fn stop(&self) {
        let mut stopped = self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.signal.cond.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the rule and the filter and drives subscriptions.
pub struct SubscriptionDispatcher {
    rule: SubscriptionRule,
    sink: Arc<DispatchSink>,
    state: DispatcherState,
    registered: Vec<Endpoint>,
    signal: Arc<StopSignal>,
}

impl SubscriptionDispatcher {
    /// Create a dispatcher. Rule and filter are fixed from here on.
    pub fn new(
        rule: SubscriptionRule,
        filter: AdmissionFilter,
        formatter: Box<dyn RecordFormatter + Send + Sync>,
        output: Box<dyn SampleOutput>,
    ) -> Self {
        Self {
            rule,
            sink: Arc::new(DispatchSink {
                filter,
                formatter,
                output: Mutex::new(output),
                stats: DispatchStats::default(),
            }),
            state: DispatcherState::Created,
            registered: Vec::new(),
            signal: Arc::new(StopSignal::default()),
        }
    }

    pub fn rule(&self) -> &SubscriptionRule {
        &self.rule
    }

    pub fn filter(&self) -> &AdmissionFilter {
        &self.sink.filter
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Endpoints whose registration succeeded.
    pub fn registered(&self) -> &[Endpoint] {
        &self.registered
    }

    /// Get dispatch statistics.
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.sink.stats.snapshot()
    }

    /// Run one sample through filter, formatter and output on the caller's
    /// thread.
    pub fn deliver(&self, sample: SampleRecord) {
        self.sink.deliver(sample);
    }

    /// Register the rule with every endpoint and enter `Running`.
    ///
    /// A failed registration is logged and skipped; the call fails only when
    /// no endpoint could be registered.
    pub fn start(
        &mut self,
        transport: &dyn Transport,
        endpoints: &[Endpoint],
    ) -> Result<(), DispatchError> {
        if self.state == DispatcherState::Running {
            return Err(DispatchError::AlreadyRunning);
        }
        if endpoints.is_empty() {
            return Err(DispatchError::NoEndpoints);
        }

        tracing::debug!(
            physical_layer = self.rule.physical_layer,
            update_interval_ms = self.rule.update_interval.as_millis() as u64,
            txers = self.rule.txers.len(),
            "Subscription rule"
        );

        let sink: Arc<dyn SampleSink> = self.sink.clone();
        for endpoint in endpoints {
            match transport.register(endpoint, &self.rule, sink.clone()) {
                Ok(()) => {
                    tracing::info!(%endpoint, "Subscription registered");
                    self.registered.push(endpoint.clone());
                }
                Err(e) => {
                    tracing::warn!(%endpoint, "Subscription failed: {}", e);
                }
            }
        }

        if self.registered.is_empty() {
            return Err(DispatchError::AllRegistrationsFailed(endpoints.len()));
        }

        self.state = DispatcherState::Running;
        Ok(())
    }

    /// Get a handle to stop the dispatcher from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            signal: self.signal.clone(),
        }
    }

    /// Block until a [`StopHandle`] fires, then flush the output.
    pub fn wait(&self) -> io::Result<()> {
        let mut stopped = self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*stopped {
            stopped = self
                .signal
                .cond
                .wait(stopped)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(stopped);
        self.flush()
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    ///
    /// Returns `true` if the stop signal fired.
    pub fn wait_timeout(&self, timeout: Duration) -> io::Result<bool> {
        let stopped = self
            .signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .signal
            .cond
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        let fired = *stopped;
        drop(stopped);
        self.flush()?;
        Ok(fired)
    }

    /// Flush output.
    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }
}
