// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport boundary.
//!
//! A transport takes a [`SubscriptionRule`] and an [`Endpoint`], owns the
//! connection to that endpoint, and calls [`SampleSink::deliver`] once per
//! arriving sample from its own delivery thread. Registration is
//! fire-and-forget: connecting and keeping the stream alive is the
//! transport's job.
//!
//! Two transports are bundled:
//!
//! - [`ChannelTransport`]: in-process, fed through [`ChannelTransport::publish`].
//! - [`LineTransport`]: TCP, reads canonical decimal record lines from an
//!   upstream collector.

mod channel;
mod line;

pub use channel::ChannelTransport;
pub use line::{parse_line, LineError, LineTransport};

use crate::config::Endpoint;
use crate::rule::SubscriptionRule;
use crate::sample::SampleRecord;
use std::sync::Arc;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Endpoint {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Transport is shut down")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receiver of delivered samples.
///
/// Implementations are called concurrently from one thread per endpoint.
pub trait SampleSink: Send + Sync {
    fn deliver(&self, sample: SampleRecord);
}

/// Subscription transport.
pub trait Transport {
    /// Subscribe `sink` to `rule` at `endpoint`.
    fn register(
        &self,
        endpoint: &Endpoint,
        rule: &SubscriptionRule,
        sink: Arc<dyn SampleSink>,
    ) -> Result<(), TransportError>;
}
