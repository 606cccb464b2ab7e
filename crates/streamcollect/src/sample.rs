// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sample records delivered by a transport.

use crate::ident::Identifier;

/// One reading: a transmitter heard by a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// Transmitter identifier.
    pub tx_id: Identifier,
    /// Receiver identifier.
    pub rx_id: Identifier,
    /// Receive time in milliseconds, as stamped by the aggregator.
    pub rx_timestamp: i64,
    /// Received signal strength.
    pub rss: f32,
    /// Auxiliary sense values, possibly empty.
    pub sense_data: Vec<u8>,
}

impl SampleRecord {
    /// Create a sample with zero timestamp, zero rss and no sense data.
    pub fn new(tx_id: Identifier, rx_id: Identifier) -> Self {
        Self {
            tx_id,
            rx_id,
            rx_timestamp: 0,
            rss: 0.0,
            sense_data: Vec::new(),
        }
    }

    /// Set receive timestamp.
    pub fn with_timestamp(mut self, rx_timestamp: i64) -> Self {
        self.rx_timestamp = rx_timestamp;
        self
    }

    /// Set signal strength.
    pub fn with_rss(mut self, rss: f32) -> Self {
        self.rss = rss;
        self
    }

    /// Set sense data.
    pub fn with_sense_data(mut self, sense_data: impl Into<Vec<u8>>) -> Self {
        self.sense_data = sense_data.into();
        self
    }
}
