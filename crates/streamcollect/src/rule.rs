// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription rules handed to the transport.
//!
//! A rule tells the remote aggregator which physical layer and which
//! transmitters to forward. It is a volume-reduction hint only: the local
//! [`AdmissionFilter`](crate::AdmissionFilter) re-checks every sample.

use crate::ident::Identifier;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mask selecting every bit of an identifier (exact match).
pub const EXACT_MASK: Identifier = Identifier::MAX;

/// Transmitter selector: an incoming id matches when the bits selected by
/// `mask` equal those of `base_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransmitterSpec {
    pub base_id: Identifier,
    pub mask: Identifier,
}

impl TransmitterSpec {
    /// Selector matching exactly one transmitter.
    pub fn exact(id: Identifier) -> Self {
        Self {
            base_id: id,
            mask: EXACT_MASK,
        }
    }

    /// Selector matching every id that agrees with `base_id` on `mask`.
    pub fn masked(base_id: Identifier, mask: Identifier) -> Self {
        Self { base_id, mask }
    }

    pub fn matches(&self, id: Identifier) -> bool {
        (id & self.mask) == (self.base_id & self.mask)
    }
}

/// What to request from each aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRule {
    /// Radio layer to request (0 = all layers).
    pub physical_layer: u8,
    /// Minimum spacing between updates; zero means "as fast as available".
    pub update_interval: Duration,
    /// Transmitters of interest, in configuration order.
    pub txers: Vec<TransmitterSpec>,
}

impl Default for SubscriptionRule {
    fn default() -> Self {
        Self {
            physical_layer: 0,
            update_interval: Duration::ZERO,
            txers: Vec::new(),
        }
    }
}

impl SubscriptionRule {
    /// Rule for a physical layer with no transmitter restriction.
    pub fn new(physical_layer: u8) -> Self {
        Self {
            physical_layer,
            ..Default::default()
        }
    }

    /// Rule requesting exact matches on each listed transmitter.
    pub fn for_transmitters(physical_layer: u8, tx_ids: &[Identifier]) -> Self {
        Self {
            physical_layer,
            update_interval: Duration::ZERO,
            txers: tx_ids.iter().copied().map(TransmitterSpec::exact).collect(),
        }
    }

    /// Set the update interval hint.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Append a transmitter selector.
    pub fn with_transmitter(mut self, spec: TransmitterSpec) -> Self {
        self.txers.push(spec);
        self
    }

    /// Remote-side transmitter check. An empty selector list matches all.
    pub fn matches_transmitter(&self, id: Identifier) -> bool {
        self.txers.is_empty() || self.txers.iter().any(|spec| spec.matches(id))
    }
}
