// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local admission filter by transmitter and receiver.

use crate::ident::{Identifier, IdentifierSet};
use crate::sample::SampleRecord;

/// Decides whether a delivered sample is in scope.
///
/// The remote aggregator may send a superset of what the rule asked for (it
/// never filters by receiver), so this check is authoritative.
#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    tx_ids: IdentifierSet,
    rx_ids: IdentifierSet,
}

impl AdmissionFilter {
    pub fn new(tx_ids: IdentifierSet, rx_ids: IdentifierSet) -> Self {
        Self { tx_ids, rx_ids }
    }

    /// Filter that admits every sample.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Transmitter allow-list.
    pub fn tx_ids(&self) -> &IdentifierSet {
        &self.tx_ids
    }

    /// Receiver allow-list.
    pub fn rx_ids(&self) -> &IdentifierSet {
        &self.rx_ids
    }

    #[inline]
    pub fn accept(&self, tx_id: Identifier, rx_id: Identifier) -> bool {
        self.tx_ids.contains(tx_id) && self.rx_ids.contains(rx_id)
    }

    /// Check a sample against both allow-lists.
    #[inline]
    pub fn matches(&self, sample: &SampleRecord) -> bool {
        self.accept(sample.tx_id, sample.rx_id)
    }
}
