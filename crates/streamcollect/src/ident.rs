// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sensor identifiers and identifier allow-lists.

use std::collections::HashSet;

/// 128-bit value naming a transmitter or receiver radio.
pub type Identifier = u128;

/// Immutable allow-list of identifiers.
///
/// An empty set is *unrestricted*: it matches every identifier. The set is
/// built once during setup and only read afterwards, so it can be shared
/// across delivery threads behind an `Arc` without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSet {
    ids: HashSet<Identifier>,
}

impl IdentifierSet {
    /// Build a set from any sequence of identifiers. Duplicates collapse.
    pub fn build<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Identifier>,
    {
        Self {
            ids: values.into_iter().collect(),
        }
    }

    /// A set that matches everything.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Membership test; always true for an empty set.
    #[inline]
    pub fn contains(&self, id: Identifier) -> bool {
        self.ids.is_empty() || self.ids.contains(&id)
    }

    /// True when the set places no restriction on identifiers.
    pub fn is_unrestricted(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of distinct identifiers listed.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<Identifier> for IdentifierSet {
    fn from_iter<T: IntoIterator<Item = Identifier>>(iter: T) -> Self {
        Self::build(iter)
    }
}
