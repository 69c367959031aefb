// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Correlation identifiers

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter backing [`RequestId::next`]. Starts at 1 so that a
/// zeroed identifier never matches a real request.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier binding a request to its eventual response.
///
/// Allocated from a monotonic counter, so identifiers are unique for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Wrap a raw value (wire decoding, tests).
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
