// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod add;
pub mod daemon;
pub mod watch;

use anyhow::{anyhow, Result};
use wt_core::Response;

/// Turn an error-band response into a command error.
pub(crate) fn ensure_success(response: &Response) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(anyhow!("{} (code: {})", response.message, response.code))
    }
}
