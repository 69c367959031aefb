// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch daemon library
//!
//! Exposes the daemon body so a front end can run it in-process, and the
//! socket protocol so a front end can reach a daemon owned by another
//! process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod logging;
pub mod protocol;
pub mod service;

pub use lifecycle::{startup, Config, DaemonState, LifecycleError, StartupResult};
pub use protocol::{ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};
pub use service::{RequestHandler, ServiceError, WatchService};
