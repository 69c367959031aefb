// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wt-core: message bus and request correlation shared by the watch
//! daemon and its front end.

pub mod bus;
pub mod correlator;
pub mod id;
pub mod message;

pub use bus::{BusError, Handler, MessageBus, Subscription, SubscriptionId};
pub use correlator::{Correlator, ResponseWaiter};
pub use id::RequestId;
pub use message::{
    Command, CommandKind, ControlCommand, Message, MessageKind, Payload, Request, Response,
    StatusCode, WatchEntry, WatchStatus,
};
