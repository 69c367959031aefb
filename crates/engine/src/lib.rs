// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Workflow stepper driving daemon round-trips

pub mod add_existing;
mod error;
pub mod validation;
pub mod workflow;

pub use error::WorkflowError;
pub use validation::{FolderValidation, ValidationError, APP_MARKER};
pub use workflow::{
    Action, Actions, ChainStep, Progress, Stage, StageKind, Workflow, WorkflowInputs,
    WorkflowSnapshot, WorkflowStatus,
};
