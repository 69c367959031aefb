// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the workflow stepper

use thiserror::Error;

use crate::validation::ValidationError;
use crate::workflow::{Action, WorkflowStatus};

/// Errors returned by workflow navigation
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow has no stages")]
    NoStages,
    #[error("{action} is not allowed on stage '{stage}'")]
    NotAllowed { action: Action, stage: &'static str },
    #[error("a daemon request is still outstanding")]
    Pending,
    #[error("workflow is {0}")]
    Terminal(WorkflowStatus),
    #[error("invalid folder: {0}")]
    Validation(#[from] ValidationError),
}
