// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The "add existing folder" workflow.
//!
//! Pick a starting point, choose an initialized sync folder, then add it
//! to the daemon, reload the daemon and refresh the watch list.

use std::sync::Arc;

use wt_core::{Command, ControlCommand, Correlator};

use crate::error::WorkflowError;
use crate::validation::FolderValidation;
use crate::workflow::{ChainStep, Stage, StageKind, Workflow, WorkflowInputs};

pub const NAME: &str = "add-existing";

pub const START: &str = "start";
pub const FOLDER: &str = "folder";
pub const PROGRESS: &str = "progress";

pub const SUCCESS: &str = "Adding folder successful.";

pub fn stages() -> Vec<Stage> {
    vec![
        Stage::new(START, StageKind::Intro),
        Stage::new(
            FOLDER,
            StageKind::Folder {
                validation: FolderValidation::AppFolder,
            },
        ),
        Stage::new(
            PROGRESS,
            StageKind::Chain {
                steps: vec![
                    ChainStep {
                        describe: describe_add,
                        failure: "add folder",
                        command: add_watch,
                    },
                    ChainStep {
                        describe: |_| "Reloading daemon ... ".to_string(),
                        failure: "reload daemon",
                        command: |_| Command::Control {
                            command: ControlCommand::Reload,
                        },
                    },
                    ChainStep {
                        describe: |_| "Refreshing watch list ... ".to_string(),
                        failure: "refresh watch list",
                        command: |_| Command::ListWatches,
                    },
                ],
                success: SUCCESS,
            },
        ),
    ]
}

/// Start the workflow on its first stage.
pub fn start(correlator: Correlator) -> Result<Arc<Workflow>, WorkflowError> {
    Workflow::start(NAME, correlator, stages())
}

fn describe_add(inputs: &WorkflowInputs) -> String {
    let folder = inputs.folder.clone().unwrap_or_default();
    format!("Adding folder {} ... ", folder.display())
}

fn add_watch(inputs: &WorkflowInputs) -> Command {
    Command::AddWatch {
        path: inputs.folder.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
#[path = "add_existing_tests.rs"]
mod tests;
