// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic workflow stepper.
//!
//! A workflow is an ordered list of stage descriptors interpreted by one
//! stepper. Local stages collect and validate input. Chain stages run a
//! sequence of daemon round-trips through the [`Correlator`], one request
//! at a time, with navigation disabled while a request is outstanding.

use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wt_core::{Command, Correlator, RequestId, Response, ResponseWaiter};

use crate::error::WorkflowError;
use crate::validation::FolderValidation;

/// Navigation action offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Previous,
    Next,
    Finish,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Previous, Action::Next, Action::Finish];

    const fn bit(self) -> u8 {
        match self {
            Action::Previous => 1,
            Action::Next => 1 << 1,
            Action::Finish => 1 << 2,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Previous => write!(f, "previous"),
            Action::Next => write!(f, "next"),
            Action::Finish => write!(f, "finish"),
        }
    }
}

/// Set of currently permitted actions.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Actions(u8);

impl Actions {
    pub const NONE: Actions = Actions(0);

    pub const fn only(action: Action) -> Self {
        Actions(action.bit())
    }

    pub const fn with(self, action: Action) -> Self {
        Actions(self.0 | action.bit())
    }

    pub const fn contains(self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Input collected by local stages and read by chain steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowInputs {
    pub folder: Option<PathBuf>,
}

/// One daemon round-trip within a chain stage.
pub struct ChainStep {
    /// Progress log text written when the step's request is issued
    pub describe: fn(&WorkflowInputs) -> String,
    /// Completes "Unable to ..." when the step fails
    pub failure: &'static str,
    pub command: fn(&WorkflowInputs) -> Command,
}

pub enum StageKind {
    /// Starting point, no input.
    Intro,
    /// Takes a folder, validated when leaving the stage with `Next`.
    Folder { validation: FolderValidation },
    /// Runs `steps` in order; each starts only after the previous one
    /// succeeded. `success` is appended to the log when all succeed.
    Chain {
        steps: Vec<ChainStep>,
        success: &'static str,
    },
}

pub struct Stage {
    pub name: &'static str,
    pub kind: StageKind,
}

impl Stage {
    pub fn new(name: &'static str, kind: StageKind) -> Self {
        Self { name, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    /// Waiting on the user
    Active,
    /// Waiting on the daemon
    Pending,
    Finished,
    Aborted,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Finished | WorkflowStatus::Aborted)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Active => write!(f, "active"),
            WorkflowStatus::Pending => write!(f, "pending"),
            WorkflowStatus::Finished => write!(f, "finished"),
            WorkflowStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Progress of the current chain stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// Steps completed (or `total` after a failure)
    pub current: usize,
    pub total: usize,
    pub log: String,
    /// Set when a step failed and the log should be shown expanded
    pub show_details: bool,
}

/// Observable state of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub stage: usize,
    pub stage_name: &'static str,
    pub status: WorkflowStatus,
    pub actions: Actions,
    pub outstanding: Option<RequestId>,
    pub progress: Progress,
    pub inputs: WorkflowInputs,
    /// Last validation or daemon error shown to the user
    pub error: Option<String>,
}

impl WorkflowSnapshot {
    pub fn is_pending(&self) -> bool {
        self.status == WorkflowStatus::Pending
    }
}

pub struct Workflow {
    name: &'static str,
    me: Weak<Workflow>,
    correlator: Correlator,
    stages: Vec<Stage>,
    state: Mutex<WorkflowSnapshot>,
    tx: watch::Sender<WorkflowSnapshot>,
}

impl Workflow {
    /// Create a workflow over `stages` and enter the first one.
    pub fn start(
        name: &'static str,
        correlator: Correlator,
        stages: Vec<Stage>,
    ) -> Result<Arc<Self>, WorkflowError> {
        let first = stages.first().ok_or(WorkflowError::NoStages)?;
        let initial = WorkflowSnapshot {
            stage: 0,
            stage_name: first.name,
            status: WorkflowStatus::Active,
            actions: Actions::NONE,
            outstanding: None,
            progress: Progress::default(),
            inputs: WorkflowInputs::default(),
            error: None,
        };
        let (tx, _) = watch::channel(initial.clone());

        let workflow = Arc::new_cyclic(|me| Workflow {
            name,
            me: me.clone(),
            correlator,
            stages,
            state: Mutex::new(initial),
            tx,
        });

        {
            let mut state = workflow.state.lock();
            workflow.enter(&mut state, 0);
            workflow.publish(&state);
        }
        info!(workflow = name, "workflow started");
        Ok(workflow)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.state.lock().clone()
    }

    /// Observe every state change.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.tx.subscribe()
    }

    /// Wait until no request is outstanding.
    ///
    /// Never resolves if the daemon never answers; callers wanting a bound
    /// wrap this in a timeout.
    pub async fn settled(&self) -> WorkflowSnapshot {
        let mut rx = self.tx.subscribe();
        let settled = rx.wait_for(|s| !s.is_pending()).await.map(|s| s.clone());
        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Record the folder chosen by the user.
    pub fn set_folder(&self, folder: impl Into<PathBuf>) -> Result<(), WorkflowError> {
        let mut state = self.state.lock();
        Self::check_idle(&state)?;
        state.inputs.folder = Some(folder.into());
        state.error = None;
        self.publish(&state);
        Ok(())
    }

    /// Apply a navigation action if it is currently permitted.
    pub fn navigate(&self, action: Action) -> Result<WorkflowSnapshot, WorkflowError> {
        let mut state = self.state.lock();
        if state.is_pending() {
            return Err(WorkflowError::Pending);
        }
        if !state.actions.contains(action) {
            if state.status.is_terminal() {
                return Err(WorkflowError::Terminal(state.status));
            }
            return Err(WorkflowError::NotAllowed {
                action,
                stage: state.stage_name,
            });
        }

        debug!(workflow = self.name, stage = state.stage_name, %action, "navigate");
        match action {
            Action::Previous => {
                let prior = state.stage.saturating_sub(1);
                self.enter(&mut state, prior);
            }
            Action::Next => {
                if let Err(e) = self.validate_stage(&mut state) {
                    state.error = Some(e.to_string());
                    self.publish(&state);
                    return Err(e);
                }
                let next = state.stage + 1;
                self.enter(&mut state, next);
            }
            Action::Finish => {
                state.status = WorkflowStatus::Finished;
                state.actions = Actions::NONE;
                info!(workflow = self.name, "workflow finished");
            }
        }

        self.publish(&state);
        Ok(state.clone())
    }

    /// Cancel the workflow, dropping any outstanding request.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return;
        }
        if let Some(id) = state.outstanding.take() {
            self.correlator.forget(id);
        }
        state.status = WorkflowStatus::Aborted;
        state.actions = Actions::NONE;
        info!(workflow = self.name, stage = state.stage_name, "workflow aborted");
        self.publish(&state);
    }

    fn publish(&self, state: &WorkflowSnapshot) {
        self.tx.send_replace(state.clone());
    }

    fn check_idle(state: &WorkflowSnapshot) -> Result<(), WorkflowError> {
        if state.is_pending() {
            return Err(WorkflowError::Pending);
        }
        if state.status.is_terminal() {
            return Err(WorkflowError::Terminal(state.status));
        }
        Ok(())
    }

    fn validate_stage(&self, state: &mut WorkflowSnapshot) -> Result<(), WorkflowError> {
        let Some(stage) = self.stages.get(state.stage) else {
            return Ok(());
        };
        if let StageKind::Folder { validation } = stage.kind {
            let folder = state.inputs.folder.clone().unwrap_or_default();
            state.inputs.folder = Some(validation.validate(&folder)?);
        }
        state.error = None;
        Ok(())
    }

    fn enter(&self, state: &mut WorkflowSnapshot, index: usize) {
        let Some(stage) = self.stages.get(index) else {
            return;
        };
        state.stage = index;
        state.stage_name = stage.name;
        state.outstanding = None;
        state.error = None;

        match &stage.kind {
            StageKind::Chain { steps, success } => {
                state.progress = Progress {
                    total: steps.len(),
                    ..Progress::default()
                };
                if steps.is_empty() {
                    self.complete_chain(state, success);
                } else {
                    self.issue(state, 0);
                }
            }
            StageKind::Intro | StageKind::Folder { .. } => {
                state.status = WorkflowStatus::Active;
                state.actions = self.local_actions(index);
            }
        }
        debug!(workflow = self.name, stage = stage.name, "entered stage");
    }

    fn local_actions(&self, index: usize) -> Actions {
        let mut actions = Actions::NONE;
        if index > 0 {
            actions = actions.with(Action::Previous);
        }
        if index + 1 < self.stages.len() {
            actions.with(Action::Next)
        } else {
            actions.with(Action::Finish)
        }
    }

    /// Send the request for chain step `step` of the current stage.
    ///
    /// Called with the state lock held, so the response cannot be routed
    /// before `outstanding` is recorded.
    fn issue(&self, state: &mut WorkflowSnapshot, step: usize) {
        let Some(StageKind::Chain { steps, .. }) = self.stages.get(state.stage).map(|s| &s.kind)
        else {
            return;
        };
        let Some(chain_step) = steps.get(step) else {
            return;
        };

        state.progress.log.push_str(&(chain_step.describe)(&state.inputs));
        let waiter: Weak<dyn ResponseWaiter> = self.me.clone();
        let id = self
            .correlator
            .send((chain_step.command)(&state.inputs), waiter);

        state.outstanding = Some(id);
        state.status = WorkflowStatus::Pending;
        state.actions = Actions::NONE;
        debug!(workflow = self.name, %id, step, "chain step issued");
    }

    fn complete_chain(&self, state: &mut WorkflowSnapshot, success: &str) {
        state.progress.log.push_str(success);
        state.status = WorkflowStatus::Finished;
        state.actions = Actions::only(Action::Finish);
        info!(workflow = self.name, "chain complete");
    }
}

impl ResponseWaiter for Workflow {
    fn on_response(&self, response: Response) {
        let mut state = self.state.lock();
        if state.outstanding != Some(response.request_id) {
            debug!(
                workflow = self.name,
                id = %response.request_id,
                "ignoring response for a request no longer outstanding"
            );
            return;
        }
        state.outstanding = None;

        let Some(StageKind::Chain { steps, success }) =
            self.stages.get(state.stage).map(|s| &s.kind)
        else {
            return;
        };
        let Some(step) = steps.get(state.progress.current) else {
            return;
        };

        if response.is_success() {
            state.progress.log.push_str("DONE.\n");
            state.progress.current += 1;
            let next = state.progress.current;
            if next < steps.len() {
                self.issue(&mut state, next);
            } else {
                self.complete_chain(&mut state, success);
            }
        } else {
            let _ = write!(
                state.progress.log,
                "ERROR.\n\nUnable to {} (code: {})\n{}",
                step.failure, response.code, response.message
            );
            state.progress.current = state.progress.total;
            state.progress.show_details = true;
            state.status = WorkflowStatus::Active;
            state.actions = Actions::only(Action::Previous);
            state.error = Some(response.message.clone());
            warn!(
                workflow = self.name,
                code = %response.code,
                message = %response.message,
                "unable to {}", step.failure
            );
        }

        self.publish(&state);
    }
}

impl Drop for Workflow {
    fn drop(&mut self) {
        if let Some(id) = self.state.get_mut().outstanding {
            self.correlator.forget(id);
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
