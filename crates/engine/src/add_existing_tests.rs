// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::validation::APP_MARKER;
use crate::workflow::{Action, Actions, WorkflowStatus};
use crate::WorkflowError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use wt_core::{
    CommandKind, Handler, Message, MessageBus, MessageKind, Request, RequestId, Response,
    ResponseWaiter, StatusCode, Subscription,
};

struct Fixture {
    _tmp: TempDir,
    folder: PathBuf,
    correlator: Correlator,
    requests: Subscription,
    workflow: Arc<Workflow>,
}

fn fixture() -> Fixture {
    let tmp = tempdir().unwrap();
    let folder = tmp.path().join("synced");
    std::fs::create_dir_all(folder.join(APP_MARKER)).unwrap();
    let folder = folder.canonicalize().unwrap();

    let bus = MessageBus::new();
    let requests = bus.subscribe(MessageKind::REQUESTS);
    let correlator = Correlator::new(bus);
    let workflow = start(correlator.clone()).unwrap();
    Fixture {
        _tmp: tmp,
        folder,
        correlator,
        requests,
        workflow,
    }
}

fn next_request(requests: &mut Subscription) -> Request {
    match requests.try_recv() {
        Some(Message::Request(request)) => request,
        other => panic!("expected a request, got {other:?}"),
    }
}

/// Walk to the progress stage with a valid folder, returning the
/// AddWatch request that entering it issued.
fn reach_progress(f: &mut Fixture) -> Request {
    f.workflow.navigate(Action::Next).unwrap();
    f.workflow.set_folder(&f.folder).unwrap();
    let snap = f.workflow.navigate(Action::Next).unwrap();
    assert_eq!(snap.stage_name, PROGRESS);
    next_request(&mut f.requests)
}

#[test]
fn stages_are_start_folder_progress() {
    let names: Vec<_> = stages().iter().map(|s| s.name).collect();
    assert_eq!(names, vec![START, FOLDER, PROGRESS]);
}

#[test]
fn folder_stage_offers_previous_and_next() {
    let f = fixture();
    let snap = f.workflow.navigate(Action::Next).unwrap();
    assert_eq!(snap.stage_name, FOLDER);
    assert_eq!(
        snap.actions,
        Actions::only(Action::Previous).with(Action::Next)
    );

    let snap = f.workflow.navigate(Action::Previous).unwrap();
    assert_eq!(snap.stage_name, START);
    assert_eq!(snap.actions, Actions::only(Action::Next));
}

#[test]
fn full_chain_success_finishes() {
    let mut f = fixture();
    let add = reach_progress(&mut f);
    assert_eq!(
        add.command,
        Command::AddWatch {
            path: f.folder.clone()
        }
    );
    assert!(f.workflow.snapshot().actions.is_empty());

    f.correlator.on_response(Response::ok(&add, "added"));
    let reload = next_request(&mut f.requests);
    assert_eq!(
        reload.command,
        Command::Control {
            command: ControlCommand::Reload
        }
    );
    assert!(f.workflow.snapshot().actions.is_empty());

    f.correlator.on_response(Response::ok(&reload, "reloaded"));
    let list = next_request(&mut f.requests);
    assert_eq!(list.command, Command::ListWatches);
    assert_eq!(f.workflow.snapshot().outstanding, Some(list.id));

    f.correlator.on_response(Response::ok(&list, "listed"));

    let snap = f.workflow.snapshot();
    assert_eq!(snap.status, WorkflowStatus::Finished);
    assert_eq!(snap.actions, Actions::only(Action::Finish));
    assert_eq!(snap.progress.current, 3);
    assert_eq!(
        snap.progress.log,
        format!(
            "Adding folder {} ... DONE.\nReloading daemon ... DONE.\nRefreshing watch list ... DONE.\n{}",
            f.folder.display(),
            SUCCESS
        )
    );

    let snap = f.workflow.navigate(Action::Finish).unwrap();
    assert!(snap.actions.is_empty());
}

#[test]
fn reload_failure_stops_before_list() {
    let mut f = fixture();
    let add = reach_progress(&mut f);
    f.correlator.on_response(Response::ok(&add, "added"));
    let reload = next_request(&mut f.requests);

    f.correlator.on_response(Response::error(
        &reload,
        StatusCode::INTERNAL,
        "disk full",
    ));

    assert!(f.requests.try_recv().is_none(), "ListWatches must not be sent");
    let snap = f.workflow.snapshot();
    assert_eq!(snap.actions, Actions::only(Action::Previous));
    assert!(snap.progress.log.contains("disk full"));
    assert!(snap
        .progress
        .log
        .contains("Unable to reload daemon (code: 500)"));
    assert!(matches!(
        f.workflow.navigate(Action::Next),
        Err(WorkflowError::NotAllowed { .. })
    ));

    let snap = f.workflow.navigate(Action::Previous).unwrap();
    assert_eq!(snap.stage_name, FOLDER);
    assert!(snap.actions.contains(Action::Next));
}

#[test]
fn non_ok_success_code_halts_chain() {
    let mut f = fixture();
    let add = reach_progress(&mut f);

    f.correlator.on_response(Response::error(
        &add,
        StatusCode(204),
        "no content",
    ));

    assert!(f.requests.try_recv().is_none(), "Reload must not be sent");
    let snap = f.workflow.snapshot();
    assert_eq!(snap.outstanding, None);
    assert_eq!(snap.status, WorkflowStatus::Active);
    assert_eq!(snap.actions, Actions::only(Action::Previous));
    assert!(snap
        .progress
        .log
        .ends_with("ERROR.\n\nUnable to add folder (code: 204)\nno content"));
}

#[test]
fn add_failure_reports_code_and_message() {
    let mut f = fixture();
    let add = reach_progress(&mut f);

    f.correlator.on_response(Response::error(
        &add,
        StatusCode::CONFLICT,
        "already watched",
    ));

    let snap = f.workflow.snapshot();
    assert!(snap
        .progress
        .log
        .ends_with("ERROR.\n\nUnable to add folder (code: 409)\nalready watched"));
    assert!(f.requests.try_recv().is_none());
}

#[test]
fn unmatched_list_response_is_ignored() {
    let mut f = fixture();
    let add = reach_progress(&mut f);
    f.correlator.on_response(Response::ok(&add, "added"));
    let reload = next_request(&mut f.requests);
    f.correlator.on_response(Response::ok(&reload, "reloaded"));
    let _list = next_request(&mut f.requests);
    let before = f.workflow.snapshot();

    let forged = Response::error_for(
        RequestId::next(),
        CommandKind::ListWatches,
        StatusCode::OK,
        "forged",
    );
    assert!(!f.correlator.on_response(forged.clone()));
    f.workflow.on_response(forged);
    // A repeat of an already consumed response
    assert!(!f.correlator.on_response(Response::ok(&reload, "again")));

    assert_eq!(f.workflow.snapshot(), before);
}

#[test]
fn plain_directory_fails_validation_and_stays() {
    let f = fixture();
    let plain = f.folder.parent().unwrap().to_path_buf();
    f.workflow.navigate(Action::Next).unwrap();
    f.workflow.set_folder(&plain).unwrap();

    let err = f.workflow.navigate(Action::Next).unwrap_err();

    assert!(matches!(err, WorkflowError::Validation(_)));
    let snap = f.workflow.snapshot();
    assert_eq!(snap.stage_name, FOLDER);
    assert!(snap.error.is_some());
    assert!(snap.actions.contains(Action::Next));
    assert_eq!(f.correlator.outstanding(), 0);
}

#[test]
fn missing_folder_selection_fails_validation() {
    let f = fixture();
    f.workflow.navigate(Action::Next).unwrap();

    assert!(matches!(
        f.workflow.navigate(Action::Next),
        Err(WorkflowError::Validation(crate::ValidationError::Empty))
    ));
}

/// Answers every request, failing commands of one kind.
struct FakeDaemon {
    bus: MessageBus,
    fail: Option<CommandKind>,
}

#[async_trait]
impl Handler for FakeDaemon {
    fn interests(&self) -> &[MessageKind] {
        MessageKind::REQUESTS
    }

    async fn handle(&self, message: Message) {
        let Message::Request(request) = message else {
            return;
        };
        let response = if Some(request.command.kind()) == self.fail {
            Response::error(&request, StatusCode::INTERNAL, "disk full")
        } else {
            Response::ok(&request, "ok")
        };
        self.bus.publish(Message::Response(response));
    }
}

async fn run_over_bus(folder: &Path, fail: Option<CommandKind>) -> crate::WorkflowSnapshot {
    let bus = MessageBus::new();
    bus.register(Arc::new(FakeDaemon {
        bus: bus.clone(),
        fail,
    }));
    let correlator = Correlator::attach(&bus);
    let workflow = start(correlator).unwrap();

    workflow.navigate(Action::Next).unwrap();
    workflow.set_folder(folder).unwrap();
    workflow.navigate(Action::Next).unwrap();

    tokio::time::timeout(Duration::from_secs(5), workflow.settled())
        .await
        .unwrap()
}

#[tokio::test]
async fn chain_runs_over_bus() {
    let tmp = tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join(APP_MARKER)).unwrap();

    let snap = run_over_bus(tmp.path(), None).await;

    assert_eq!(snap.status, WorkflowStatus::Finished);
    assert!(snap.progress.log.ends_with(SUCCESS));
}

#[tokio::test]
async fn chain_over_bus_stops_at_failing_step() {
    let tmp = tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join(APP_MARKER)).unwrap();

    let snap = run_over_bus(tmp.path(), Some(CommandKind::Control)).await;

    assert_eq!(snap.status, WorkflowStatus::Active);
    assert_eq!(snap.actions, Actions::only(Action::Previous));
    assert!(!snap.progress.log.contains("Refreshing watch list"));
}
