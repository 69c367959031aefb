// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wt add` - add an existing sync folder

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use wt_engine::{add_existing, Action};

use crate::app::Session;
use crate::exit_error::ExitError;

/// Run the add-existing workflow without a UI: Next, pick the folder,
/// Next, wait for the daemon chain, Finish.
pub async fn add(session: &Session, folder: &Path, timeout: Duration) -> Result<()> {
    let workflow = add_existing::start(session.correlator().clone())?;
    workflow.navigate(Action::Next)?;
    workflow.set_folder(folder)?;
    if let Err(e) = workflow.navigate(Action::Next) {
        workflow.abort();
        return Err(ExitError::new(1, e.to_string()).into());
    }

    let snapshot = match tokio::time::timeout(timeout, workflow.settled()).await {
        Ok(snapshot) => snapshot,
        Err(_) => {
            let log = workflow.snapshot().progress.log;
            workflow.abort();
            println!("{log}");
            return Err(ExitError::new(
                1,
                format!("no response from daemon within {:?}", timeout),
            )
            .into());
        }
    };

    println!("{}", snapshot.progress.log);
    if snapshot.actions.contains(Action::Finish) {
        workflow.navigate(Action::Finish)?;
        Ok(())
    } else {
        // The log above already carries the failure
        Err(ExitError::new(1, "").into())
    }
}
