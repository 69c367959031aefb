// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Front-end session: one bus, one correlator, one resolved transport.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use wt_core::{
    Command, Correlator, Message, MessageBus, MessageKind, Response, StatusCode, Subscription,
};
use wt_daemon::lifecycle::Config;

use crate::daemon_process::{DaemonLauncher, DaemonProcess};
use crate::transport::{RemoteTransport, Transport, TransportMode};

pub struct Session {
    bus: MessageBus,
    correlator: Correlator,
    process: Option<Arc<DaemonProcess>>,
    transport: Transport,
    exit: Subscription,
}

impl Session {
    /// Resolve the daemon lifecycle once and attach to it, launching an
    /// embedded daemon if none is alive.
    pub async fn open(bus: MessageBus, config: Config, launcher: Arc<dyn DaemonLauncher>) -> Self {
        let process = Arc::new(DaemonProcess::new(config, bus.clone(), launcher));
        Self::open_with(bus, process).await
    }

    /// Like [`Session::open`], with a lifecycle manager built by the caller.
    pub async fn open_with(bus: MessageBus, process: Arc<DaemonProcess>) -> Self {
        let exit = bus.subscribe(&[MessageKind::ExitRequested]);
        let correlator = Correlator::attach(&bus);
        let transport = Transport::resolve(&process, &bus).await;
        info!(mode = %transport.mode(), state = %process.state(), "session open");
        Self {
            bus,
            correlator,
            process: Some(process),
            transport,
            exit,
        }
    }

    /// Attach to a daemon owned by another process without ever
    /// starting one.
    pub async fn attach(bus: MessageBus, config: &Config) -> Self {
        let exit = bus.subscribe(&[MessageKind::ExitRequested]);
        let correlator = Correlator::attach(&bus);
        let transport =
            Transport::Remote(RemoteTransport::connect(&bus, &config.socket_path).await);
        Self {
            bus,
            correlator,
            process: None,
            transport,
            exit,
        }
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn mode(&self) -> TransportMode {
        self.transport.mode()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Lifecycle manager, absent for sessions that never start a daemon.
    pub fn process(&self) -> Option<&Arc<DaemonProcess>> {
        self.process.as_ref()
    }

    /// Send one command and wait at most `timeout` for its response.
    pub async fn call(&self, command: Command, timeout: Duration) -> Response {
        let kind = command.kind();
        match tokio::time::timeout(timeout, self.correlator.call(command)).await {
            Ok(response) => response,
            Err(_) => Response::error_for(
                wt_core::RequestId::next(),
                kind,
                StatusCode::UNAVAILABLE,
                format!("no response from daemon within {:?}", timeout),
            ),
        }
    }

    /// Ask the session to end; see [`Session::wait_for_exit`].
    pub fn request_exit(&self) {
        self.bus.publish(Message::ExitRequested);
    }

    /// Wait until some component publishes `ExitRequested`.
    pub async fn wait_for_exit(&mut self) {
        while let Some(message) = self.exit.recv().await {
            if matches!(message, Message::ExitRequested) {
                info!("exit requested");
                return;
            }
        }
    }

    /// Release hook: fail what is still waiting, stop an owned daemon
    /// and wait up to `timeout` for it.
    pub async fn close(self, timeout: Duration) {
        let failed = self
            .correlator
            .fail_outstanding(StatusCode::UNAVAILABLE, "front end exiting");
        if failed > 0 {
            info!(failed, "failed outstanding requests on exit");
        }

        if let Some(process) = &self.process {
            process.stop();
        }
        self.transport.detach();
        if let Some(process) = &self.process {
            process.shutdown(timeout).await;
            info!(state = %process.state(), "session closed");
        }
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
