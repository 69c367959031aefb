// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request correlation.
//!
//! The correlator stamps each outgoing request with a fresh identifier,
//! remembers who is waiting for it, and routes exactly one response back.
//! Waiters are held weakly: a waiter torn down while its request is
//! outstanding simply never hears about the response.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::bus::{Handler, MessageBus, SubscriptionId};
use crate::id::RequestId;
use crate::message::{Command, CommandKind, Message, MessageKind, Request, Response, StatusCode};

/// Receives the response to a request issued through a [`Correlator`].
///
/// Called from the correlator's dispatch task; implementations that touch
/// single-threaded presentation state must marshal the work themselves.
pub trait ResponseWaiter: Send + Sync {
    fn on_response(&self, response: Response);
}

struct Waiting {
    kind: CommandKind,
    waiter: Weak<dyn ResponseWaiter>,
}

struct CorrelatorInner {
    bus: MessageBus,
    waiting: Mutex<HashMap<RequestId, Waiting>>,
    /// Response router registered by [`Correlator::attach`]
    router: Mutex<Option<SubscriptionId>>,
}

impl Drop for CorrelatorInner {
    fn drop(&mut self) {
        if let Some(id) = self.router.get_mut().take() {
            self.bus.unsubscribe(id);
        }
    }
}

#[derive(Clone)]
pub struct Correlator {
    inner: Arc<CorrelatorInner>,
}

impl Correlator {
    /// Create a correlator that is not yet listening for responses.
    ///
    /// Responses must be fed in through [`Correlator::on_response`].
    pub fn new(bus: MessageBus) -> Self {
        Self {
            inner: Arc::new(CorrelatorInner {
                bus,
                waiting: Mutex::new(HashMap::new()),
                router: Mutex::new(None),
            }),
        }
    }

    /// Create a correlator and register it on the bus for all response
    /// kinds. The registration is removed when the last clone is dropped.
    /// Must be called from within a tokio runtime.
    pub fn attach(bus: &MessageBus) -> Self {
        let correlator = Self::new(bus.clone());
        let router = bus.register(Arc::new(ResponseRouter {
            inner: Arc::downgrade(&correlator.inner),
        }));
        *correlator.inner.router.lock() = Some(router);
        correlator
    }

    pub fn bus(&self) -> &MessageBus {
        &self.inner.bus
    }

    /// Issue `command` on behalf of `waiter`, returning its identifier.
    ///
    /// The waiting entry is recorded before the request is published so a
    /// fast response cannot overtake it.
    pub fn send(&self, command: Command, waiter: Weak<dyn ResponseWaiter>) -> RequestId {
        let request = Request::new(command);
        let id = request.id;
        self.inner.waiting.lock().insert(
            id,
            Waiting {
                kind: request.command.kind(),
                waiter,
            },
        );
        debug!(%id, command = ?request.command, "sending request");
        if self.inner.bus.publish(Message::Request(request)) == 0 {
            warn!(%id, "no transport attached, request will not be answered");
        }
        id
    }

    /// Route a response to its waiter.
    ///
    /// Returns true if a live waiter received it. Unknown, already
    /// consumed, and orphaned identifiers are dropped.
    pub fn on_response(&self, response: Response) -> bool {
        let id = response.request_id;
        let Some(entry) = self.inner.waiting.lock().remove(&id) else {
            debug!(%id, code = %response.code, "discarding unmatched response");
            return false;
        };
        match entry.waiter.upgrade() {
            Some(waiter) => {
                waiter.on_response(response);
                true
            }
            None => {
                debug!(%id, "waiter gone, discarding response");
                false
            }
        }
    }

    /// Stop waiting for `id`. Returns false if it was not outstanding.
    pub fn forget(&self, id: RequestId) -> bool {
        self.inner.waiting.lock().remove(&id).is_some()
    }

    pub fn is_outstanding(&self, id: RequestId) -> bool {
        self.inner.waiting.lock().contains_key(&id)
    }

    pub fn outstanding(&self) -> usize {
        self.inner.waiting.lock().len()
    }

    /// Answer every outstanding request with a synthetic error response.
    ///
    /// Used when the transport goes away so no waiter is left pending.
    pub fn fail_outstanding(&self, code: StatusCode, message: &str) -> usize {
        let drained: Vec<(RequestId, Waiting)> = self.inner.waiting.lock().drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            if let Some(waiter) = entry.waiter.upgrade() {
                waiter.on_response(Response::error_for(id, entry.kind, code, message));
            }
        }
        count
    }

    /// Issue `command` and wait for its response.
    ///
    /// There is no timeout here; callers that need one wrap the future.
    /// Dropping the future stops waiting for the response.
    pub async fn call(&self, command: Command) -> Response {
        let kind = command.kind();
        let (tx, rx) = oneshot::channel();
        let waiter: Arc<dyn ResponseWaiter> = Arc::new(OneshotWaiter {
            tx: Mutex::new(Some(tx)),
        });
        let id = self.send(command, Arc::downgrade(&waiter));
        let _guard = ForgetOnDrop {
            correlator: self,
            id,
        };

        match rx.await {
            Ok(response) => response,
            Err(_) => Response::error_for(id, kind, StatusCode::UNAVAILABLE, "response dropped"),
        }
    }
}

/// Bus handler forwarding responses into the correlator.
///
/// Holds the correlator weakly so the bus does not keep it alive.
struct ResponseRouter {
    inner: Weak<CorrelatorInner>,
}

#[async_trait]
impl Handler for ResponseRouter {
    fn interests(&self) -> &[MessageKind] {
        MessageKind::RESPONSES
    }

    async fn handle(&self, message: Message) {
        let Message::Response(response) = message else {
            return;
        };
        if let Some(inner) = self.inner.upgrade() {
            Correlator { inner }.on_response(response);
        }
    }
}

struct OneshotWaiter {
    tx: Mutex<Option<oneshot::Sender<Response>>>,
}

impl ResponseWaiter for OneshotWaiter {
    fn on_response(&self, response: Response) {
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(response);
        }
    }
}

struct ForgetOnDrop<'a> {
    correlator: &'a Correlator,
    id: RequestId,
}

impl Drop for ForgetOnDrop<'_> {
    fn drop(&mut self) {
        self.correlator.forget(self.id);
    }
}

#[cfg(test)]
#[path = "correlator_tests.rs"]
mod tests;
