// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish/subscribe dispatcher for typed messages.
//!
//! Every subscriber owns an unbounded queue, so `publish()` only enqueues
//! and never waits on a subscriber. Fan-out happens under one lock, which
//! gives each subscriber the messages in publish order. Handlers run on
//! their own tasks, off the publisher's context.
//!
//! One bus is shared per process. It is initialized once with [`init`],
//! handed to components explicitly, and can be [`reset`] by tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

use crate::message::{Message, MessageKind};

/// Bus errors
#[derive(Debug, Error)]
pub enum BusError {
    #[error("message bus already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A component that handles a fixed set of message kinds.
///
/// Registered handlers are driven from a dedicated task; `handle` is
/// awaited once per message, in publish order.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    fn interests(&self) -> &[MessageKind];

    async fn handle(&self, message: Message);
}

struct Subscriber {
    id: SubscriptionId,
    interests: Vec<MessageKind>,
    tx: mpsc::UnboundedSender<Message>,
    /// Address of the registered handler, for idempotent registration
    handler: Option<usize>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl BusInner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }
}

/// Cloneable handle to a message bus.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` to every subscriber interested in its kind.
    ///
    /// Returns the number of subscribers it was queued for. Subscribers
    /// whose receiving end is gone are pruned here.
    pub fn publish(&self, message: Message) -> usize {
        let kind = message.kind();
        let mut delivered = 0;
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|s| {
            if !s.interests.contains(&kind) {
                return true;
            }
            match s.tx.send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        trace!(?kind, delivered, "published");
        delivered
    }

    /// Subscribe to `kinds`, receiving matching messages on the returned
    /// queue. Dropping the subscription unsubscribes.
    pub fn subscribe(&self, kinds: &[MessageKind]) -> Subscription {
        let (subscriber, rx) = self.new_subscriber(kinds, None);
        let id = subscriber.id;
        self.inner.subscribers.lock().push(subscriber);
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Register a handler, driving it from a spawned task.
    ///
    /// Registering the same handler again returns the existing id.
    /// Must be called from within a tokio runtime.
    pub fn register(&self, handler: Arc<dyn Handler>) -> SubscriptionId {
        let key = Arc::as_ptr(&handler) as *const () as usize;
        let (id, mut rx) = {
            let mut subscribers = self.inner.subscribers.lock();
            if let Some(existing) = subscribers.iter().find(|s| s.handler == Some(key)) {
                return existing.id;
            }
            let (subscriber, rx) = self.new_subscriber(handler.interests(), Some(key));
            let id = subscriber.id;
            subscribers.push(subscriber);
            (id, rx)
        };
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                handler.handle(message).await;
            }
            trace!(%id, "handler detached");
        });
        id
    }

    /// Remove a subscription or handler. Returns false if it was already
    /// gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Drop every subscriber. Their queues drain and then close.
    pub fn clear(&self) {
        self.inner.subscribers.lock().clear();
    }

    fn new_subscriber(
        &self,
        kinds: &[MessageKind],
        handler: Option<usize>,
    ) -> (Subscriber, mpsc::UnboundedReceiver<Message>) {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            id,
            interests: kinds.to_vec(),
            tx,
            handler,
        };
        (subscriber, rx)
    }
}

/// Receiving end of [`MessageBus::subscribe`].
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<Message>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next message. Returns `None` once unsubscribed (after
    /// already-queued messages have been drained).
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

static GLOBAL: Mutex<Option<MessageBus>> = parking_lot::const_mutex(None);

/// Initialize the process-wide bus. Fails if already initialized.
pub fn init() -> Result<MessageBus, BusError> {
    let mut global = GLOBAL.lock();
    if global.is_some() {
        return Err(BusError::AlreadyInitialized);
    }
    let bus = MessageBus::new();
    *global = Some(bus.clone());
    Ok(bus)
}

/// The process-wide bus, if initialized.
pub fn global() -> Option<MessageBus> {
    GLOBAL.lock().clone()
}

/// Tear down the process-wide bus so it can be initialized again.
pub fn reset() {
    if let Some(bus) = GLOBAL.lock().take() {
        bus.clear();
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
