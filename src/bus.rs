//! Publish/subscribe event bus
//!
//! The bus routes published values to per-subscriber mailboxes by topic name.
//!
//! ## Delivery Model
//!
//! ```text
//! publish(topic, msg) ──► registry[topic] ──► try_send ──► Mailbox A (bounded)
//!                                         ├─► try_send ──► Mailbox B (bounded)
//!                                         └─► try_send ──► Mailbox C (full → dropped)
//! ```
//!
//! - **Best effort**: delivery never blocks. A full mailbox loses the newest message,
//!   every other mailbox still receives it.
//! - **FIFO per mailbox**: messages that are not dropped arrive in publish order.
//! - **Multi-topic mailboxes**: one mailbox may be registered under many topics and many
//!   mailboxes may share a topic.
//!
//! ## Mailbox Lifetime
//!
//! The registry owns one sender per (topic, mailbox) pair and nothing else holds a sender.
//! Once a mailbox is removed from its last topic the queue closes, and `recv` returns
//! `None` after the already queued messages are drained. A mailbox dropped without
//! unsubscribing is pruned by the first publish that finds its receiver gone.
//!
//! ## Typed Topics
//!
//! [`Topic<T>`] binds a topic name to the type published on it. `publish_typed` only accepts a
//! `T` for a `Topic<T>`, so mismatched payloads are a compile error, while the transport
//! itself carries whatever message type `M` the bus was built for.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc::{
    self,
    error::{TryRecvError, TrySendError},
};
use tracing::{debug, trace};

/// Identifier of a mailbox, unique per bus
pub type MailboxId = u64;

/// A mailbox registered under one topic
struct Registration<M> {
    mailbox: MailboxId,
    sender: mpsc::Sender<M>,
}

/// Topic-routed publish/subscribe bus over bounded mailboxes
///
/// Registry mutation (subscribe/unsubscribe) takes the write lock. `publish` only takes the
/// read lock, so concurrent publishers proceed in parallel.
pub struct EventBus<M> {
    /// topic name → mailboxes registered under it
    subs: RwLock<HashMap<String, Vec<Registration<M>>>>,

    /// Capacity of every mailbox created by this bus
    buffer_size: usize,

    next_id: AtomicU64,
}

impl<M> EventBus<M>
where
    M: Clone + Send + 'static,
{
    /// Create a bus whose mailboxes hold `buffer_size` messages each (minimum 1)
    pub fn new(buffer_size: usize) -> Self {
        Self {
            subs: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    /// Capacity of each mailbox
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Create a mailbox registered under every topic in `topics`
    ///
    /// Subscribing to no topic at all yields a mailbox that is already closed.
    pub fn subscribe(&self, topics: &[&str]) -> Mailbox<M> {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut subs = self.subs.write();
            for topic in topics {
                let registrations = subs.entry((*topic).to_string()).or_default();
                if registrations.iter().all(|r| r.mailbox != id) {
                    registrations.push(Registration {
                        mailbox: id,
                        sender: tx.clone(),
                    });
                }
            }
        }

        debug!(mailbox = id, ?topics, "mailbox subscribed");

        Mailbox { id, rx }
    }

    /// Deliver `msg` to every mailbox currently subscribed to `topic`
    ///
    /// Never blocks. Returns the number of mailboxes the message was queued into.
    pub fn publish(&self, topic: &str, msg: M) -> usize {
        let subs = self.subs.read();

        let Some(registrations) = subs.get(topic) else {
            trace!(topic, "no subscribers for topic");
            return 0;
        };

        let mut delivered = 0;
        let mut stale = false;
        for registration in registrations {
            match registration.sender.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(
                        topic,
                        mailbox = registration.mailbox,
                        "mailbox full, dropping message"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(
                        topic,
                        mailbox = registration.mailbox,
                        "mailbox receiver dropped, pruning"
                    );
                    stale = true;
                }
            }
        }
        drop(subs);

        if stale {
            self.prune_closed();
        }

        trace!(topic, delivered, "published message");
        delivered
    }

    /// Drop registrations whose mailbox was dropped without unsubscribing
    fn prune_closed(&self) {
        let mut subs = self.subs.write();
        for registrations in subs.values_mut() {
            registrations.retain(|r| !r.sender.is_closed());
        }
        subs.retain(|_, registrations| !registrations.is_empty());
    }

    /// Publish a value on a typed topic
    ///
    /// The value type is fixed by the topic, so publishing the wrong payload does not compile.
    pub fn publish_typed<T>(&self, topic: Topic<T>, value: T) -> usize
    where
        T: Into<M>,
    {
        self.publish(topic.name(), value.into())
    }

    /// Remove `mailbox` from `topics`, or from every topic if `topics` is empty
    ///
    /// The mailbox closes as soon as it is registered under no topic.
    pub fn unsubscribe(&self, mailbox: &Mailbox<M>, topics: &[&str]) {
        let mut subs = self.subs.write();

        if topics.is_empty() {
            for registrations in subs.values_mut() {
                registrations.retain(|r| r.mailbox != mailbox.id);
            }
        } else {
            for topic in topics {
                if let Some(registrations) = subs.get_mut(*topic) {
                    registrations.retain(|r| r.mailbox != mailbox.id);
                }
            }
        }

        subs.retain(|_, registrations| !registrations.is_empty());

        debug!(mailbox = mailbox.id, ?topics, "mailbox unsubscribed");
    }

    /// Number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.subs.read().len()
    }

    /// Number of mailboxes subscribed to `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subs.read().get(topic).map_or(0, Vec::len)
    }
}

impl<M> fmt::Debug for EventBus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.subs.read().len())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

/// Receiving end of a subscription
///
/// Returned by [`EventBus::subscribe`]; pass it back to [`EventBus::unsubscribe`] to
/// detach it from topics.
pub struct Mailbox<M> {
    id: MailboxId,
    rx: mpsc::Receiver<M>,
}

impl<M> Mailbox<M> {
    pub fn id(&self) -> MailboxId {
        self.id
    }

    /// Wait for the next message
    ///
    /// Returns `None` once the mailbox is closed and drained.
    pub async fn recv(&mut self) -> Option<M> {
        self.rx.recv().await
    }

    /// Take the next queued message without waiting
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.rx.try_recv()
    }

    /// Whether the mailbox is no longer registered under any topic
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl<M> fmt::Debug for Mailbox<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("id", &self.id).finish()
    }
}

/// A topic name tagged with the type of value published on it
///
/// Identity is the name alone; the type parameter only exists at compile time.
pub struct Topic<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Topic<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Topic<T> {}

impl<T> PartialEq for Topic<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Topic<T> {}

impl<T> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Topic").field(&self.name).finish()
    }
}

impl<T> fmt::Display for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
