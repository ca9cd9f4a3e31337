//! Event distribution and caching core of a storage server monitoring agent
//!
//! Collectors publish snapshots on a topic-routed [`bus`]. Two consumers drain it: the cache
//! subscriber keeps the latest value of every kind in the [`cache`], and the broadcast loop
//! feeds the WebSocket [`hub`], which fans events out to connected clients according to their
//! topic filters. REST handlers only ever read the cache.

pub mod api;
pub mod bindings;
pub mod bus;
pub mod cache;
pub mod collectors;
pub mod config;
pub mod events;
pub mod hub;
pub mod models;
pub mod runtime;
pub mod subscriptions;
pub mod util;

pub use bus::{EventBus, Mailbox, Topic};
pub use cache::CacheStore;
pub use events::{AgentBus, Payload, PayloadKind, topics};
pub use hub::{WsEvent, WsHub};
pub use runtime::{Agent, AgentBuilder};
