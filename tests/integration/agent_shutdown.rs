use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use storage_agent::collectors::Collector;
use storage_agent::{Agent, AgentBus};

use crate::helpers::{test_config, wait_until, within};

/// A collector whose pass never completes
#[derive(Default)]
struct Hang {
    entered: AtomicBool,
}

#[async_trait]
impl Collector for Hang {
    async fn collect(&self, _bus: &AgentBus) -> anyhow::Result<()> {
        self.entered.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_shutdown_stops_hung_collector() {
    let hang = Arc::new(Hang::default());
    let agent = Agent::builder(test_config())
        .without_system_collector()
        .collector("hang", hang.clone())
        .start()
        .await
        .unwrap();

    wait_until(Duration::from_secs(2), || hang.entered.load(Ordering::SeqCst)).await;

    // bounded by the two second grace period of the test config
    tokio::time::timeout(Duration::from_secs(4), agent.shutdown())
        .await
        .expect("shutdown exceeded its grace period");

    // no task still holds the collector
    wait_until(Duration::from_secs(3), || Arc::strong_count(&hang) == 1).await;
}

#[tokio::test]
async fn test_shutdown_waits_for_collectors_and_loops() {
    let agent = Agent::builder(test_config())
        .without_system_collector()
        .start()
        .await
        .unwrap();

    let bus = agent.bus().clone();
    assert!(bus.topic_count() > 0);

    within(agent.shutdown()).await;

    // both bus consumers detached before shutdown returned
    assert_eq!(bus.topic_count(), 0);
}
