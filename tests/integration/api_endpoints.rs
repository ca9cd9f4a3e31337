use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use storage_agent::api::{self, ApiState, HealthResponse};
use storage_agent::bindings::CacheDispatch;
use storage_agent::collectors::{Collector, CollectorManager};
use storage_agent::hub::HubConfig;
use storage_agent::{AgentBus, CacheStore, Payload, WsHub, topics};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::helpers::{array_status, disks, system_info};

struct Idle;

#[async_trait]
impl Collector for Idle {
    async fn collect(&self, _bus: &AgentBus) -> anyhow::Result<()> {
        Ok(())
    }
}

struct TestApi {
    router: Router,
    cache: Arc<CacheStore>,
    bus: Arc<AgentBus>,
    cancel: CancellationToken,
}

impl Drop for TestApi {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn test_api() -> TestApi {
    let cancel = CancellationToken::new();
    let bus = Arc::new(AgentBus::new(16));
    let cache = Arc::new(CacheStore::new());
    let (hub, _task) = WsHub::spawn(HubConfig::default(), cancel.child_token());

    let manager = Arc::new(CollectorManager::new(bus.clone(), cancel.child_token()));
    manager.register("system", Arc::new(Idle), 5, true);
    manager.register("docker", Arc::new(Idle), 10, false);
    manager.register("gpu", Arc::new(Idle), 0, false);
    manager.start_all();

    let state = ApiState::new(cache.clone(), hub, manager, bus.clone());

    TestApi {
        router: api::router(state, false),
        cache,
        bus,
        cancel,
    }
}

async fn call(api: &TestApi, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = api
        .router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get(api: &TestApi, uri: &str) -> (StatusCode, Value) {
    call(api, Method::GET, uri, None).await
}

#[tokio::test]
async fn test_health_reports_cache_and_hub() {
    let api = test_api();
    CacheDispatch::default().apply(&api.cache, Payload::from(system_info("tower")));

    let (status, body) = get(&api, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.cached, vec!["system".to_string()]);
    assert_eq!(health.bus.buffer_size, 16);
    assert_eq!(health.websocket.clients, 0);
    assert!(health.websocket.accepting);
}

#[tokio::test]
async fn test_empty_cache_serves_empty_values() {
    let api = test_api();

    let (status, body) = get(&api, "/api/v1/disks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = get(&api, "/api/v1/array").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "");

    let (status, body) = get(&api, "/api/v1/array/parity-history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], json!([]));

    for uri in ["/api/v1/zfs/pools", "/api/v1/docker", "/api/v1/vm", "/api/v1/gpu"] {
        let (status, body) = get(&api, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!([]), "{uri}");
    }
}

#[tokio::test]
async fn test_cached_values_are_served() {
    let api = test_api();
    let dispatch = CacheDispatch::default();
    dispatch.apply(&api.cache, Payload::from(array_status("STARTED")));
    dispatch.apply(&api.cache, Payload::from(disks(&["parity", "disk1"])));

    let (_, body) = get(&api, "/api/v1/array").await;
    assert_eq!(body["state"], "STARTED");
    assert_eq!(body["num_disks"], 6);

    let (_, body) = get(&api, "/api/v1/disks").await;
    assert_eq!(body[0]["name"], "parity");
    assert_eq!(body[1]["name"], "disk1");
}

#[tokio::test]
async fn test_collector_status_listing() {
    let api = test_api();

    let (status, body) = get(&api, "/api/v1/collectors/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["enabled_count"], 2);
    assert_eq!(body["disabled_count"], 1);

    let names: Vec<&str> = body["collectors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["system", "docker", "gpu"]);

    let (status, body) = get(&api, "/api/v1/collectors/gpu").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disabled");
    assert_eq!(body["enabled"], false);
}

#[tokio::test]
async fn test_enable_and_disable_collector() {
    let api = test_api();
    let mut changes = api.bus.subscribe(&[topics::COLLECTOR_STATE_CHANGE.name()]);

    let (status, body) = call(&api, Method::POST, "/api/v1/collectors/gpu/enable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["collector"]["status"], "running");
    assert_eq!(body["collector"]["interval_seconds"], 10);

    let Ok(Payload::CollectorState(event)) = changes.try_recv() else {
        panic!("expected a collector state change");
    };
    assert_eq!(event.collector, "gpu");
    assert!(event.enabled);

    let (status, body) = call(&api, Method::POST, "/api/v1/collectors/gpu/disable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collector"]["status"], "stopped");
    assert_eq!(body["collector"]["enabled"], false);
}

#[tokio::test]
async fn test_collector_errors_map_to_status_codes() {
    let api = test_api();

    let (status, body) = call(&api, Method::POST, "/api/v1/collectors/nope/enable", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = call(&api, Method::POST, "/api/v1/collectors/system/disable", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &api,
        Method::PATCH,
        "/api/v1/collectors/docker/interval",
        Some(json!({ "interval": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&api, "/api/v1/collectors/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_interval() {
    let api = test_api();

    let (status, body) = call(
        &api,
        Method::PATCH,
        "/api/v1/collectors/docker/interval",
        Some(json!({ "interval": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collector"]["interval_seconds"], 120);
    assert_eq!(body["collector"]["status"], "running");
}
