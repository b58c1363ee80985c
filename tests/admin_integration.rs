//! Admin gateway integration tests
//!
//! Drive the configuration resource end to end with a scripted runtime and a
//! store that can be told to fail, checking status codes and error bodies.

mod common;

use a3s_cep::{AdminGateway, ConfigurationEngine, EngineConfig, ADMIN_CONFIG_PATH};
use common::{basic_conf, FlakyStore, ScriptedRuntime};
use std::sync::Arc;

struct Harness {
    gateway: AdminGateway,
    runtime: Arc<ScriptedRuntime>,
    store: Arc<FlakyStore>,
}

fn harness() -> Harness {
    let runtime = Arc::new(ScriptedRuntime::default());
    let store = Arc::new(FlakyStore::default());
    let engine = ConfigurationEngine::new(runtime.clone(), store.clone(), EngineConfig::default());
    Harness {
        gateway: AdminGateway::new(Arc::new(engine)),
        runtime,
        store,
    }
}

fn json(conf: &a3s_cep::Configuration) -> Vec<u8> {
    serde_json::to_vec(conf).unwrap()
}

#[tokio::test]
async fn test_configuration_not_found() {
    let h = harness();
    let response = h.gateway.handle("GET", ADMIN_CONFIG_PATH, b"").await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_post_configuration_created() {
    let h = harness();
    let response = h
        .gateway
        .handle("POST", ADMIN_CONFIG_PATH, &json(&basic_conf()))
        .await;
    assert_eq!(response.status, 201);

    let active = h.gateway.engine().get_configuration().unwrap();
    assert_eq!(active.event_type_ins.len(), 1);
    assert_eq!(active.event_type_ins[0].id(), "S.*");
    assert_eq!(active.event_type_outs.len(), 1);
    assert_eq!(active.event_type_outs[0].id(), "OUT1");
    assert_eq!(h.runtime.compiled(), vec!["select * from S.*"]);

    // The same document reached the store
    assert_eq!(h.store.saved(), vec![(*active).clone()]);
}

#[tokio::test]
async fn test_get_configuration() {
    let h = harness();
    let conf = basic_conf();
    h.gateway.submit(conf.clone()).await;

    let response = h.gateway.handle("GET", ADMIN_CONFIG_PATH, b"").await;
    assert_eq!(response.status, 200);
    let body = response.body.unwrap();
    assert_eq!(body["in"][0]["id"], conf.event_type_ins[0].id());
    assert_eq!(body["out"][0]["id"], conf.event_type_outs[0].id());
    assert_eq!(body["statements"][0], conf.statements[0].as_str());

    // Round-trip: the served document decodes to what was submitted
    let served: a3s_cep::Configuration = serde_json::from_value(body).unwrap();
    assert_eq!(served, conf);
}

#[tokio::test]
async fn test_configuration_error_handling() {
    let h = harness();
    h.runtime.reject_with("ERROR", "DETAIL ERROR");

    let response = h
        .gateway
        .handle("POST", ADMIN_CONFIG_PATH, &json(&basic_conf()))
        .await;
    assert_eq!(response.status, 400);

    let body = response.body.unwrap();
    assert_eq!(body["code"], "400");
    assert_eq!(body["reasonPhrase"], "ERROR");
    assert_eq!(body["detail"], "DETAIL ERROR");

    // Rejection is a no-op on observable state
    assert!(h.gateway.engine().get_configuration().is_none());
    assert!(h.store.saved().is_empty());
    assert_eq!(h.gateway.get_configuration().status, 404);
}

#[tokio::test]
async fn test_persistence_error_handling() {
    let h = harness();
    h.store.fail_next(1);

    let response = h
        .gateway
        .handle("POST", ADMIN_CONFIG_PATH, &json(&basic_conf()))
        .await;
    assert_eq!(response.status, 500);

    let body = response.error_body().unwrap();
    assert_eq!(body.code, "500");
    assert_eq!(body.reason_phrase, "ERROR");

    // The configuration is running even though it was not saved
    let response = h.gateway.get_configuration();
    assert_eq!(response.status, 200);
    assert_eq!(response.body.unwrap()["out"][0]["id"], "OUT1");
}

#[tokio::test]
async fn test_rejection_after_success_keeps_previous() {
    let h = harness();
    h.gateway.submit(basic_conf()).await;

    h.runtime.reject_with("ERROR", "DETAIL ERROR");
    let changed = basic_conf().with_statement("select count(*) from S.*");
    let response = h.gateway.submit(changed).await;
    assert_eq!(response.status, 400);

    h.runtime.accept_all();
    let response = h.gateway.get_configuration();
    let body = response.body.unwrap();
    assert_eq!(body["statements"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_event_type_rejected_by_memory_runtime() {
    let h = harness();
    let body = br#"{"in":[{"id":"S.*"}],"out":[{"id":"OUT1"}],"statements":["select * from T"]}"#;

    let response = h.gateway.handle("POST", ADMIN_CONFIG_PATH, body).await;
    assert_eq!(response.status, 400);
    let error = response.error_body().unwrap();
    assert_eq!(error.reason_phrase, "Unknown event type");
    assert!(error.detail.unwrap().contains("'T'"));
}

#[tokio::test]
async fn test_duplicate_ids_rejected() {
    let h = harness();
    let body = br#"{"in":[{"id":"A"},{"id":"A"}],"out":[],"statements":[]}"#;

    let response = h.gateway.post_configuration(body).await;
    assert_eq!(response.status, 400);
    let error = response.error_body().unwrap();
    assert_eq!(error.reason_phrase, "Duplicate event type id");
    assert!(h.runtime.compiled().is_empty());
}

#[tokio::test]
async fn test_blank_provider_url_rejected() {
    let h = harness();
    let body = br#"{"in":[{"id":"A","providers":[{"url":""}]}],"out":[],"statements":[]}"#;

    let response = h.gateway.post_configuration(body).await;
    assert_eq!(response.status, 400);
    let error = response.error_body().unwrap();
    assert_eq!(error.reason_phrase, "Invalid event type");
    assert!(error.detail.unwrap().contains("empty url"));
    assert!(h.store.saved().is_empty());
    assert_eq!(h.gateway.get_configuration().status, 404);
}
