//! JSON REST API for Rounds.
//!
//! Exposes an axum [`Router`] backed by an [`Engine`] over any
//! [`DeliveryStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility; the acting agent is carried in request bodies.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rounds_api::api_router(engine.clone()))
//! ```

pub mod coverage;
pub mod error;
pub mod extract;
pub mod generation;
pub mod obligations;
pub mod subscriptions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rounds_core::{Engine, notify::NotificationSink, store::DeliveryStore};

pub use error::ApiError;
pub use extract::ApiJson;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(engine: Arc<Engine<S, N>>) -> Router<()>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  Router::new()
    // Generation
    .route("/generate", post(generation::generate::<S, N>))
    .route("/obligations/assign", post(generation::assign::<S, N>))
    // Coverage
    .route("/coverage/resolve", get(coverage::resolve::<S, N>))
    .route(
      "/areas",
      get(coverage::list_areas::<S, N>).post(coverage::create_area::<S, N>),
    )
    .route("/areas/{id}", get(coverage::get_area::<S, N>))
    .route(
      "/agents",
      get(coverage::list_agents::<S, N>).post(coverage::create_agent::<S, N>),
    )
    .route("/agents/{id}", get(coverage::get_agent::<S, N>))
    .route("/agents/{id}/area", post(coverage::reassign_area::<S, N>))
    .route("/agents/{id}/active", post(coverage::set_active::<S, N>))
    .route("/agents/{id}/obligations", get(coverage::daily_obligations::<S, N>))
    .route("/agents/{id}/route", get(coverage::route::<S, N>))
    // Addresses & subscriptions
    .route("/addresses", post(subscriptions::create_address::<S, N>))
    .route("/addresses/{id}", get(subscriptions::get_address::<S, N>))
    .route("/subscriptions", post(subscriptions::create::<S, N>))
    .route("/subscriptions/{id}", get(subscriptions::get_one::<S, N>))
    .route("/subscriptions/{id}/pause", post(subscriptions::pause::<S, N>))
    .route("/subscriptions/{id}/resume", post(subscriptions::resume::<S, N>))
    .route("/subscriptions/{id}/cancel", post(subscriptions::cancel::<S, N>))
    // Obligations
    .route("/obligations/{id}", get(obligations::get_one::<S, N>))
    .route("/obligations/{id}/start", post(obligations::start::<S, N>))
    .route("/obligations/{id}/complete", post(obligations::complete::<S, N>))
    .route("/obligations/{id}/fail", post(obligations::fail::<S, N>))
    .route("/failure-reasons", get(obligations::failure_reasons::<S, N>))
    .with_state(engine)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use rounds_core::{Engine, notify::NoopNotifier};
  use rounds_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::api_router;

  type TestEngine = Arc<Engine<SqliteStore, NoopNotifier>>;

  async fn make_engine() -> TestEngine {
    let store = SqliteStore::open_in_memory().await.unwrap();
    Arc::new(Engine::new(store, NoopNotifier))
  }

  async fn call(engine: &TestEngine, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(b) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = api_router(engine.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn id_of(v: &Value, field: &str) -> String { v[field].as_str().unwrap().to_owned() }

  /// One area covering 110001, one agent, one daily subscription there.
  async fn seeded() -> (TestEngine, String) {
    let engine = make_engine().await;
    let (_, area) = call(&engine, "POST", "/areas", Some(json!({
      "name": "central",
      "postal_codes": ["110001"],
    })))
    .await;
    let (_, agent) = call(&engine, "POST", "/agents", Some(json!({
      "name": "Ravi",
      "area_id": id_of(&area, "area_id"),
    })))
    .await;
    let (_, address) = call(&engine, "POST", "/addresses", Some(json!({
      "line": "4 Janpath",
      "postal_code": "110001",
      "location": { "lat": 28.62, "lng": 77.21 },
    })))
    .await;
    let (status, _) = call(&engine, "POST", "/subscriptions", Some(json!({
      "customer_id": Uuid::new_v4(),
      "address_id": id_of(&address, "address_id"),
      "products": [{
        "product_id": Uuid::new_v4(),
        "name": "Curd 400g",
        "quantity": 1,
        "unit_price_minor": 3500,
      }],
      "recurrence": "daily",
      "start_date": "2024-01-01",
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (engine, id_of(&agent, "agent_id"))
  }

  async fn first_obligation(engine: &TestEngine, agent: &str) -> String {
    call(engine, "POST", "/generate", Some(json!({ "date": "2024-01-01" }))).await;
    let (_, list) = call(
      engine,
      "GET",
      &format!("/agents/{agent}/obligations?date=2024-01-01"),
      None,
    )
    .await;
    id_of(&list[0], "obligation_id")
  }

  #[tokio::test]
  async fn generate_accepts_day_and_range() {
    let (engine, _) = seeded().await;
    let (status, body) = call(&engine, "POST", "/generate", Some(json!({ "date": "2024-01-01" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 1);

    let (_, body) = call(&engine, "POST", "/generate", Some(json!({
      "from": "2024-01-01",
      "to": "2024-01-03",
    })))
    .await;
    assert_eq!(body["created"], 2);
  }

  #[tokio::test]
  async fn inverted_range_is_bad_request() {
    let engine = make_engine().await;
    let (status, body) = call(&engine, "POST", "/generate", Some(json!({
      "from": "2024-01-03",
      "to": "2024-01-01",
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_date_range");
  }

  #[tokio::test]
  async fn resolve_reports_covering_agent_or_null() {
    let (engine, agent) = seeded().await;
    let (status, body) = call(&engine, "GET", "/coverage/resolve?postal_code=110001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["agent_id"], agent.as_str());

    let (_, body) = call(&engine, "GET", "/coverage/resolve?postal_code=560001", None).await;
    assert!(body["agent"].is_null());
  }

  #[tokio::test]
  async fn agent_in_unknown_area_is_404() {
    let engine = make_engine().await;
    let (status, body) = call(&engine, "POST", "/agents", Some(json!({
      "name": "Nobody",
      "area_id": Uuid::new_v4(),
    })))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "invalid_area");
  }

  #[tokio::test]
  async fn full_delivery_flow() {
    let (engine, agent) = seeded().await;
    let ob = first_obligation(&engine, &agent).await;

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/start"),
      Some(json!({ "agent_id": agent })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/complete"),
      Some(json!({
        "agent_id": agent,
        "proof": { "kind": "photo", "url": "https://cdn.example/a.jpg" },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "delivered");

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/fail"),
      Some(json!({ "agent_id": agent, "code": "weather" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_terminal");
  }

  #[tokio::test]
  async fn lifecycle_guards_map_to_statuses() {
    let (engine, agent) = seeded().await;
    let ob = first_obligation(&engine, &agent).await;

    let (status, _) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/start"),
      Some(json!({ "agent_id": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/complete"),
      Some(json!({ "agent_id": agent })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "missing_proof");

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/fail"),
      Some(json!({ "agent_id": agent, "code": "aliens" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_reason_code");

    let (status, _) = call(&engine, "GET", &format!("/obligations/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn malformed_bodies_are_structured_bad_requests() {
    let (engine, agent) = seeded().await;
    let ob = first_obligation(&engine, &agent).await;

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/complete"),
      Some(json!({ "proof": { "kind": "photo", "url": "https://cdn.example/a.jpg" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("agent_id"));

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/complete"),
      Some(json!({
        "agent_id": agent,
        "proof": { "kind": "video", "url": "https://cdn.example/a.mp4" },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/obligations/{ob}/fail"),
      Some(json!({ "code": "weather" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (_, body) = call(&engine, "GET", &format!("/obligations/{ob}"), None).await;
    assert_eq!(body["status"], "pending");
  }

  #[tokio::test]
  async fn missing_content_type_is_structured() {
    let engine = make_engine().await;
    let req = Request::builder()
      .method("POST")
      .uri("/generate")
      .body(Body::from(r#"{"date":"2024-01-01"}"#))
      .unwrap();
    let resp = api_router(engine).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "bad_request");
  }

  #[tokio::test]
  async fn route_lists_open_stops() {
    let (engine, agent) = seeded().await;
    first_obligation(&engine, &agent).await;
    let (status, plan) = call(
      &engine,
      "GET",
      &format!("/agents/{agent}/route?date=2024-01-01"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["stops"].as_array().unwrap().len(), 1);
    assert_eq!(plan["total_distance_km"], 0.0);
  }

  #[tokio::test]
  async fn route_for_unknown_agent_is_404() {
    let engine = make_engine().await;
    let (status, body) = call(
      &engine,
      "GET",
      &format!("/agents/{}/route", Uuid::new_v4()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
  }

  #[tokio::test]
  async fn deactivating_agent_unassigns_pending_work() {
    let (engine, agent) = seeded().await;
    let ob = first_obligation(&engine, &agent).await;

    let (status, body) = call(
      &engine,
      "POST",
      &format!("/agents/{agent}/active"),
      Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reassigned_count"], 1);

    let (_, body) = call(&engine, "GET", &format!("/obligations/{ob}"), None).await;
    assert!(body["agent_id"].is_null());
  }

  #[tokio::test]
  async fn pause_rejects_inverted_window() {
    let engine = make_engine().await;
    let (status, body) = call(
      &engine,
      "POST",
      &format!("/subscriptions/{}/pause", Uuid::new_v4()),
      Some(json!({ "start": "2024-01-10", "end": "2024-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_pause_window");
  }

  #[tokio::test]
  async fn failure_reasons_are_listed() {
    let engine = make_engine().await;
    let (status, body) = call(&engine, "GET", "/failure-reasons", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0]["code"], "customer_unavailable");
  }
}
