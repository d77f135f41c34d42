//! End-to-end tests for the HTTP surface against an in-memory store
//!
//! Requests go straight through `router::handle`, the same code path the
//! server's connection tasks use, so these cover routing, parameter
//! parsing, envelopes, identity enforcement, and self-auditing.

use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;
use vestry_api::{router, AppState, MetricsRegistry};
use vestry_audit::{AlertDispatcher, AuditRecorder};
use vestry_core::domain::{ActionCategory, Actor, ActorKind};
use vestry_core::ports::{IDirectory, IEventStore};
use vestry_store::{DatabasePool, SqliteDirectory, SqliteEventStore};

async fn test_state() -> Arc<AppState> {
    let pool = DatabasePool::in_memory().await.expect("in-memory pool");
    let store: Arc<dyn IEventStore> = Arc::new(SqliteEventStore::new(pool.pool().clone()));
    let directory: Arc<dyn IDirectory> = Arc::new(SqliteDirectory::new(pool.pool().clone()));
    let metrics = Arc::new(MetricsRegistry::new().expect("metrics registry"));
    let dispatcher = AlertDispatcher::new(vec![], Duration::from_millis(100));
    let recorder = AuditRecorder::new(Arc::clone(&store), dispatcher);
    Arc::new(AppState::new(store, directory, recorder, metrics))
}

fn admin() -> Actor {
    Actor::new(ActorKind::Admin, "adm-1")
        .with_name("Ruth Okafor")
        .with_source_ip("203.0.113.9")
}

/// Seeds four events: low, medium, critical, and a medium failure.
/// Returns the id of the medium `update_user` event.
async fn seed(state: &AppState) -> i64 {
    state
        .recorder
        .log_success(
            "view_dashboard",
            ActionCategory::Dashboard,
            "Opened dashboard",
            admin(),
        )
        .await
        .expect("seed");
    let update = state
        .recorder
        .log_success(
            "update_user",
            ActionCategory::UserManagement,
            "Updated member profile",
            admin(),
        )
        .await
        .expect("seed");
    state
        .recorder
        .log_success(
            "hard_delete_user",
            ActionCategory::UserManagement,
            "Hard-deleted member mem-4",
            Actor::new(ActorKind::Admin, "adm-2"),
        )
        .await
        .expect("seed");
    state
        .recorder
        .log_failure(
            "login_failed",
            ActionCategory::Authentication,
            "Login attempt for member portal",
            admin(),
            "OTP_EXPIRED",
            "the code expired",
        )
        .await
        .expect("seed");
    update.id().expect("seeded id").as_i64()
}

fn get(path: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn get_as_admin(path: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method("GET")
        .uri(path)
        .header("x-admin-id", "adm-1")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn post(path: &str, admin_id: Option<&str>, body: Value) -> Request<Full<Bytes>> {
    let mut builder = Request::builder().method("POST").uri(path);
    if let Some(id) = admin_id {
        builder = builder
            .header("x-admin-id", id)
            .header("x-admin-name", "Ruth Okafor");
    }
    builder
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn body_json(response: Response<Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let state = test_state().await;

    let response = router::handle(state, get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let state = test_state().await;

    let response = router::handle(state, get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let state = test_state().await;

    let response = router::handle(state, get("/health")).await.unwrap();
    let header = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header")
        .to_str()
        .unwrap();
    assert!(Uuid::parse_str(header).is_ok());
}

#[tokio::test]
async fn test_list_logs_empty_store() {
    let state = test_state().await;

    let response = router::handle(state, get("/logs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["logs"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["pagination"]["total"], 0);
    assert_eq!(body["data"]["summary"]["critical"], 0);
}

#[tokio::test]
async fn test_list_logs_with_summary() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/logs")).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["data"]["logs"].as_array().unwrap().len(), 4);
    assert_eq!(body["data"]["pagination"]["total"], 4);
    assert_eq!(body["data"]["summary"]["total"], 4);
    assert_eq!(body["data"]["summary"]["critical"], 1);
    assert_eq!(body["data"]["summary"]["unreviewed_elevated"], 1);
}

#[tokio::test]
async fn test_list_logs_filter_narrows_but_summary_describes_window() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/logs?risk_level=critical"))
        .await
        .unwrap();
    let body = body_json(response).await;

    let logs = body["data"]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["action"], "hard_delete_user");
    // The summary covers the time window, not the row filter
    assert_eq!(body["data"]["summary"]["total"], 4);
}

#[tokio::test]
async fn test_list_logs_invalid_category_is_400() {
    let state = test_state().await;

    let response = router::handle(state, get("/logs?category=gardening"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("gardening"));
}

#[tokio::test]
async fn test_get_log_by_id() {
    let state = test_state().await;
    let id = seed(&state).await;

    let response = router::handle(state, get(&format!("/logs/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["action"], "update_user");
    assert_eq!(body["data"]["actor"]["id"], "adm-1");
}

#[tokio::test]
async fn test_get_log_unknown_id_is_404() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/logs/999999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_log_malformed_id_is_400() {
    let state = test_state().await;

    let response = router::handle(state, get("/logs/abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_actor_history() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/actors/adm-1/logs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["actor_id"], "adm-1");
    // adm-2 performed the hard delete; the other three are adm-1's
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 3);
    assert!(body["data"]["identity"].is_null());
}

#[tokio::test]
async fn test_target_history_rejects_unknown_kind() {
    let state = test_state().await;

    let response = router::handle(state, get("/targets/starship/s-1/logs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_security_events_defaults() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/security/events")).await.unwrap();
    let body = body_json(response).await;

    let events = body["data"]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["action"], "hard_delete_user");
    assert_eq!(body["data"]["summary"]["critical"], 1);
    assert_eq!(body["data"]["summary"]["high"], 0);
}

#[tokio::test]
async fn test_flag_requires_identity() {
    let state = test_state().await;
    let id = seed(&state).await;

    let response = router::handle(
        state,
        post(&format!("/logs/{id}/flag"), None, json!({"reason": "odd"})),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_flag_then_review_flow() {
    let state = test_state().await;
    let id = seed(&state).await;

    let response = router::handle(
        Arc::clone(&state),
        post(
            &format!("/logs/{id}/flag"),
            Some("adm-3"),
            json!({"reason": "bulk edit outside office hours"}),
        ),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["flagged"], true);
    assert_eq!(body["data"]["flag_reason"], "bulk edit outside office hours");

    let response = router::handle(
        Arc::clone(&state),
        post(
            &format!("/logs/{id}/review"),
            Some("adm-3"),
            json!({"notes": "verified with the office"}),
        ),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["reviewed"], true);
    assert_eq!(body["data"]["reviewed_by"], "adm-3");

    // Both mutations audited themselves: 4 seeded + flag + review
    let response = router::handle(state, get("/logs")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], 6);
    let actions: Vec<&str> = body["data"]["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"flag_audit_log"));
    assert!(actions.contains(&"review_audit_log"));
}

#[tokio::test]
async fn test_flag_empty_reason_is_400() {
    let state = test_state().await;
    let id = seed(&state).await;

    let response = router::handle(
        state,
        post(
            &format!("/logs/{id}/flag"),
            Some("adm-3"),
            json!({"reason": "   "}),
        ),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_flag_unknown_event_is_404() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(
        state,
        post("/logs/424242/flag", Some("adm-3"), json!({"reason": "x"})),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_flag_malformed_body_is_400() {
    let state = test_state().await;
    let id = seed(&state).await;

    let response = router::handle(
        state,
        post(&format!("/logs/{id}/flag"), Some("adm-3"), json!({"why": "x"})),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_statistics_daily() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/statistics?granularity=day"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let series = body["data"]["series"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["total"], 4);
    assert_eq!(series[0]["failed"], 1);
    assert!(!body["data"]["categories"].as_array().unwrap().is_empty());
    assert!(!body["data"]["top_actors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_statistics_invalid_granularity_is_400() {
    let state = test_state().await;

    let response = router::handle(state, get("/statistics?granularity=week"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compliance_report() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/compliance/report")).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["data"]["total_logs"], 4);
    assert_eq!(body["data"]["critical_events"], 1);
    assert!(body["data"]["compliance_score"].as_u64().unwrap() <= 100);
    assert!(!body["data"]["recommendations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_alerts_feed() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/alerts")).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["data"]["hours"], 24);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["alerts"][0]["action"], "hard_delete_user");
}

#[tokio::test]
async fn test_alerts_zero_hours_is_400() {
    let state = test_state().await;

    let response = router::handle(state, get("/alerts?hours=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_requires_identity() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(state, get("/export?format=csv")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_export_csv_raw_body_and_self_audit() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(Arc::clone(&state), get_as_admin("/export?format=csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Content-Type").unwrap(), "text/csv");
    let disposition = response
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"audit-export-"));

    let body = body_text(response).await;
    // Header line plus the four seeded rows
    assert_eq!(body.lines().count(), 5);
    assert!(body.starts_with("id,timestamp,action"));

    // The export audited itself after rendering
    let response = router::handle(state, get("/logs?action=export_audit_logs"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_export_unknown_format_is_400() {
    let state = test_state().await;

    let response = router::handle(state, get_as_admin("/export?format=xml"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cleanup_requires_identity() {
    let state = test_state().await;

    let response = router::handle(
        state,
        post("/cleanup", None, json!({"older_than_days": 30, "mode": "archive"})),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_archive_recent_store_affects_nothing() {
    let state = test_state().await;
    seed(&state).await;

    let response = router::handle(
        Arc::clone(&state),
        post(
            "/cleanup",
            Some("adm-1"),
            json!({"older_than_days": 30, "mode": "archive"}),
        ),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["affected"], 0);
    assert_eq!(body["data"]["mode"], "archive");
    assert_eq!(body["data"]["preserve_critical"], true);

    // Cleanup self-audit landed
    let response = router::handle(state, get("/logs?action=cleanup_audit_logs"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cleanup_invalid_mode_is_400() {
    let state = test_state().await;

    let response = router::handle(
        state,
        post(
            "/cleanup",
            Some("adm-1"),
            json!({"older_than_days": 30, "mode": "truncate"}),
        ),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let state = test_state().await;

    // Generate one sample first
    router::handle(Arc::clone(&state), get("/health")).await.unwrap();

    let response = router::handle(state, get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let body = body_text(response).await;
    assert!(body.contains("vestry_http_requests_total"));
    assert!(body.contains("endpoint=\"/health\""));
}

#[tokio::test]
async fn test_mutations_feed_audit_event_counter() {
    let state = test_state().await;
    let id = seed(&state).await;

    router::handle(
        Arc::clone(&state),
        post(
            &format!("/logs/{id}/flag"),
            Some("adm-3"),
            json!({"reason": "odd activity"}),
        ),
    )
    .await
    .unwrap();

    // flag_audit_log classifies as medium risk
    assert_eq!(
        state
            .metrics
            .audit_events_total
            .with_label_values(&["medium"])
            .get(),
        1
    );
}
