//! API integration tests
//!
//! The router runs in-process over an in-memory inventory.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use magazzino_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};

fn app() -> Router {
    let mut config = AppConfig::default();
    config.labels.enabled = false;
    config.labels.public_base_url = "http://10.0.0.5:8080".to_string();

    let services = Services::new(Repository::in_memory(Vec::new()), &config.labels);
    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

async fn create(app: &Router, codice: &str, quantita: i64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/tools",
        Some(json!({
            "codice": codice,
            "produttore": "Sandvik",
            "diametro": "6",
            "materiale": "HSS",
            "descrizione": "Punta elicoidale",
            "tipo": "punta",
            "cassetto": "A3",
            "quantita": quantita
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_checkout_and_return_scenario() {
    let app = app();

    let (status, body) = create(&app, "T1", 10).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stato"], "in magazzino");
    assert_eq!(body["qr_url"], "http://10.0.0.5:8080/utensile/T1");

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/T1/checkout",
        Some(json!({ "operatore": "Alice", "quantita": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantita_disponibile"], 7);
    assert_eq!(body["quantita"], 7);
    assert_eq!(body["operatori"], json!({ "Alice": 3 }));
    assert_eq!(body["stato"], "in uso");
    assert_eq!(body["in_uso"], 3);
    assert_eq!(body["operatori_formattati"], "Alice (3)");

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/T1/checkout",
        Some(json!({ "operatore": "Alice", "quantita": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NotAvailable");

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/T1/return",
        Some(json!({ "operatore": "Bob", "quantita": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NotHeld");

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/T1/return",
        Some(json!({ "operatore": "Alice", "quantita": 3, "stato": "in magazzino" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantita_disponibile"], 10);
    assert_eq!(body["quantita"], 10);
    assert_eq!(body["operatori"], json!({}));
    assert_eq!(body["stato"], "in magazzino");
    assert_eq!(body["storico"].as_array().map(Vec::len), Some(2));

    let (status, body) = create(&app, "T1", 5).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantita"], 15);
    assert_eq!(body["stato"], "in magazzino");
}

#[tokio::test]
async fn test_broken_return() {
    let app = app();
    create(&app, "F8", 4).await;
    send(
        &app,
        Method::POST,
        "/tools/F8/checkout",
        Some(json!({ "operatore": "Marco", "quantita": 2 })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/F8/return",
        Some(json!({ "operatore": "Marco", "quantita": 1, "stato": "Rotta" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stato"], "rotta");
    assert_eq!(body["quantita_disponibile"], 2);
    assert_eq!(body["operatori"], json!({ "Marco": 1 }));
    assert_eq!(body["storico"][1]["azione"], "RESTITUZIONE 1 (rotta)");
}

#[tokio::test]
async fn test_validation_errors() {
    let app = app();
    create(&app, "T1", 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/T1/checkout",
        Some(json!({ "operatore": " ", "quantita": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = send(
        &app,
        Method::POST,
        "/tools/T1/return",
        Some(json!({ "operatore": "Alice", "quantita": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        Method::POST,
        "/tools/T1/checkout",
        Some(json!({ "operatore": "Alice", "quantita": 1 })),
    )
    .await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/tools/T1/return",
        Some(json!({ "operatore": "Alice", "quantita": 1, "stato": "ok||x:: y:: z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (_, body) = send(&app, Method::GET, "/tools/T1", None).await;
    assert_eq!(body["storico"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["operatori"], json!({ "Alice": 1 }));

    let (status, _) = create(&app, "", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_filters_and_delete() {
    let app = app();
    create(&app, "P-6", 1).await;
    send(
        &app,
        Method::POST,
        "/tools",
        Some(json!({ "codice": "F-8", "produttore": "Garant", "tipo": "fresa", "quantita": 2 })),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/tools?tipo=FRES", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["codice"], "F-8");

    let (_, body) = send(&app, Method::GET, "/tools?produttore=&codice=-", None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (_, body) = send(&app, Method::GET, "/labels", None).await;
    assert_eq!(body[1]["qr_url"], "http://10.0.0.5:8080/utensile/F-8");

    let (status, _) = send(&app, Method::DELETE, "/tools/P-6", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/tools/P-6", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchTool");

    let (status, _) = send(&app, Method::DELETE, "/tools/P-6", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
