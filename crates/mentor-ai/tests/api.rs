//! End-to-end tests of the HTTP API against an in-memory database

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Html,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mentor_ai::{build_router, llm::MockLlm, AppState, MentorConfig, MentorDb};

fn test_config() -> MentorConfig {
    let mut config = MentorConfig::default();
    config.scraper.timeout_secs = 5;
    config
}

fn app() -> Router {
    let db = MentorDb::in_memory().unwrap();
    let state = AppState::with_parts(test_config(), db, Arc::new(MockLlm::new())).unwrap();
    build_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_tip(app: &Router, semester: &str, issue_type: &str, description: &str) -> Value {
    let (status, tip) = send(
        app,
        Method::POST,
        "/api/v1/tips",
        Some(json!({
            "semester": semester,
            "issue_type": issue_type,
            "description": description,
            "tags": ["Anmeldung", " anmeldung "],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    tip
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Two pages on the same topic that disagree on the application deadline
fn university_site() -> Router {
    Router::new()
        .route(
            "/studium",
            get(|| async {
                Html(
                    r#"<html><head><title>Studium</title></head><body>
                    <p>Alles rund ums Studium an der Hochschule.</p>
                    <a href="/studium/bewerbung">Bewerbung</a>
                    <a href="/studium/bewerbung-international">International</a>
                    <a href="/impressum">Impressum</a>
                    </body></html>"#,
                )
            }),
        )
        .route(
            "/studium/bewerbung",
            get(|| async {
                Html(
                    r#"<html><head><title>Bewerbung</title></head><body>
                    <h1>Bewerbung</h1>
                    <p>Der Bewerbungsschluss für das Wintersemester ist der 15.07.2025. Bitte reichen Sie alle Unterlagen vollständig ein.</p>
                    </body></html>"#,
                )
            }),
        )
        .route(
            "/studium/bewerbung-international",
            get(|| async {
                Html(
                    r#"<html><head><title>Bewerbung</title></head><body>
                    <h1>Bewerbung</h1>
                    <p>Internationale Studierende beachten: Bewerbungsschluss ist der 01.06.2025. Die Unterlagen gehen an das International Office.</p>
                    </body></html>"#,
                )
            }),
        )
}

#[tokio::test]
async fn test_tip_lifecycle() {
    let app = app();
    let tip = create_tip(
        &app,
        "WS24/25",
        "Prüfungsanmeldung",
        "Melde dich früh im Portal an, die Frist endet zwei Wochen vor der Prüfung.",
    )
    .await;
    assert_eq!(tip["tags"], json!(["anmeldung"]));
    let id = tip["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, Method::GET, &format!("/api/v1/tips/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["issue_type"], "Prüfungsanmeldung");

    let (status, list) = send(&app, Method::GET, "/api/v1/tips?semester=WS24/25", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["tips"][0]["id"], id.as_str());

    // The tip is searchable right away
    let (_, hits) = send(&app, Method::GET, "/api/v1/knowledge/search?q=Portal", None).await;
    assert_eq!(hits["results"][0]["id"], format!("tip_{}", id));

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/tips/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/tips/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");

    let (_, hits) = send(&app, Method::GET, "/api/v1/knowledge/search?q=Portal", None).await;
    assert!(hits["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tip_validation() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/tips",
        Some(json!({ "semester": "3", "issue_type": "Mensa", "description": "zu kurz" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/tips",
        Some(json!({ "semester": "  ", "issue_type": "Mensa", "description": "Die Mensa ist mittwochs voll." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/tips/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: &'static str) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_malformed_requests_use_error_body() {
    let app = app();

    // Missing required field
    let (status, content_type, body) = send_raw(
        &app,
        Method::POST,
        "/api/v1/tips",
        r#"{"semester":"3","issue_type":"Mensa"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body["error"]["type"], "validation_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("description"));

    // Broken JSON
    let (status, _, body) = send_raw(&app, Method::POST, "/api/v1/chat", r#"{"message": "#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");

    let (status, _, body) = send_raw(&app, Method::POST, "/api/v1/scrape", "[1, 2]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");

    let (status, body) = send(&app, Method::GET, "/api/v1/tips?limit=viele", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");

    let (status, body) = send(&app, Method::GET, "/api/v1/tips/keine-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn test_tip_graph() {
    let app = app();
    create_tip(&app, "WS24/25", "Prüfungsanmeldung", "Im Portal rechtzeitig für alle Prüfungen anmelden.").await;
    create_tip(&app, "WS24/25", "Wohnen", "Das Wohnheim früh beantragen, die Warteliste ist lang.").await;

    let (status, graph) = send(&app, Method::GET, "/api/v1/tips/graph", None).await;
    assert_eq!(status, StatusCode::OK);

    let nodes = graph["nodes"].as_array().unwrap();
    let ids: Vec<&str> = nodes.iter().map(|n| n["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"semester:ws24/25"));
    assert!(ids.contains(&"topic:wohnen"));
    assert!(ids.contains(&"tag:anmeldung"));
    assert_eq!(nodes.iter().filter(|n| n["kind"] == "tip").count(), 2);

    // Both tips hang off the shared semester node
    let semester_links = graph["links"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|l| l["target"] == "semester:ws24/25")
        .count();
    assert_eq!(semester_links, 2);
}

#[tokio::test]
async fn test_chat_feed_and_insights() {
    let app = app();
    create_tip(
        &app,
        "SS25",
        "Prüfungsanmeldung",
        "Die Prüfungsanmeldung läuft über das Portal und schließt zwei Wochen vorher.",
    )
    .await;

    let (status, reply) = send(
        &app,
        Method::POST,
        "/api/v1/chat",
        Some(json!({ "message": "Wie funktioniert die Prüfungsanmeldung?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response"], "Mock reply to: Wie funktioniert die Prüfungsanmeldung?");
    assert_eq!(reply["source"], "mock");
    assert_eq!(reply["sources"][0]["source"], "student");

    let conversation_id = reply["conversation_id"].as_str().unwrap().to_string();
    let (status, transcript) = send(&app, Method::GET, &format!("/api/v1/chat/{}", conversation_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = transcript["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");

    let (status, _) = send(&app, Method::GET, "/api/v1/chat/unknown-conversation", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/api/v1/chat", Some(json!({ "message": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, feed) = send(&app, Method::GET, "/api/v1/feed?source=student", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["items"].as_array().unwrap().len(), 1);

    let (status, insight) = send(
        &app,
        Method::POST,
        "/api/v1/insights",
        Some(json!({ "query": "Prüfungsanmeldung" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(insight["confidence"].as_f64().unwrap() > 0.0);

    let (_, empty) = send(
        &app,
        Method::POST,
        "/api/v1/insights",
        Some(json!({ "query": "Quantenchromodynamik" })),
    )
    .await;
    assert_eq!(empty["insight"], "No information found for: Quantenchromodynamik");
    assert_eq!(empty["confidence"], 0.0);
}

#[tokio::test]
async fn test_scrape_section_detects_conflicts() {
    let app = app();
    let base = serve(university_site()).await;

    let (status, report) = send(
        &app,
        Method::POST,
        "/api/v1/scrape/section",
        Some(json!({ "url": format!("{}/studium", base) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["pages_scraped"], 3);
    assert_eq!(report["pages_failed"], 0);
    assert!(report["chunks_indexed"].as_u64().unwrap() >= 2);
    assert_eq!(report["new_conflicts"], 1);

    let (status, listed) = send(&app, Method::GET, "/api/v1/conflicts?topic=Bewerbung", None).await;
    assert_eq!(status, StatusCode::OK);
    let conflicts = listed["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["kind"], "deadline");

    let mut values = vec![
        conflicts[0]["left_value"].as_str().unwrap(),
        conflicts[0]["right_value"].as_str().unwrap(),
    ];
    values.sort();
    assert_eq!(values, vec!["2025-06-01", "2025-07-15"]);

    // A second scan finds the same conflict but nothing new
    let (status, scan) = send(&app, Method::POST, "/api/v1/conflicts/scan", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scan["conflicts"].as_array().unwrap().len(), 1);
    assert_eq!(scan["new_conflicts"], 0);
    assert_eq!(scan["resolved"], 0);

    let (_, summary) = send(&app, Method::GET, "/api/v1/knowledge/summary?sample=2", None).await;
    assert!(summary["official"].as_u64().unwrap() >= 2);
    assert_eq!(summary["sample"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_scrape_single_page() {
    let app = app();
    let base = serve(university_site()).await;

    let (status, page) = send(
        &app,
        Method::POST,
        "/api/v1/scrape",
        Some(json!({ "url": format!("{}/studium/bewerbung", base), "persist": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"]["title"], "Bewerbung");
    assert_eq!(page["chunks_indexed"], 1);

    let (_, records) = send(&app, Method::GET, "/api/v1/knowledge?source=official", None).await;
    assert_eq!(records["records"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/scrape",
        Some(json!({ "url": "ftp://h-da.de/studium" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/scrape",
        Some(json!({ "url": format!("{}/gibt-es-nicht", base) })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reindex_restores_records() {
    let app = app();
    create_tip(&app, "3", "Praktikum", "Die Praktikumsbörse im Intranet hat die besten Angebote.").await;

    let (status, report) = send(&app, Method::POST, "/api/v1/knowledge/reindex", None).await;
    assert_eq!(status, StatusCode::OK);
    // Already present from submission
    assert_eq!(report["tips"]["skipped"], 1);
    assert_eq!(report["tips"]["indexed"], 0);
}

#[tokio::test]
async fn test_health_and_info() {
    let app = app();

    let (status, health) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health, json!({ "status": "ok", "db": 1, "version": "v1" }));

    let (status, info) = send(&app, Method::GET, "/api/v1/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["llm"]["provider"], "mock");
    assert!(info["endpoints"]["POST /api/v1/chat"].is_string());
}

#[tokio::test]
async fn test_tips_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("mentor.db");

    let first = build_router(
        AppState::with_parts(test_config(), MentorDb::open(&path).unwrap(), Arc::new(MockLlm::new())).unwrap(),
    );
    let tip = create_tip(&first, "WS24/25", "Bibliothek", "Die Bibliothek hat in der Prüfungszeit länger geöffnet.").await;
    drop(first);

    let second = build_router(
        AppState::with_parts(test_config(), MentorDb::open(&path).unwrap(), Arc::new(MockLlm::new())).unwrap(),
    );
    let (status, list) = send(&second, Method::GET, "/api/v1/tips", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["tips"][0]["id"], tip["id"]);
}
