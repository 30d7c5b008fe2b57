use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, BodyDataStream, to_bytes},
    http::{Request, StatusCode},
};
use deck::{SheetData, SheetRef, SheetSource, SheetsError};
use futures::StreamExt;
use serde_json::{Value, json};
use server::{
    config::Config,
    database::{MemoryStore, PromptStore},
    router,
    state::AppState,
};
use tower::ServiceExt;

const CLIENT: &str = "client-1";

struct StaticSheets {
    sheets: HashMap<String, Vec<Vec<String>>>,
}

#[async_trait]
impl SheetSource for StaticSheets {
    async fn fetch(&self, sheet: &SheetRef) -> Result<SheetData, SheetsError> {
        let values = self
            .sheets
            .get(&sheet.sheet_name)
            .ok_or(SheetsError::SheetNotFound)?;

        Ok(SheetData {
            values: values.clone(),
            range: format!("'{}'!A1:Z{}", sheet.sheet_name, values.len()),
        })
    }
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

fn sample_sheets(config: &Config) -> StaticSheets {
    let primary = vec![
        row(&["제목", "이미지", "영어", "한국어", "도구"]),
        row(&[
            "Photo Restore",
            "https://drive.google.com/file/d/abc123/view",
            "restore this photo",
            "사진 복원",
            "Gemini",
            "",
            "restored",
            "복원됨",
        ]),
        row(&["Sticker", "", "make a sticker", "스티커", "Nano Banana"]),
    ];
    let special = vec![
        row(&["title", "en", "ko", "tool"]),
        row(&["Bonus Card", "bonus prompt", "보너스", "ChatGPT"]),
    ];

    StaticSheets {
        sheets: HashMap::from([
            (config.primary.sheet_name.clone(), primary),
            (config.special.sheet_name.clone(), special),
        ]),
    }
}

fn app_with(sheets: Option<Arc<dyn SheetSource>>, config: Config) -> Router {
    let store: Arc<dyn PromptStore> = Arc::new(MemoryStore::default());

    router(AppState::from_parts(config, sheets, store))
}

fn app() -> Router {
    let config = Config::default();
    let sheets: Arc<dyn SheetSource> = Arc::new(sample_sheets(&config));

    app_with(Some(sheets), config)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header("x-client-id", CLIENT)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("x-client-id", CLIENT)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

fn titles(body: &Value) -> Vec<&str> {
    body["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|card| card["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_raw_sheets() {
    let app = app();

    let (status, body) = send(&app, get("/api/sheets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["values"].as_array().unwrap().len(), 3);
    assert_eq!(body["values"][1][0], "Photo Restore");

    let (status, body) = send(&app, get("/api/sheets/special")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["values"][1][0], "Bonus Card");
}

#[tokio::test]
async fn test_missing_credentials() {
    let app = app_with(None, Config::default());

    let (status, body) = send(&app, get("/api/sheets")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Configuration error");
    assert_eq!(
        body["message"],
        "GOOGLE_SERVICE_ACCOUNT_JSON environment variable is not set"
    );
}

#[tokio::test]
async fn test_sheet_not_found() {
    let config = Config::default();
    let sheets: Arc<dyn SheetSource> = Arc::new(StaticSheets {
        sheets: HashMap::new(),
    });
    let app = app_with(Some(sheets), config);

    let (status, body) = send(&app, get("/api/sheets/special")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Failed to fetch special sheet data");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_details_in_development() {
    let config = Config {
        development: true,
        ..Config::default()
    };
    let sheets: Arc<dyn SheetSource> = Arc::new(StaticSheets {
        sheets: HashMap::new(),
    });
    let app = app_with(Some(sheets), config);

    let (status, body) = send(&app, get("/api/sheets")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"], "SheetNotFound");
}

#[tokio::test]
async fn test_cards_without_redeem() {
    let app = app();

    let (status, body) = send(&app, get("/api/cards")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redeemed"], false);
    assert_eq!(titles(&body), ["Bonus Card"]);
    assert_eq!(body["cards"][0]["id"], "special-title-Bonus-Card-1");
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_redeem_flow() {
    let app = app();

    let (status, body) = send(&app, get("/api/redeem")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activated"], false);

    let (status, body) = send(&app, post("/api/redeem", json!({ "code": "nope" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid redeem code");

    let (status, body) = send(
        &app,
        post("/api/redeem", json!({ "code": " GDRB2026-banana " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activated"], true);

    let (_, body) = send(&app, get("/api/redeem")).await;
    assert_eq!(body["activated"], true);

    let (status, body) = send(&app, get("/api/cards")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redeemed"], true);
    assert_eq!(titles(&body), ["Photo Restore", "Sticker", "Bonus Card"]);
}

#[tokio::test]
async fn test_redeemed_cards_rewrite_drive_links() {
    let app = app();
    send(
        &app,
        post("/api/redeem", json!({ "code": "GDRB2026-banana" })),
    )
    .await;

    let (_, body) = send(&app, get("/api/cards")).await;
    let restore = &body["cards"][0];

    assert_eq!(restore["id"], "super-Photo-Restore-1");
    assert_eq!(
        restore["beforeItems"][0]["image"],
        "https://lh3.googleusercontent.com/d/abc123"
    );
    assert_eq!(restore["beforeItems"][0]["tool"], "Gemini");
    assert_eq!(restore["afterItems"][0]["english"], "restored");
}

#[tokio::test]
async fn test_redeem_is_per_client() {
    let app = app();
    send(
        &app,
        post("/api/redeem", json!({ "code": "GDRB2026-banana" })),
    )
    .await;

    let request = Request::get("/api/cards")
        .header("x-client-id", "someone-else")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, request).await;

    assert_eq!(body["redeemed"], false);
    assert_eq!(titles(&body), ["Bonus Card"]);
}

#[tokio::test]
async fn test_cards_search_and_paging() {
    let app = app();
    send(
        &app,
        post("/api/redeem", json!({ "code": "GDRB2026-banana" })),
    )
    .await;

    let (_, body) = send(&app, get("/api/cards?q=nano%20banana")).await;
    assert_eq!(titles(&body), ["Sticker"]);

    let (_, body) = send(&app, get("/api/cards?q=%EB%B3%B4%EB%84%88%EC%8A%A4")).await;
    assert_eq!(titles(&body), ["Bonus Card"]);

    let (_, body) = send(&app, get("/api/cards?page=1&perPage=2")).await;
    assert_eq!(titles(&body), ["Photo Restore"]);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["total"], 3);

    let (_, body) = send(&app, get("/api/cards?page=2&perPage=2")).await;
    assert_eq!(titles(&body), ["Sticker", "Bonus Card"]);
    assert_eq!(body["page"], 2);
}

#[tokio::test]
async fn test_cards_bad_paging() {
    let app = app();

    let (status, _) = send(&app, get("/api/cards?page=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/cards?perPage=1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clicks() {
    let app = app();

    let (status, body) = send(&app, get("/api/prompts/super-A-1/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, post("/api/prompts/super-A-1/clicks", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clickCount"], 1);

    send(&app, post("/api/prompts/super-A-1/clicks", json!({}))).await;

    let (_, body) = send(&app, get("/api/prompts/super-A-1/stats")).await;
    assert_eq!(body["promptId"], "super-A-1");
    assert_eq!(body["clickCount"], 2);

    let (_, body) = send(&app, get("/api/prompts/super-B-2/stats")).await;
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_comments() {
    let app = app();
    let uri = "/api/prompts/super-A-1/comments";

    let (status, body) = send(&app, get(uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(&app, post(uri, json!({ "content": "  first  " }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "first");
    assert_eq!(body["userId"], CLIENT);
    assert_eq!(body["promptId"], "super-A-1");

    send(&app, post(uri, json!({ "content": "second" }))).await;

    let (_, body) = send(&app, get(uri)).await;
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|comment| comment["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["second", "first"]);
}

#[tokio::test]
async fn test_empty_comment() {
    let app = app();
    let uri = "/api/prompts/super-A-1/comments";

    let (status, body) = send(&app, post(uri, json!({ "content": "   " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");

    let (_, body) = send(&app, get(uri)).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_missing_client_id() {
    let app = app();

    let request = Request::post("/api/prompts/super-A-1/clicks")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing client id");
}

#[tokio::test]
async fn test_events_stream_opens() {
    let response = app()
        .oneshot(get("/api/prompts/super-A-1/events"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
}

/// Next SSE event as `(name, data)`, keep-alive comments skipped.
async fn next_event(body: &mut BodyDataStream, buffer: &mut String) -> (String, Value) {
    loop {
        if let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            let field = |prefix: &str| {
                frame
                    .lines()
                    .find_map(|line| line.strip_prefix(prefix))
                    .map(str::to_string)
            };

            if let Some(name) = field("event: ") {
                let data = field("data: ").unwrap_or_default();
                return (name, serde_json::from_str(&data).unwrap());
            }
            continue;
        }

        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("no event within 5s")
            .expect("stream ended")
            .unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

#[tokio::test]
async fn test_events_snapshot_then_updates() {
    let app = app();
    let prompt = "/api/prompts/super-A-1";

    send(&app, post(&format!("{prompt}/comments"), json!({ "content": "hi" }))).await;

    let response = app
        .clone()
        .oneshot(get(&format!("{prompt}/events")))
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();
    let mut buffer = String::new();

    let (name, data) = next_event(&mut body, &mut buffer).await;
    assert_eq!(name, "stats");
    assert_eq!(data, Value::Null);

    let (name, data) = next_event(&mut body, &mut buffer).await;
    assert_eq!(name, "comments");
    assert_eq!(data[0]["content"], "hi");

    send(&app, post(&format!("{prompt}/clicks"), json!({}))).await;

    let (name, data) = next_event(&mut body, &mut buffer).await;
    assert_eq!(name, "stats");
    assert_eq!(data["promptId"], "super-A-1");
    assert_eq!(data["clickCount"], 1);

    send(&app, post(&format!("{prompt}/comments"), json!({ "content": "again" }))).await;

    let (name, data) = next_event(&mut body, &mut buffer).await;
    assert_eq!(name, "comments");
    assert_eq!(data[0]["content"], "again");
    assert_eq!(data[1]["content"], "hi");
}

#[tokio::test]
async fn test_malformed_bodies_use_error_body() {
    let app = app();

    let (status, body) = send(&app, post("/api/redeem", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");
    assert!(body["message"].as_str().unwrap().contains("code"));

    let (status, body) = send(
        &app,
        post("/api/prompts/super-A-1/comments", json!({ "text": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");

    let request = Request::post("/api/redeem")
        .header("x-client-id", CLIENT)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");
}

#[tokio::test]
async fn test_malformed_query_uses_error_body() {
    let app = app();

    let (status, body) = send(&app, get("/api/cards?page=abc")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed payload");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_huge_page_is_empty() {
    let app = app();

    let (status, body) = send(
        &app,
        get(&format!("/api/cards?page={}&perPage=6", usize::MAX / 2)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cards"], json!([]));
    assert_eq!(body["total"], 1);
}
