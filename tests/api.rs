//! End-to-end API tests: the full router wired to fixture collaborators,
//! no network.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use venue_gate::catalog::StaticCatalog;
use venue_gate::config::Config;
use venue_gate::content::MemoryContent;
use venue_gate::errors::UpstreamError;
use venue_gate::mail::LogMail;
use venue_gate::server::{build_router, AppState};
use venue_gate::upstream::{AvailabilityRecord, BookingFeed};

const CONFIG: &str = r#"
[server]
bind = "127.0.0.1:0"

[upstream]
ajax_url = "http://unused.invalid/wp-admin/admin-ajax.php"

[site]
base_url = "https://venue.example"
admin_email = "admin@venue.example"

[enquiry]
secret = "integration-secret"

[filters]
tax = { pa_city = "1", product_cat = "1" }
tax_keys = ["pa_city"]

[filters.labels]
pa_city = "City"

[[filters.terms.pa_city]]
key = "mito"
label = "Mito"

[[products]]
id = 42
name = "Studio A"
permalink = "https://venue.example/studio-a/"
calendar_id = 7
owner_email = "owner@venue.example"

[[calendars]]
id = 7
settings = { rule = "3" }

[[rules]]
id = 3
name = "hourly"
time_lapse_min = 1
time_lapse_max = 12

[[news]]
id = 1
title = "Reopening"
date = "2026-01-10"
link = "https://venue.example/news/1"
"#;

/// Two bookable hours and one booked hour on 2026-03-01.
struct StubFeed;

#[async_trait]
impl BookingFeed for StubFeed {
    async fn day_availability(
        &self,
        _calendar_id: u32,
    ) -> Result<Vec<AvailabilityRecord>, UpstreamError> {
        Ok(vec![AvailabilityRecord {
            date_start: "2026-03-01 00:00:00".to_string(),
        }])
    }

    async fn year_schedule(
        &self,
        _calendar_id: u32,
        year: i32,
    ) -> Result<BTreeMap<String, String>, UpstreamError> {
        let mut out = BTreeMap::new();
        if year == 2026 {
            let raw = json!({
                "hours": {
                    "10:00": { "status": "available", "price": 1000, "available": 2 },
                    "11:00": { "status": "available", "price": 1000, "available": 2 },
                    "12:00": { "status": "booked", "price": 1000, "available": 0 },
                },
                "hours_definitions": [
                    { "value": "10:00" },
                    { "value": "11:00" },
                    { "value": "12:00" },
                    { "value": "13:00" },
                ],
            })
            .to_string();
            out.insert("2026-03-01".to_string(), raw);
        }
        Ok(out)
    }
}

fn router() -> axum::Router {
    let config: Config = toml::from_str(CONFIG).unwrap();
    let state = AppState {
        catalog: Arc::new(StaticCatalog::new(&config.products)),
        content: Arc::new(MemoryContent::new(&config.news)),
        mail: Arc::new(LogMail),
        feed: Arc::new(StubFeed),
        config: Arc::new(config),
    };
    build_router(state)
}

async fn get(path: &str) -> (StatusCode, Value) {
    let response = router()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_and_meta() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get("/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ping"], "pong");

    let (status, body) = get("/meta").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart_url"], "https://venue.example/cart/");
    assert_eq!(body["enquiry_ttl_secs"], 600);
    assert!(body["endpoints"].as_array().unwrap().len() >= 10);
}

#[tokio::test]
async fn test_filters_and_news() {
    let (status, body) = get("/filters").await;
    assert_eq!(status, StatusCode::OK);
    let filters = body["filters"].as_array().unwrap();
    // product_cat is always excluded
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0]["key"], "city");
    assert_eq!(filters[0]["items"][0]["key"], "mito");

    let (status, body) = get("/news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["news"][0]["title"], "Reopening");
    assert_eq!(body["total"], 1);

    let (status, body) = get("/news?page=2&per_page=5").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["news"].as_array().unwrap().is_empty());

    // paging arithmetic must tolerate the largest representable page
    let (status, body) = get("/news?page=18446744073709551615&per_page=100").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["news"].as_array().unwrap().is_empty());
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_calendar_snapshot_shape() {
    let (status, body) = get("/calendar/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calendar_id"], 7);
    assert_eq!(body["days"]["2026-03-01"]["status"], "available");
    assert_eq!(body["days"]["2026-03-01"]["mark"], "partial");

    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0]["time_start"], "10:00");
    assert_eq!(slots[2]["status"], "booked");
}

#[tokio::test]
async fn test_product_calendar_lookups() {
    let (status, body) = get("/product/42/calendar").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calendar_id"], 7);

    let (status, body) = get("/product/99/calendar").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = get("/calendar/7/product").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 42);
    // owner address never leaves the server
    assert!(body.get("owner_email").is_none());
}

#[tokio::test]
async fn test_cart_payload_success() {
    let (status, body) = post_json(
        "/cart/payload",
        json!({
            "calendar_id": 7,
            "date": "2026-03-01",
            "start_hour": "10:00",
            "end_hour": "12:00",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action_url"], "https://venue.example/cart/");
    assert_eq!(body["price_total"], 2000);

    let fields = body["fields"].as_array().unwrap();
    let action = fields.iter().find(|f| f[0] == "action").unwrap();
    assert_eq!(action[1], "dopbsp_woocommerce_add_to_cart");
    // product_id omitted from the command: resolved via the calendar
    let product = fields.iter().find(|f| f[0] == "product_id").unwrap();
    assert_eq!(product[1], "42");
}

#[tokio::test]
async fn test_cart_payload_conflict_on_booked_slot() {
    let (status, body) = post_json(
        "/cart/payload",
        json!({
            "product_id": 42,
            "calendar_id": 7,
            "date": "2026-03-01",
            "start_hour": "11:00",
            "end_hour": "13:00",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "slot_unavailable");
    assert_eq!(body["error"]["detail"]["reason"], "booked");
}

#[tokio::test]
async fn test_cart_webview_envelope_is_200_on_business_error() {
    let (status, body) = get(
        "/cart/webview?calendar_id=7&date=2026-03-01&start_hour=11:00&end_hour=13:00",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "slot_unavailable");

    let (status, body) = get(
        "/cart/webview?calendar_id=7&date=2026-03-01&start_hour=10:00&end_hour=12:00",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["form"]["price_total"], 2000);
}

#[tokio::test]
async fn test_cart_bridge_renders_html() {
    let response = router()
        .oneshot(
            Request::get(
                "/cart/bridge?calendar_id=7&date=2026-03-01&start_hour=10:00&end_hour=11:00",
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("document.forms[0].submit()"));
    assert!(html.contains("https://venue.example/cart/"));
}

#[tokio::test]
async fn test_enquiry_preview_then_send_over_http() {
    let enquiry = json!({
        "product_id": 42,
        "name": "Taro",
        "email": "taro@example.com",
        "enquiry": "Is the hall free next Friday?",
    });

    let (status, preview) = post_json("/enquiry/preview", enquiry.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["to"], "owner@venue.example");
    assert!(preview["payload_hash"]
        .as_str()
        .unwrap()
        .starts_with("sha256:"));

    let mut echo = enquiry;
    echo["issued_at"] = preview["issued_at"].clone();
    echo["payload_hash"] = preview["payload_hash"].clone();

    let (status, result) = post_json("/enquiry", echo).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "success");
    assert_eq!(result["mail_sent"], true);
    assert_eq!(result["to"], "owner@venue.example");
    assert_eq!(result["cc"], "admin@venue.example");
    assert!(!result["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_enquiry_send_rejects_tampered_payload() {
    let enquiry = json!({
        "product_id": 42,
        "name": "Taro",
        "email": "taro@example.com",
        "enquiry": "original text",
    });
    let (_, preview) = post_json("/enquiry/preview", enquiry).await;

    let tampered = json!({
        "product_id": 42,
        "name": "Taro",
        "email": "taro@example.com",
        "enquiry": "altered text",
        "issued_at": preview["issued_at"],
        "payload_hash": preview["payload_hash"],
    });
    let (status, body) = post_json("/enquiry", tampered).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "payload_hash_mismatch");
}

#[tokio::test]
async fn test_enquiry_unknown_product_rejected() {
    let (status, body) = post_json(
        "/enquiry/preview",
        json!({
            "product_id": 9999,
            "name": "Taro",
            "email": "taro@example.com",
            "enquiry": "hello",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_product_id");
}
