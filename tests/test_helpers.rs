// tests/test_helpers.rs
// In-process mock of the Mealz REST API

#![allow(dead_code)]

use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use futures::{Stream, StreamExt, stream};
use serde_json::{Value, json};

use mealz::ApiClient;

/// Serve `router` on an ephemeral port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{}", addr)
}

pub async fn client_for(router: Router) -> ApiClient {
    let base_url = spawn_server(router).await;
    ApiClient::with_base_url(&base_url).expect("create API client")
}

/// One `data: ` line for a chat event
pub fn event_line(event: Value) -> String {
    format!("data: {}\n\n", event)
}

/// Streaming body that sends each chunk separately, with a short pause
/// between chunks so they reach the client as distinct reads
pub fn chunked_body(chunks: Vec<Vec<u8>>) -> Body {
    Body::from_stream(paced(chunks))
}

pub fn paced(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, Infallible>> + Send + 'static {
    stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        Ok::<_, Infallible>(chunk)
    })
}

pub fn timestamp() -> &'static str {
    "2025-03-01T12:00:00"
}

pub fn week_plan_json(id: i64, week_start: &str, slots: Vec<Value>) -> Value {
    json!({
        "id": id,
        "week_start": week_start,
        "notes": null,
        "slots": slots,
        "created_at": timestamp(),
    })
}

pub fn slot_json(id: i64, plan_id: i64, date: &str, sort_order: i32) -> Value {
    json!({
        "id": id,
        "week_plan_id": plan_id,
        "date": date,
        "meal_type": "dinner",
        "recipe_id": 4,
        "is_leftover": false,
        "leftover_source_id": null,
        "notes": null,
        "sort_order": sort_order,
        "recipe_name": "Shakshuka",
    })
}
