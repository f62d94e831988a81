//! Integration tests for `/review`.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_json};
use serde_json::json;

fn items() -> serde_json::Value {
    json!([
        {
            "file_path": "a.mp4",
            "name": "a.mp4",
            "size": 100,
            "duration": 2.0,
            "width": 640,
            "height": 360,
            "fps": 24.0,
            "widgetValues": { "seed": 1, "steps": 20 }
        },
        {
            "file_path": "b.mp4",
            "name": "b.mp4",
            "size": 300,
            "duration": 2.0,
            "width": 640,
            "height": 360,
            "fps": 24.0,
            "widgetValues": { "seed": 2, "steps": 20 }
        }
    ])
}

#[tokio::test]
async fn review_builds_headers_and_diffs_against_first_row() {
    let app = common::build_test_app();
    let response = post_json(
        app,
        "/review",
        json!({ "items": items(), "sort": { "key": "name", "direction": "asc" } }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let headers: Vec<&str> = json["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h.as_str().unwrap())
        .collect();
    assert_eq!(&headers[..2], &["file_path", "created_at"]);
    assert_eq!(&headers[8..], &["seed", "steps"]);

    let diffs = json["diffs"].as_array().unwrap();
    assert_eq!(diffs[0]["baseline"], true);
    let changed: Vec<&str> = diffs[1]["changes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["key"].as_str().unwrap())
        .collect();
    assert!(changed.contains(&"seed"));
    assert!(changed.contains(&"size"));
    assert!(!changed.contains(&"steps"));
}

#[tokio::test]
async fn review_hides_paths_and_regex_columns() {
    let app = common::build_test_app();
    let response = post_json(
        app,
        "/review",
        json!({
            "items": items(),
            "hidePaths": true,
            "hideSpec": "/^ste/i",
            "search": "b.mp4"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let visible = json["visibleHeaders"].as_array().unwrap();
    assert!(!visible.contains(&json!("file_path")));
    assert!(!visible.contains(&json!("created_at")));
    assert!(!visible.contains(&json!("steps")));
    assert!(visible.contains(&json!("seed")));

    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "b.mp4");
}

#[tokio::test]
async fn review_search_matches_hidden_columns() {
    let app = common::build_test_app();
    let items = json!([
        { "file_path": "a.mp4", "name": "a.mp4", "widgetValues": { "prompt": "red fox" } },
        { "file_path": "b.mp4", "name": "b.mp4", "widgetValues": { "prompt": "blue whale" } }
    ]);
    let response = post_json(
        app,
        "/review",
        json!({ "items": items, "hideSpec": "prompt", "search": "WHALE" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(!json["visibleHeaders"].as_array().unwrap().contains(&json!("prompt")));
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "b.mp4");
}

#[tokio::test]
async fn review_outputs_view_uses_allow_listed_node_outputs() {
    let app = common::build_test_app();
    let graph = json!({
        "nodes": [
            { "id": 4, "type": "CheckpointLoaderSimple", "widgets_values": ["base.safetensors"],
              "outputs": [{ "name": "MODEL" }] },
            { "id": 7, "type": "Note", "widgets_values": ["scratch"], "outputs": [{ "name": "TEXT" }] }
        ],
        "links": []
    });
    let items = json!([
        {
            "file_path": "a.mp4",
            "name": "a.mp4",
            "workflowNorm": graph.to_string(),
            "widgetValues": { "stale": 1 }
        }
    ]);
    let response = post_json(
        app,
        "/review",
        json!({
            "items": items,
            "view": "outputs",
            "filter": { "allowedTypes": ["CheckpointLoaderSimple"], "enabled": true }
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let fields = &json["rows"][0]["widgetValues"];
    assert_eq!(fields, &json!({ "CheckpointLoaderSimple #4.MODEL": "base.safetensors" }));
    let headers = json["headers"].as_array().unwrap();
    assert!(headers.contains(&json!("CheckpointLoaderSimple #4.MODEL")));
    assert!(!headers.contains(&json!("stale")));
}

#[tokio::test]
async fn review_rejects_unknown_sort_key() {
    let app = common::build_test_app();
    let response = post_json(
        app,
        "/review",
        json!({ "items": [], "sort": { "key": "bogus" } }),
    )
    .await;

    assert!(response.status().is_client_error());
}
