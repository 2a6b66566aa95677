use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::{DocumentMeta, FsStorage, IndexBuilder, IndexConfig};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let storage = Arc::new(FsStorage::new(dir));
    let mut builder = IndexBuilder::new(storage, IndexConfig::default().with_partition_size(2)).unwrap();
    let docs = [
        ("Doc 0", "rust is great and rust is fast"),
        ("Doc 1", "learning rust"),
        ("Doc 2", "systems programming"),
        ("Doc 3", "rust systems programming"),
    ];
    for (title, text) in docs {
        builder.add_text(DocumentMeta::titled(title), text).unwrap();
    }
    builder.finish().unwrap();
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn app(dir: &std::path::Path) -> Router {
    server::build_app(dir.to_string_lossy().to_string(), IndexConfig::default()).unwrap()
}

#[tokio::test]
async fn search_returns_matches_in_doc_order() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app(dir.path()), "/search?q=rust&k=10").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let ids: Vec<u64> = json["results"].as_array().unwrap().iter().map(|r| r["doc_id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 3]);
    assert_eq!(json["results"][0]["term_frequencies"]["rust"], 2);
    assert_eq!(json["terms"][0]["doc_frequency"], 3);
    assert_eq!(json["terms"][0]["term_frequency"], 4);
    assert!(json["next_after"].is_null());
}

#[tokio::test]
async fn search_pages_with_next_after() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (_, body) = call(app(dir.path()), "/search?q=rust&k=2").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
    assert_eq!(json["next_after"], 1);

    let (_, body) = call(app(dir.path()), "/search?q=rust&k=2&after=1").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["doc_id"], 3);
    assert!(json["next_after"].is_null());
}

#[tokio::test]
async fn phrase_query_requires_adjacency() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (_, body) = call(app(dir.path()), "/search?q=%22rust%20systems%22").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["title"], "Doc 3");
}

#[tokio::test]
async fn doc_term_and_stats_endpoints() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, body) = call(app(dir.path()), "/doc/1").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "Doc 1");
    assert_eq!(json["length"], 2);
    assert_eq!(json["terms"]["rust"], 1);

    let (status, _) = call(app(dir.path()), "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(app(dir.path()), "/term/systems").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["doc_frequency"], 2);

    let (_, body) = call(app(dir.path()), "/term/absent").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["doc_frequency"], 0);
    assert_eq!(json["term_frequency"], 0);

    let (_, body) = call(app(dir.path()), "/stats").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["num_docs"], 4);
    assert_eq!(json["total_term_frequency"], 14);
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let (status, body) = call(app(dir.path()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}
