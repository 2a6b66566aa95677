use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use engine::{DocId, FsStorage, IndexConfig, InvertedIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_PAGE: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    /// Continue after this doc id (the previous page's `next_after`).
    pub after: Option<DocId>,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub terms: Vec<TermStats>,
    pub results: Vec<SearchHit>,
    /// Pass as `after` to fetch the next page; absent on the last page.
    pub next_after: Option<DocId>,
}

#[derive(Serialize)]
pub struct TermStats {
    pub term: String,
    pub doc_frequency: u32,
    pub term_frequency: u64,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub url: Option<String>,
    pub length: u32,
    pub popularity: f32,
    pub num_views: u32,
    /// Occurrences of each query term in this document.
    pub term_frequencies: BTreeMap<String, u32>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub num_docs: u32,
    pub num_terms: usize,
    pub total_term_frequency: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<InvertedIndex>,
}

type ApiError = (StatusCode, String);

fn internal(e: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub fn build_app(index_dir: String, config: IndexConfig) -> Result<Router> {
    let index = InvertedIndex::open(&FsStorage::new(&index_dir), config)?;
    Ok(router(Arc::new(index)))
}

pub fn router(index: Arc<InvertedIndex>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/term/:term", get(term_handler))
        .route("/stats", get(stats_handler))
        .with_state(AppState { index })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    // evaluation is blocking disk work; each request gets its own context
    tokio::task::spawn_blocking(move || run_search(&state.index, params))
        .await
        .map_err(internal)?
        .map(Json)
        .map_err(internal)
}

fn run_search(index: &InvertedIndex, params: SearchParams) -> engine::Result<SearchResponse> {
    let start = std::time::Instant::now();
    let query = engine::Query::parse(&params.q);
    let k = params.k.clamp(1, MAX_PAGE);
    let mut ctx = index.context();

    let docs = ctx.matching_documents(&query, params.after, k)?;
    let terms = query.terms();
    let mut results = Vec::with_capacity(docs.len());
    for doc in &docs {
        let mut term_frequencies = BTreeMap::new();
        for term in &terms {
            term_frequencies.insert(term.to_string(), ctx.document_term_frequency(term, doc.doc_id)?);
        }
        results.push(SearchHit {
            doc_id: doc.doc_id,
            title: doc.title.clone(),
            url: doc.url.clone(),
            length: doc.length,
            popularity: doc.popularity,
            num_views: doc.num_views,
            term_frequencies,
        });
    }
    let mut stats = Vec::with_capacity(terms.len());
    for term in &terms {
        stats.push(TermStats {
            term: term.to_string(),
            doc_frequency: ctx.corpus_doc_frequency_by_term(term)?,
            term_frequency: ctx.corpus_term_frequency(term)?,
        });
    }
    let next_after = if docs.len() == k { docs.last().map(|d| d.doc_id) } else { None };
    Ok(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), terms: stats, results, next_after })
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(doc) = state.index.get_doc(doc_id) else {
        return Err((StatusCode::NOT_FOUND, format!("no document {doc_id}")));
    };
    let doc = doc.clone();
    let index = state.index.clone();
    let terms = tokio::task::spawn_blocking(move || index.get_doc_term_map(doc_id))
        .await
        .map_err(internal)?
        .map_err(internal)?;
    let terms: BTreeMap<String, u32> = terms.into_iter().collect();
    Ok(Json(serde_json::json!({
        "doc_id": doc.doc_id,
        "title": doc.title,
        "url": doc.url,
        "length": doc.length,
        "popularity": doc.popularity,
        "num_views": doc.num_views,
        "terms": terms,
    })))
}

pub async fn term_handler(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<Json<TermStats>, ApiError> {
    let index = state.index.clone();
    tokio::task::spawn_blocking(move || -> engine::Result<TermStats> {
        // raw terms go through the document tokenizer so "Cats" finds "cat"
        let term = engine::tokenizer::tokenize(&term).into_iter().next().unwrap_or(term);
        let list = index.postings(&term)?;
        Ok(TermStats {
            doc_frequency: list.as_ref().map_or(0, |l| l.doc_frequency()),
            term_frequency: list.as_ref().map_or(0, |l| l.term_frequency()),
            term,
        })
    })
    .await
    .map_err(internal)?
    .map(Json)
    .map_err(internal)
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        num_docs: state.index.num_docs(),
        num_terms: state.index.num_terms(),
        total_term_frequency: state.index.total_term_frequency(),
    })
}
