use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use smartkeep_core::benchmark::BenchmarkReport;
use smartkeep_core::evaluation::{EvaluationQuery, PrecisionReport, QueryEvaluation};
use smartkeep_core::{DocId, Document, IndexStats, Model, NewDocument, ScoredResult, SearchError};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::error::ApiError;
use crate::extract::parse_url;
use crate::AppState;

fn default_model() -> String { "bm25".into() }
fn default_k() -> i64 { 5 }

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_k")]
    pub top_k: i64,
}

#[derive(Deserialize)]
pub struct FixedModelParams {
    pub query: String,
    #[serde(default = "default_k")]
    pub top_k: i64,
}

#[derive(Deserialize)]
pub struct EvaluateParams {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_k")]
    pub k: i64,
}

#[derive(Deserialize)]
pub struct EvaluateRequest {
    pub queries: Vec<EvaluationQuery>,
}

#[derive(Deserialize)]
pub struct PrecisionParams {
    pub query: String,
    pub relevant_ids: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_k")]
    pub k: i64,
}

#[derive(Deserialize)]
pub struct ManualContentRequest {
    pub title: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub model: Model,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ScoredResult>,
}

#[derive(Serialize)]
pub struct EvaluationMetrics {
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub mean_average_precision: f64,
    pub num_queries: usize,
    pub individual_results: Vec<QueryEvaluation>,
}

#[derive(Serialize)]
pub struct EvaluateResponse {
    pub model: Model,
    pub k: usize,
    /// query → precision@k
    pub results: BTreeMap<String, f64>,
    pub metrics: EvaluationMetrics,
}

fn positive_k(k: i64) -> Result<usize, ApiError> {
    if k <= 0 {
        return Err(SearchError::InvalidK(k).into());
    }
    Ok(usize::try_from(k).unwrap_or(usize::MAX))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params.map(|Query(p)| p).map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(b)| b).map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn run_search(state: &AppState, query: String, model: Model, top_k: i64) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let k = positive_k(top_k)?;
    let results = state.service.retrieve(&query, model, k)?;
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query, model, took_s: elapsed.as_secs_f64(), total_hits: results.len(), results }))
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let params = query_params(params)?;
    let model: Model = params.model.parse()?;
    run_search(&state, params.query, model, params.top_k)
}

pub async fn search_tfidf(
    State(state): State<AppState>,
    params: Result<Query<FixedModelParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let params = query_params(params)?;
    run_search(&state, params.query, Model::TfIdf, params.top_k)
}

pub async fn benchmark(
    State(state): State<AppState>,
    params: Result<Query<FixedModelParams>, QueryRejection>,
) -> Result<Json<BenchmarkReport>, ApiError> {
    let params = query_params(params)?;
    let k = positive_k(params.top_k)?;
    Ok(Json(state.service.benchmark(&params.query, k)?))
}

pub async fn evaluate(
    State(state): State<AppState>,
    params: Result<Query<EvaluateParams>, QueryRejection>,
    body: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let params = query_params(params)?;
    let body = json_body(body)?;
    let model: Model = params.model.parse()?;
    let k = positive_k(params.k)?;
    let report = state.service.evaluate(&body.queries, model, k)?;
    Ok(Json(EvaluateResponse {
        model,
        k: report.k,
        results: report.precision_by_query(),
        metrics: EvaluationMetrics {
            precision_at_k: report.mean_precision_at_k(),
            recall_at_k: report.mean_recall_at_k(),
            mean_average_precision: report.mean_average_precision(),
            num_queries: report.queries.len(),
            individual_results: report.queries,
        },
    }))
}

/// Parse a comma-separated id list; blanks between commas are ignored.
pub fn parse_relevant_ids(raw: &str) -> Result<HashSet<DocId>, ApiError> {
    let mut ids = HashSet::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = part.parse::<DocId>().map_err(|_| {
            ApiError::BadRequest("relevant_ids must be comma-separated non-negative integers".into())
        })?;
        ids.insert(id);
    }
    if ids.is_empty() {
        return Err(ApiError::BadRequest("at least one relevant id is required".into()));
    }
    Ok(ids)
}

pub async fn evaluate_precision(
    State(state): State<AppState>,
    params: Result<Query<PrecisionParams>, QueryRejection>,
) -> Result<Json<PrecisionReport>, ApiError> {
    let params = query_params(params)?;
    let model: Model = params.model.parse()?;
    let k = positive_k(params.k)?;
    let relevant = parse_relevant_ids(&params.relevant_ids)?;
    Ok(Json(state.service.precision_at_k(&params.query, &relevant, model, k)?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<IndexStats>, ApiError> {
    Ok(Json(state.service.stats()?))
}

pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.store.list_documents()?))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<DocId>,
) -> Result<Json<Document>, ApiError> {
    state
        .store
        .get_document(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("document {id} not found")))
}

/// Store the document, then index it. The index never references a document
/// the store does not hold.
fn ingest(state: &AppState, doc: NewDocument) -> Result<Document, ApiError> {
    let stored = state.store.insert_document(doc)?;
    state.service.add_document(stored.clone());
    Ok(stored)
}

/// `POST /documents`: ingest a document with its domain and source URL as given.
pub async fn create_document(
    State(state): State<AppState>,
    body: Result<Json<NewDocument>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let doc = json_body(body)?;
    if doc.title.trim().is_empty() || doc.content.trim().is_empty() {
        return Err(ApiError::BadRequest("title and content must not be empty".into()));
    }
    Ok(Json(ingest(&state, doc)?))
}

pub async fn create_manual(
    State(state): State<AppState>,
    body: Result<Json<ManualContentRequest>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let body = json_body(body)?;
    if body.title.trim().is_empty() || body.content.trim().is_empty() {
        return Err(ApiError::BadRequest("title and content must not be empty".into()));
    }
    Ok(Json(ingest(&state, NewDocument::manual(body.title, body.content))?))
}

pub async fn create_from_url(
    State(state): State<AppState>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let body = json_body(body)?;
    let url = parse_url(&body.url).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let doc = state
        .fetcher
        .fetch(&url)
        .await
        .map_err(|e| ApiError::FetchFailed(format!("Unable to fetch URL: {e}")))?;
    Ok(Json(ingest(&state, doc)?))
}
