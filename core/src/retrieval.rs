use crate::config::EngineConfig;
use crate::error::{Result, SearchError};
use crate::index::{DocId, InvertedIndex};
use crate::scoring::{Bm25Scorer, Scorer, TfIdfScorer};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Ranking model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Bm25,
    TfIdf,
}

impl Model {
    pub const ALL: [Model; 2] = [Model::Bm25, Model::TfIdf];

    pub const fn as_str(self) -> &'static str {
        match self {
            Model::Bm25 => "bm25",
            Model::TfIdf => "tfidf",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bm25" => Ok(Model::Bm25),
            "tfidf" => Ok(Model::TfIdf),
            _ => Err(SearchError::InvalidModel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    #[serde(rename = "id")]
    pub document_id: DocId,
    pub score: f64,
    pub title: String,
    pub content: String,
    pub domain: Option<String>,
    pub source_url: Option<String>,
}

/// Validate a caller-supplied k and clamp it to `max_top_k`.
pub fn effective_k(k: i64, max_top_k: usize) -> Result<usize> {
    if k <= 0 {
        return Err(SearchError::InvalidK(k));
    }
    Ok((k as u64).min(max_top_k.max(1) as u64) as usize)
}

/// The `k` best entries ordered by descending score, equal scores by ascending id.
pub fn top_k(scores: HashMap<DocId, f64>, k: usize) -> Vec<(DocId, f64)> {
    let by_rank = |a: &(DocId, f64), b: &(DocId, f64)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));
    if k == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<(DocId, f64)> = scores.into_iter().collect();
    if ranked.len() > k {
        ranked.select_nth_unstable_by(k, by_rank);
        ranked.truncate(k);
    }
    ranked.sort_unstable_by(by_rank);
    ranked
}

/// Query-time view over one index snapshot.
pub struct Retriever<'a> {
    index: &'a InvertedIndex,
    tokenizer: &'a Tokenizer,
    config: &'a EngineConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a InvertedIndex, tokenizer: &'a Tokenizer, config: &'a EngineConfig) -> Self {
        Self { index, tokenizer, config }
    }

    /// Validate `k` against this retriever's configured ceiling.
    pub fn check_k(&self, k: i64) -> Result<usize> {
        effective_k(k, self.config.max_top_k)
    }

    /// Tokenize a query with the index's tokenizer. A query with no terms left
    /// after tokenization is rejected.
    pub fn query_terms(&self, query: &str) -> Result<Vec<String>> {
        let terms = self.tokenizer.tokenize(query);
        if terms.is_empty() {
            return Err(SearchError::InvalidQuery(query.to_string()));
        }
        Ok(terms)
    }

    pub fn retrieve(&self, query: &str, model: Model, k: usize) -> Result<Vec<ScoredResult>> {
        let k = self.check_k(i64::try_from(k).unwrap_or(i64::MAX))?;
        let terms = self.query_terms(query)?;
        let results = self.retrieve_terms(&terms, model, k);
        tracing::debug!(%model, k, terms = terms.len(), hits = results.len(), "retrieve");
        Ok(results)
    }

    /// Score already-tokenized terms. `k` is taken as validated.
    pub fn retrieve_terms(&self, terms: &[String], model: Model, k: usize) -> Vec<ScoredResult> {
        let scores = match model {
            Model::Bm25 => Bm25Scorer::new(self.config.bm25).score(terms, self.index),
            Model::TfIdf => TfIdfScorer::new(self.config.tfidf).score(terms, self.index),
        };
        top_k(scores, k)
            .into_iter()
            .filter_map(|(doc_id, score)| {
                let doc = self.index.document(doc_id)?;
                Some(ScoredResult {
                    document_id: doc_id,
                    score,
                    title: doc.title.clone(),
                    content: doc.content.clone(),
                    domain: doc.domain.clone(),
                    source_url: doc.source_url.clone(),
                })
            })
            .collect()
    }
}
