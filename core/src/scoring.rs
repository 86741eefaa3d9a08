//! Lexical scoring strategies.
//!
//! Both strategies read the same [`InvertedIndex`] and receive the same
//! tokenized query, so their scores differ only in the weighting math. Scores
//! are model-specific and not comparable across models.
//!
//! A document is scored iff it shares at least one query term. Query terms
//! missing from the index contribute nothing. Repeated query terms contribute
//! once per occurrence.

use crate::index::{DocId, InvertedIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Shared interface of the ranking strategies.
pub trait Scorer {
    /// Score every document that contains at least one of `terms`.
    fn score(&self, terms: &[String], index: &InvertedIndex) -> HashMap<DocId, f64>;
}

/// Term-frequency component of TF-IDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TfWeighting {
    /// Raw occurrence count.
    Raw,
    /// `1 + ln(count)`.
    #[default]
    #[serde(alias = "log")]
    LogScaled,
}

impl TfWeighting {
    pub fn weight(self, count: u32) -> f64 {
        if count == 0 {
            return 0.0;
        }
        match self {
            TfWeighting::Raw => count as f64,
            TfWeighting::LogScaled => 1.0 + (count as f64).ln(),
        }
    }
}

impl FromStr for TfWeighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(TfWeighting::Raw),
            "log" | "log_scaled" => Ok(TfWeighting::LogScaled),
            other => Err(format!("unknown tf weighting `{other}`, expected `raw` or `log`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TfIdfParams {
    pub tf: TfWeighting,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Document-length normalization, 0 disables it.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// `ln(N / df)`. Zero when the term is in every document or nowhere.
pub fn tfidf_idf(n: usize, df: usize) -> f64 {
    if n == 0 || df == 0 {
        return 0.0;
    }
    (n as f64 / df as f64).ln()
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`, non-negative for every `df` in `[0, N]`.
pub fn bm25_idf(n: usize, df: usize) -> f64 {
    let n = n as f64;
    let df = df as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfScorer {
    pub params: TfIdfParams,
}

impl TfIdfScorer {
    pub fn new(params: TfIdfParams) -> Self { Self { params } }
}

impl Scorer for TfIdfScorer {
    fn score(&self, terms: &[String], index: &InvertedIndex) -> HashMap<DocId, f64> {
        let n = index.document_count();
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for term in terms {
            let postings = index.term_postings(term);
            if postings.is_empty() {
                continue;
            }
            let idf = tfidf_idf(n, postings.len());
            for p in postings {
                *scores.entry(p.doc_id).or_insert(0.0) += self.params.tf.weight(p.term_frequency) * idf;
            }
        }
        scores
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Bm25Scorer {
    pub params: Bm25Params,
}

impl Bm25Scorer {
    pub fn new(params: Bm25Params) -> Self { Self { params } }
}

impl Scorer for Bm25Scorer {
    fn score(&self, terms: &[String], index: &InvertedIndex) -> HashMap<DocId, f64> {
        let n = index.document_count();
        let Bm25Params { k1, b } = self.params;
        // A corpus of empty documents has avgdl 0; every |d| is 0 too, so any
        // positive stand-in leaves the ratio |d| / avgdl at 0.
        let avgdl = match index.average_document_length() {
            x if x > 0.0 => x,
            _ => 1.0,
        };
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for term in terms {
            let postings = index.term_postings(term);
            if postings.is_empty() {
                continue;
            }
            let idf = bm25_idf(n, postings.len());
            for p in postings {
                let tf = p.term_frequency as f64;
                let dl = index.document_length(p.doc_id).unwrap_or(0) as f64;
                let tf_norm = (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * dl / avgdl));
                *scores.entry(p.doc_id).or_insert(0.0) += idf * tf_norm;
            }
        }
        scores
    }
}
