use crate::error::Result;
use crate::index::DocId;
use crate::retrieval::{Model, Retriever, ScoredResult};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ModelRun {
    pub model: Model,
    pub results: Vec<ScoredResult>,
    pub latency_ms: f64,
}

impl ModelRun {
    pub fn ids(&self) -> Vec<DocId> {
        self.results.iter().map(|r| r.document_id).collect()
    }
}

/// Side-by-side run of both models over one snapshot and one tokenized query.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub query: String,
    pub k: usize,
    pub terms: Vec<String>,
    pub bm25: ModelRun,
    pub tfidf: ModelRun,
    /// Jaccard overlap of the two top-k id sets.
    pub overlap: f64,
    /// Ids present in both top-k lists, ascending.
    pub shared_ids: Vec<DocId>,
    /// Kendall tau-a over the shared ids, `None` when fewer than two are shared.
    pub rank_correlation: Option<f64>,
}

pub fn benchmark(retriever: &Retriever<'_>, query: &str, k: usize) -> Result<BenchmarkReport> {
    let k = retriever.check_k(i64::try_from(k).unwrap_or(i64::MAX))?;
    let terms = retriever.query_terms(query)?;
    let bm25 = timed_run(retriever, &terms, Model::Bm25, k);
    let tfidf = timed_run(retriever, &terms, Model::TfIdf, k);

    let (a, b) = (bm25.ids(), tfidf.ids());
    let overlap = jaccard(&a, &b);
    let shared_ids: Vec<DocId> = {
        let left: BTreeSet<DocId> = a.iter().copied().collect();
        let right: BTreeSet<DocId> = b.iter().copied().collect();
        left.intersection(&right).copied().collect()
    };
    let rank_correlation = kendall_tau(&a, &b);
    tracing::debug!(
        k,
        overlap,
        bm25_ms = bm25.latency_ms,
        tfidf_ms = tfidf.latency_ms,
        "benchmark"
    );

    Ok(BenchmarkReport {
        query: query.to_string(),
        k,
        terms,
        bm25,
        tfidf,
        overlap,
        shared_ids,
        rank_correlation,
    })
}

fn timed_run(retriever: &Retriever<'_>, terms: &[String], model: Model, k: usize) -> ModelRun {
    let start = Instant::now();
    let results = retriever.retrieve_terms(terms, model, k);
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    ModelRun { model, results, latency_ms }
}

/// `|A ∩ B| / |A ∪ B|`, 0 when both lists are empty.
pub fn jaccard(a: &[DocId], b: &[DocId]) -> f64 {
    let left: BTreeSet<DocId> = a.iter().copied().collect();
    let right: BTreeSet<DocId> = b.iter().copied().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Kendall tau-a between two rankings, restricted to the ids they share.
pub fn kendall_tau(a: &[DocId], b: &[DocId]) -> Option<f64> {
    let rank_b: HashMap<DocId, usize> = b.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    // Shared ids in `a` order, paired with their rank in `b`.
    let ranks: Vec<usize> = a.iter().filter_map(|id| rank_b.get(id).copied()).collect();
    let n = ranks.len();
    if n < 2 {
        return None;
    }
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            if ranks[i] < ranks[j] {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }
    let pairs = (n * (n - 1) / 2) as f64;
    Some((concordant - discordant) as f64 / pairs)
}
