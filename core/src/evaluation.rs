//! Ranking quality metrics against caller-supplied relevance judgements.
//!
//! Metrics only look at the ordered ids a model retrieved, so new ones can be
//! added here without touching the retrieval path. Relevant ids that are not in
//! the corpus are accepted; they simply never match.

use crate::error::Result;
use crate::index::DocId;
use crate::retrieval::{Model, Retriever};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Relevant hits among the first `k` retrieved, divided by `k` itself, so a
/// short result list is penalized rather than rewarded.
pub fn precision_at_k(retrieved: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    hits(retrieved, relevant, k) as f64 / k as f64
}

/// Relevant hits among the first `k` retrieved, divided by the number of relevant ids.
pub fn recall_at_k(retrieved: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    hits(retrieved, relevant, k) as f64 / relevant.len() as f64
}

/// Mean of precision@i over the ranks i holding a relevant id, divided by `|relevant|`.
pub fn average_precision(retrieved: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut found = 0usize;
    let mut sum = 0.0;
    for (i, id) in retrieved.iter().enumerate() {
        if relevant.contains(id) {
            found += 1;
            sum += found as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

pub fn mean_average_precision<'a, I>(runs: I) -> f64
where
    I: IntoIterator<Item = (&'a [DocId], &'a HashSet<DocId>)>,
{
    let mut n = 0usize;
    let mut total = 0.0;
    for (retrieved, relevant) in runs {
        total += average_precision(retrieved, relevant);
        n += 1;
    }
    if n == 0 { 0.0 } else { total / n as f64 }
}

fn hits(retrieved: &[DocId], relevant: &HashSet<DocId>, k: usize) -> usize {
    retrieved.iter().take(k).filter(|id| relevant.contains(id)).count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationQuery {
    pub query: String,
    pub relevant_ids: Vec<DocId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecisionReport {
    pub query: String,
    pub model: Model,
    pub k: usize,
    pub retrieved_ids: Vec<DocId>,
    pub relevant_ids: Vec<DocId>,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEvaluation {
    pub query: String,
    pub retrieved_ids: Vec<DocId>,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub average_precision: f64,
}

/// Per-query results in input order. Aggregates are derived, not stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub model: Model,
    pub k: usize,
    pub queries: Vec<QueryEvaluation>,
}

impl EvaluationReport {
    /// Query → precision@k. A query listed twice keeps its last value.
    pub fn precision_by_query(&self) -> BTreeMap<String, f64> {
        self.queries.iter().map(|q| (q.query.clone(), q.precision_at_k)).collect()
    }

    pub fn mean_precision_at_k(&self) -> f64 { self.mean(|q| q.precision_at_k) }

    pub fn mean_recall_at_k(&self) -> f64 { self.mean(|q| q.recall_at_k) }

    pub fn mean_average_precision(&self) -> f64 { self.mean(|q| q.average_precision) }

    fn mean(&self, f: impl Fn(&QueryEvaluation) -> f64) -> f64 {
        if self.queries.is_empty() {
            return 0.0;
        }
        self.queries.iter().map(f).sum::<f64>() / self.queries.len() as f64
    }
}

fn retrieved_ids(retriever: &Retriever<'_>, query: &str, model: Model, k: usize) -> Result<Vec<DocId>> {
    Ok(retriever.retrieve(query, model, k)?.into_iter().map(|r| r.document_id).collect())
}

pub fn precision_report(
    retriever: &Retriever<'_>,
    query: &str,
    relevant: &HashSet<DocId>,
    model: Model,
    k: usize,
) -> Result<PrecisionReport> {
    let k = retriever.check_k(i64::try_from(k).unwrap_or(i64::MAX))?;
    let retrieved = retrieved_ids(retriever, query, model, k)?;
    let mut relevant_ids: Vec<DocId> = relevant.iter().copied().collect();
    relevant_ids.sort_unstable();
    Ok(PrecisionReport {
        query: query.to_string(),
        model,
        k,
        precision_at_k: precision_at_k(&retrieved, relevant, k),
        recall_at_k: recall_at_k(&retrieved, relevant, k),
        retrieved_ids: retrieved,
        relevant_ids,
    })
}

pub fn evaluate(
    retriever: &Retriever<'_>,
    queries: &[EvaluationQuery],
    model: Model,
    k: usize,
) -> Result<EvaluationReport> {
    let k = retriever.check_k(i64::try_from(k).unwrap_or(i64::MAX))?;
    let mut out = Vec::with_capacity(queries.len());
    for item in queries {
        let relevant: HashSet<DocId> = item.relevant_ids.iter().copied().collect();
        let retrieved = retrieved_ids(retriever, &item.query, model, k)?;
        out.push(QueryEvaluation {
            query: item.query.clone(),
            precision_at_k: precision_at_k(&retrieved, &relevant, k),
            recall_at_k: recall_at_k(&retrieved, &relevant, k),
            average_precision: average_precision(&retrieved, &relevant),
            retrieved_ids: retrieved,
        });
    }
    Ok(EvaluationReport { model, k, queries: out })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[DocId]) -> HashSet<DocId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn precision_counts_hits_over_k() {
        let p = precision_at_k(&[2, 4, 1], &set(&[1, 4, 5]), 3);
        assert!((p - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn short_lists_are_penalized() {
        assert_eq!(precision_at_k(&[1], &set(&[1]), 4), 0.25);
        assert_eq!(precision_at_k(&[], &set(&[1]), 4), 0.0);
        assert_eq!(precision_at_k(&[1], &set(&[1]), 0), 0.0);
    }

    #[test]
    fn recall_and_average_precision() {
        let relevant = set(&[1, 3, 8]);
        assert!((recall_at_k(&[1, 2, 3], &relevant, 3) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(recall_at_k(&[1, 2, 3], &set(&[]), 3), 0.0);
        // ranks 1 and 3 are relevant: (1/1 + 2/3) / 3
        let ap = average_precision(&[1, 2, 3], &relevant);
        assert!((ap - (1.0 + 2.0 / 3.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn map_averages_over_queries() {
        let r1 = set(&[1]);
        let r2 = set(&[9]);
        let a: Vec<DocId> = vec![1, 2];
        let b: Vec<DocId> = vec![1, 2];
        let map = mean_average_precision([(a.as_slice(), &r1), (b.as_slice(), &r2)]);
        assert_eq!(map, 0.5);
        assert_eq!(mean_average_precision(Vec::<(&[DocId], &HashSet<DocId>)>::new()), 0.0);
    }
}
