//! Process-wide search context.
//!
//! The index lives behind a reader-writer lock as an `Arc` snapshot. Readers
//! clone the `Arc` under a brief read lock and score without holding any lock.
//! Writers prepare their change off-lock, then apply it under the write lock to
//! a copy-on-write index, so a reader never sees a half-applied document.
//! Writers are serialized with each other, so a rebuild cannot drop a document
//! added while the corpus was being listed.

use crate::benchmark::{self, BenchmarkReport};
use crate::config::EngineConfig;
use crate::error::{Result, SearchError};
use crate::evaluation::{self, EvaluationQuery, EvaluationReport, PrecisionReport};
use crate::index::{DocId, Document, DocumentEntry, IndexStats, InvertedIndex};
use crate::retrieval::{Model, Retriever, ScoredResult};
use crate::store::DocumentStore;
use crate::tokenizer::Tokenizer;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;

pub struct SearchService {
    config: EngineConfig,
    tokenizer: Tokenizer,
    index: RwLock<Option<Arc<InvertedIndex>>>,
    writer: Mutex<()>,
}

impl SearchService {
    /// A service whose index is not built yet; queries fail with
    /// [`SearchError::IndexUnavailable`] until [`rebuild`](Self::rebuild) or
    /// [`add_document`](Self::add_document) runs.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.tokenizer),
            config,
            index: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    /// Build from a store listing and swap the result in.
    pub fn from_store(config: EngineConfig, store: &dyn DocumentStore) -> anyhow::Result<Self> {
        let service = Self::new(config);
        service.rebuild(store)?;
        Ok(service)
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    /// Rebuild the whole index from the store's current corpus.
    /// `add_document` calls made meanwhile wait for the swap and land in the new index.
    pub fn rebuild(&self, store: &dyn DocumentStore) -> anyhow::Result<IndexStats> {
        let _writer = self.writer.lock();
        let docs = store.list_documents()?;
        Ok(self.swap_in(docs))
    }

    /// Replace the index with one built from `documents`.
    pub fn rebuild_from<I>(&self, documents: I) -> IndexStats
    where
        I: IntoIterator<Item = Document>,
    {
        let _writer = self.writer.lock();
        self.swap_in(documents)
    }

    fn swap_in<I>(&self, documents: I) -> IndexStats
    where
        I: IntoIterator<Item = Document>,
    {
        let fresh = InvertedIndex::build(documents, &self.tokenizer);
        let stats = fresh.stats();
        *self.index.write() = Some(Arc::new(fresh));
        tracing::info!(
            documents = stats.document_count,
            terms = stats.term_count,
            avgdl = stats.average_document_length,
            "index rebuilt"
        );
        stats
    }

    /// Index `doc`, replacing any previous version with the same id.
    pub fn add_document(&self, doc: Document) -> IndexStats {
        let entry = DocumentEntry::new(doc, &self.tokenizer);
        let (doc_id, length) = (entry.id(), entry.length());
        let _writer = self.writer.lock();
        let mut guard = self.index.write();
        // Clones the whole index when a reader still holds the old snapshot.
        // That O(corpus) copy per ingestion is intended.
        let index = Arc::make_mut(guard.get_or_insert_with(Default::default));
        index.insert(entry);
        let stats = index.stats();
        drop(guard);
        tracing::info!(doc_id, length, documents = stats.document_count, "document indexed");
        stats
    }

    /// The current index snapshot. Later writes do not affect it.
    pub fn snapshot(&self) -> Result<Arc<InvertedIndex>> {
        self.index.read().clone().ok_or(SearchError::IndexUnavailable)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        Ok(self.snapshot()?.stats())
    }

    pub fn retrieve(&self, query: &str, model: Model, k: usize) -> Result<Vec<ScoredResult>> {
        let index = self.snapshot()?;
        Retriever::new(&index, &self.tokenizer, &self.config).retrieve(query, model, k)
    }

    pub fn benchmark(&self, query: &str, k: usize) -> Result<BenchmarkReport> {
        let index = self.snapshot()?;
        benchmark::benchmark(&Retriever::new(&index, &self.tokenizer, &self.config), query, k)
    }

    pub fn precision_at_k(
        &self,
        query: &str,
        relevant: &HashSet<DocId>,
        model: Model,
        k: usize,
    ) -> Result<PrecisionReport> {
        let index = self.snapshot()?;
        let retriever = Retriever::new(&index, &self.tokenizer, &self.config);
        evaluation::precision_report(&retriever, query, relevant, model, k)
    }

    pub fn evaluate(&self, queries: &[EvaluationQuery], model: Model, k: usize) -> Result<EvaluationReport> {
        let index = self.snapshot()?;
        let retriever = Retriever::new(&index, &self.tokenizer, &self.config);
        evaluation::evaluate(&retriever, queries, model, k)
    }
}
