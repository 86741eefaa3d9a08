use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub type DocId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub content: String,
    /// Source site, e.g. `en.wikipedia.org`.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// RFC 3339 timestamp assigned by the document store.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub term_count: usize,
    pub average_document_length: f64,
}

/// A document tokenized and counted, ready to be applied to an index.
///
/// Preparing entries needs no access to the index, so callers do the
/// tokenization before taking any lock and keep the critical section to
/// [`InvertedIndex::insert`].
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    document: Arc<Document>,
    length: u32,
    term_counts: Vec<(String, u32)>, // sorted by term
}

impl DocumentEntry {
    pub fn new(document: Document, tokenizer: &Tokenizer) -> Self {
        let tokens = tokenizer.tokenize(&document.content);
        let length = tokens.len() as u32;
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
        Self { document: Arc::new(document), length, term_counts: counts.into_iter().collect() }
    }

    pub fn id(&self) -> DocId { self.document.id }

    pub fn length(&self) -> u32 { self.length }
}

#[derive(Debug, Clone)]
struct IndexedDoc {
    document: Arc<Document>,
    length: u32,
    terms: Vec<String>,
}

/// Term → postings table plus the corpus statistics BM25 needs.
///
/// Postings for every term are kept sorted by ascending `doc_id`, and a term is
/// present iff at least one indexed document contains it, so the document
/// frequency of a term is always the length of its posting list.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
    docs: BTreeMap<DocId, IndexedDoc>,
    total_length: u64,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build an index over a full corpus snapshot.
    pub fn build<I>(documents: I, tokenizer: &Tokenizer) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        let mut index = Self::new();
        for doc in documents {
            index.insert(DocumentEntry::new(doc, tokenizer));
        }
        index
    }

    /// Tokenize and index `doc`, replacing any document with the same id.
    pub fn add_document(&mut self, doc: Document, tokenizer: &Tokenizer) {
        self.insert(DocumentEntry::new(doc, tokenizer));
    }

    /// Apply a prepared entry. Re-inserting an id replaces its postings and
    /// length, so inserting identical content twice leaves the index unchanged.
    pub fn insert(&mut self, entry: DocumentEntry) {
        let doc_id = entry.id();
        self.remove(doc_id);

        let mut terms = Vec::with_capacity(entry.term_counts.len());
        for (term, term_frequency) in entry.term_counts {
            let plist = self.postings.entry(term.clone()).or_default();
            let posting = Posting { doc_id, term_frequency };
            match plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
                Ok(pos) => plist[pos] = posting,
                Err(pos) => plist.insert(pos, posting),
            }
            terms.push(term);
        }
        self.total_length += entry.length as u64;
        self.docs.insert(doc_id, IndexedDoc { document: entry.document, length: entry.length, terms });
    }

    fn remove(&mut self, doc_id: DocId) {
        let Some(old) = self.docs.remove(&doc_id) else { return };
        self.total_length -= old.length as u64;
        for term in old.terms {
            if let Some(plist) = self.postings.get_mut(&term) {
                if let Ok(pos) = plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
                    plist.remove(pos);
                }
                if plist.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }

    /// Postings for `term` in ascending document id order; empty for unknown terms.
    pub fn term_postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.term_postings(term).len()
    }

    pub fn document_count(&self) -> usize { self.docs.len() }

    pub fn term_count(&self) -> usize { self.postings.len() }

    /// Mean token count per document, 0 for an empty corpus.
    pub fn average_document_length(&self) -> f64 {
        if self.docs.is_empty() {
            return 0.0;
        }
        self.total_length as f64 / self.docs.len() as f64
    }

    pub fn document_length(&self, doc_id: DocId) -> Option<u32> {
        self.docs.get(&doc_id).map(|d| d.length)
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docs.get(&doc_id).map(|d| d.document.as_ref())
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            document_count: self.document_count(),
            term_count: self.term_count(),
            average_document_length: self.average_document_length(),
        }
    }
}
