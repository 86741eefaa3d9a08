//! Document stores the search service reads its corpus from.
//!
//! Stores own documents and assign their ids; the index only ever derives state
//! from what a store lists.

use crate::index::{DocId, Document};
use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use time::format_description::well_known::Rfc3339;

/// A document as submitted for ingestion, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl NewDocument {
    pub fn manual(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into(), domain: None, source_url: None }
    }

    fn into_document(self, id: DocId) -> Document {
        Document {
            id,
            title: self.title,
            content: self.content,
            domain: self.domain,
            source_url: self.source_url,
            created_at: Some(now_rfc3339()),
        }
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

pub trait DocumentStore: Send + Sync {
    /// Every stored document in ascending id order.
    fn list_documents(&self) -> Result<Vec<Document>>;

    fn get_document(&self, id: DocId) -> Result<Option<Document>>;

    /// Persist a new document under the next free id (ids start at 1).
    fn insert_document(&self, doc: NewDocument) -> Result<Document>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<DocId, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl DocumentStore for MemoryStore {
    fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.docs.read().values().cloned().collect())
    }

    fn get_document(&self, id: DocId) -> Result<Option<Document>> {
        Ok(self.docs.read().get(&id).cloned())
    }

    fn insert_document(&self, doc: NewDocument) -> Result<Document> {
        let mut docs = self.docs.write();
        let id = docs.keys().next_back().map_or(1, |last| last + 1);
        let doc = doc.into_document(id);
        docs.insert(id, doc.clone());
        Ok(doc)
    }
}

/// Documents persisted in a sled tree. Keys are big-endian ids so the tree
/// iterates in ascending id order; values are bincode-encoded [`Document`]s.
pub struct SledStore {
    db: sled::Db,
    insert_lock: Mutex<()>,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("opening document store {}", path.display()))?;
        Ok(Self { db, insert_lock: Mutex::new(()) })
    }

    pub fn len(&self) -> usize { self.db.len() }

    pub fn is_empty(&self) -> bool { self.db.is_empty() }

    fn decode(bytes: &[u8]) -> Result<Document> {
        let doc = bincode::deserialize(bytes).context("decoding stored document")?;
        Ok(doc)
    }
}

impl DocumentStore for SledStore {
    fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(self.db.len());
        for entry in self.db.iter() {
            let (_key, value) = entry?;
            docs.push(Self::decode(&value)?);
        }
        Ok(docs)
    }

    fn get_document(&self, id: DocId) -> Result<Option<Document>> {
        match self.db.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(Self::decode(&value)?)),
            None => Ok(None),
        }
    }

    fn insert_document(&self, doc: NewDocument) -> Result<Document> {
        let _guard = self.insert_lock.lock();
        let id = match self.db.last()? {
            Some((key, _)) => {
                let bytes = <[u8; 8]>::try_from(&key[..]).context("malformed document key")?;
                DocId::from_be_bytes(bytes) + 1
            }
            None => 1,
        };
        let doc = doc.into_document(id);
        let bytes = bincode::serialize(&doc)?;
        self.db.insert(id.to_be_bytes(), bytes)?;
        self.db.flush()?;
        Ok(doc)
    }
}
