pub mod benchmark;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod index;
pub mod retrieval;
pub mod scoring;
pub mod service;
pub mod store;
pub mod tokenizer;

pub use config::EngineConfig;
pub use error::SearchError;
pub use index::{DocId, Document, IndexStats, InvertedIndex, Posting};
pub use retrieval::{Model, ScoredResult};
pub use service::SearchService;
pub use store::{DocumentStore, MemoryStore, NewDocument, SledStore};
