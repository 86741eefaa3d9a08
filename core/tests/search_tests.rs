use smartkeep_core::evaluation::EvaluationQuery;
use smartkeep_core::{
    DocId, Document, DocumentStore, EngineConfig, MemoryStore, Model, NewDocument, SearchError,
    SearchService,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn doc(id: DocId, content: &str) -> Document {
    Document {
        id,
        title: format!("Doc {id}"),
        content: content.into(),
        domain: None,
        source_url: None,
        created_at: None,
    }
}

fn service_with(docs: Vec<Document>) -> SearchService {
    let service = SearchService::new(EngineConfig::default());
    service.rebuild_from(docs);
    service
}

fn ids(results: &[smartkeep_core::ScoredResult]) -> Vec<DocId> {
    results.iter().map(|r| r.document_id).collect()
}

#[test]
fn cat_query_ranks_exact_match_only() {
    let service = service_with(vec![doc(1, "the cat sat on the mat"), doc(2, "dogs and cats are pets")]);
    let hits = service.retrieve("cat", Model::TfIdf, 5).unwrap();
    assert_eq!(ids(&hits), vec![1]);
    assert!(hits[0].score > 0.0);
    assert_eq!(hits[0].title, "Doc 1");
    assert_eq!(hits[0].content, "the cat sat on the mat");
}

#[test]
fn readding_identical_document_is_idempotent() {
    let d = doc(3, "apple banana apple");
    let service = service_with(vec![doc(1, "apple"), doc(2, "cherry banana"), d.clone()]);
    let before = service.snapshot().unwrap();
    service.add_document(d);
    let after = service.snapshot().unwrap();

    for term in ["apple", "banana", "cherry"] {
        assert_eq!(before.term_postings(term), after.term_postings(term));
        assert_eq!(before.document_frequency(term), after.document_frequency(term));
    }
    assert_eq!(before.average_document_length(), after.average_document_length());
    assert_eq!(before.document_count(), after.document_count());
}

#[test]
fn unknown_terms_return_empty_not_error() {
    let service = service_with(vec![doc(1, "apple"), doc(2, "banana")]);
    for model in Model::ALL {
        assert!(service.retrieve("zeppelin", model, 3).unwrap().is_empty());
    }
}

#[test]
fn empty_corpus_is_a_valid_zero_result_response() {
    let service = service_with(Vec::new());
    assert!(service.retrieve("anything", Model::Bm25, 3).unwrap().is_empty());
}

#[test]
fn short_result_lists_exclude_only_non_matching_documents() {
    let docs = vec![
        doc(1, "rust systems language"),
        doc(2, "python scripting"),
        doc(3, "rust rust borrow checker"),
        doc(4, "gardening tips"),
        doc(5, "rust"),
    ];
    let service = service_with(docs.clone());
    let index = service.snapshot().unwrap();
    for model in Model::ALL {
        for k in 1..=6 {
            let hits = service.retrieve("rust borrow", model, k).unwrap();
            assert!(hits.len() <= k);
            if hits.len() < k {
                let returned: HashSet<DocId> = ids(&hits).into_iter().collect();
                for d in docs.iter().filter(|d| !returned.contains(&d.id)) {
                    for term in ["rust", "borrow"] {
                        assert!(index.term_postings(term).iter().all(|p| p.doc_id != d.id));
                    }
                }
            }
        }
    }
}

#[test]
fn zero_score_matches_are_still_returned() {
    // a term present in every document has tf-idf weight ln(N/N) = 0
    let service = service_with(vec![doc(1, "common words"), doc(2, "common ground")]);
    let hits = service.retrieve("common", Model::TfIdf, 5).unwrap();
    assert_eq!(ids(&hits), vec![1, 2]);
    assert!(hits.iter().all(|h| h.score == 0.0));
    let bm25 = service.retrieve("common", Model::Bm25, 5).unwrap();
    assert!(bm25.iter().all(|h| h.score > 0.0));
}

#[test]
fn scores_are_sorted_descending() {
    let service = service_with(vec![
        doc(1, "search engine"),
        doc(2, "search search engine ranking"),
        doc(3, "ranking"),
        doc(4, "engine oil"),
    ]);
    for model in Model::ALL {
        let hits = service.retrieve("search engine ranking", model, 10).unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score), "{model}");
    }
}

#[test]
fn errors_are_typed() {
    let unbuilt = SearchService::new(EngineConfig::default());
    assert_eq!(unbuilt.retrieve("cat", Model::Bm25, 3), Err(SearchError::IndexUnavailable));
    assert_eq!(unbuilt.benchmark("cat", 3).unwrap_err(), SearchError::IndexUnavailable);

    let service = service_with(vec![doc(1, "cat")]);
    assert_eq!(service.retrieve("cat", Model::Bm25, 0), Err(SearchError::InvalidK(0)));
    assert!(matches!(service.retrieve("?!", Model::Bm25, 3), Err(SearchError::InvalidQuery(_))));
    assert_eq!("lsi".parse::<Model>(), Err(SearchError::InvalidModel("lsi".into())));
}

#[test]
fn first_add_makes_index_available() {
    let service = SearchService::new(EngineConfig::default());
    service.add_document(doc(7, "hello world"));
    assert_eq!(ids(&service.retrieve("world", Model::Bm25, 1).unwrap()), vec![7]);
}

#[test]
fn benchmark_is_deterministic() {
    let service = service_with(vec![
        doc(1, "rust ownership and borrowing"),
        doc(2, "ownership of pets"),
        doc(3, "borrowing money"),
        doc(4, "rust on old cars, rust everywhere"),
    ]);
    let first = service.benchmark("rust borrowing", 3).unwrap();
    for _ in 0..5 {
        let again = service.benchmark("rust borrowing", 3).unwrap();
        assert_eq!(first.overlap, again.overlap);
        assert_eq!(first.shared_ids, again.shared_ids);
        assert_eq!(first.rank_correlation, again.rank_correlation);
        assert_eq!(first.bm25.ids(), again.bm25.ids());
        assert_eq!(first.tfidf.ids(), again.tfidf.ids());
    }
    assert_eq!(first.terms, vec!["rust", "borrowing"]);
    assert!(first.bm25.results.len() <= 3 && first.tfidf.results.len() <= 3);
    assert!((0.0..=1.0).contains(&first.overlap));
}

#[test]
fn precision_example_two_thirds() {
    // "alpha" ranks 2, 4, 1 under both models; 3 does not match
    let service = service_with(vec![
        doc(1, "alpha beta gamma delta epsilon"),
        doc(2, "alpha alpha alpha"),
        doc(3, "omega"),
        doc(4, "alpha alpha zeta"),
    ]);
    let relevant: HashSet<DocId> = [1, 4, 5].into_iter().collect();
    for model in Model::ALL {
        let report = service.precision_at_k("alpha", &relevant, model, 3).unwrap();
        assert_eq!(report.retrieved_ids, vec![2, 4, 1], "{model}");
        assert!((report.precision_at_k - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.recall_at_k - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.relevant_ids, vec![1, 4, 5]);
    }
}

#[test]
fn precision_divides_by_requested_k() {
    let service = service_with(vec![doc(1, "needle"), doc(2, "hay")]);
    let relevant: HashSet<DocId> = [1].into_iter().collect();
    let report = service.precision_at_k("needle", &relevant, Model::Bm25, 5).unwrap();
    assert_eq!(report.retrieved_ids, vec![1]);
    assert_eq!(report.precision_at_k, 0.2);
}

#[test]
fn evaluate_reports_each_query_in_order() {
    let service = service_with(vec![doc(1, "red apple"), doc(2, "green apple"), doc(3, "red car")]);
    let queries = vec![
        EvaluationQuery { query: "apple".into(), relevant_ids: vec![1, 2] },
        EvaluationQuery { query: "car".into(), relevant_ids: vec![99] },
    ];
    let report = service.evaluate(&queries, Model::TfIdf, 2).unwrap();
    assert_eq!(report.k, 2);
    assert_eq!(report.queries.len(), 2);
    assert_eq!(report.queries[0].precision_at_k, 1.0);
    assert_eq!(report.queries[1].precision_at_k, 0.0);
    let by_query = report.precision_by_query();
    assert_eq!(by_query["apple"], 1.0);
    assert_eq!(by_query["car"], 0.0);
    assert_eq!(report.mean_precision_at_k(), 0.5);
    assert_eq!(report.mean_average_precision(), 0.5);
}

#[test]
fn rebuild_reads_the_store() {
    let store = MemoryStore::new();
    store.insert_document(NewDocument::manual("One", "first body")).unwrap();
    store.insert_document(NewDocument::manual("Two", "second body")).unwrap();
    let service = SearchService::from_store(EngineConfig::default(), &store).unwrap();
    assert_eq!(service.stats().unwrap().document_count, 2);
    let hits = service.retrieve("second", Model::Bm25, 5).unwrap();
    assert_eq!(hits[0].title, "Two");
}

#[test]
fn readers_run_alongside_writer() {
    let service = Arc::new(service_with(vec![doc(1, "shared term")]));
    let writer = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for id in 2..200 {
                service.add_document(doc(id, "shared term plus more words"));
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..200 {
                    let index = service.snapshot().unwrap();
                    // postings and statistics always come from one consistent version
                    let plist = index.term_postings("shared");
                    assert_eq!(plist.len(), index.document_count());
                    let hits = service.retrieve("shared", Model::Bm25, 10).unwrap();
                    assert!(hits.len() <= 10);
                }
            })
        })
        .collect();
    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(service.stats().unwrap().document_count, 199);
}

/// Signals once the corpus has been listed, then stalls before returning it.
struct SlowListing {
    inner: MemoryStore,
    listed: std::sync::Mutex<Option<mpsc::Sender<()>>>,
}

impl DocumentStore for SlowListing {
    fn list_documents(&self) -> anyhow::Result<Vec<Document>> {
        let docs = self.inner.list_documents()?;
        if let Some(tx) = self.listed.lock().unwrap().take() {
            tx.send(()).unwrap();
        }
        thread::sleep(Duration::from_millis(100));
        Ok(docs)
    }

    fn get_document(&self, id: DocId) -> anyhow::Result<Option<Document>> {
        self.inner.get_document(id)
    }

    fn insert_document(&self, doc: NewDocument) -> anyhow::Result<Document> {
        self.inner.insert_document(doc)
    }
}

#[test]
fn add_during_rebuild_is_not_lost() {
    let inner = MemoryStore::new();
    inner.insert_document(NewDocument::manual("One", "listed before")).unwrap();
    let (tx, rx) = mpsc::channel();
    let store = Arc::new(SlowListing { inner, listed: std::sync::Mutex::new(Some(tx)) });
    let service = Arc::new(SearchService::new(EngineConfig::default()));

    let rebuild = {
        let (service, store) = (Arc::clone(&service), Arc::clone(&store));
        thread::spawn(move || service.rebuild(store.as_ref()).unwrap())
    };
    rx.recv().unwrap();
    let late = store.insert_document(NewDocument::manual("Two", "arrived late")).unwrap();
    service.add_document(late);
    rebuild.join().unwrap();

    assert_eq!(service.stats().unwrap().document_count, 2);
    let hits = service.retrieve("late", Model::Bm25, 5).unwrap();
    assert_eq!(hits[0].title, "Two");
}
