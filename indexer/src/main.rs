use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use smartkeep_core::evaluation::EvaluationQuery;
use smartkeep_core::{DocumentStore, EngineConfig, Model, NewDocument, SearchService, SledStore};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    title: String,
    #[serde(alias = "body")]
    content: String,
    #[serde(alias = "source_url")]
    url: Option<String>,
    domain: Option<String>,
}

impl From<InputDoc> for NewDocument {
    fn from(doc: InputDoc) -> Self {
        NewDocument { title: doc.title, content: doc.content, domain: doc.domain, source_url: doc.url }
    }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load documents into the store and query them with BM25 or TF-IDF", long_about = None)]
struct Cli {
    /// Engine configuration JSON file
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load documents from JSON/JSONL files or a directory into the store
    Load {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Document store directory
        #[arg(long, default_value = "./data/documents")]
        store: String,
    },
    /// Run one query against the stored corpus
    Search {
        #[arg(long, default_value = "./data/documents")]
        store: String,
        #[arg(long)]
        query: String,
        /// bm25 or tfidf
        #[arg(long, default_value = "bm25")]
        model: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Evaluate a JSON file of `{query, relevant_ids}` judgements
    Evaluate {
        #[arg(long, default_value = "./data/documents")]
        store: String,
        #[arg(long)]
        queries: String,
        #[arg(long, default_value = "bm25")]
        model: String,
        #[arg(long, default_value_t = 5)]
        k: usize,
    },
    /// Print corpus statistics
    Stats {
        #[arg(long, default_value = "./data/documents")]
        store: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;

    match cli.command {
        Commands::Load { input, store } => {
            let store = SledStore::open(&store)?;
            load(&input, &store)
        }
        Commands::Search { store, query, model, top_k } => {
            let service = open_service(&store, config)?;
            let model: Model = model.parse()?;
            for hit in service.retrieve(&query, model, top_k)? {
                println!("{:>6}  {:.4}  {}", hit.document_id, hit.score, hit.title);
            }
            Ok(())
        }
        Commands::Evaluate { store, queries, model, k } => {
            let service = open_service(&store, config)?;
            let model: Model = model.parse()?;
            let f = File::open(&queries).with_context(|| format!("opening {queries}"))?;
            let judgements: Vec<EvaluationQuery> = serde_json::from_reader(BufReader::new(f))?;
            let report = service.evaluate(&judgements, model, k)?;
            for q in &report.queries {
                println!("P@{}={:.4}  R@{}={:.4}  AP={:.4}  {}", report.k, q.precision_at_k, report.k, q.recall_at_k, q.average_precision, q.query);
            }
            println!(
                "mean P@{}={:.4}  mean R@{}={:.4}  MAP={:.4}  queries={}",
                report.k,
                report.mean_precision_at_k(),
                report.k,
                report.mean_recall_at_k(),
                report.mean_average_precision(),
                report.queries.len()
            );
            Ok(())
        }
        Commands::Stats { store } => {
            let service = open_service(&store, config)?;
            let stats = service.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

fn open_service(store: &str, config: EngineConfig) -> Result<SearchService> {
    let store = SledStore::open(store)?;
    SearchService::from_store(config, &store)
}

fn input_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn load(input: &str, store: &dyn DocumentStore) -> Result<()> {
    let mut loaded = 0usize;
    for file in input_files(Path::new(input)) {
        let docs = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        for doc in docs {
            store.insert_document(doc.into())?;
            loaded += 1;
        }
        tracing::info!(file = %file.display(), loaded, "loaded file");
    }
    tracing::info!(input, loaded, "load complete");
    Ok(())
}

fn read_jsonl(file: &Path) -> Result<Vec<InputDoc>> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let mut docs = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<InputDoc>> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<InputDoc>, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(docs)
}
