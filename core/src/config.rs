use crate::scoring::{Bm25Params, TfIdfParams};
use crate::tokenizer::TokenizerConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Engine-wide settings. One value is shared by index builds and queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tokenizer: TokenizerConfig,
    pub tfidf: TfIdfParams,
    pub bm25: Bm25Params,
    /// Upper bound applied to any requested k.
    pub max_top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerConfig::default(),
            tfidf: TfIdfParams::default(),
            bm25: Bm25Params::default(),
            max_top_k: 100,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields fall back to their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings that make BM25 scores negative or NaN.
    pub fn validate(&self) -> Result<()> {
        let Bm25Params { k1, b } = self.bm25;
        if !(k1.is_finite() && k1 >= 0.0) {
            bail!("bm25.k1 must be a finite value >= 0, got {k1}");
        }
        if !(0.0..=1.0).contains(&b) {
            bail!("bm25.b must be within [0, 1], got {b}");
        }
        if self.max_top_k == 0 {
            bail!("max_top_k must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::TfWeighting;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"bm25": {"k1": 1.2}, "tfidf": {"tf": "raw"}}"#).unwrap();
        assert_eq!(config.bm25.k1, 1.2);
        assert_eq!(config.bm25.b, 0.75);
        assert_eq!(config.tfidf.tf, TfWeighting::Raw);
        assert_eq!(config.max_top_k, 100);
        assert!(!config.tokenizer.stopwords);
    }

    #[test]
    fn validate_rejects_bad_bm25_and_k_bounds() {
        assert!(EngineConfig::default().validate().is_ok());

        let mut config = EngineConfig::default();
        config.bm25 = Bm25Params { k1: -1.0, b: 0.0 };
        assert!(config.validate().unwrap_err().to_string().contains("k1"));

        config.bm25 = Bm25Params { k1: f64::NAN, b: 0.5 };
        assert!(config.validate().is_err());

        config.bm25 = Bm25Params { k1: 0.0, b: 1.5 };
        assert!(config.validate().unwrap_err().to_string().contains("bm25.b"));

        config.bm25 = Bm25Params { k1: 0.0, b: 1.0 };
        assert!(config.validate().is_ok());

        config.max_top_k = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_top_k"));
    }
}
