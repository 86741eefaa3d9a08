use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    // Apostrophes split terms, so contractions are listed as their fragments.
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves",
            "aren","couldn","didn","doesn","don","hadn","hasn","haven","isn","mustn","shan","shouldn",
            "wasn","weren","won","wouldn",
            "d","ll","m","re","s","t","ve"
        ];
        words.iter().copied().collect()
    };
}

/// Normalization switches shared by index-time and query-time tokenization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Apply NFKC normalization before lower-casing.
    pub unicode_normalize: bool,
    /// Drop terms found in the fixed English stop-word list.
    pub stopwords: bool,
    /// Reduce terms with the English Snowball stemmer.
    pub stem: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { unicode_normalize: true, stopwords: false, stem: false }
    }
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Turns raw text into terms. Built once from a [`TokenizerConfig`] and shared by
/// the index and the query path so both sides see the same vocabulary.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self { Self { config } }

    pub fn config(&self) -> &TokenizerConfig { &self.config }

    /// Split on non-alphanumeric boundaries, lowercase, then apply the optional
    /// stop-word and stemming passes. Never yields an empty term.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = if self.config.unicode_normalize {
            text.nfkc().collect::<String>().to_lowercase()
        } else {
            text.to_lowercase()
        };
        let mut terms = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let token = mat.as_str();
            if self.config.stopwords && is_stopword(token) { continue; }
            if self.config.stem {
                terms.push(STEMMER.stem(token).into_owned());
            } else {
                terms.push(token.to_string());
            }
        }
        terms
    }
}

/// Tokenize with the default configuration.
pub fn tokenize(text: &str) -> Vec<String> {
    Tokenizer::default().tokenize(text)
}
