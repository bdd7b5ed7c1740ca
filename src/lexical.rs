//! Query tokenization for the external lexical ranker.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

const DEFAULT_STOPWORDS: &[&str] = &[
    "của", "và", "các", "có", "được", "theo", "tại", "trong", "về", "hoặc", "người", "này",
    "khoản", "cho", "không", "từ", "phải", "ngày", "việc", "sau", "để", "đến", "bộ", "với",
    "là", "năm", "khi", "số", "trên", "khác", "đã", "thì", "thuộc", "điểm", "đồng", "do",
    "một", "bị", "vào", "lại", "ở", "nếu", "làm", "đây", "như", "đó", "mà", "nơi", "”", "“",
];

/// Single letters that show up as list markers in legal text.
const MARKER_LETTERS: &str = "abcdefghijklmnoprstuvxyđ";

/// Immutable tokenizer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerConfig {
    stopwords: BTreeSet<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        let numbers = (1..=10).map(|value| value.to_string());
        let letters = MARKER_LETTERS.chars().map(String::from);
        let words = DEFAULT_STOPWORDS.iter().map(|word| word.to_string());

        Self {
            stopwords: numbers.chain(letters).chain(words).collect(),
        }
    }
}

impl TokenizerConfig {
    pub fn with_stopwords<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stopwords: stopwords.into_iter().map(Into::into).collect(),
        }
    }

    /// One stopword per line; blank lines and `#` comments are ignored.
    pub fn from_stopword_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read stopword file: {}", path.display()))?;
        Ok(Self::with_stopwords(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_lowercase),
        ))
    }

    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }
}

#[derive(Debug, Clone)]
pub struct LexicalTokenizer {
    config: TokenizerConfig,
}

impl LexicalTokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|word| word.trim_matches(is_punctuation))
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .filter(|word| !self.config.is_stopword(word))
            .collect()
    }
}

fn is_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation() || matches!(ch, '“' | '”' | '‘' | '’' | '…' | '–' | '—')
}
