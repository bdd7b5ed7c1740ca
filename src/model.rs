use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Separator between the document id and the segment index of a chunk id.
pub const CHUNK_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryId {
    Number(i64),
    Text(String),
}

impl QueryId {
    pub fn as_integer(&self) -> Result<i64, DataError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(value) => value
                .trim()
                .parse::<i64>()
                .map_err(|_| DataError::NonIntegerQuery {
                    value: value.clone(),
                }),
        }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Owning document: everything before the first separator, or the whole
    /// id when there is no separator. `None` when that prefix is empty.
    pub fn document_id(&self) -> Option<DocumentId> {
        let prefix = match self.0.split_once(CHUNK_SEPARATOR) {
            Some((prefix, _)) => prefix,
            None => self.0.as_str(),
        };
        if prefix.is_empty() {
            return None;
        }
        Some(DocumentId(prefix.to_string()))
    }

    /// Collapses a duplicated document prefix (`56908_56908_0` -> `56908_0`).
    /// Returns `None` when the id has no duplicated prefix.
    pub fn without_duplicated_prefix(&self) -> Option<ChunkId> {
        let parts = self.0.split(CHUNK_SEPARATOR).collect::<Vec<&str>>();
        if parts.len() < 3 || parts[0] != parts[1] || parts[0].is_empty() {
            return None;
        }

        let mut rebuilt = vec![parts[0]];
        rebuilt.extend_from_slice(&parts[2..]);
        Some(ChunkId(rebuilt.join(&CHUNK_SEPARATOR.to_string())))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a law article. Never empty and never contains
/// [`CHUNK_SEPARATOR`], so chunk ids collapse to it unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(value: impl Into<String>) -> Result<Self, DataError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DataError::InvalidDocumentId {
                value,
                reason: "document id is empty",
            });
        }
        if value.contains(CHUNK_SEPARATOR) {
            return Err(DataError::InvalidDocumentId {
                value,
                reason: "document id contains the chunk separator `_`",
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_integer(&self) -> Result<i64, DataError> {
        self.0
            .parse::<i64>()
            .map_err(|_| DataError::InvalidDocumentId {
                value: self.0.clone(),
                reason: "document id is not an integer",
            })
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub score: f64,
}

#[cfg(test)]
impl ScoredChunk {
    pub fn new(chunk_id: impl Into<String>, score: f64) -> Self {
        Self {
            chunk_id: ChunkId::new(chunk_id),
            score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedRecord {
    pub qid: QueryId,
    pub top_chunks: Vec<ScoredChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub qid: i64,
    pub relevant_laws: Vec<i64>,
}

/// A law reference in a ground-truth file, written as a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LawRef {
    Number(i64),
    Text(String),
}

impl LawRef {
    pub fn into_document_id(self) -> Result<DocumentId, DataError> {
        match self {
            Self::Number(value) => DocumentId::parse(value.to_string()),
            Self::Text(value) => DocumentId::parse(value),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroundTruthRecord {
    pub qid: QueryId,
    pub relevant_laws: Vec<LawRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRecord {
    pub qid: QueryId,
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenizedQuestion {
    pub qid: QueryId,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceManifestEntry {
    pub path: String,
    pub sha256: String,
    pub weight: f64,
    pub query_count: usize,
    pub chunk_count: usize,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FusionRunManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub strategy: String,
    pub top_k: usize,
    pub output_path: String,
    pub query_count: usize,
    pub sources: Vec<SourceManifestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryEvaluation {
    pub qid: QueryId,
    pub predicted: Vec<DocumentId>,
    pub gold: Vec<DocumentId>,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub f2: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRun {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub macro_f2: f64,
    pub queries: Vec<QueryEvaluation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub ground_truth_path: String,
    pub top_k: usize,
    pub query_count: usize,
    pub runs: Vec<EvaluationRun>,
}
