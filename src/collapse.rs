//! Chunk-to-document collapsing.
//!
//! Two selection rules exist and they differ on purpose:
//! [`collapse_to_documents`] walks the list until `k` distinct documents
//! are found, while [`truncate_then_dedupe`] fixes a window of the first `k`
//! raw entries by score and only deduplicates inside it.

use std::collections::{BTreeMap, HashSet};

use clap::ValueEnum;

use crate::model::{DocumentId, QueryId, ScoredChunk};
use crate::scores::RawScoreMap;

pub type Predictions = BTreeMap<QueryId, Vec<DocumentId>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DocumentSelection {
    /// First `k` raw entries by descending score, then deduplicated.
    RawWindow,
    /// Given order, first `k` distinct documents.
    FirstDistinct,
}

impl DocumentSelection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RawWindow => "raw_window",
            Self::FirstDistinct => "first_distinct",
        }
    }
}

/// Walks `chunks` in the given order (no re-sorting) and keeps the first
/// chunk of each document, stopping at `top_k` documents.
pub fn collapse_to_documents(chunks: &[ScoredChunk], top_k: usize) -> Vec<DocumentId> {
    dedupe_documents(
        chunks.iter().filter_map(|chunk| chunk.chunk_id.document_id()),
        top_k,
    )
}

/// Order-preserving deduplication capped at `top_k` distinct ids.
pub fn dedupe_documents<I>(documents: I, top_k: usize) -> Vec<DocumentId>
where
    I: IntoIterator<Item = DocumentId>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for document in documents {
        if out.len() >= top_k {
            break;
        }
        if seen.insert(document.clone()) {
            out.push(document);
        }
    }
    out
}

/// Stable sort by descending score, keep exactly the first `top_k` raw
/// entries, then deduplicate inside that window. Entries past the window
/// never top the list back up.
pub fn truncate_then_dedupe(chunks: &[ScoredChunk], top_k: usize) -> Vec<DocumentId> {
    let mut window = chunks.iter().collect::<Vec<&ScoredChunk>>();
    window.sort_by(|left, right| right.score.total_cmp(&left.score));
    window.truncate(top_k);

    dedupe_documents(
        window
            .into_iter()
            .filter_map(|chunk| chunk.chunk_id.document_id()),
        top_k,
    )
}

/// Applies `selection` to every query of a raw ranked file.
pub fn select_documents(
    scores: &RawScoreMap,
    top_k: usize,
    selection: DocumentSelection,
) -> Predictions {
    scores
        .iter()
        .map(|(qid, query)| {
            let documents = match selection {
                DocumentSelection::RawWindow => truncate_then_dedupe(&query.entries, top_k),
                DocumentSelection::FirstDistinct => {
                    collapse_to_documents(&query.entries, top_k)
                }
            };
            (qid.clone(), documents)
        })
        .collect()
}
