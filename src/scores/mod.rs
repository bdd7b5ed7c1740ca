//! Per-query score maps built from ranked-result files.

use std::collections::{BTreeMap, HashMap};

use crate::model::{ChunkId, QueryId, ScoredChunk};

pub mod loader;

pub use loader::{load, load_query_order, load_raw, load_with_rank};

/// One ranked-result source: query id to its ranked chunk scores.
pub type ScoreMap = BTreeMap<QueryId, QueryScores>;

/// Query id to the 1-based rank of each chunk in the source's original order.
pub type RankMap = BTreeMap<QueryId, HashMap<ChunkId, usize>>;

/// Raw ranked results: every well-formed entry, duplicates included.
pub type RawScoreMap = BTreeMap<QueryId, RawQuery>;

/// Well-formed entries of one record in file order. `positions[i]` is the
/// 1-based index of `entries[i]` among all entries of the record, skipped
/// ones included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery {
    pub entries: Vec<ScoredChunk>,
    pub positions: Vec<usize>,
}

/// Chunk scores for a single query, in source order, one entry per chunk id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryScores {
    entries: Vec<ScoredChunk>,
    ranks: Vec<usize>,
    index: HashMap<ChunkId, usize>,
}

impl QueryScores {
    /// Appends an entry ranked after the current last one. See [`push_ranked`].
    ///
    /// [`push_ranked`]: QueryScores::push_ranked
    pub fn push(&mut self, entry: ScoredChunk) -> bool {
        let rank = self.entries.len() + 1;
        self.push_ranked(entry, rank)
    }

    /// Appends an entry with its 1-based rank in the source unless its chunk
    /// id is already present; the first occurrence wins. Returns whether the
    /// entry was kept.
    pub fn push_ranked(&mut self, entry: ScoredChunk, rank: usize) -> bool {
        if self.index.contains_key(&entry.chunk_id) {
            return false;
        }
        self.index.insert(entry.chunk_id.clone(), self.entries.len());
        self.entries.push(entry);
        self.ranks.push(rank);
        true
    }

    pub fn get(&self, chunk_id: &ChunkId) -> Option<f64> {
        self.index
            .get(chunk_id)
            .map(|index| self.entries[*index].score)
    }

    pub fn contains(&self, chunk_id: &ChunkId) -> bool {
        self.index.contains_key(chunk_id)
    }

    pub fn entries(&self) -> &[ScoredChunk] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ScoredChunk> for QueryScores {
    fn from_iter<I: IntoIterator<Item = ScoredChunk>>(iter: I) -> Self {
        let mut scores = Self::default();
        for entry in iter {
            scores.push(entry);
        }
        scores
    }
}

/// Ranks are the recorded source positions of each chunk's first occurrence.
pub fn rank_map(scores: &ScoreMap) -> RankMap {
    scores
        .iter()
        .map(|(qid, query)| {
            let ranks = query
                .entries
                .iter()
                .zip(&query.ranks)
                .map(|(entry, rank)| (entry.chunk_id.clone(), *rank))
                .collect::<HashMap<ChunkId, usize>>();
            (qid.clone(), ranks)
        })
        .collect()
}

/// Global minimum and maximum over every query and chunk of a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBounds {
    pub min: f64,
    pub max: f64,
}

impl ScoreBounds {
    pub fn of(scores: &ScoreMap) -> Option<Self> {
        let mut values = scores
            .values()
            .flat_map(|query| query.entries().iter().map(|entry| entry.score));
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(min, max), value| {
            (min.min(value), max.max(value))
        });
        Some(Self { min, max })
    }

    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    /// Min-max scaling into `[0, 1]`; a degenerate range maps to 0.0.
    pub fn scale(&self, raw: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        (raw - self.min) / (self.max - self.min)
    }
}

pub fn chunk_count(scores: &ScoreMap) -> usize {
    scores.values().map(QueryScores::len).sum()
}
