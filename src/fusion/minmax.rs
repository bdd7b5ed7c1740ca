use std::collections::HashMap;

use tracing::warn;

use crate::model::{ChunkId, QueryId, ScoredChunk};
use crate::scores::ScoreBounds;

use super::{FusionSource, QueryFusion};

/// Weighted sum of globally min-max scaled scores. A chunk missing from a
/// source gets no contribution from it.
pub struct MinMaxSum<'a> {
    sources: &'a [FusionSource<'a>],
    weights: &'a [f64],
    bounds: Vec<ScoreBounds>,
}

impl<'a> MinMaxSum<'a> {
    pub fn new(sources: &'a [FusionSource<'a>], weights: &'a [f64]) -> Self {
        let bounds = sources
            .iter()
            .enumerate()
            .map(|(index, source)| match ScoreBounds::of(source.scores) {
                Some(bounds) => {
                    if bounds.is_degenerate() {
                        warn!(
                            source = index,
                            score = bounds.min,
                            "source has a single distinct score; scaled scores fall back to 0.0"
                        );
                    }
                    bounds
                }
                None => {
                    warn!(source = index, "source has no scores");
                    ScoreBounds { min: 0.0, max: 1.0 }
                }
            })
            .collect();

        Self {
            sources,
            weights,
            bounds,
        }
    }
}

impl QueryFusion for MinMaxSum<'_> {
    fn fuse_query(&self, qid: &QueryId) -> Vec<ScoredChunk> {
        let mut order = Vec::<ChunkId>::new();
        let mut totals = HashMap::<ChunkId, f64>::new();

        for ((source, weight), bounds) in self.sources.iter().zip(self.weights).zip(&self.bounds) {
            let Some(query) = source.query(qid) else {
                continue;
            };
            for entry in query.entries() {
                let contribution = bounds.scale(entry.score) * weight;
                match totals.get_mut(&entry.chunk_id) {
                    Some(total) => *total += contribution,
                    None => {
                        order.push(entry.chunk_id.clone());
                        totals.insert(entry.chunk_id.clone(), contribution);
                    }
                }
            }
        }

        order
            .into_iter()
            .map(|chunk_id| {
                let score = totals.get(&chunk_id).copied().unwrap_or_default();
                ScoredChunk { chunk_id, score }
            })
            .collect()
    }
}
