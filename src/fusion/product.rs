use crate::model::{ChunkId, QueryId, ScoredChunk};
use crate::scores::QueryScores;

use super::{FusionSource, QueryFusion};

/// Which source's original rank decays the product.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecaySide {
    Dense,
    Lexical,
}

/// Weighted product of a dense and a lexical source.
///
/// Chunks in both sources score `wd*sd * wl*sl`; chunks in one source score
/// `w*s` with nothing substituted for the missing side. With a decay side,
/// every score involving a chunk of that source is multiplied by
/// `1/rank` in it, or left undecayed when the rank is unknown.
pub struct WeightedProduct<'a> {
    dense: FusionSource<'a>,
    lexical: FusionSource<'a>,
    dense_weight: f64,
    lexical_weight: f64,
    decay: Option<DecaySide>,
}

impl<'a> WeightedProduct<'a> {
    /// Expects exactly two sources and weights, dense first.
    pub fn new(sources: &[FusionSource<'a>], weights: &[f64], decay: Option<DecaySide>) -> Self {
        Self {
            dense: sources[0],
            lexical: sources[1],
            dense_weight: weights[0],
            lexical_weight: weights[1],
            decay,
        }
    }

    fn decay_factor(&self, side: DecaySide, qid: &QueryId, chunk_id: &ChunkId) -> f64 {
        if self.decay != Some(side) {
            return 1.0;
        }

        let source = match side {
            DecaySide::Dense => &self.dense,
            DecaySide::Lexical => &self.lexical,
        };
        source
            .ranks
            .and_then(|ranks| ranks.get(qid))
            .and_then(|ranks| ranks.get(chunk_id))
            .filter(|rank| **rank > 0)
            .map_or(1.0, |rank| 1.0 / *rank as f64)
    }
}

impl QueryFusion for WeightedProduct<'_> {
    fn fuse_query(&self, qid: &QueryId) -> Vec<ScoredChunk> {
        let empty = QueryScores::default();
        let dense = self.dense.query(qid).unwrap_or(&empty);
        let lexical = self.lexical.query(qid).unwrap_or(&empty);

        let mut shared = Vec::new();
        let mut dense_only = Vec::new();

        for entry in dense.entries() {
            let weighted = self.dense_weight * entry.score;
            let dense_decay = self.decay_factor(DecaySide::Dense, qid, &entry.chunk_id);
            match lexical.get(&entry.chunk_id) {
                Some(lexical_score) => {
                    let lexical_decay =
                        self.decay_factor(DecaySide::Lexical, qid, &entry.chunk_id);
                    shared.push(ScoredChunk {
                        chunk_id: entry.chunk_id.clone(),
                        score: weighted
                            * (self.lexical_weight * lexical_score)
                            * dense_decay
                            * lexical_decay,
                    });
                }
                None => dense_only.push(ScoredChunk {
                    chunk_id: entry.chunk_id.clone(),
                    score: weighted * dense_decay,
                }),
            }
        }

        let lexical_only = lexical
            .entries()
            .iter()
            .filter(|entry| !dense.contains(&entry.chunk_id))
            .map(|entry| ScoredChunk {
                chunk_id: entry.chunk_id.clone(),
                score: self.lexical_weight
                    * entry.score
                    * self.decay_factor(DecaySide::Lexical, qid, &entry.chunk_id),
            });

        shared.extend(dense_only);
        shared.extend(lexical_only);
        shared
    }
}
