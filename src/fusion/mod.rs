//! Fusion of independently ranked chunk lists.
//!
//! Every strategy works per query, so queries are fused in parallel. The
//! candidate list of a query is built in a fixed generation order and then
//! stably sorted by descending score: equal scores keep generation order.

use std::collections::BTreeSet;
use std::str::FromStr;

use clap::ValueEnum;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::validate_fusion;
use crate::error::{ConfigError, Result};
use crate::model::{QueryId, ScoredChunk};
use crate::scores::{QueryScores, RankMap, ScoreMap};

mod minmax;
mod product;
#[cfg(test)]
mod tests;

pub use minmax::MinMaxSum;
pub use product::{DecaySide, WeightedProduct};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Global min-max scaling per source, weighted sum.
    Sum,
    /// Raw weighted product for shared chunks, weighted score otherwise.
    Product,
    /// Product decayed by `1/rank` in the dense source.
    ProductRank,
    /// Product decayed by `1/rank` in the lexical source.
    ProductBm25Rank,
}

impl FusionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Product => "product",
            Self::ProductRank => "product_rank",
            Self::ProductBm25Rank => "product_bm25_rank",
        }
    }

    /// Whether scores decay by the original rank in one of the sources.
    pub fn uses_ranks(self) -> bool {
        matches!(self, Self::ProductRank | Self::ProductBm25Rank)
    }

    pub fn required_sources(self) -> Option<usize> {
        match self {
            Self::Sum => None,
            Self::Product | Self::ProductRank | Self::ProductBm25Rank => Some(2),
        }
    }
}

impl FromStr for FusionStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sum" => Ok(Self::Sum),
            "product" => Ok(Self::Product),
            "product_rank" => Ok(Self::ProductRank),
            "product_bm25_rank" => Ok(Self::ProductBm25Rank),
            _ => Err(ConfigError::UnknownStrategy(value.to_string())),
        }
    }
}

/// One ranked source as seen by the fusion engine.
#[derive(Debug, Clone, Copy)]
pub struct FusionSource<'a> {
    pub scores: &'a ScoreMap,
    pub ranks: Option<&'a RankMap>,
}

impl<'a> FusionSource<'a> {
    pub fn new(scores: &'a ScoreMap) -> Self {
        Self {
            scores,
            ranks: None,
        }
    }

    pub fn with_ranks(scores: &'a ScoreMap, ranks: &'a RankMap) -> Self {
        Self {
            scores,
            ranks: Some(ranks),
        }
    }

    pub fn query(&self, qid: &QueryId) -> Option<&'a QueryScores> {
        self.scores.get(qid)
    }
}

/// Uniform interface of every fusion strategy: the unsorted candidate list
/// of one query, in generation order.
pub trait QueryFusion: Sync {
    fn fuse_query(&self, qid: &QueryId) -> Vec<ScoredChunk>;
}

pub fn fuse(
    sources: &[FusionSource<'_>],
    weights: &[f64],
    strategy: FusionStrategy,
    top_k: usize,
) -> Result<ScoreMap> {
    validate_fusion(strategy, sources.len(), weights, top_k)?;

    let fused = match strategy {
        FusionStrategy::Sum => run(&MinMaxSum::new(sources, weights), sources, top_k),
        FusionStrategy::Product => run(
            &WeightedProduct::new(sources, weights, None),
            sources,
            top_k,
        ),
        FusionStrategy::ProductRank => run(
            &WeightedProduct::new(sources, weights, Some(DecaySide::Dense)),
            sources,
            top_k,
        ),
        FusionStrategy::ProductBm25Rank => run(
            &WeightedProduct::new(sources, weights, Some(DecaySide::Lexical)),
            sources,
            top_k,
        ),
    };

    debug!(
        strategy = strategy.as_str(),
        queries = fused.len(),
        top_k,
        "fusion completed"
    );
    Ok(fused)
}

fn run(fusion: &dyn QueryFusion, sources: &[FusionSource<'_>], top_k: usize) -> ScoreMap {
    let qids = sources
        .iter()
        .flat_map(|source| source.scores.keys())
        .collect::<BTreeSet<&QueryId>>();

    qids.into_par_iter()
        .map(|qid| {
            let candidates = fusion.fuse_query(qid);
            if candidates.is_empty() {
                warn!(qid = %qid, "query has no chunks in any source");
            }
            (qid.clone(), top_k_descending(candidates, top_k))
        })
        .collect::<Vec<(QueryId, QueryScores)>>()
        .into_iter()
        .collect()
}

/// Stable descending sort by score, truncated to `top_k`.
pub fn top_k_descending(mut candidates: Vec<ScoredChunk>, top_k: usize) -> QueryScores {
    candidates.sort_by(|left, right| right.score.total_cmp(&left.score));
    candidates.truncate(top_k);
    candidates.into_iter().collect()
}
