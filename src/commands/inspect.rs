use anyhow::Result;
use tracing::{info, warn};

use crate::cli::InspectArgs;
use crate::scores::{self, ScoreBounds, ScoreMap};

#[derive(Debug, Clone, PartialEq)]
pub struct InspectSummary {
    pub queries: usize,
    pub chunks: usize,
    pub empty_queries: usize,
    pub min_chunks: usize,
    pub max_chunks: usize,
    pub bounds: Option<ScoreBounds>,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let scores = scores::load(&args.input)?;
    let summary = summarize(&scores);

    info!(
        path = %args.input.display(),
        queries = summary.queries,
        chunks = summary.chunks,
        empty_queries = summary.empty_queries,
        min_chunks = summary.min_chunks,
        max_chunks = summary.max_chunks,
        "ranked file summary"
    );

    match summary.bounds {
        Some(bounds) if bounds.is_degenerate() => {
            warn!(score = bounds.min, "every chunk has the same score");
        }
        Some(bounds) => info!(min_score = bounds.min, max_score = bounds.max, "score bounds"),
        None => warn!("file has no scored chunks"),
    }
    Ok(())
}

pub fn summarize(scores: &ScoreMap) -> InspectSummary {
    let lengths = scores.values().map(|query| query.len());

    InspectSummary {
        queries: scores.len(),
        chunks: scores::chunk_count(scores),
        empty_queries: scores.values().filter(|query| query.is_empty()).count(),
        min_chunks: lengths.clone().min().unwrap_or(0),
        max_chunks: lengths.max().unwrap_or(0),
        bounds: ScoreBounds::of(scores),
    }
}
