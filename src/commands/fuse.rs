use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::FuseArgs;
use crate::config::{FusionSpec, SourceSpec};
use crate::error::ConfigError;
use crate::fusion::{self, FusionSource};
use crate::model::{FusionRunManifest, SourceManifestEntry};
use crate::scores::{self, RankMap, ScoreBounds, ScoreMap};
use crate::util::{display_path, now_utc_string, sha256_file, write_json_pretty};
use crate::writer;

pub fn run(args: FuseArgs) -> Result<()> {
    let weights = if args.weights.is_empty() {
        vec![1.0; args.sources.len()]
    } else if args.weights.len() == args.sources.len() {
        args.weights
    } else {
        return Err(ConfigError::WeightCount(args.weights.len(), args.sources.len()).into());
    };

    let sources = args
        .sources
        .into_iter()
        .zip(weights)
        .map(|(path, weight)| SourceSpec::new(path, weight))
        .collect();
    let spec = FusionSpec::new(sources, args.strategy, args.top_k)?;

    let manifest = execute(&spec, &args.output)?;
    if let Some(manifest_path) = args.manifest_path {
        write_json_pretty(&manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote fusion manifest");
    }

    info!(
        strategy = spec.strategy().as_str(),
        queries = manifest.query_count,
        "fusion completed"
    );
    Ok(())
}

/// Loads and hashes every source of `spec`, fuses them and writes the ranked
/// output. Returns the run manifest without writing it.
pub fn execute(spec: &FusionSpec, output: &Path) -> Result<FusionRunManifest> {
    let uses_ranks = spec.strategy().uses_ranks();
    let loaded = spec
        .sources()
        .iter()
        .map(|source| load_source(&source.path, uses_ranks))
        .collect::<Result<Vec<(ScoreMap, Option<RankMap>)>>>()?;

    let sources = source_entries(spec, &loaded)?;

    let fusion_sources = loaded
        .iter()
        .map(|(scores, ranks)| match ranks {
            Some(ranks) => FusionSource::with_ranks(scores, ranks),
            None => FusionSource::new(scores),
        })
        .collect::<Vec<FusionSource<'_>>>();

    let fused = fusion::fuse(&fusion_sources, &spec.weights(), spec.strategy(), spec.top_k())?;
    writer::write_ranked(output, &fused)?;

    Ok(FusionRunManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        strategy: spec.strategy().as_str().to_string(),
        top_k: spec.top_k(),
        output_path: display_path(output),
        query_count: fused.len(),
        sources,
    })
}

fn load_source(path: &Path, with_ranks: bool) -> Result<(ScoreMap, Option<RankMap>)> {
    let context = || format!("failed to load source {}", path.display());
    if with_ranks {
        let (scores, ranks) = scores::load_with_rank(path).with_context(context)?;
        return Ok((scores, Some(ranks)));
    }
    Ok((scores::load(path).with_context(context)?, None))
}

fn source_entries(
    spec: &FusionSpec,
    loaded: &[(ScoreMap, Option<RankMap>)],
) -> Result<Vec<SourceManifestEntry>> {
    spec.sources()
        .iter()
        .zip(loaded)
        .map(|(source, (scores, _))| source_entry(source, scores))
        .collect()
}

fn source_entry(source: &SourceSpec, scores: &ScoreMap) -> Result<SourceManifestEntry> {
    let bounds = ScoreBounds::of(scores);
    Ok(SourceManifestEntry {
        path: display_path(&source.path),
        sha256: sha256_file(&source.path)?,
        weight: source.weight,
        query_count: scores.len(),
        chunk_count: scores::chunk_count(scores),
        min_score: bounds.map(|bounds| bounds.min),
        max_score: bounds.map(|bounds| bounds.max),
    })
}
