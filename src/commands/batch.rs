use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{error, info, warn};

use crate::cli::FuseBatchArgs;
use crate::config::{FusionPlan, PlannedFusion};
use crate::util::{read_json, write_json_pretty};

use super::fuse;

pub fn run(args: FuseBatchArgs) -> Result<()> {
    let plan: FusionPlan = read_json(&args.plan)?;
    let planned = resolve_plan(&plan)?;

    if planned.is_empty() {
        warn!(results_dir = %plan.results_dir.display(), "fusion plan resolved to no pairs");
        return Ok(());
    }

    info!(
        plan = %args.plan.display(),
        pairs = planned.len(),
        strategy = %plan.strategy,
        top_k = plan.top_k,
        "batch fusion started"
    );

    let mut failed = 0_usize;
    for fusion in &planned {
        if let Err(err) = run_pair(fusion, args.manifest_dir.as_deref()) {
            failed += 1;
            error!(
                output = %fusion.output_path.display(),
                error = %format!("{err:#}"),
                "fusion pair failed"
            );
        }
    }

    info!(
        pairs = planned.len(),
        succeeded = planned.len() - failed,
        failed,
        "batch fusion completed"
    );
    if failed > 0 {
        bail!("{failed} of {} fusion pairs failed", planned.len());
    }
    Ok(())
}

fn resolve_plan(plan: &FusionPlan) -> Result<Vec<PlannedFusion>> {
    if !plan.pairs.is_empty() {
        return Ok(plan.resolve_pairs()?);
    }

    let model_files = discover_model_files(&plan.results_dir, &plan.lexical)?;
    info!(
        results_dir = %plan.results_dir.display(),
        models = model_files.len(),
        "discovered model result files"
    );
    Ok(plan.resolve_discovered(&model_files)?)
}

fn run_pair(fusion: &PlannedFusion, manifest_dir: Option<&Path>) -> Result<()> {
    let manifest = fuse::execute(&fusion.spec, &fusion.output_path)?;

    if let Some(manifest_dir) = manifest_dir {
        let stem = fusion
            .output_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .with_context(|| {
                format!("invalid output filename: {}", fusion.output_path.display())
            })?;
        let manifest_path = manifest_dir.join(format!("{stem}.manifest.json"));
        write_json_pretty(&manifest_path, &manifest)?;
    }

    info!(
        output = %fusion.output_path.display(),
        queries = manifest.query_count,
        "fusion pair completed"
    );
    Ok(())
}

/// Model result files in `results_dir`: every `*.json` whose name mentions
/// neither `bm25` nor `ensemble`, except the lexical file itself. Sorted by
/// name.
pub fn discover_model_files(results_dir: &Path, lexical_file: &str) -> Result<Vec<String>> {
    let excluded =
        Regex::new(r"(?i)bm25|ensemble").context("failed to compile model filename regex")?;

    let entries = fs::read_dir(results_dir)
        .with_context(|| format!("failed to read {}", results_dir.display()))?;

    let mut models = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", results_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json && name != lexical_file && !excluded.is_match(name) {
            models.push(name.to_string());
        }
    }

    models.sort();
    Ok(models)
}
