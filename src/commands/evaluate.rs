use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{EvaluateArgs, NamedPath};
use crate::error::{ConfigError, DataError};
use crate::evaluate::{self, GroundTruth};
use crate::model::{EvaluationReport, EvaluationRun};
use crate::util::{display_path, now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: EvaluateArgs) -> Result<()> {
    if args.top_k == 0 {
        return Err(ConfigError::NonPositiveTopK.into());
    }

    let gt = evaluate::load_ground_truth(&args.ground_truth)?;
    if gt.is_empty() {
        return Err(DataError::Malformed {
            path: args.ground_truth.clone(),
            detail: "ground truth has no queries".to_string(),
        }
        .into());
    }

    let runs = args
        .predictions
        .iter()
        .map(|named| evaluate_run(&gt, named, args.top_k))
        .collect::<Result<Vec<EvaluationRun>>>()?;

    if runs.len() > 1
        && let Some(best) = runs
            .iter()
            .max_by(|left, right| left.macro_f2.total_cmp(&right.macro_f2))
    {
        info!(name = %best.name, macro_f2 = best.macro_f2, "best prediction file");
    }

    if let Some(report_path) = args.report_path {
        let report = EvaluationReport {
            manifest_version: 1,
            generated_at: now_utc_string(),
            ground_truth_path: display_path(&args.ground_truth),
            top_k: args.top_k,
            query_count: gt.len(),
            runs,
        };
        write_json_pretty(&report_path, &report)?;
        info!(path = %report_path.display(), "wrote evaluation report");
    }

    Ok(())
}

fn evaluate_run(gt: &GroundTruth, named: &NamedPath, top_k: usize) -> Result<EvaluationRun> {
    let predictions = evaluate::load_predictions(&named.path, top_k)
        .with_context(|| format!("failed to load predictions `{}`", named.name))?;
    let macro_f2 = evaluate::macro_score(gt, &predictions);
    let queries = evaluate::evaluate_queries(gt, &predictions);

    let missing = gt
        .keys()
        .filter(|qid| !predictions.contains_key(*qid))
        .count();
    info!(
        name = %named.name,
        path = %named.path.display(),
        top_k,
        queries = queries.len(),
        missing_predictions = missing,
        macro_f2 = %format!("{macro_f2:.4}"),
        "evaluated predictions"
    );

    Ok(EvaluationRun {
        name: named.name.clone(),
        path: display_path(&named.path),
        sha256: sha256_file(&named.path)?,
        macro_f2,
        queries,
    })
}
