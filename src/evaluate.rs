//! F2 scoring of document predictions against ground truth.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::collapse::{DocumentSelection, Predictions, select_documents};
use crate::error::{DataError, Result};
use crate::model::{DocumentId, GroundTruthRecord, QueryEvaluation, QueryId};
use crate::scores;

pub const BETA_SQ: f64 = 4.0;

pub type GroundTruth = BTreeMap<QueryId, HashSet<DocumentId>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOutcome {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub score: f64,
}

pub fn outcome(predicted: &HashSet<DocumentId>, gold: &HashSet<DocumentId>) -> QueryOutcome {
    let true_positives = predicted.intersection(gold).count();
    QueryOutcome {
        true_positives,
        false_positives: predicted.len() - true_positives,
        false_negatives: gold.len() - true_positives,
        score: score_query(predicted, gold),
    }
}

/// F2 of one query.
pub fn score_query(predicted: &HashSet<DocumentId>, gold: &HashSet<DocumentId>) -> f64 {
    fbeta(predicted, gold, BETA_SQ)
}

pub fn fbeta(predicted: &HashSet<DocumentId>, gold: &HashSet<DocumentId>, beta_sq: f64) -> f64 {
    if predicted.is_empty() && gold.is_empty() {
        return 1.0;
    }
    if predicted.is_empty() {
        return 0.0;
    }

    let true_positives = predicted.intersection(gold).count() as f64;
    let false_positives = predicted.len() as f64 - true_positives;
    let false_negatives = gold.len() as f64 - true_positives;

    let numerator = (1.0 + beta_sq) * true_positives;
    let denominator = numerator + beta_sq * false_negatives + false_positives;
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Per-query outcomes for every ground-truth query, in qid order. A query
/// without predictions counts as an empty prediction.
pub fn evaluate_queries(gt: &GroundTruth, pred: &Predictions) -> Vec<QueryEvaluation> {
    gt.par_iter()
        .map(|(qid, gold)| {
            let predicted = pred.get(qid).cloned().unwrap_or_default();
            let predicted_set = predicted.iter().cloned().collect::<HashSet<DocumentId>>();
            let result = outcome(&predicted_set, gold);

            let mut gold_sorted = gold.iter().cloned().collect::<Vec<DocumentId>>();
            gold_sorted.sort();

            QueryEvaluation {
                qid: qid.clone(),
                predicted,
                gold: gold_sorted,
                true_positives: result.true_positives,
                false_positives: result.false_positives,
                false_negatives: result.false_negatives,
                f2: result.score,
            }
        })
        .collect()
}

/// Unweighted mean of per-query F2 over the ground-truth queries; 0.0 when
/// the ground truth is empty.
pub fn macro_score(gt: &GroundTruth, pred: &Predictions) -> f64 {
    macro_of(&evaluate_queries(gt, pred))
}

pub fn macro_of(queries: &[QueryEvaluation]) -> f64 {
    if queries.is_empty() {
        return 0.0;
    }
    queries.iter().map(|query| query.f2).sum::<f64>() / queries.len() as f64
}

pub fn load_ground_truth(path: &Path) -> Result<GroundTruth> {
    let raw = fs::read(path).map_err(|err| DataError::io(path, err))?;
    let records = serde_json::from_slice::<Vec<GroundTruthRecord>>(&raw)
        .map_err(|err| DataError::json(path, err))?;

    let mut gt = GroundTruth::new();
    let mut first_seen = BTreeMap::<QueryId, usize>::new();
    for (index, record) in records.into_iter().enumerate() {
        if let Some(first) = first_seen.get(&record.qid) {
            return Err(DataError::DuplicateQuery {
                path: path.to_path_buf(),
                qid: record.qid.to_string(),
                first: *first,
                second: index,
            }
            .into());
        }
        first_seen.insert(record.qid.clone(), index);

        let laws = record
            .relevant_laws
            .into_iter()
            .map(|law| law.into_document_id())
            .collect::<std::result::Result<HashSet<DocumentId>, DataError>>()?;
        gt.insert(record.qid, laws);
    }

    info!(path = %path.display(), queries = gt.len(), "loaded ground truth");
    Ok(gt)
}

/// Loads a chunk-scored prediction file and keeps, per query, the
/// deduplicated documents of its first `top_k` raw entries by score.
/// Repeated chunk ids stay in the window.
pub fn load_predictions(path: &Path, top_k: usize) -> Result<Predictions> {
    let raw = scores::load_raw(path)?;
    Ok(select_documents(&raw, top_k, DocumentSelection::RawWindow))
}
