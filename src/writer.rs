//! Serialization of fused rankings and submissions.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

use crate::collapse::Predictions;
use crate::error::DataError;
use crate::model::{QueryId, RankedRecord, SubmissionRecord};
use crate::scores::ScoreMap;
use crate::util::write_json_pretty;

/// Records in ascending qid order, chunks in stored order.
pub fn ranked_records(scores: &ScoreMap) -> Vec<RankedRecord> {
    scores
        .iter()
        .map(|(qid, query)| RankedRecord {
            qid: qid.clone(),
            top_chunks: query.entries().to_vec(),
        })
        .collect()
}

pub fn write_ranked(path: &Path, scores: &ScoreMap) -> Result<()> {
    write_json_pretty(path, &ranked_records(scores))?;
    info!(path = %path.display(), queries = scores.len(), "wrote ranked results");
    Ok(())
}

/// Submission records in ascending qid order, or in `order` when given.
/// Qids of `order` without predictions are dropped.
pub fn submission_records(
    predictions: &Predictions,
    order: Option<&[QueryId]>,
) -> Result<Vec<SubmissionRecord>, DataError> {
    let qids = match order {
        Some(order) => order
            .iter()
            .filter(|qid| predictions.contains_key(*qid))
            .collect::<Vec<&QueryId>>(),
        None => predictions.keys().collect(),
    };

    qids.into_iter()
        .map(|qid| -> Result<SubmissionRecord, DataError> {
            let relevant_laws = predictions[qid]
                .iter()
                .map(|document| document.as_integer())
                .collect::<Result<Vec<i64>, DataError>>()?;
            Ok(SubmissionRecord {
                qid: qid.as_integer()?,
                relevant_laws,
            })
        })
        .collect()
}

pub fn write_submission(
    path: &Path,
    predictions: &Predictions,
    order: Option<&[QueryId]>,
) -> Result<()> {
    let records = submission_records(predictions, order)?;
    write_json_pretty(path, &records)?;
    info!(path = %path.display(), queries = records.len(), "wrote submission");
    Ok(())
}

/// Reorders raw qid-keyed records by `order`, keeping each record verbatim.
/// Records whose qid is not in `order`, and qids without a record, are
/// dropped.
pub fn reorder_records(records: Vec<Value>, order: &[QueryId]) -> Vec<Value> {
    let mut by_qid = HashMap::<QueryId, Value>::new();
    for record in records {
        let Some(qid) = record
            .get("qid")
            .and_then(|value| serde_json::from_value::<QueryId>(value.clone()).ok())
        else {
            debug!("dropping record without a usable qid");
            continue;
        };
        by_qid.entry(qid).or_insert(record);
    }

    order
        .iter()
        .filter_map(|qid| by_qid.remove(qid))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{DocumentId, ScoredChunk};
    use crate::scores::QueryScores;

    fn documents(ids: &[&str]) -> Vec<DocumentId> {
        ids.iter()
            .map(|id| DocumentId::parse(*id).expect("valid document id"))
            .collect()
    }

    #[test]
    fn ranked_output_matches_input_schema() {
        let mut scores = ScoreMap::new();
        scores.insert(
            QueryId::Number(2),
            [ScoredChunk::new("5_1", 0.25)].into_iter().collect::<QueryScores>(),
        );
        scores.insert(QueryId::Number(1), QueryScores::default());

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out").join("fused.json");
        write_ranked(&path, &scores).expect("write ranked");

        let written: Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read back")).expect("json");
        assert_eq!(
            written,
            json!([
                {"qid": 1, "top_chunks": []},
                {"qid": 2, "top_chunks": [{"chunk_id": "5_1", "score": 0.25}]}
            ])
        );
    }

    #[test]
    fn submission_follows_external_order_and_drops_unknown_qids() {
        let mut predictions = Predictions::new();
        predictions.insert(QueryId::Number(1), documents(&["10", "11"]));
        predictions.insert(QueryId::Number(3), documents(&["7"]));

        let order = vec![QueryId::Number(3), QueryId::Number(8), QueryId::Number(1)];
        let records = submission_records(&predictions, Some(&order)).expect("records");
        assert_eq!(
            records,
            vec![
                SubmissionRecord { qid: 3, relevant_laws: vec![7] },
                SubmissionRecord { qid: 1, relevant_laws: vec![10, 11] },
            ]
        );

        let ascending = submission_records(&predictions, None).expect("records");
        assert_eq!(ascending[0].qid, 1);
    }

    #[test]
    fn submission_rejects_non_integer_ids() {
        let mut predictions = Predictions::new();
        predictions.insert(QueryId::Text("q1".to_string()), documents(&["10"]));
        assert!(submission_records(&predictions, None).is_err());

        let mut predictions = Predictions::new();
        predictions.insert(QueryId::Number(1), documents(&["abc"]));
        assert!(submission_records(&predictions, None).is_err());
    }

    #[test]
    fn reorder_keeps_records_verbatim() {
        let records = vec![
            json!({"qid": 1, "top_chunks": [], "question": "a"}),
            json!({"qid": 2, "relevant_laws": [4]}),
            json!({"no_qid": true}),
        ];
        let order = vec![QueryId::Number(2), QueryId::Number(5), QueryId::Number(1)];

        let reordered = reorder_records(records, &order);
        assert_eq!(
            reordered,
            vec![
                json!({"qid": 2, "relevant_laws": [4]}),
                json!({"qid": 1, "top_chunks": [], "question": "a"}),
            ]
        );
    }
}
