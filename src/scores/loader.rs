use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{DataError, Error, Result};
use crate::model::{ChunkId, QueryId, ScoredChunk};

use super::{QueryScores, RankMap, RawQuery, RawScoreMap, ScoreMap, rank_map};

/// Keys holding a record's chunk list, in priority order.
pub const CHUNK_LIST_FIELDS: [&str; 2] = ["top_chunks", "chunks"];

/// Keys holding a chunk identifier, in priority order. An entry matching
/// none of them is skipped.
pub const CHUNK_ID_FIELDS: [&str; 3] = ["chunk_id", "id", "doc_id"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub records: usize,
    pub entries: usize,
    pub missing_id: usize,
    pub invalid_score: usize,
    pub duplicate_chunks: usize,
}

impl LoadStats {
    pub fn skipped(&self) -> usize {
        self.missing_id + self.invalid_score + self.duplicate_chunks
    }
}

pub fn load(path: &Path) -> Result<ScoreMap> {
    let records = read_records(path)?;
    let (scores, stats) = parse_records(path, &records)?;

    info!(
        path = %path.display(),
        queries = scores.len(),
        chunks = stats.entries - stats.skipped(),
        "loaded ranked results"
    );
    if stats.skipped() > 0 {
        warn!(
            path = %path.display(),
            missing_id = stats.missing_id,
            invalid_score = stats.invalid_score,
            duplicate_chunks = stats.duplicate_chunks,
            "skipped malformed or duplicate chunk entries"
        );
    }

    Ok(scores)
}

/// Loads every well-formed entry without collapsing duplicate chunk ids.
pub fn load_raw(path: &Path) -> Result<RawScoreMap> {
    let records = read_records(path)?;
    let (raw, stats) = parse_raw_records(path, &records)?;

    info!(
        path = %path.display(),
        queries = raw.len(),
        entries = stats.entries - stats.skipped(),
        "loaded raw ranked results"
    );
    if stats.skipped() > 0 {
        warn!(
            path = %path.display(),
            missing_id = stats.missing_id,
            invalid_score = stats.invalid_score,
            "skipped malformed chunk entries"
        );
    }

    Ok(raw)
}

pub fn load_with_rank(path: &Path) -> Result<(ScoreMap, RankMap)> {
    let scores = load(path)?;
    let ranks = rank_map(&scores);
    Ok((scores, ranks))
}

/// Reads the qid order of an external query file (`[{"qid": ..}, ..]`).
pub fn load_query_order(path: &Path) -> Result<Vec<QueryId>> {
    let records = read_records(path)?;
    records
        .iter()
        .enumerate()
        .map(|(index, record)| record_qid(path, index, record))
        .collect()
}

pub(crate) fn read_records(path: &Path) -> Result<Vec<Value>> {
    let raw = fs::read(path).map_err(|err| DataError::io(path, err))?;
    let records = serde_json::from_slice::<Vec<Value>>(&raw)
        .map_err(|err| DataError::json(path, err))?;
    Ok(records)
}

/// Parses records into per-query entry lists in file order. Malformed
/// entries are skipped and counted, duplicate chunk ids are kept.
pub fn parse_raw_records(path: &Path, records: &[Value]) -> Result<(RawScoreMap, LoadStats)> {
    let mut raw = RawScoreMap::new();
    let mut first_seen = HashMap::<QueryId, usize>::new();
    let mut stats = LoadStats::default();

    for (index, record) in records.iter().enumerate() {
        let qid = record_qid(path, index, record)?;
        if let Some(first) = first_seen.get(&qid) {
            return Err(DataError::DuplicateQuery {
                path: path.to_path_buf(),
                qid: qid.to_string(),
                first: *first,
                second: index,
            }
            .into());
        }
        first_seen.insert(qid.clone(), index);
        stats.records += 1;

        let mut query = RawQuery::default();
        for (position, entry) in chunk_entries(record).iter().enumerate() {
            stats.entries += 1;

            let Some(chunk_id) = entry.as_object().and_then(chunk_id_of) else {
                stats.missing_id += 1;
                continue;
            };
            let Some(score) = entry
                .get("score")
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
            else {
                stats.invalid_score += 1;
                continue;
            };

            query.entries.push(ScoredChunk { chunk_id, score });
            query.positions.push(position + 1);
        }
        raw.insert(qid, query);
    }

    Ok((raw, stats))
}

/// Parses records into a [`ScoreMap`]. The first occurrence of a chunk id
/// wins and keeps its 1-based position in the record as its rank.
pub fn parse_records(path: &Path, records: &[Value]) -> Result<(ScoreMap, LoadStats)> {
    let (raw, mut stats) = parse_raw_records(path, records)?;
    let mut scores = ScoreMap::new();

    for (qid, raw_query) in raw {
        let mut query = QueryScores::default();
        for (entry, position) in raw_query.entries.into_iter().zip(raw_query.positions) {
            if !query.push_ranked(entry, position) {
                stats.duplicate_chunks += 1;
            }
        }

        if query.is_empty() {
            debug!(path = %path.display(), qid = %qid, "record has no usable chunks");
        }
        scores.insert(qid, query);
    }

    Ok((scores, stats))
}

fn record_qid(path: &Path, index: usize, record: &Value) -> Result<QueryId> {
    let Some(object) = record.as_object() else {
        return Err(DataError::Malformed {
            path: path.to_path_buf(),
            detail: format!("record {index} is not an object"),
        }
        .into());
    };

    match object.get("qid") {
        None | Some(Value::Null) => Err(DataError::MissingField {
            path: path.to_path_buf(),
            index,
            field: "qid",
        }
        .into()),
        Some(value) => serde_json::from_value::<QueryId>(value.clone()).map_err(|_| {
            Error::from(DataError::Malformed {
                path: path.to_path_buf(),
                detail: format!("record {index}: qid must be an integer or a string"),
            })
        }),
    }
}

fn chunk_entries(record: &Value) -> &[Value] {
    CHUNK_LIST_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn chunk_id_of(entry: &Map<String, Value>) -> Option<ChunkId> {
    let raw = CHUNK_ID_FIELDS.iter().find_map(|field| match entry.get(*field) {
        Some(Value::String(value)) if !value.is_empty() => Some(value.clone()),
        Some(Value::Number(value)) if value.is_i64() || value.is_u64() => {
            Some(value.to_string())
        }
        _ => None,
    })?;

    let chunk_id = ChunkId::new(raw);
    chunk_id.document_id()?;
    Some(chunk_id)
}
