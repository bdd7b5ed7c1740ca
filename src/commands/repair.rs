use anyhow::Result;
use serde_json::Value;
use tracing::info;

use crate::cli::RepairChunkIdsArgs;
use crate::model::ChunkId;
use crate::util::{read_json, write_json_pretty};

pub fn run(args: RepairChunkIdsArgs) -> Result<()> {
    let mut document: Value = read_json(&args.input)?;
    let repaired = repair_chunk_ids(&mut document);

    let output = args.output.as_deref().unwrap_or(&args.input);
    write_json_pretty(output, &document)?;

    info!(
        input = %args.input.display(),
        output = %output.display(),
        repaired,
        "repaired chunk ids"
    );
    Ok(())
}

/// Rewrites every `chunk_id` string field with a duplicated document prefix,
/// at any depth. Returns the number of rewritten ids.
pub fn repair_chunk_ids(value: &mut Value) -> usize {
    match value {
        Value::Array(items) => items.iter_mut().map(repair_chunk_ids).sum(),
        Value::Object(fields) => {
            let mut repaired = 0;
            for (key, field) in fields.iter_mut() {
                if key == "chunk_id"
                    && let Value::String(raw) = field
                    && let Some(fixed) = ChunkId::new(raw.as_str()).without_duplicated_prefix()
                {
                    *raw = fixed.as_str().to_string();
                    repaired += 1;
                    continue;
                }
                repaired += repair_chunk_ids(field);
            }
            repaired
        }
        _ => 0,
    }
}
