use anyhow::Result;
use tracing::info;

use crate::cli::ReorderArgs;
use crate::scores::{load_query_order, loader};
use crate::util::write_json_pretty;
use crate::writer::reorder_records;

pub fn run(args: ReorderArgs) -> Result<()> {
    let records = loader::read_records(&args.input)?;
    let order = load_query_order(&args.order_path)?;

    let input_count = records.len();
    let reordered = reorder_records(records, &order);
    write_json_pretty(&args.output, &reordered)?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        records = reordered.len(),
        dropped = input_count.saturating_sub(reordered.len()),
        "reordered results"
    );
    Ok(())
}
