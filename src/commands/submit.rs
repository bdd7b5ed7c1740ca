use anyhow::Result;
use tracing::info;

use crate::cli::SubmitArgs;
use crate::collapse;
use crate::error::ConfigError;
use crate::scores;
use crate::writer;

pub fn run(args: SubmitArgs) -> Result<()> {
    if args.top_k == 0 {
        return Err(ConfigError::NonPositiveTopK.into());
    }

    let ranked = scores::load_raw(&args.input)?;
    let order = args
        .order_path
        .as_deref()
        .map(scores::load_query_order)
        .transpose()?;

    let predictions = collapse::select_documents(&ranked, args.top_k, args.selection);
    writer::write_submission(&args.output, &predictions, order.as_deref())?;

    info!(
        input = %args.input.display(),
        selection = args.selection.as_str(),
        top_k = args.top_k,
        "submission completed"
    );
    Ok(())
}
