use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::collapse::DocumentSelection;
use crate::fusion::FusionStrategy;

#[derive(Parser, Debug)]
#[command(
    name = "lawfuse",
    version,
    about = "Fusion and F2 evaluation of ranked legal-retrieval results"
)]
pub struct Cli {
    /// Tracing filter directive used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Fuse(FuseArgs),
    FuseBatch(FuseBatchArgs),
    Evaluate(EvaluateArgs),
    Submit(SubmitArgs),
    Reorder(ReorderArgs),
    RepairChunkIds(RepairChunkIdsArgs),
    Tokenize(TokenizeArgs),
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FuseArgs {
    /// Ranked result files; the first is the dense model, the second lexical.
    #[arg(long = "source", required = true)]
    pub sources: Vec<PathBuf>,

    /// One weight per source; every source weighs 1.0 when omitted.
    #[arg(long = "weight")]
    pub weights: Vec<f64>,

    #[arg(long, value_enum, default_value_t = FusionStrategy::Sum)]
    pub strategy: FusionStrategy,

    #[arg(long, default_value_t = 100)]
    pub top_k: usize,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FuseBatchArgs {
    #[arg(long)]
    pub plan: PathBuf,

    /// Writes one run manifest per fused pair into this directory.
    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub ground_truth: PathBuf,

    /// `name=path`, or a bare path named after its file stem.
    #[arg(long = "predictions", required = true, value_parser = parse_named_path)]
    pub predictions: Vec<NamedPath>,

    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    #[arg(long, value_enum, default_value_t = DocumentSelection::RawWindow)]
    pub selection: DocumentSelection,

    /// Query file whose qid order the submission follows.
    #[arg(long)]
    pub order_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReorderArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub order_path: PathBuf,

    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RepairChunkIdsArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Rewrites the input in place when omitted.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TokenizeArgs {
    #[arg(long)]
    pub questions: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub stopwords_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub input: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPath {
    pub name: String,
    pub path: PathBuf,
}

fn parse_named_path(value: &str) -> Result<NamedPath, String> {
    if let Some((name, path)) = value.split_once('=') {
        if name.is_empty() || path.is_empty() {
            return Err(format!("expected name=path, got `{value}`"));
        }
        return Ok(NamedPath {
            name: name.to_string(),
            path: PathBuf::from(path),
        });
    }

    let path = Path::new(value);
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| format!("cannot derive a name from `{value}`"))?;
    Ok(NamedPath {
        name: name.to_string(),
        path: path.to_path_buf(),
    })
}
