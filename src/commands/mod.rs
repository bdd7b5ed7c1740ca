use anyhow::Result;

use crate::cli::Commands;

pub mod batch;
pub mod evaluate;
pub mod fuse;
pub mod inspect;
pub mod reorder;
pub mod repair;
pub mod submit;
pub mod tokenize;

pub fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Fuse(args) => fuse::run(args),
        Commands::FuseBatch(args) => batch::run(args),
        Commands::Evaluate(args) => evaluate::run(args),
        Commands::Submit(args) => submit::run(args),
        Commands::Reorder(args) => reorder::run(args),
        Commands::RepairChunkIds(args) => repair::run(args),
        Commands::Tokenize(args) => tokenize::run(args),
        Commands::Inspect(args) => inspect::run(args),
    }
}
