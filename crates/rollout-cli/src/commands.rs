use super::args::{Cli, Commands};
use super::handlers::{self, HandlerContext};
use anyhow::{Context, Result};
use rollout_runtime::{RolloutStore, resolve_data_dir};

pub fn run(cli: Cli) -> Result<()> {
    crate::logging::init(cli.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;
    let store = RolloutStore::open(&data_dir)
        .with_context(|| format!("Failed to open rollout store in {}", data_dir.display()))?;
    let ctx = HandlerContext::new(cli.format);

    match cli.command {
        Commands::List { limit, cursor } => {
            handlers::list::handle(&ctx, &store, limit, cursor).await
        }

        Commands::History { session_id } => {
            handlers::history::handle(&ctx, &store, session_id).await
        }

        Commands::Cleanup { every } => handlers::cleanup::handle(&ctx, &store, every).await,

        Commands::Delete { session_id } => handlers::delete::handle(&ctx, &store, session_id).await,

        Commands::Export { session_id, output } => {
            handlers::export::handle(&ctx, &store, session_id, output).await
        }

        Commands::Import { path, ttl_days } => {
            handlers::import::handle(&ctx, &store, path, ttl_days).await
        }

        Commands::Record {
            id,
            instructions,
            ttl_days,
        } => {
            let stdin = std::io::stdin();
            handlers::record::handle(&ctx, &store, stdin.lock(), id, instructions, ttl_days).await
        }
    }
}
