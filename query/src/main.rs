use anyhow::Result;
use clap::{Parser, Subcommand};
use query::{build_engine, load_boolean_index, run_boolean_session, run_ranked_session, AuthorityMode, SearchSpace};
use retrieval::config::DEFAULT_TOP_K;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Interactive boolean and ranked search over a snapshot", long_about = None)]
struct Cli {
    /// Snapshot directory written by the indexer
    #[arg(long, default_value = "./data")]
    data: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// AND/OR/NOT set queries; `exit` quits
    Boolean,
    /// Cosine-ranked free-text queries; `q` quits
    Ranked {
        #[arg(long, value_enum, default_value_t = SearchSpace::Token)]
        space: SearchSpace,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Tie-breaker for equal scores
        #[arg(long, value_enum, default_value_t = AuthorityMode::Pagerank)]
        authority: AuthorityMode,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Boolean => {
            let index = load_boolean_index(&cli.data)?;
            run_boolean_session(&index, io::stdin().lock(), io::stdout().lock())?;
        }
        Commands::Ranked { space, top_k, authority } => {
            let engine = build_engine(&cli.data, authority)?;
            tracing::info!(?space, top_k, "ranked search ready");
            run_ranked_session(&engine, space, top_k, io::stdin().lock(), io::stdout().lock())?;
        }
    }
    Ok(())
}
