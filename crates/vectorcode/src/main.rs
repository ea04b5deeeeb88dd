use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use vectorcode::actions::{Action, ActionOutput, AppContext, QueryParams, VectoriseParams};
use vectorcode::cache::ConfigCache;
use vectorcode::chroma::ChromaConnector;
use vectorcode::config;
use vectorcode::files::LocalFiles;
use vectorcode::progress::{reporter_for, ProgressMode};
use vectorcode::server;

use vectorcode_core::embedding::HashEmbedder;
use vectorcode_core::fs::FileAccess;

#[derive(Parser)]
#[command(name = "vectorcode", version, about = "Semantic code indexing and retrieval")]
struct Cli {
    /// Project root to operate on. Defaults to the current directory.
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Progress reporting on stderr.
    #[arg(long, global = true, value_enum, default_value_t = ProgressMode::default())]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve the files most relevant to one or more query messages.
    Query {
        #[arg(required = true)]
        messages: Vec<String>,
        /// Number of files to return.
        #[arg(short, long, default_value_t = 5)]
        n_results: usize,
    },
    /// Index files or directories into the project's collection.
    Vectorise {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List known collections.
    Ls,
    /// Run the HTTP tool server.
    Serve {
        #[arg(long, default_value = "127.0.0.1:9590")]
        bind: std::net::SocketAddr,
    },
}

/// Expand directory arguments to the files beneath them. Dot-directories
/// such as `.git` are not descended into; fine-grained exclusion happens
/// later against the project's own patterns.
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let walk = WalkDir::new(path).into_iter().filter_entry(|entry| {
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_string_lossy()
                        .starts_with('.')
            });
            for entry in walk.flatten() {
                if entry.file_type().is_file() {
                    out.push(entry.into_path());
                }
            }
        } else {
            out.push(path.clone());
        }
    }
    out.sort();
    out.dedup();
    out
}

fn embedder_for(base: &config::ProjectConfig) -> Arc<HashEmbedder> {
    let dims = base
        .embedding_params
        .get("dims")
        .and_then(|v| v.as_u64())
        .unwrap_or(384) as usize;
    Arc::new(HashEmbedder::new(dims))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let files: Arc<dyn FileAccess> = Arc::new(LocalFiles);
    let connector = Arc::new(ChromaConnector::new());

    let default_root = match &cli.project_root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("cannot resolve current directory")?,
    };
    let base = config::load_project_config(files.as_ref(), &default_root).await?;

    let app = Arc::new(AppContext {
        cache: ConfigCache::new(files.clone(), connector.clone()),
        connector,
        files,
        embedder: embedder_for(&base),
        progress: reporter_for(cli.progress),
        base,
        default_project_root: default_root,
    });

    let cancel = CancellationToken::new();
    let action = match cli.command {
        Command::Query { messages, n_results } => Action::Query(QueryParams {
            messages,
            n_results,
            project_root: cli.project_root.clone(),
        }),
        Command::Vectorise { paths } => Action::Vectorise(VectoriseParams {
            paths: expand_paths(&paths),
            project_root: cli.project_root.clone(),
        }),
        Command::Ls => Action::Ls,
        Command::Serve { bind } => {
            return server::serve(app, bind).await;
        }
    };

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    match app.dispatch(action, &cancel).await? {
        ActionOutput::Vectorise(stats) => {
            println!("added: {}", stats.added);
            println!("updated: {}", stats.updated);
            println!("removed: {}", stats.removed);
            println!("skipped: {}", stats.skipped);
        }
        output => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}
