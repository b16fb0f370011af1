use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use nextsight::config::{Config, ScorerBackend};
use nextsight::error::Error;
use nextsight::output::report::{self, ReportMeta};
use nextsight::taxonomy::Taxonomy;
use nextsight::toxicity::traits::ToxicityOracle;
use nextsight::vault::{ConsolePrompter, Vault};
use nextsight::xapi::client::{parse_username, XClient};

/// Next Sight: AI analysis of harmful behavior on X.com accounts.
///
/// Scores an account's recent posts with a toxicity classifier and your own
/// keyword categories, then writes a report of everything flagged.
#[derive(Parser)]
#[command(name = "nextsight", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an account's recent posts and write a report
    Analyze {
        /// Profile URL or handle (e.g. https://x.com/someone); prompted if omitted
        profile: Option<String>,

        /// Max posts to fetch (default: 100)
        #[arg(long, default_value = "100")]
        max_posts: usize,

        /// Number of posts to score in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Download the ONNX toxicity model (~110 MB)
    DownloadModel,

    /// Show keyword, vault and classifier status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nextsight=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            profile,
            max_posts,
            concurrency,
        } => {
            print_banner();
            let config = Config::load()?;

            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_signal(cancel.clone()));

            let finished = analyze(&config, profile, max_posts, concurrency, &cancel).await?;
            if !finished {
                println!("\nExiting. Goodbye!");
                // The profile prompt may still be blocking a worker thread;
                // the runtime would wait on it forever at shutdown.
                std::process::exit(0);
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX toxicity model...");
            println!("  Destination: {}", model_dir.display());

            nextsight::toxicity::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `nextsight analyze <profile>`.");
        }

        Commands::Status => {
            let config = Config::load()?;
            nextsight::status::show(&config);
        }
    }

    Ok(())
}

/// The full analysis run. Returns Ok(false) if interrupted before a report
/// was written; fatal errors propagate and no report is produced.
async fn analyze(
    config: &Config,
    profile: Option<String>,
    max_posts: usize,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<bool> {
    // Startup preconditions: keywords and classifier, before any network use.
    let taxonomy = Taxonomy::load(&config.keywords_path)?;
    let oracle = create_oracle(config)?;

    let vault = Vault::new(&config.vault_dir);
    let bearer = match vault
        .load_or_prompt_secret_until(ConsolePrompter::default(), cancel)
        .await
    {
        Ok(bearer) => bearer,
        Err(Error::Cancelled) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let profile = match profile {
        Some(p) => p,
        None => match blocking_unless_cancelled(cancel, read_profile).await? {
            Some(p) => p?,
            None => return Ok(false),
        },
    };
    let username = parse_username(&profile)?;

    let client = XClient::new(&config.api_url, bearer)?;
    println!("Fetching recent posts for @{username}...");
    let fetch = async {
        let user_id = client.resolve_user_id(&username).await?;
        nextsight::xapi::posts::fetch_recent_posts(&client, &user_id, max_posts).await
    };
    let items = tokio::select! {
        _ = cancel.cancelled() => return Ok(false),
        items = fetch => items?,
    };
    println!("  {} posts fetched", items.len());

    let run = nextsight::pipeline::run(&items, &taxonomy, oracle.as_ref(), concurrency, cancel).await;
    if run.cancelled {
        return Ok(false);
    }

    nextsight::output::terminal::display_summary(&username, run.items_analyzed, &run.findings);

    let meta = ReportMeta {
        subject: username,
        items_analyzed: run.items_analyzed,
        generated_at: chrono::Utc::now(),
    };
    let path = report::generate(&run.findings, &meta, &config.reports_dir)?;
    println!("\nReport generated: {}", path.display().to_string().bold());

    Ok(true)
}

/// Create the toxicity oracle for the configured backend.
/// Failure is OracleUnavailable and aborts the run before any post is scored.
fn create_oracle(config: &Config) -> Result<Box<dyn ToxicityOracle>, Error> {
    config.require_scorer()?;
    match config.scorer_backend {
        ScorerBackend::Onnx => {
            info!("Using local ONNX toxicity oracle");
            let oracle = nextsight::toxicity::onnx::OnnxOracle::load(&config.model_dir)?;
            Ok(Box::new(oracle))
        }
        ScorerBackend::Perspective => {
            info!("Using Perspective API toxicity oracle");
            let oracle = nextsight::toxicity::perspective::PerspectiveOracle::new(
                config.perspective_api_key.clone(),
            );
            Ok(Box::new(oracle))
        }
    }
}

/// Run a blocking console read off the async runtime, giving up if the run
/// is cancelled first. Only for reads that leave the terminal untouched.
async fn blocking_unless_cancelled<T, F>(cancel: &CancellationToken, f: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    tokio::select! {
        _ = cancel.cancelled() => Ok(None),
        joined = task => Ok(Some(joined.context("console prompt task failed")?)),
    }
}

fn read_profile() -> Result<String> {
    use std::io::Write;

    print!("Enter the X.com profile URL to analyze: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read profile URL")?;
    Ok(line.trim().to_string())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, stopping"),
        () = terminate => info!("Received SIGTERM, stopping"),
    }
    token.cancel();
}

fn print_banner() {
    println!(
        "{}",
        "===============================================\n       \
         Next Sight - X.com AI Analyzer\n\
         ===============================================\n   \
         Analysis tool for monitoring harmful online\n   \
         behavior on x.com (formerly Twitter).\n\
         ==============================================="
            .bold()
    );
}
