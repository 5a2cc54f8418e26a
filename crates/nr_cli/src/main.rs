use clap::Parser;
use nr_core::{Article, Result};
use nr_functions::{Functions, StaticTokenVerifier};
use nr_text::{extract_keywords, Cleaner, CleanerRules, KeywordOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

/// Longest interval the periodic backfill accepts.
const MAX_DURATION_SECONDS: u64 = 365 * 86400;

fn parse_count(digits: &str) -> std::result::Result<u64, String> {
    digits.parse().map_err(|_| format!("Duration number '{}' is too large", digits))
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_number = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let unit_seconds: u64 = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            if current_number.is_empty() {
                return Err(format!("Missing number before unit '{}'", c));
            }
            total_seconds = parse_count(&current_number)?
                .checked_mul(unit_seconds)
                .and_then(|seconds| total_seconds.checked_add(seconds))
                .ok_or_else(|| format!("Duration '{}' is too large", s))?;
            current_number.clear();
            has_number = true;
        }

        // trailing bare number counts as seconds
        if !current_number.is_empty() {
            total_seconds = total_seconds
                .checked_add(parse_count(&current_number)?)
                .ok_or_else(|| format!("Duration '{}' is too large", s))?;
            has_number = true;
        }

        if !has_number || total_seconds == 0 {
            return Err("Duration must be a positive amount like 30m or 1h15m".to_string());
        }
        if total_seconds > MAX_DURATION_SECONDS {
            return Err(format!("Duration '{}' is longer than 365d", s));
        }
        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "News reader backend", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "NR_STORAGE", default_value = "memory")]
    storage: String,
    /// Backend location, e.g. the SQLite database file
    #[arg(long, env = "NR_BACKEND_URL")]
    backend_url: Option<String>,
    /// Speech synthesizer: http or dummy
    #[arg(long, env = "NR_SPEECH", default_value = "http")]
    speech: String,
    #[arg(long, env = "NR_TTS_URL", default_value = nr_speech::DEFAULT_TTS_ENDPOINT)]
    tts_url: String,
    /// JSON file overriding the cleaner's phrase lists and thresholds
    #[arg(long, env = "NR_CLEANER_RULES")]
    rules: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the callable and REST endpoints
    Serve {
        #[arg(long, env = "NR_BIND", default_value = "127.0.0.1:3000")]
        bind: String,
        /// Accepted caller tokens as uid:token, comma separated
        #[arg(long = "tokens", env = "NR_TOKENS", value_delimiter = ',')]
        tokens: Vec<String>,
    },
    /// Clean raw article text from a file or stdin
    Clean { file: Option<PathBuf> },
    /// Print the keywords of a text from a file or stdin
    Keywords {
        file: Option<PathBuf>,
        /// Use the short-token settings applied to search queries
        #[arg(long)]
        query: bool,
    },
    /// Store articles from a JSON array file, running the content sync on each
    Import { file: PathBuf },
    /// Re-clean every stored article
    Backfill {
        /// Repeat with the given interval (e.g. 1h, 30m, 1d, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn load_cleaner(rules: Option<&Path>) -> Result<Cleaner> {
    match rules {
        Some(path) => {
            let rules = CleanerRules::from_file(path)?;
            info!("🧹 Cleaner rules loaded from {}", path.display());
            Cleaner::new(rules)
        }
        None => Ok(Cleaner::default()),
    }
}

async fn build_functions(cli: &Cli) -> Result<Functions> {
    let storage = nr_storage::create_storage(cli.storage.as_str(), cli.backend_url.as_deref()).await?;
    info!("✨ Storage initialized successfully (using {})", cli.storage);

    let speech_config = nr_speech::Config {
        model_name: cli.speech.clone(),
        endpoint: cli.tts_url.clone(),
    };
    let speech = nr_speech::create_synthesizer(Some(speech_config)).await?;
    let cleaner = load_cleaner(cli.rules.as_deref())?;
    Ok(Functions::new(&storage, speech, cleaner))
}

async fn import(functions: &Functions, file: &Path) -> Result<()> {
    let articles: Vec<Article> = serde_json::from_str(&std::fs::read_to_string(file)?)?;
    info!("📥 Importing {} articles from {}", articles.len(), file.display());

    for mut article in articles {
        if article.id.is_empty() {
            warn!("⚠️ Skipping article without id: {:?}", article.title);
            continue;
        }
        article.category = article.category.to_lowercase();
        let stored = functions.syncer.write_article(article).await?;
        info!("📰 {} -> {}", stored.id, stored.processing_status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Clean { file } => {
            let cleaner = load_cleaner(cli.rules.as_deref())?;
            println!("{}", cleaner.clean(&read_input(file.as_deref())?));
        }
        Commands::Keywords { file, query } => {
            let cleaner = load_cleaner(cli.rules.as_deref())?;
            let text = read_input(file.as_deref())?;
            let keywords = if *query {
                extract_keywords(&text, KeywordOptions::query())
            } else {
                extract_keywords(&cleaner.clean(&text), KeywordOptions::document())
            };
            println!("{}", keywords.join("\n"));
        }
        Commands::Serve { bind, tokens } => {
            let verifier = StaticTokenVerifier::from_specs(tokens)?;
            if verifier.is_empty() {
                warn!("⚠️ No caller tokens configured, every callable will answer unauthenticated");
            }
            let functions = build_functions(&cli).await?;
            nr_web::serve(nr_web::AppState::new(functions, Arc::new(verifier)), bind).await?;
        }
        Commands::Import { file } => {
            let functions = build_functions(&cli).await?;
            import(&functions, file).await?;
        }
        Commands::Backfill { interval } => {
            let functions = build_functions(&cli).await?;
            match interval {
                Some(interval) => {
                    info!("Running in periodic mode with {}s interval", interval.0.as_secs());
                    loop {
                        if let Err(e) = functions.syncer.backfill().await {
                            warn!("⚠️ Backfill failed: {}", e);
                        }
                        info!("Waiting {}s before next backfill", interval.0.as_secs());
                        tokio::time::sleep(interval.0).await;
                    }
                }
                None => {
                    let report = functions.syncer.backfill().await?;
                    println!("{}", serde_json::to_string(&report)?);
                }
            }
        }
    }

    Ok(())
}
