//! ragkb CLI: build a knowledge base and ask it questions.
//!
//! ```bash
//! # Index ./knowledge_base into ./vector_store/index.db
//! ragkb build
//!
//! # One-shot question
//! ragkb ask "Where did the cat sit?" -k 2
//!
//! # Interactive session with conversation memory
//! ragkb chat
//! ```
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ragkb::config::{Config, DEFAULT_CONFIG_PATH, Provider};
use ragkb::db::VectorStore;
use ragkb::generator::{Answer, AnswerGenerator};
use ragkb::indexer::core::{BuildReport, Indexer};
use ragkb::qa::QaSession;
use ragkb::retriever::Retriever;
use ragkb::{embedder, generator};

#[derive(Parser)]
#[command(name = "ragkb")]
#[command(about = "Ask questions about a directory of text files, with sources")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Knowledge base directory (overrides config)
    #[arg(long, global = true)]
    knowledge_dir: Option<PathBuf>,

    /// Vector store file (overrides config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Only log warnings and hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the vector store from the knowledge base
    Build,

    /// Ask a single question
    Ask {
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// Interactive question loop (`history`, `clear`, `exit`)
    Chat {
        /// Number of chunks to retrieve
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// Show store statistics and indexed sources
    Info,
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let mut config = Config::load(&cli.config)?;
    if let Some(dir) = cli.knowledge_dir {
        config.knowledge_dir = dir;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    match &cli.command {
        Commands::Ask { top_k: Some(k), .. } | Commands::Chat { top_k: Some(k) } => {
            config.top_k = *k;
        }
        _ => {}
    }
    config.validate()?;

    match cli.command {
        Commands::Build => {
            let report = build_store(&config, cli.quiet)?;
            print_report(&report);
        }
        Commands::Ask { question, .. } => {
            let store = open_or_build(&config, cli.quiet)?;
            let embedder = embedder::from_config(&config.embedding)?;
            let generator = generator::from_config(&config.generation)?;

            let mut session = QaSession::new(
                Retriever::new(embedder.as_ref(), &store, config.top_k)?,
                AnswerGenerator::new(generator.as_ref(), config.template()?),
                config.history_limit,
            );
            let answer = session.ask(&question)?;
            print_answer(&answer);
        }
        Commands::Chat { .. } => {
            let store = open_or_build(&config, cli.quiet)?;
            let embedder = embedder::from_config(&config.embedding)?;
            let generator = generator::from_config(&config.generation)?;

            let session = QaSession::new(
                Retriever::new(embedder.as_ref(), &store, config.top_k)?,
                AnswerGenerator::new(generator.as_ref(), config.template()?),
                config.history_limit,
            );
            chat_loop(session)?;
        }
        Commands::Info => {
            let store = VectorStore::load_read_only(&config.store_path)
                .with_context(|| format!("cannot open {}", config.store_path.display()))?;
            print_info(&store)?;
        }
    }

    Ok(())
}

/// `store.db` -> `store.db.tmp`, next to the target.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Build into a temporary file and swap it in, so a failed build never
/// leaves a half-written store behind.
fn build_store(config: &Config, quiet: bool) -> Result<BuildReport> {
    if !config.knowledge_dir.is_dir() {
        bail!(
            "knowledge base directory {} does not exist",
            config.knowledge_dir.display()
        );
    }
    info!(
        "Building vector store from {}",
        config.knowledge_dir.display()
    );

    let embedder = embedder::from_config(&config.embedding)?;
    let tmp = temp_path(&config.store_path);
    if tmp.exists() {
        std::fs::remove_file(&tmp)
            .with_context(|| format!("cannot remove stale {}", tmp.display()))?;
    }

    let built = {
        let mut store = VectorStore::create(&tmp, config.embedding.dimensions)?;
        Indexer::from_config(&mut store, embedder.as_ref(), config)?
            .with_progress(!quiet)
            .build(&config.knowledge_dir)
    };
    let report = match built {
        Ok(report) => report,
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).context("build failed; previous store left unchanged");
        }
    };

    std::fs::rename(&tmp, &config.store_path).with_context(|| {
        format!(
            "cannot move {} to {}",
            tmp.display(),
            config.store_path.display()
        )
    })?;
    info!("Vector store written to {}", config.store_path.display());
    Ok(report)
}

/// Open the store read-only, building it first if only the knowledge base
/// exists.
fn open_or_build(config: &Config, quiet: bool) -> Result<VectorStore> {
    if !config.store_path.is_file() {
        if !config.knowledge_dir.is_dir() {
            bail!(
                "no vector store at {} and knowledge base directory {} does not exist",
                config.store_path.display(),
                config.knowledge_dir.display()
            );
        }
        info!("No vector store yet, building one");
        let report = build_store(config, quiet)?;
        if !quiet {
            print_report(&report);
        }
    }

    let store = VectorStore::load_read_only(&config.store_path)?;
    let expected = match config.embedding.provider {
        Provider::Mock => embedder::mock::MOCK_MODEL_NAME,
        Provider::Ollama => config.embedding.model.as_str(),
    };
    if let Some(built_with) = store.info()?.embedding_model {
        if built_with != expected {
            warn!(
                "Store was built with {built_with} but {expected} is configured; rebuild with `ragkb build`"
            );
        }
    }
    Ok(store)
}

fn chat_loop(mut session: QaSession<'_>) -> Result<()> {
    println!("Ask a question. Commands: history, clear, exit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\n> ");
        stdout.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        match line.trim() {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                session.clear_history();
                println!("History cleared.");
            }
            "history" => {
                if session.history().is_empty() {
                    println!("(no history)");
                } else {
                    print!("{}", session.history().render());
                }
            }
            question => {
                let streamed = session.ask_streaming(question, &mut |token| {
                    print!("{token}");
                    let _ = stdout.flush();
                });
                match streamed {
                    Ok(answer) => {
                        println!();
                        print_sources(&answer);
                    }
                    Err(e) => eprintln!("\nError: {e}"),
                }
            }
        }
    }
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    print_sources(answer);
}

fn print_sources(answer: &Answer) {
    if answer.is_grounded() {
        println!("\nSources:\n{}", answer.format_sources());
    } else {
        println!("\n(No relevant documents found; answered from the model alone.)");
    }
}

fn print_report(report: &BuildReport) {
    println!(
        "Indexed {} chunks from {} documents",
        report.chunks, report.documents
    );
    if report.blank_chunks > 0 {
        println!("Skipped {} blank chunks", report.blank_chunks);
    }
    for path in &report.failed_files {
        println!("Failed to load {}", path.display());
    }
}

fn print_info(store: &VectorStore) -> Result<()> {
    let info = store.info()?;
    println!("Dimensions:      {}", info.dimensions);
    println!("Documents:       {}", info.documents);
    println!("Chunks:          {}", info.chunks);
    println!(
        "Embedding model: {}",
        info.embedding_model.as_deref().unwrap_or("unknown")
    );
    if let Some(built_at) = info.built_at {
        println!("Built at:        {}", built_at.to_rfc3339());
    }

    let sources = store.list_sources()?;
    if !sources.is_empty() {
        println!("\nSources:");
        for s in sources {
            println!("  {s}");
        }
    }
    Ok(())
}
