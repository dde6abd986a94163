//! svd-retrieval CLI.
//!
//! Builds chunks from parsed register records, indexes them into a vector
//! store, and answers questions against the index.

use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use svd_retrieval::ChunkKind;
use svd_retrieval::HybridRetriever;
use svd_retrieval::IndexPipeline;
use svd_retrieval::RetrievalConfig;
use svd_retrieval::SearchParams;
use svd_retrieval::embeddings::create_embedder;
use svd_retrieval::eval;
use svd_retrieval::indexing::prepare_chunks;
use svd_retrieval::model::load_registers;
use svd_retrieval::reranker::create_reranker;
use svd_retrieval::storage::create_store;

#[derive(Parser)]
#[command(name = "svd-retrieval")]
#[command(about = "Hybrid search over hardware register descriptions")]
struct Cli {
    /// Working directory used to locate `.svd-retrieval/config.toml`
    #[arg(short, long, default_value = ".")]
    workdir: PathBuf,

    /// Path to config file (default: {workdir}/.svd-retrieval/config.toml or ~/.svd-retrieval/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deduplicate records and print the chunks they produce
    Chunk {
        /// JSON array of parsed register records
        input: PathBuf,
        /// Print every chunk as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Deduplicate, chunk, embed and upsert records into the store
    Index {
        /// JSON array of parsed register records
        input: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a question
    Search {
        query: String,
        /// Number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Rerank with the cross-encoder
        #[arg(long)]
        rerank: bool,
        /// Dense-only baseline (no BM25, no reranking)
        #[arg(long, conflicts_with = "rerank")]
        dense: bool,
        /// Print results with their debug trace as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the golden question suite
    Eval {
        /// TOML file of `[[cases]]` (default: built-in suite)
        #[arg(long)]
        cases: Option<PathBuf>,
        /// Rerank with the cross-encoder
        #[arg(long)]
        rerank: bool,
        /// Exit with an error when the pass rate is below the threshold
        #[arg(long)]
        strict: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive("svd_retrieval=info".parse()?);
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    let workdir = cli.workdir.canonicalize().unwrap_or(cli.workdir.clone());
    let config = if let Some(config_path) = &cli.config {
        if !config_path.exists() {
            anyhow::bail!("Config file not found: {}", config_path.display());
        }
        eprintln!("Using config: {}", config_path.display());
        RetrievalConfig::from_file(config_path)?
    } else {
        RetrievalConfig::load(&workdir)?
    };

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Command::Chunk { input, json } => cmd_chunk(&config, &input, json)?,
        Command::Index { input, json } => cmd_index(&config, &input, json).await?,
        Command::Search {
            query,
            top_k,
            rerank,
            dense,
            json,
        } => cmd_search(&config, &query, top_k, rerank, dense, json).await?,
        Command::Eval {
            cases,
            rerank,
            strict,
            json,
        } => cmd_eval(&config, cases.as_deref(), rerank, strict, json).await?,
        Command::Config => cmd_config(&config)?,
    }
    Ok(())
}

fn cmd_chunk(config: &RetrievalConfig, input: &Path, json: bool) -> anyhow::Result<()> {
    let prepared = prepare_chunks(load_registers(input)?, config);

    if json {
        for chunk in &prepared.batch.chunks {
            println!("{}", serde_json::to_string(chunk)?);
        }
        return Ok(());
    }

    println!("Registers: {}", prepared.registers_in);
    for report in &prepared.dedup {
        println!(
            "Dedup: {} -> {} ({:.1}% removed, largest group {})",
            report.before,
            report.after,
            report.reduction_pct(),
            report.max_group_size
        );
    }
    println!("Chunks: {}", prepared.batch.chunks.len());
    for kind in [
        ChunkKind::Register,
        ChunkKind::PeripheralSummary,
        ChunkKind::PeripheralDetail,
        ChunkKind::DeviceSummary,
    ] {
        println!("  {kind}: {}", prepared.batch.count(kind));
    }
    for failure in &prepared.batch.failures {
        println!("Skipped {}: {}", failure.item, failure.reason);
    }
    Ok(())
}

async fn cmd_index(config: &RetrievalConfig, input: &Path, json: bool) -> anyhow::Result<()> {
    let registers = load_registers(input)?;
    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config.store, embedder.clone())?;

    let report = IndexPipeline::new(config.clone(), embedder, store)
        .run(registers)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Registers: {} ({} after dedup)",
        report.registers_in, report.registers_after_dedup
    );
    for (kind, count) in &report.chunks {
        println!("  {kind}: {count}");
    }
    println!("Upserted: {}/{}", report.upserted, report.total_chunks());
    for failure in report.failures.iter().take(10) {
        println!("Failed ({:?}) {}: {}", failure.stage, failure.item, failure.reason);
    }
    if report.failures.len() > 10 {
        println!("... and {} more", report.failures.len() - 10);
    }
    if let Some(finished) = chrono::DateTime::from_timestamp(report.finished_at, 0) {
        println!("Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}

fn build_retriever(config: &RetrievalConfig, rerank: bool) -> anyhow::Result<HybridRetriever> {
    let embedder = create_embedder(&config.embedding)?;
    let store = create_store(&config.store, embedder.clone())?;
    let mut retriever = HybridRetriever::from_config(store, config).with_embeddings(embedder);

    let mut reranker_config = config.reranker.clone();
    reranker_config.enabled |= rerank;
    if let Some(reranker) = create_reranker(&reranker_config, &config.retry)? {
        retriever = retriever.with_reranker(reranker);
    }
    Ok(retriever)
}

async fn cmd_search(
    config: &RetrievalConfig,
    query: &str,
    top_k: Option<usize>,
    rerank: bool,
    dense: bool,
    json: bool,
) -> anyhow::Result<()> {
    let retriever = build_retriever(config, rerank && !dense)?;
    let mut params = SearchParams::from(&config.search);
    if let Some(top_k) = top_k {
        params = params.with_top_k(top_k);
    }

    let results = if dense {
        retriever.search_dense_only(query, &params).await?
    } else {
        retriever.search(query, &params).await?
    };

    if json {
        let values: Vec<serde_json::Value> = results.iter().map(|r| r.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    println!("Found {} results:\n", results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {}/{} (score: {:.6}, type: {})",
            i + 1,
            result.peripheral,
            result.register,
            result.score,
            result.kind.map_or("unknown", ChunkKind::as_str)
        );
        if let Some(address) = &result.address {
            println!("   address: {address}");
        }
        let preview: String = result.text.lines().take(3).collect::<Vec<_>>().join(" | ");
        println!("   {preview}\n");
    }
    Ok(())
}

async fn cmd_eval(
    config: &RetrievalConfig,
    cases: Option<&Path>,
    rerank: bool,
    strict: bool,
    json: bool,
) -> anyhow::Result<()> {
    let cases = match cases {
        Some(path) => eval::load_cases(path)?,
        None => eval::default_cases()?,
    };
    let retriever = build_retriever(config, rerank)?;
    let report = eval::run_suite(&retriever, &cases).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if strict && !report.meets_threshold() {
        anyhow::bail!(
            "pass rate {:.1}% is below {:.1}%",
            report.pass_rate(),
            eval::PASS_THRESHOLD_PCT
        );
    }
    Ok(())
}

fn cmd_config(config: &RetrievalConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    let warnings = config.validate();
    if !warnings.is_empty() {
        println!();
        for warning in warnings {
            println!("# warning: {warning}");
        }
    }
    Ok(())
}
