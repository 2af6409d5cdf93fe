//! ielts-import - IELTS content import tool
//!
//! Builds linked Test/Section/Group/Question documents from crawled source
//! JSON and imports them into the content database in dependency order.
//!
//! Exit status: 0 on a clean run, 1 on a fatal error, 2 when documents were
//! skipped or validation found issues.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ielts_common::config::{ResolvedConfig, TomlConfig};
use ielts_import::answers::{build_answer_documents, load_answer_sources};
use ielts_import::batch_files::{read_batches, read_existing, write_batches, write_collection};
use ielts_import::builder::DocumentBuilder;
use ielts_import::db::verify::verify_store;
use ielts_import::db::Store;
use ielts_import::direct::write_test;
use ielts_import::documents::DocumentBatches;
use ielts_import::source::load_source;
use ielts_import::validate::{validate_batches, ExportReport};
use ielts_import::{Collection, ImportError, ImportOptions, ImportSummary, Importer, ParentResolution};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const EXIT_WITH_SKIPS: i32 = 2;

/// Command-line arguments for ielts-import
#[derive(Parser, Debug)]
#[command(name = "ielts-import")]
#[command(about = "Build and import linked IELTS test collections")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(long, global = true, env = "IELTS_DATABASE")]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true, env = "IELTS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build collection batch files from source test JSON
    Build {
        /// Source test files (one Test each)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output collections directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Merge into batch files already in the output directory
        #[arg(long)]
        append: bool,

        /// Crawler answer.json to include as answers.json
        #[arg(long)]
        answers: Option<PathBuf>,
    },

    /// Report range, coverage and duplicate problems in batch files
    Validate {
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Import batch files in dependency order
    Import {
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Empty all collections first
        #[arg(long)]
        drop_existing: bool,

        /// Skip rewriting each Test's section id list
        #[arg(long)]
        no_backfill: bool,
    },

    /// Build and upsert source tests directly, without batch files
    Write {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Build Answer records from a crawler answer.json
    Answers {
        answer_json: PathBuf,

        /// Write answers.json into this collections directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Link and upsert by looking up parents in the database
        #[arg(long)]
        auto_resolve_from_storage: bool,
    },

    /// Count documents and orphaned references in the database
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let config = ResolvedConfig::resolve(args.database.as_deref(), &toml)
        .context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting ielts-import"
    );

    let clean = match args.command {
        Command::Build {
            inputs,
            out,
            append,
            answers,
        } => {
            let out = out.unwrap_or_else(|| config.collections_dir.clone());
            build(&inputs, &out, append, answers.as_deref())?
        }
        Command::Validate { dir } => {
            let dir = dir.unwrap_or_else(|| config.collections_dir.clone());
            validate(&dir)?
        }
        Command::Import {
            dir,
            drop_existing,
            no_backfill,
        } => {
            let dir = dir.unwrap_or_else(|| config.collections_dir.clone());
            let options = ImportOptions {
                drop_existing,
                backfill_sections: !no_backfill,
                max_write_attempts: config.max_write_attempts,
                answer_resolution: ParentResolution::ReferenceTable,
            };
            import(&config, &dir, options).await?
        }
        Command::Write { inputs } => write(&config, &inputs).await?,
        Command::Answers {
            answer_json,
            out,
            auto_resolve_from_storage,
        } => answers(&config, &answer_json, out.as_deref(), auto_resolve_from_storage).await?,
        Command::Verify => verify(&config).await?,
    };

    if !clean {
        std::process::exit(EXIT_WITH_SKIPS);
    }
    Ok(())
}

async fn open_store(config: &ResolvedConfig) -> Result<Store> {
    info!("Database: {}", config.database_path.display());
    Store::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))
}

fn build(inputs: &[PathBuf], out: &Path, append: bool, answers: Option<&Path>) -> Result<bool> {
    let builder = DocumentBuilder::new();
    let mut batches = if append {
        read_existing(out)?
    } else {
        DocumentBatches::default()
    };
    let mut clean = batches.rejected.is_empty();
    if !clean {
        warn!(
            count = batches.rejected.len(),
            "Dropping invalid documents from existing batch files"
        );
    }

    for input in inputs {
        let source = load_source(input)?;
        match builder.build(&source) {
            Ok(built) => {
                info!(input = %input.display(), questions = built.questions.len(), "Built test");
                batches.merge(built);
            }
            Err(err @ ImportError::MalformedDocument { .. }) => {
                warn!(input = %input.display(), error = %err, "Skipping source test");
                clean = false;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(path) = answers {
        let built = build_answer_documents(&load_answer_sources(path)?);
        clean &= built.malformed.is_empty();
        let slugs: Vec<_> = built.documents.iter().map(|a| a.test_ref.clone()).collect();
        batches.answers.retain(|a| !slugs.contains(&a.test_ref));
        batches.answers.extend(built.documents);
    }

    let report = validate_batches(&batches);
    print!("{}", ExportReport::from_batches(&batches));
    print!("{}", report);

    write_batches(out, &batches)?;
    println!("Batch files written to {}", out.display());
    Ok(clean)
}

fn validate(dir: &Path) -> Result<bool> {
    let batches = read_batches(dir)?;
    let report = validate_batches(&batches);
    print!("{}", report);
    Ok(report.is_clean())
}

async fn import(config: &ResolvedConfig, dir: &Path, options: ImportOptions) -> Result<bool> {
    let batches = read_batches(dir)?;
    let store = open_store(config).await?;

    let result = Importer::new(&store, options).run(&batches).await;
    store.close().await;

    let summary = result?;
    println!("{}", summary);
    Ok(summary.is_clean())
}

async fn write(config: &ResolvedConfig, inputs: &[PathBuf]) -> Result<bool> {
    let builder = DocumentBuilder::new();
    let store = open_store(config).await?;
    let mut summary = ImportSummary::new();

    let mut outcome = Ok(());
    for input in inputs {
        let result = match load_source(input) {
            Ok(source) => write_test(&store, &builder, &source, config.max_write_attempts).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(one) => summary.absorb(one),
            Err(err) if !err.is_fatal() => {
                warn!(input = %input.display(), error = %err, "Skipping source test");
                if let Some(reason) = err.skip_reason() {
                    summary.record_skipped(Collection::Tests, reason);
                }
            }
            Err(err) => {
                outcome = Err(err);
                break;
            }
        }
    }
    store.close().await;
    outcome?;

    println!("{}", summary);
    Ok(summary.is_clean())
}

async fn answers(
    config: &ResolvedConfig,
    answer_json: &Path,
    out: Option<&Path>,
    auto_resolve: bool,
) -> Result<bool> {
    if out.is_none() && !auto_resolve {
        bail!("Nothing to do: pass --out <DIR> and/or --auto-resolve-from-storage");
    }

    let built = build_answer_documents(&load_answer_sources(answer_json)?);
    let mut clean = built.malformed.is_empty();
    info!(
        documents = built.documents.len(),
        malformed = built.malformed.len(),
        "Built answer records"
    );

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_collection(dir, Collection::Answers, &built.documents)?;
        println!("Wrote {} answer record(s) to {}", built.documents.len(), dir.display());
    }

    if auto_resolve {
        let store = open_store(config).await?;
        let options = ImportOptions {
            max_write_attempts: config.max_write_attempts,
            answer_resolution: ParentResolution::Storage,
            backfill_sections: false,
            ..Default::default()
        };
        let mut importer = Importer::new(&store, options);
        importer.import_answers(&built.documents).await;
        let summary = importer.into_summary();
        store.close().await;

        println!("{}", summary);
        clean &= summary.is_clean();
    }

    Ok(clean)
}

async fn verify(config: &ResolvedConfig) -> Result<bool> {
    let store = open_store(config).await?;
    let result = verify_store(store.pool()).await;
    store.close().await;

    let report = result?;
    println!("{}", report);
    Ok(report.is_consistent())
}
