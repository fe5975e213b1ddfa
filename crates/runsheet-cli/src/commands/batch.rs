//! Batch command - process many run-sheet files with merge into the store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use runsheet_core::{
    DocumentHandle, DocumentState, MergeEngine, MergeMode, MergeOutcome, ParseResult,
    RunSheetParser,
};

use super::process::{load_config, StrategyArg};
use super::document_handle;
use crate::store::JsonFileStore;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Only process sheets for this date
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Start of a date range (inclusive)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End of a date range (inclusive)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Merge mode
    #[arg(short, long, value_enum, default_value = "preview")]
    mode: ModeArg,

    /// Extraction strategy
    #[arg(short, long, value_enum, default_value = "auto")]
    strategy: StrategyArg,

    /// Number of parallel extraction workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Job store path (default: user data directory)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Driver context override for every file
    #[arg(long)]
    driver: Option<String>,
}

/// Merge mode argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Preview,
    Append,
    Replace,
}

impl ModeArg {
    fn mode(self) -> MergeMode {
        match self {
            ModeArg::Preview => MergeMode::Preview,
            ModeArg::Append => MergeMode::Append,
            ModeArg::Replace => MergeMode::Replace,
        }
    }
}

/// Result of processing a single file.
struct SheetResult {
    path: PathBuf,
    handle: DocumentHandle,
    parse: Option<ParseResult>,
    merge: Option<MergeOutcome>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let timeout_secs = config.pdf.timeout_secs;
    let mode = args.mode.mode();

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();

    // Derive handles and apply the date scope
    let scoped: Vec<(PathBuf, DocumentHandle)> = files
        .into_iter()
        .map(|path| {
            let handle = document_handle(&path, args.driver.as_deref(), None, None);
            (path, handle)
        })
        .filter(|(path, handle)| {
            let keep = in_scope(handle.date, args.date, args.from, args.to);
            if !keep {
                debug!("Skipping {} (outside date scope)", path.display());
            }
            keep
        })
        .collect();

    if scoped.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process ({} mode)",
        style("ℹ").blue(),
        scoped.len(),
        mode.as_str()
    );

    let store = match &args.store {
        Some(path) => JsonFileStore::open(path),
        None => JsonFileStore::open(JsonFileStore::default_path()),
    };
    let engine = Arc::new(MergeEngine::new(store));
    let parser = Arc::new(RunSheetParser::new(config));

    let overall_pb = ProgressBar::new(scoped.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Extraction is embarrassingly parallel; merges for the same
    // (date, source) key are serialized inside the engine.
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (path, handle) in scoped {
        let parser = Arc::clone(&parser);
        let engine = Arc::clone(&engine);
        let semaphore = Arc::clone(&semaphore);
        let choice = args.strategy.choice();

        tasks.spawn(async move {
            // Semaphore is never closed, so acquisition cannot fail.
            let _permit = semaphore.acquire_owned().await.ok();
            process_one(path, handle, parser, engine, choice, mode, timeout_secs).await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => warn!("Worker task failed: {}", e),
        }
        overall_pb.inc(1);
    }
    overall_pb.finish_with_message("Complete");

    // Stable report order regardless of completion order.
    results.sort_by(|a, b| a.path.cmp(&b.path));

    report(&results, mode, start);

    if args.summary {
        let summary_path = PathBuf::from("summary.csv");
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    Ok(())
}

async fn process_one(
    path: PathBuf,
    handle: DocumentHandle,
    parser: Arc<RunSheetParser>,
    engine: Arc<MergeEngine<JsonFileStore>>,
    choice: runsheet_core::StrategyChoice,
    mode: MergeMode,
    timeout_secs: u64,
) -> SheetResult {
    let file_start = Instant::now();
    let mut result = SheetResult {
        path: path.clone(),
        handle: handle.clone(),
        parse: None,
        merge: None,
        error: None,
        processing_time_ms: 0,
    };

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) => {
            result.error = Some(format!("read failed: {}", e));
            return result;
        }
    };

    // Bound the extraction so one malformed input cannot stall the batch.
    let parse_task = {
        let parser = Arc::clone(&parser);
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || parser.parse_bytes(&handle, &data, choice))
    };

    let parsed = match timeout(Duration::from_secs(timeout_secs), parse_task).await {
        Ok(Ok(parsed)) => parsed,
        Ok(Err(e)) => {
            result.error = Some(format!("parse worker failed: {}", e));
            result.processing_time_ms = file_start.elapsed().as_millis() as u64;
            return result;
        }
        Err(_) => {
            warn!("Extraction timed out for {}", path.display());
            result.error = Some(format!("extraction timed out after {}s", timeout_secs));
            result.processing_time_ms = file_start.elapsed().as_millis() as u64;
            return result;
        }
    };

    if parsed.state != DocumentState::Rejected {
        let merge_task = {
            let engine = Arc::clone(&engine);
            let key = handle.key();
            let parsed = parsed.clone();
            tokio::task::spawn_blocking(move || engine.merge(&key, &parsed, mode))
        };

        match merge_task.await {
            Ok(Ok(outcome)) => result.merge = Some(outcome),
            Ok(Err(e)) => {
                // Fatal for this document only.
                warn!("Merge failed for {}: {}", path.display(), e);
                result.error = Some(format!("merge failed: {}", e));
            }
            Err(e) => result.error = Some(format!("merge worker failed: {}", e)),
        }
    }

    result.parse = Some(parsed);
    result.processing_time_ms = file_start.elapsed().as_millis() as u64;
    result
}

fn in_scope(
    date: NaiveDate,
    exact: Option<NaiveDate>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> bool {
    if let Some(exact) = exact {
        return date == exact;
    }
    if let Some(from) = from {
        if date < from {
            return false;
        }
    }
    if let Some(to) = to {
        if date > to {
            return false;
        }
    }
    true
}

fn report(results: &[SheetResult], mode: MergeMode, start: Instant) {
    let accepted: usize = results
        .iter()
        .filter_map(|r| r.parse.as_ref())
        .map(|p| p.accepted.len())
        .sum();
    let rejected_docs: Vec<&SheetResult> = results
        .iter()
        .filter(|r| {
            r.parse
                .as_ref()
                .map(|p| p.state == DocumentState::Rejected)
                .unwrap_or(false)
        })
        .collect();
    let failed: Vec<&SheetResult> = results.iter().filter(|r| r.error.is_some()).collect();

    let (updated, inserted, flagged): (usize, usize, usize) = results
        .iter()
        .filter_map(|r| r.merge.as_ref())
        .fold((0, 0, 0), |(u, i, f), m| {
            (u + m.updated, i + m.inserted, f + m.flagged)
        });

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} jobs accepted, {} updated, {} inserted, {} flagged for review",
        style(accepted).green(),
        updated,
        inserted,
        flagged
    );
    if mode == MergeMode::Preview {
        println!("   {} preview mode: nothing was persisted", style("ℹ").blue());
    }

    if !rejected_docs.is_empty() {
        println!();
        println!("{}", style("Rejected documents:").yellow());
        for result in &rejected_docs {
            let reason = result
                .parse
                .as_ref()
                .map(|p| p.warnings.join("; "))
                .unwrap_or_default();
            println!("  - {}: {}", result.path.display(), reason);
        }
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn write_summary(path: &PathBuf, results: &[SheetResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "date",
        "source",
        "status",
        "strategy",
        "accepted",
        "rejected",
        "filtered",
        "score",
        "updated",
        "inserted",
        "untouched",
        "flagged",
        "removed",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let status = if result.error.is_some() {
            "error"
        } else if result
            .parse
            .as_ref()
            .map(|p| p.state == DocumentState::Rejected)
            .unwrap_or(true)
        {
            "rejected"
        } else {
            "success"
        };

        let parse = result.parse.as_ref();
        let merge = result.merge.as_ref();

        wtr.write_record([
            filename.to_string(),
            result.handle.date.to_string(),
            result.handle.source.label(),
            status.to_string(),
            parse.map(|p| p.strategy.clone()).unwrap_or_default(),
            parse.map(|p| p.accepted.len().to_string()).unwrap_or_default(),
            parse.map(|p| p.rejected_count.to_string()).unwrap_or_default(),
            parse.map(|p| p.filtered_count.to_string()).unwrap_or_default(),
            parse
                .map(|p| format!("{:.2}", p.completeness_score))
                .unwrap_or_default(),
            merge.map(|m| m.updated.to_string()).unwrap_or_default(),
            merge.map(|m| m.inserted.to_string()).unwrap_or_default(),
            merge.map(|m| m.untouched.to_string()).unwrap_or_default(),
            merge.map(|m| m.flagged.to_string()).unwrap_or_default(),
            merge.map(|m| m.removed.to_string()).unwrap_or_default(),
            result.processing_time_ms.to_string(),
            result.error.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
