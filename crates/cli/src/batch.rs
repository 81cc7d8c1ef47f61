use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use pdf_outline::{OutlineError, OutlineRecord, OutlineResult, Thresholds};

use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct BatchOptions {
    /// Directory containing the PDF files to process
    #[clap(env = "PDF_OUTLINE_INPUT")]
    input: PathBuf,

    /// Output JSON file (one array entry per document)
    #[arg(short, long, env = "PDF_OUTLINE_OUTPUT", default_value = "outline.json")]
    output: PathBuf,

    /// Number of documents processed concurrently
    #[arg(short, long, env = "PDF_OUTLINE_JOBS", default_value_t = default_jobs())]
    jobs: usize,

    /// Per-document timeout in seconds
    #[arg(short, long, env = "PDF_OUTLINE_TIMEOUT", default_value = "60")]
    timeout: u64,

    /// Also write one `<stem>.json` per document into this directory
    #[arg(long, env = "PDF_OUTLINE_PER_FILE")]
    per_file: Option<PathBuf>,

    /// Include the leveled `outline` array in the output
    #[arg(long)]
    levels: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Outcome of one document; failed documents carry the fallback result.
#[derive(Debug)]
pub struct FileOutcome {
    pub result: OutlineResult,
    pub failure: Option<String>,
    pub elapsed: Duration,
}

pub async fn run(options: BatchOptions, thresholds: Thresholds) -> Result<()> {
    let files = discover(&options.input)?;
    let started = Instant::now();

    let progress = progress_bar(files.len(), options.quiet);
    let outcomes = process_all(
        files,
        Arc::new(thresholds),
        options.jobs,
        Duration::from_secs(options.timeout),
        &progress,
    )
    .await;
    progress.finish_and_clear();

    write_output(&options.output, &outcomes, options.levels)?;
    if let Some(dir) = &options.per_file {
        write_per_file(dir, &outcomes, options.levels)?;
    }

    print_summary(&outcomes, &options.output, started.elapsed());
    Ok(())
}

/// PDF files directly inside `dir`, sorted by file name.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InputDirNotFound(dir.to_path_buf()).into());
    }

    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).wrap_err_with(|| f!("failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(Error::NoPdfs(dir.to_path_buf()).into());
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Process every file with at most `jobs` extractions in flight.
///
/// Outcomes come back in the order of `files`, whatever order the
/// extractions finish in.
pub async fn process_all(
    files: Vec<PathBuf>,
    thresholds: Arc<Thresholds>,
    jobs: usize,
    timeout: Duration,
    progress: &ProgressBar,
) -> Vec<FileOutcome> {
    futures::stream::iter(files)
        .map(|path| {
            let thresholds = thresholds.clone();
            let progress = progress.clone();
            async move {
                let outcome = process_file(path, thresholds, timeout).await;
                progress.set_message(outcome.result.file_name.clone());
                progress.inc(1);
                outcome
            }
        })
        .buffered(jobs.max(1))
        .collect()
        .await
}

async fn process_file(path: PathBuf, thresholds: Arc<Thresholds>, timeout: Duration) -> FileOutcome {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    run_with_timeout(file_name, timeout, move || {
        pdf_outline::extract_file(&path, &thresholds)
    })
    .await
}

/// Run one blocking extraction, bounded by `timeout`.
///
/// A job that overruns is abandoned on its blocking thread and the document
/// gets the fallback result.
async fn run_with_timeout<F>(file_name: String, timeout: Duration, job: F) -> FileOutcome
where
    F: FnOnce() -> Result<OutlineResult, OutlineError> + Send + 'static,
{
    let started = Instant::now();
    let task = tokio::task::spawn_blocking(job);

    let failure = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(result))) => {
            return FileOutcome {
                result,
                failure: None,
                elapsed: started.elapsed(),
            }
        }
        Ok(Ok(Err(e))) => e.to_string(),
        Ok(Err(e)) => Error::Join(e.to_string()).to_string(),
        Err(_) => Error::Timeout(timeout.as_secs()).to_string(),
    };

    warn!("{file_name}: {failure}");
    FileOutcome {
        result: OutlineResult::fallback(&file_name),
        failure: Some(failure),
        elapsed: started.elapsed(),
    }
}

fn progress_bar(len: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(len as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

pub fn render(outcomes: &[FileOutcome], levels: bool) -> Result<String> {
    let records: Vec<OutlineRecord<'_>> = outcomes
        .iter()
        .map(|o| o.result.to_record(levels))
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

fn write_output(output: &Path, outcomes: &[FileOutcome], levels: bool) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| f!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(output, render(outcomes, levels)?)
        .wrap_err_with(|| f!("failed to write {}", output.display()))
}

/// Output names for `--per-file`: `<stem>.json`, or `<file name>.json` when
/// another document already claimed the stem (`a.pdf` and `a.PDF`).
fn per_file_names(outcomes: &[FileOutcome]) -> Vec<String> {
    let mut taken = HashSet::new();
    outcomes
        .iter()
        .map(|outcome| {
            let file_name = &outcome.result.file_name;
            let stem = pdf_outline::classify::file_stem(file_name);
            let name = if taken.contains(&stem.to_lowercase()) {
                f!("{file_name}.json")
            } else {
                f!("{stem}.json")
            };
            taken.insert(stem.to_lowercase());
            taken.insert(name.trim_end_matches(".json").to_lowercase());
            name
        })
        .collect()
}

fn write_per_file(dir: &Path, outcomes: &[FileOutcome], levels: bool) -> Result<()> {
    std::fs::create_dir_all(dir).wrap_err_with(|| f!("failed to create {}", dir.display()))?;
    for (outcome, name) in outcomes.iter().zip(per_file_names(outcomes)) {
        let path = dir.join(name);
        std::fs::write(&path, outcome.result.to_json(levels)?)
            .wrap_err_with(|| f!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn print_summary(outcomes: &[FileOutcome], output: &Path, elapsed: Duration) {
    let failed: Vec<&FileOutcome> = outcomes.iter().filter(|o| o.failure.is_some()).collect();

    for outcome in &failed {
        eprintln!(
            "{} {}: {}",
            "failed".red().bold(),
            outcome.result.file_name,
            outcome.failure.as_deref().unwrap_or_default()
        );
    }

    let slowest = outcomes.iter().max_by_key(|o| o.elapsed);
    let status = if failed.is_empty() {
        f!("{} documents", outcomes.len()).green().bold()
    } else {
        f!("{} documents, {} failed", outcomes.len(), failed.len())
            .yellow()
            .bold()
    };
    println!(
        "{} in {:.1}s -> {}",
        status,
        elapsed.as_secs_f64(),
        output.display().to_string().cyan()
    );
    if let Some(slowest) = slowest {
        log::info!(
            "slowest: {} ({:.2}s)",
            slowest.result.file_name,
            slowest.elapsed.as_secs_f64()
        );
    }
}
