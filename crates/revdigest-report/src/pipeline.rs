//! End-to-end summary pipeline.
//!
//! Resolve, collect, group, chunk, enrich, assemble, write. Git work runs
//! synchronously up front; only enrichment is concurrent.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use revdigest_core::{ChangeSet, DigestConfig, DigestError, FileGroup, FileReport};
use revdigest_difflens::chunker::chunk_diff;
use revdigest_difflens::grouping::{group_files, group_key};
use revdigest_enrich::{AnalyzerRegistry, EnrichSettings, Enricher, FileTypes};
use revdigest_git::{ChangeSetCollector, CollectOptions, GitRepo, RepoIdentity};
use serde::Serialize;
use tracing::{debug, info};

use crate::assemble::{assemble, Report, ReportInput};
use crate::output::OutputDestination;
use crate::structure::list_files;

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Repository location; any directory inside the working tree.
    pub repo_path: PathBuf,
    /// Source revision name.
    pub source: String,
    /// Target revision name.
    pub target: String,
    /// Context notes written before everything else.
    pub context: Option<String>,
    /// Task instructions written after the context notes.
    pub task: Option<String>,
    /// Where the report is written.
    pub output: PathBuf,
    /// Effective configuration, CLI overrides already applied.
    pub config: DigestConfig,
    /// Show a spinner while analyzers run.
    pub show_progress: bool,
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    pub identity: RepoIdentity,
    pub output: PathBuf,
    pub stat_summary: String,
    pub commits: usize,
    pub files_changed: usize,
    pub enrichments: usize,
}

struct Collected {
    identity: RepoIdentity,
    change_set: ChangeSet,
    groups: Vec<FileGroup>,
    chunks: BTreeMap<String, Vec<String>>,
    structure: Vec<String>,
}

/// Run the pipeline and write the report to `options.output`.
///
/// # Errors
///
/// Configuration, revision, collection and output errors are fatal and leave
/// nothing at the output path. Analyzer failures are logged and only drop
/// that analyzer's section.
pub async fn summarize(
    options: &SummaryOptions,
    registry: AnalyzerRegistry,
) -> Result<SummaryOutcome, DigestError> {
    let config = &options.config;
    config.validate()?;
    let max_chars = NonZeroUsize::new(config.report.max_chars)
        .ok_or_else(|| DigestError::Config("max_chars must be at least 1".into()))?;

    let destination = OutputDestination::prepare(&options.output)?;
    let collected = collect(options, max_chars)?;

    let files: Vec<String> = collected
        .groups
        .iter()
        .flat_map(|g| g.files.iter().cloned())
        .collect();
    let enrichments = enrich(options, registry, &collected, &files).await;

    let reports: Vec<FileReport> = files
        .iter()
        .zip(enrichments)
        .map(|(path, enrichments)| FileReport {
            path: path.clone(),
            directory_key: group_key(path),
            last_commit_subject: collected.change_set.last_commit_subject(path).to_string(),
            diff_chunks: collected.chunks.get(path).cloned().unwrap_or_default(),
            enrichments,
        })
        .collect();
    let enrichment_count = reports.iter().map(|r| r.enrichments.len()).sum();

    let report = render(options, &collected, &reports);
    let output = destination.commit(report.as_str())?;
    info!(output = %output.display(), files = reports.len(), "report written");

    Ok(SummaryOutcome {
        identity: collected.identity,
        output,
        stat_summary: collected.change_set.stat_summary,
        commits: collected.change_set.commits.len(),
        files_changed: reports.len(),
        enrichments: enrichment_count,
    })
}

fn collect(options: &SummaryOptions, max_chars: NonZeroUsize) -> Result<Collected, DigestError> {
    let config = &options.config;
    let repo = GitRepo::open(&options.repo_path)?;
    let identity = repo.identity(&config.repository.remote);

    let pair = repo.resolve_pair(&options.source, &options.target)?;
    info!(source = %pair.source.id, target = %pair.target.id, "resolved revisions");

    let collector = ChangeSetCollector::new(
        &repo,
        CollectOptions {
            context_lines: config.report.context_lines,
            ..CollectOptions::default()
        },
    );
    let change_set = collector.collect(&pair)?;
    let chunks: BTreeMap<String, Vec<String>> = collector
        .diff_texts(&pair)?
        .into_iter()
        .map(|(path, text)| {
            let pieces: Vec<String> = chunk_diff(&text, max_chars).map(str::to_string).collect();
            debug!(path = %path, chunks = pieces.len(), "chunked diff");
            (path, pieces)
        })
        .collect();

    let groups = group_files(&change_set.changed_files);
    let structure = list_files(&repo, config.report.structure)?;
    info!(
        files = change_set.changed_files.len(),
        commits = change_set.commits.len(),
        groups = groups.len(),
        "collected change set"
    );

    Ok(Collected {
        identity,
        change_set,
        groups,
        chunks,
        structure,
    })
}

async fn enrich(
    options: &SummaryOptions,
    registry: AnalyzerRegistry,
    collected: &Collected,
    files: &[String],
) -> Vec<Vec<revdigest_core::Enrichment>> {
    let config = &options.config;
    let pair = &collected.change_set.pair;
    let enricher = Enricher::new(
        registry,
        FileTypes::with_overrides(&config.enrich.file_types),
        EnrichSettings::from_config(&config.enrich),
        &collected.identity.root,
        &pair.source.name,
        &pair.target.name,
    );

    let spinner = options.show_progress.then(spinner);
    let results = enricher
        .enrich_all(files, |done, total| {
            if let Some(pb) = &spinner {
                pb.set_message(format!("Running analyzers ({done}/{total})"));
            }
        })
        .await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    results
}

fn render(options: &SummaryOptions, collected: &Collected, reports: &[FileReport]) -> Report {
    assemble(&ReportInput {
        context: options.context.as_deref(),
        task: options.task.as_deref(),
        structure_source: options.config.report.structure,
        structure: &collected.structure,
        stat_summary: &collected.change_set.stat_summary,
        commits: &collected.change_set.commits,
        groups: &collected.groups,
        files: reports,
    })
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Running analyzers...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
