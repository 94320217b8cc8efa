//! Per-file enrichment with bounded concurrency.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use revdigest_core::{EnrichConfig, Enrichment, EnrichmentKind};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::analyzer::{AnalysisRequest, Analyzer};
use crate::filetype::FileTypes;
use crate::registry::AnalyzerRegistry;

/// Run-wide enrichment settings.
#[derive(Debug, Clone)]
pub struct EnrichSettings {
    /// Lint or language tags whose files are enriched.
    pub enabled: BTreeSet<String>,
    /// Limit for one analyzer invocation.
    pub timeout: Duration,
    /// Maximum concurrent analyzer invocations.
    pub jobs: usize,
}

impl EnrichSettings {
    pub fn from_config(config: &EnrichConfig) -> Self {
        Self {
            enabled: config
                .languages
                .iter()
                .map(|l| l.trim().to_ascii_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
            timeout: Duration::from_secs(config.timeout_secs),
            jobs: config.effective_jobs(),
        }
    }
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self::from_config(&EnrichConfig::default())
    }
}

struct Job {
    file_index: usize,
    slot: usize,
    analyzer: Arc<dyn Analyzer>,
    request: AnalysisRequest,
}

/// Attaches analyzer output to changed files.
///
/// A file gets at most one [`Enrichment`] per [`EnrichmentKind`], in
/// [`EnrichmentKind::ALL`] order. Unavailable, failing, and timed-out
/// analyzers contribute nothing and never fail the run.
pub struct Enricher {
    registry: AnalyzerRegistry,
    file_types: FileTypes,
    settings: EnrichSettings,
    repo_root: PathBuf,
    source: String,
    target: String,
    availability: Mutex<HashMap<(EnrichmentKind, String), bool>>,
}

impl Enricher {
    /// Create an enricher for one comparison of `source` against `target`
    /// in the repository at `repo_root`.
    pub fn new(
        registry: AnalyzerRegistry,
        file_types: FileTypes,
        settings: EnrichSettings,
        repo_root: impl Into<PathBuf>,
        source: &str,
        target: &str,
    ) -> Self {
        Self {
            registry,
            file_types,
            settings,
            repo_root: repo_root.into(),
            source: source.to_string(),
            target: target.to_string(),
            availability: Mutex::new(HashMap::new()),
        }
    }

    /// Enrichments for a single file.
    pub async fn enrich_file(&self, file: &str) -> Vec<Enrichment> {
        self.enrich_all(&[file.to_string()], |_, _| {})
            .await
            .pop()
            .unwrap_or_default()
    }

    /// Enrichments for every file, index-aligned with `files`.
    ///
    /// At most `jobs` analyzers run at once. Results do not depend on the
    /// completion order. `on_progress(done, total)` is called on the current
    /// task after each invocation finishes.
    pub async fn enrich_all<F>(&self, files: &[String], mut on_progress: F) -> Vec<Vec<Enrichment>>
    where
        F: FnMut(usize, usize),
    {
        let mut slots: Vec<Vec<Option<Enrichment>>> =
            vec![vec![None; EnrichmentKind::ALL.len()]; files.len()];

        let jobs: Vec<Job> = files
            .iter()
            .enumerate()
            .flat_map(|(index, file)| self.plan(index, file))
            .collect();
        let total = jobs.len();
        debug!(files = files.len(), invocations = total, "planned enrichment");

        let semaphore = Arc::new(Semaphore::new(self.settings.jobs.max(1)));
        let limit = self.settings.timeout;
        let mut join_set = JoinSet::new();

        for job in jobs {
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let Job {
                    file_index,
                    slot,
                    analyzer,
                    request,
                } = job;

                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (file_index, slot, None),
                };

                let kind = analyzer.kind();
                let outcome = match timeout(limit, analyzer.invoke(&request)).await {
                    Ok(Ok(payload)) => Some(Enrichment {
                        kind,
                        label: analyzer.label().to_string(),
                        payload,
                    }),
                    Ok(Err(err)) => {
                        warn!(file = %request.file, %kind, error = %err, "analyzer failed");
                        None
                    }
                    Err(_) => {
                        warn!(
                            file = %request.file,
                            %kind,
                            timeout_secs = limit.as_secs_f64(),
                            "analyzer timed out"
                        );
                        None
                    }
                };
                (file_index, slot, outcome)
            });
        }

        let mut done = 0;
        while let Some(joined) = join_set.join_next().await {
            done += 1;
            match joined {
                Ok((file_index, slot, outcome)) => slots[file_index][slot] = outcome,
                Err(err) => warn!(error = %err, "analyzer task panicked"),
            }
            on_progress(done, total);
        }

        slots
            .into_iter()
            .map(|per_file| per_file.into_iter().flatten().collect())
            .collect()
    }

    fn plan(&self, file_index: usize, file: &str) -> Vec<Job> {
        let tags = self.file_types.detect(file);
        let Some(selector) = tags.selector() else {
            return Vec::new();
        };
        if !self.settings.enabled.contains(&selector.to_ascii_lowercase()) {
            debug!(file, tag = selector, "file type not enabled");
            return Vec::new();
        }

        let path = self.repo_root.join(file);
        let on_disk = path.is_file();
        let mut jobs = Vec::new();

        for (slot, kind) in EnrichmentKind::ALL.into_iter().enumerate() {
            let tag = if kind.uses_lint_tag() {
                tags.lint.as_deref()
            } else {
                tags.language.as_deref()
            };
            let Some(tag) = tag else { continue };
            let Some(analyzer) = self.registry.lookup(kind, tag) else {
                continue;
            };
            if !self.is_available(analyzer) {
                debug!(file, %kind, tag, "analyzer unavailable");
                continue;
            }
            if kind != EnrichmentKind::SemanticDiff && !on_disk {
                debug!(file, %kind, "file not in working tree");
                continue;
            }

            jobs.push(Job {
                file_index,
                slot,
                analyzer: analyzer.clone(),
                request: AnalysisRequest {
                    file: file.to_string(),
                    path: path.clone(),
                    repo_root: self.repo_root.clone(),
                    tag: tag.to_string(),
                    source: self.source.clone(),
                    target: self.target.clone(),
                },
            });
        }
        jobs
    }

    fn is_available(&self, analyzer: &Arc<dyn Analyzer>) -> bool {
        let key = (analyzer.kind(), analyzer.tag().to_string());
        let mut cache = match self.availability.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cache.entry(key).or_insert_with(|| analyzer.is_available())
    }
}
