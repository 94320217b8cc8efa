use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use revdigest_core::{DigestError, EnrichmentKind};
use revdigest_enrich::{
    AnalysisRequest, Analyzer, AnalyzerRegistry, EnrichSettings, Enricher, FileTypes,
};

enum Behavior {
    Reply(&'static str),
    EchoFile,
    Fail,
    Sleep(Duration),
}

struct FakeAnalyzer {
    kind: EnrichmentKind,
    tag: &'static str,
    label: &'static str,
    available: bool,
    behavior: Behavior,
    probes: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeAnalyzer {
    fn new(kind: EnrichmentKind, tag: &'static str, behavior: Behavior) -> Self {
        Self {
            kind,
            tag,
            label: "Fake",
            available: true,
            behavior,
            probes: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn labelled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    fn kind(&self) -> EnrichmentKind {
        self.kind
    }

    fn tag(&self) -> &str {
        self.tag
    }

    fn label(&self) -> &str {
        self.label
    }

    fn is_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.available
    }

    async fn invoke(&self, request: &AnalysisRequest) -> Result<String, DigestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.to_string()),
            Behavior::EchoFile => {
                let delay = (request.file.len() % 4) as u64 * 5;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(format!("{}@{}..{}", request.file, request.source, request.target))
            }
            Behavior::Fail => Err(DigestError::Analyzer("boom".into())),
            Behavior::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok("late".into())
            }
        }
    }
}

fn settings(jobs: usize) -> EnrichSettings {
    EnrichSettings {
        enabled: ["cs", "py", "js", "dart"].iter().map(|s| s.to_string()).collect(),
        timeout: Duration::from_secs(5),
        jobs,
    }
}

fn workdir(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        let path = dir.path().join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x\n").unwrap();
    }
    dir
}

fn enricher(root: &Path, registry: AnalyzerRegistry, settings: EnrichSettings) -> Enricher {
    Enricher::new(registry, FileTypes::builtin(), settings, root, "main", "feature")
}

#[tokio::test]
async fn lint_only_for_python_and_all_kinds_for_csharp() {
    let dir = workdir(&["src/a.py", "src/App.cs"]);
    let mut registry = AnalyzerRegistry::new();
    registry.register(Arc::new(
        FakeAnalyzer::new(EnrichmentKind::Lint, "py", Behavior::Reply("a.py:1:1: E1\n"))
            .labelled("Flake8 warnings"),
    ));
    registry.register(Arc::new(FakeAnalyzer::new(
        EnrichmentKind::Lint,
        "cs",
        Behavior::Reply(""),
    )));
    for kind in [
        EnrichmentKind::SemanticDiff,
        EnrichmentKind::CallGraph,
        EnrichmentKind::Metrics,
    ] {
        registry.register(Arc::new(FakeAnalyzer::new(kind, "csharp", Behavior::EchoFile)));
        registry.register(Arc::new(FakeAnalyzer::new(kind, "py", Behavior::EchoFile)));
    }

    let enricher = enricher(dir.path(), registry, settings(2));
    let files = vec!["src/a.py".to_string(), "src/App.cs".to_string()];
    let results = enricher.enrich_all(&files, |_, _| {}).await;

    assert_eq!(results[0].len(), 1);
    assert_eq!(results[0][0].label, "Flake8 warnings");
    assert_eq!(results[0][0].payload, "a.py:1:1: E1\n");

    let kinds: Vec<EnrichmentKind> = results[1].iter().map(|e| e.kind).collect();
    assert_eq!(kinds, EnrichmentKind::ALL.to_vec());
    assert_eq!(results[1][0].payload, "");
    assert_eq!(results[1][1].payload, "src/App.cs@main..feature");
}

#[tokio::test]
async fn unavailable_failing_and_slow_analyzers_contribute_nothing() {
    let dir = workdir(&["lib/main.dart"]);
    let unavailable = Arc::new(
        FakeAnalyzer::new(EnrichmentKind::Lint, "dart", Behavior::Reply("never")).unavailable(),
    );
    let mut registry = AnalyzerRegistry::new();
    registry.register(unavailable.clone());
    registry.register(Arc::new(FakeAnalyzer::new(
        EnrichmentKind::SemanticDiff,
        "dart",
        Behavior::Fail,
    )));
    registry.register(Arc::new(FakeAnalyzer::new(
        EnrichmentKind::CallGraph,
        "dart",
        Behavior::Sleep(Duration::from_secs(30)),
    )));
    registry.register(Arc::new(FakeAnalyzer::new(
        EnrichmentKind::Metrics,
        "dart",
        Behavior::Reply("{\"loc\": 1}"),
    )));

    let mut settings = settings(4);
    settings.timeout = Duration::from_millis(100);
    let enricher = enricher(dir.path(), registry, settings);

    let started = std::time::Instant::now();
    let result = enricher.enrich_file("lib/main.dart").await;
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].kind, EnrichmentKind::Metrics);
    assert_eq!(result[0].payload, "{\"loc\": 1}");
    assert_eq!(unavailable.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn availability_is_probed_once_per_analyzer() {
    let files: Vec<String> = (0..6).map(|i| format!("pkg/m{i}.py")).collect();
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let dir = workdir(&refs);

    let lint = Arc::new(FakeAnalyzer::new(EnrichmentKind::Lint, "py", Behavior::Reply("")));
    let mut registry = AnalyzerRegistry::new();
    registry.register(lint.clone());

    let enricher = enricher(dir.path(), registry, settings(3));
    let mut progress = Vec::new();
    let results = enricher
        .enrich_all(&files, |done, total| progress.push((done, total)))
        .await;

    assert_eq!(results.len(), 6);
    assert_eq!(lint.probes.load(Ordering::SeqCst), 1);
    assert_eq!(lint.calls.load(Ordering::SeqCst), 6);
    assert_eq!(progress.last(), Some(&(6, 6)));
}

#[tokio::test]
async fn results_do_not_depend_on_concurrency() {
    let names = ["a/x.cs", "b/yy.cs", "c/zzz.cs", "d/w.cs", "e/vvvvv.cs"];
    let dir = workdir(&names);
    let files: Vec<String> = names.iter().map(|s| s.to_string()).collect();

    let build = || {
        let mut registry = AnalyzerRegistry::new();
        for kind in EnrichmentKind::ALL {
            let tag = if kind.uses_lint_tag() { "cs" } else { "csharp" };
            registry.register(Arc::new(FakeAnalyzer::new(kind, tag, Behavior::EchoFile)));
        }
        registry
    };

    let serial = enricher(dir.path(), build(), settings(1))
        .enrich_all(&files, |_, _| {})
        .await;
    let parallel = enricher(dir.path(), build(), settings(8))
        .enrich_all(&files, |_, _| {})
        .await;

    assert_eq!(serial, parallel);
    for (file, enrichments) in files.iter().zip(&serial) {
        assert_eq!(enrichments.len(), 4);
        assert!(enrichments[0].payload.starts_with(file.as_str()));
    }
}

#[tokio::test]
async fn disabled_and_unknown_types_are_skipped() {
    let dir = workdir(&["web/app.js", "README.md"]);
    let js = Arc::new(FakeAnalyzer::new(EnrichmentKind::Lint, "js", Behavior::Reply("w")));
    let mut registry = AnalyzerRegistry::new();
    registry.register(js.clone());

    let mut settings = settings(2);
    settings.enabled = BTreeSet::from(["py".to_string()]);
    let enricher = enricher(dir.path(), registry, settings);

    assert!(enricher.enrich_file("web/app.js").await.is_empty());
    assert!(enricher.enrich_file("README.md").await.is_empty());
    assert_eq!(js.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deleted_files_only_get_semantic_diff() {
    let dir = workdir(&[]);
    let mut registry = AnalyzerRegistry::new();
    for kind in EnrichmentKind::ALL {
        let tag = if kind.uses_lint_tag() { "cs" } else { "csharp" };
        registry.register(Arc::new(FakeAnalyzer::new(kind, tag, Behavior::Reply("out"))));
    }

    let enricher = enricher(dir.path(), registry, settings(2));
    let result = enricher.enrich_file("src/Gone.cs").await;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].kind, EnrichmentKind::SemanticDiff);
}

#[cfg(unix)]
#[tokio::test]
async fn command_analyzer_from_config_runs_in_repo_root() {
    use revdigest_core::{AnalyzerConfig, EnrichConfig};

    let dir = workdir(&["src/a.py"]);
    let config = EnrichConfig {
        analyzers: vec![AnalyzerConfig {
            kind: EnrichmentKind::Lint,
            tag: "py".into(),
            label: "Shell lint".into(),
            program: "sh".into(),
            args: vec!["-c".into(), "test -f {file} && echo ok:{file}".into()],
            success_codes: vec![0],
        }],
        ..EnrichConfig::default()
    };
    let registry = AnalyzerRegistry::from_config(&config);
    let enricher = enricher(dir.path(), registry, EnrichSettings::from_config(&config));

    let result = enricher.enrich_file("src/a.py").await;
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].label, "Shell lint");
    assert_eq!(result[0].payload, "ok:src/a.py\n");
}
