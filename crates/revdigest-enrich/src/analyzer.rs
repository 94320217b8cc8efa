//! The analyzer trait and its external-command implementation.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use revdigest_core::{AnalyzerConfig, DigestError, EnrichmentKind};
use tracing::debug;

use crate::runner::{find_program, run_command};

/// Everything an analyzer may need about one file.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Repository-relative path, forward slashes.
    pub file: String,
    /// Absolute path of the file in the working tree.
    pub path: PathBuf,
    /// Working directory for the analyzer.
    pub repo_root: PathBuf,
    /// Tag the analyzer was selected by.
    pub tag: String,
    /// Source revision name.
    pub source: String,
    /// Target revision name.
    pub target: String,
}

/// A pluggable producer of one [`EnrichmentKind`] for one tag.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Kind of output this analyzer produces.
    fn kind(&self) -> EnrichmentKind;

    /// Lint or language tag this analyzer serves.
    fn tag(&self) -> &str;

    /// Heading used in the report.
    fn label(&self) -> &str;

    /// Whether the analyzer can run in this environment.
    fn is_available(&self) -> bool;

    /// Run the analyzer and return its payload.
    async fn invoke(&self, request: &AnalysisRequest) -> Result<String, DigestError>;
}

/// An analyzer backed by an external program.
///
/// Arguments may contain `{path}`, `{file}`, `{source}`, `{target}` and
/// `{lang}` placeholders, expanded per request.
///
/// # Examples
///
/// ```
/// use revdigest_core::EnrichmentKind;
/// use revdigest_enrich::{Analyzer, CommandAnalyzer};
///
/// let flake8 = CommandAnalyzer::new(
///     EnrichmentKind::Lint,
///     "py",
///     "Flake8 warnings",
///     "flake8",
///     &["{path}"],
///     &[0, 1],
/// );
/// assert_eq!(flake8.tag(), "py");
/// assert_eq!(flake8.program(), "flake8");
/// ```
#[derive(Debug)]
pub struct CommandAnalyzer {
    kind: EnrichmentKind,
    tag: String,
    label: String,
    program: String,
    args: Vec<String>,
    success_codes: Vec<i32>,
    resolved: OnceLock<Option<PathBuf>>,
}

impl CommandAnalyzer {
    /// Build a command analyzer from its parts.
    pub fn new(
        kind: EnrichmentKind,
        tag: &str,
        label: &str,
        program: &str,
        args: &[&str],
        success_codes: &[i32],
    ) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            label: label.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            success_codes: success_codes.to_vec(),
            resolved: OnceLock::new(),
        }
    }

    /// Build a command analyzer from a `[[enrich.analyzers]]` entry.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            kind: config.kind,
            tag: config.tag.clone(),
            label: config.label.clone(),
            program: config.program.clone(),
            args: config.args.clone(),
            success_codes: config.success_codes.clone(),
            resolved: OnceLock::new(),
        }
    }

    /// Program name as configured.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for `request`, with placeholders expanded.
    pub fn expand_args(&self, request: &AnalysisRequest) -> Vec<String> {
        let path = request.path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{path}", &path)
                    .replace("{file}", &request.file)
                    .replace("{source}", &request.source)
                    .replace("{target}", &request.target)
                    .replace("{lang}", &request.tag)
            })
            .collect()
    }

    fn resolved_program(&self) -> Option<&PathBuf> {
        self.resolved
            .get_or_init(|| {
                let found = find_program(&self.program);
                debug!(program = %self.program, available = found.is_some(), "probed analyzer");
                found
            })
            .as_ref()
    }
}

#[async_trait]
impl Analyzer for CommandAnalyzer {
    fn kind(&self) -> EnrichmentKind {
        self.kind
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_available(&self) -> bool {
        self.resolved_program().is_some()
    }

    async fn invoke(&self, request: &AnalysisRequest) -> Result<String, DigestError> {
        let program = self
            .resolved_program()
            .ok_or_else(|| DigestError::Analyzer(format!("{} is not installed", self.program)))?;
        let args = self.expand_args(request);
        let output = run_command(program, &args, &request.repo_root).await?;

        match output.exit_code {
            Some(code) if self.success_codes.contains(&code) => Ok(output.combined()),
            Some(code) => Err(DigestError::Analyzer(format!(
                "{} exited with status {code} for {}: {}",
                self.program,
                request.file,
                output.stderr.trim()
            ))),
            None => Err(DigestError::Analyzer(format!(
                "{} was terminated by a signal for {}",
                self.program, request.file
            ))),
        }
    }
}

/// The built-in analyzers, in registration order.
pub fn builtin_analyzers() -> Vec<CommandAnalyzer> {
    use EnrichmentKind::{CallGraph, Lint, Metrics, SemanticDiff};

    let mut analyzers = vec![
        CommandAnalyzer::new(Lint, "py", "Flake8 warnings", "flake8", &["{path}"], &[0, 1]),
        CommandAnalyzer::new(
            Lint,
            "js",
            "ESLint warnings",
            "eslint",
            &["--quiet", "--format", "unix", "{path}"],
            &[0, 1],
        ),
        CommandAnalyzer::new(
            Lint,
            "dart",
            "Dart analyzer warnings",
            "dart",
            &["analyze", "{path}"],
            &[0, 1, 2, 3],
        ),
        CommandAnalyzer::new(
            Lint,
            "cs",
            "C# format check",
            "dotnet",
            &["format", "--verify-no-changes", "--include", "{path}"],
            &[0, 2],
        ),
    ];

    for lang in ["csharp", "dart"] {
        analyzers.push(CommandAnalyzer::new(
            SemanticDiff,
            lang,
            "Semantic AST Diff",
            "diffsitter",
            &["diff", "--lang={lang}", "{source}", "{target}", "--", "{file}"],
            &[0],
        ));
        analyzers.push(CommandAnalyzer::new(
            CallGraph,
            lang,
            "Call Graph",
            "callgraph-gen",
            &["--lang={lang}", "{file}"],
            &[0],
        ));
        analyzers.push(CommandAnalyzer::new(
            Metrics,
            lang,
            "Code Metrics",
            "metrics-cli",
            &["--lang={lang}", "{file}", "--format=json"],
            &[0],
        ));
    }

    analyzers
}
