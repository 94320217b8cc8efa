use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DigestError;
use crate::types::{EnrichmentKind, StructureSource};

/// Top-level configuration loaded from `.revdigest.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use revdigest_core::DigestConfig;
///
/// let config = DigestConfig::default();
/// assert_eq!(config.report.max_chars, 5000);
/// assert_eq!(config.enrich.languages, vec!["cs", "py", "js", "dart"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Document layout and diff settings.
    #[serde(default)]
    pub report: ReportConfig,
    /// External analyzer settings.
    #[serde(default)]
    pub enrich: EnrichConfig,
    /// Repository identity settings.
    #[serde(default)]
    pub repository: RepositoryConfig,
}

impl DigestConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Io`] if the file cannot be read,
    /// [`DigestError::Toml`] if the content is not valid TOML, or
    /// [`DigestError::Config`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, DigestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Toml`] if parsing fails, or
    /// [`DigestError::Config`] if validation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use revdigest_core::DigestConfig;
    ///
    /// let toml = r#"
    /// [report]
    /// max_chars = 8000
    /// "#;
    /// let config = DigestConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.report.max_chars, 8000);
    ///
    /// assert!(DigestConfig::from_toml("[report]\nmax_chars = 0").is_err());
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DigestError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<(), DigestError> {
        if self.report.max_chars == 0 {
            return Err(DigestError::Config(
                "report.max_chars must be at least 1".into(),
            ));
        }
        if self.enrich.timeout_secs == 0 {
            return Err(DigestError::Config(
                "enrich.timeout_secs must be at least 1".into(),
            ));
        }
        if self.enrich.jobs == Some(0) {
            return Err(DigestError::Config("enrich.jobs must be at least 1".into()));
        }
        for analyzer in &self.enrich.analyzers {
            if analyzer.program.trim().is_empty() {
                return Err(DigestError::Config(format!(
                    "analyzer for {} ({}) has an empty program",
                    analyzer.kind, analyzer.tag
                )));
            }
        }
        for file_type in &self.enrich.file_types {
            if file_type.extensions.is_empty() {
                return Err(DigestError::Config(
                    "file type entries need at least one extension".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Report layout configuration.
///
/// # Examples
///
/// ```
/// use revdigest_core::ReportConfig;
///
/// let config = ReportConfig::default();
/// assert_eq!(config.context_lines, 3);
/// assert_eq!(config.output.to_str(), Some("review_summary.md"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Maximum characters per raw-diff chunk (default: 5000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Unchanged lines of context around each diff hunk (default: 3).
    #[serde(default = "default_context_lines")]
    pub context_lines: u32,
    /// How the project-structure section is listed (default: tracked).
    #[serde(default)]
    pub structure: StructureSource,
    /// Default output path (default: `review_summary.md`).
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_max_chars() -> usize {
    5000
}

fn default_context_lines() -> u32 {
    3
}

fn default_output() -> PathBuf {
    PathBuf::from("review_summary.md")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            context_lines: default_context_lines(),
            structure: StructureSource::default(),
            output: default_output(),
        }
    }
}

/// External analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Lint tags whose files get enriched (default: cs, py, js, dart).
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Per-invocation timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum concurrent analyzer invocations (default: number of CPUs).
    pub jobs: Option<usize>,
    /// Extra file types, checked before the built-in table.
    #[serde(default)]
    pub file_types: Vec<FileTypeConfig>,
    /// Extra analyzers, taking precedence over built-ins for the same kind and tag.
    #[serde(default)]
    pub analyzers: Vec<AnalyzerConfig>,
}

fn default_languages() -> Vec<String> {
    ["cs", "py", "js", "dart"].map(String::from).to_vec()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            timeout_secs: default_timeout_secs(),
            jobs: None,
            file_types: Vec::new(),
            analyzers: Vec::new(),
        }
    }
}

impl EnrichConfig {
    /// Effective concurrency limit, never below 1.
    pub fn effective_jobs(&self) -> usize {
        self.jobs
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// Maps file extensions to type tags.
///
/// # Examples
///
/// ```
/// use revdigest_core::FileTypeConfig;
///
/// let rust = FileTypeConfig {
///     extensions: vec!["rs".into()],
///     lint_tag: Some("rs".into()),
///     language: Some("rust".into()),
/// };
/// assert!(rust.extensions.contains(&"rs".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTypeConfig {
    /// Extensions without the leading dot, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Tag used to select a linter, and to match `enrich.languages`.
    pub lint_tag: Option<String>,
    /// Tag used for semantic diff, call graph and metrics.
    pub language: Option<String>,
}

/// An external command registered as an analyzer.
///
/// Arguments may contain the placeholders `{path}` (absolute working-tree
/// path), `{file}` (repository-relative path), `{source}`, `{target}` and
/// `{lang}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Analysis kind this command provides.
    pub kind: EnrichmentKind,
    /// Lint tag for `lint`, language tag for every other kind.
    pub tag: String,
    /// Heading used in the report.
    pub label: String,
    /// Executable name or path.
    pub program: String,
    /// Argument templates.
    #[serde(default)]
    pub args: Vec<String>,
    /// Exit codes treated as success (default: `[0]`).
    #[serde(default = "default_success_codes")]
    pub success_codes: Vec<i32>,
}

fn default_success_codes() -> Vec<i32> {
    vec![0]
}

/// Repository identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Remote whose URL names the project (default: `origin`).
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_remote() -> String {
    "origin".into()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
        }
    }
}
