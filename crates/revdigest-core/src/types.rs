use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Group key used for files that live at the repository root.
pub const ROOT_GROUP: &str = ".";

/// Commit summary shown for a changed file with no in-range commit touching it.
pub const NO_COMMITS: &str = "No commits";

/// A revision name together with the commit it resolved to.
///
/// # Examples
///
/// ```
/// use revdigest_core::RevisionRef;
///
/// let rev = RevisionRef {
///     name: "main".into(),
///     id: "4b825dc642cb6eb9a060e54bf8d69288fbee4904".into(),
/// };
/// assert_eq!(rev.to_string(), "main");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRef {
    /// The reference as the user wrote it (branch, tag, or commit id).
    pub name: String,
    /// Full hex id of the commit the reference points at.
    pub id: String,
}

impl fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The two revisions being compared. Only built by the resolver, after both
/// sides have been confirmed to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionPair {
    /// The base revision.
    pub source: RevisionRef,
    /// The revision whose changes are being summarized.
    pub target: RevisionRef,
}

impl RevisionPair {
    /// Returns `true` when both sides point at the same commit.
    pub fn is_identical(&self) -> bool {
        self.source.id == self.target.id
    }
}

/// One commit reachable from the target but not from the source.
///
/// # Examples
///
/// ```
/// use revdigest_core::CommitRecord;
///
/// let commit = CommitRecord {
///     id: "a1b2c3d".into(),
///     author: "alice".into(),
///     subject: "fix: auth bug".into(),
/// };
/// assert_eq!(commit.to_string(), "a1b2c3d by alice: fix: auth bug");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Abbreviated commit id.
    pub id: String,
    /// Author name.
    pub author: String,
    /// First line of the commit message.
    pub subject: String,
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}: {}", self.id, self.author, self.subject)
    }
}

/// Everything collected about the difference between two revisions.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// The compared revisions.
    pub pair: RevisionPair,
    /// Shortstat-style summary, empty when nothing changed.
    pub stat_summary: String,
    /// In-range commits, in history order (newest first).
    pub commits: Vec<CommitRecord>,
    /// Paths that differ between the two revisions.
    pub changed_files: BTreeSet<String>,
    /// Subject of the most recent in-range commit touching each path.
    pub file_subjects: BTreeMap<String, String>,
}

impl ChangeSet {
    /// Subject of the newest in-range commit that touched `path`, or
    /// [`NO_COMMITS`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::{BTreeMap, BTreeSet};
    /// use revdigest_core::{ChangeSet, RevisionPair, RevisionRef, NO_COMMITS};
    ///
    /// let rev = RevisionRef { name: "main".into(), id: "abc".into() };
    /// let set = ChangeSet {
    ///     pair: RevisionPair { source: rev.clone(), target: rev },
    ///     stat_summary: String::new(),
    ///     commits: vec![],
    ///     changed_files: BTreeSet::new(),
    ///     file_subjects: BTreeMap::new(),
    /// };
    /// assert_eq!(set.last_commit_subject("src/lib.rs"), NO_COMMITS);
    /// ```
    pub fn last_commit_subject(&self, path: &str) -> &str {
        self.file_subjects
            .get(path)
            .map(String::as_str)
            .unwrap_or(NO_COMMITS)
    }
}

/// Changed files sharing the same top-level directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileGroup {
    /// First path segment, or [`ROOT_GROUP`] for root-level files.
    pub directory_key: String,
    /// Paths in lexicographic order.
    pub files: Vec<String>,
}

/// Kind of auxiliary analysis attached to a file.
///
/// # Examples
///
/// ```
/// use revdigest_core::EnrichmentKind;
///
/// let kind: EnrichmentKind = "semantic_diff".parse().unwrap();
/// assert_eq!(kind, EnrichmentKind::SemanticDiff);
/// assert_eq!(kind.to_string(), "semantic_diff");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentKind {
    /// Linter or format-check warnings.
    Lint,
    /// AST-level structural diff.
    SemanticDiff,
    /// Call graph of the file.
    CallGraph,
    /// Complexity and size metrics.
    Metrics,
}

impl EnrichmentKind {
    /// All kinds, in the order they are attempted for a file.
    pub const ALL: [EnrichmentKind; 4] = [
        EnrichmentKind::Lint,
        EnrichmentKind::SemanticDiff,
        EnrichmentKind::CallGraph,
        EnrichmentKind::Metrics,
    ];

    /// Whether this kind is keyed by the lint tag rather than the language tag.
    pub fn uses_lint_tag(self) -> bool {
        matches!(self, EnrichmentKind::Lint)
    }
}

impl fmt::Display for EnrichmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentKind::Lint => write!(f, "lint"),
            EnrichmentKind::SemanticDiff => write!(f, "semantic_diff"),
            EnrichmentKind::CallGraph => write!(f, "call_graph"),
            EnrichmentKind::Metrics => write!(f, "metrics"),
        }
    }
}

impl FromStr for EnrichmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "lint" => Ok(EnrichmentKind::Lint),
            "semantic_diff" => Ok(EnrichmentKind::SemanticDiff),
            "call_graph" => Ok(EnrichmentKind::CallGraph),
            "metrics" => Ok(EnrichmentKind::Metrics),
            other => Err(format!("unknown enrichment kind: {other}")),
        }
    }
}

/// Output of one analyzer for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    /// Which kind of analysis produced this.
    pub kind: EnrichmentKind,
    /// Heading shown in the report, e.g. `Flake8 warnings`.
    pub label: String,
    /// Raw tool output. May be empty (e.g. a linter with no warnings).
    pub payload: String,
}

/// Per-file data handed to the report assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    /// Repository-relative path.
    pub path: String,
    /// Group this file belongs to.
    pub directory_key: String,
    /// Newest in-range commit subject, or [`NO_COMMITS`].
    pub last_commit_subject: String,
    /// Raw diff split into bounded chunks, in order.
    pub diff_chunks: Vec<String>,
    /// At most one entry per [`EnrichmentKind`].
    pub enrichments: Vec<Enrichment>,
}

impl FileReport {
    /// The enrichment of the given kind, if an analyzer produced one.
    pub fn enrichment(&self, kind: EnrichmentKind) -> Option<&Enrichment> {
        self.enrichments.iter().find(|e| e.kind == kind)
    }
}

/// How the project-structure section is produced.
///
/// # Examples
///
/// ```
/// use revdigest_core::StructureSource;
///
/// let source: StructureSource = "walk".parse().unwrap();
/// assert_eq!(source, StructureSource::Walk);
/// assert_eq!(StructureSource::default(), StructureSource::Tracked);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureSource {
    /// Files in the git index.
    #[default]
    Tracked,
    /// A gitignore-aware walk of the working tree.
    Walk,
}

impl fmt::Display for StructureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureSource::Tracked => write!(f, "tracked"),
            StructureSource::Walk => write!(f, "walk"),
        }
    }
}

impl FromStr for StructureSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tracked" => Ok(StructureSource::Tracked),
            "walk" => Ok(StructureSource::Walk),
            other => Err(format!("unknown structure source: {other}")),
        }
    }
}

/// Output format for diagnostic subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use revdigest_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
