use std::path::PathBuf;

/// Errors that can occur across the revdigest pipeline.
///
/// Resolution and collection failures are fatal for a run. Analyzer failures
/// are reported with [`DigestError::Analyzer`] but the enrichment stage
/// absorbs them, so they never abort report generation. Library crates use
/// this type directly; the binary converts to a `miette::Report` at the
/// boundary.
///
/// # Examples
///
/// ```
/// use revdigest_core::DigestError;
///
/// let err = DigestError::UnknownRevision("feature/missing".into());
/// assert!(err.to_string().contains("feature/missing"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DigestError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(revdigest::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(revdigest::config), help("check .revdigest.toml and the command-line flags"))]
    Config(String),

    /// Git operation failure outside of change collection.
    #[error("git error: {0}")]
    #[diagnostic(code(revdigest::git))]
    Git(String),

    /// The given location is not inside a git working tree.
    #[error("not a git repository: {}", .0.display())]
    #[diagnostic(
        code(revdigest::not_a_repository),
        help("pass --repo-path pointing at a git working tree")
    )]
    NotARepository(PathBuf),

    /// A revision reference does not resolve to a commit.
    #[error("branch or ref not found: {0}")]
    #[diagnostic(
        code(revdigest::unknown_revision),
        help("run `git rev-parse --verify <ref>` to check the name")
    )]
    UnknownRevision(String),

    /// History or diff query failed for a reason other than "no difference".
    #[error("failed to collect changes: {0}")]
    #[diagnostic(code(revdigest::collection))]
    Collection(String),

    /// An external analyzer could not produce a result.
    #[error("analyzer error: {0}")]
    #[diagnostic(code(revdigest::analyzer))]
    Analyzer(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(revdigest::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(revdigest::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(revdigest::file_not_found))]
    FileNotFound(PathBuf),
}
