//! Repository discovery, identity, and revision resolution.

use std::path::{Path, PathBuf};

use git2::Repository;
use revdigest_core::{DigestError, RevisionPair, RevisionRef};
use serde::Serialize;
use tracing::{debug, info};

/// A git working tree opened for read-only queries.
///
/// The repository root is carried explicitly; nothing here touches the
/// process working directory.
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

/// Where a repository lives and what it is called.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use revdigest_git::repo::RepoIdentity;
///
/// let identity = RepoIdentity {
///     root: PathBuf::from("/work/widgets"),
///     name: "widgets".into(),
///     remote_url: None,
///     remote_name: None,
/// };
/// assert_eq!(identity.name, "widgets");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoIdentity {
    /// Working-tree root directory.
    pub root: PathBuf,
    /// Last component of the root directory.
    pub name: String,
    /// URL of the configured remote, if it exists.
    pub remote_url: Option<String>,
    /// Repository name parsed from the remote URL.
    pub remote_name: Option<String>,
}

impl GitRepo {
    /// Discover the repository containing `path` (which may be a subdirectory).
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::NotARepository`] if `path` is not inside a git
    /// working tree, including bare repositories.
    pub fn open(path: &Path) -> Result<Self, DigestError> {
        let repo = Repository::discover(path)
            .map_err(|_| DigestError::NotARepository(path.to_path_buf()))?;
        let root = repo
            .workdir()
            .ok_or_else(|| DigestError::NotARepository(path.to_path_buf()))?
            .to_path_buf();
        debug!(root = %root.display(), "opened repository");
        Ok(Self { repo, root })
    }

    /// The working-tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Access the underlying git2 handle.
    pub fn raw(&self) -> &Repository {
        &self.repo
    }

    /// Describe the repository: root, directory name, and the URL and
    /// repository name of `remote` when it is configured.
    pub fn identity(&self, remote: &str) -> RepoIdentity {
        let name = self
            .root
            .components()
            .next_back()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote_url = self
            .repo
            .find_remote(remote)
            .ok()
            .and_then(|r| r.url().map(str::to_string));
        let remote_name = remote_url.as_deref().and_then(parse_remote_name);
        let identity = RepoIdentity {
            root: self.root.clone(),
            name,
            remote_url,
            remote_name,
        };
        info!(
            root = %identity.root.display(),
            name = %identity.name,
            remote = identity.remote_url.as_deref().unwrap_or("-"),
            "repository identity"
        );
        identity
    }

    /// Resolve one revision reference to a commit.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::UnknownRevision`] naming `name` if it does not
    /// resolve, or resolves to something that is not a commit.
    pub fn resolve(&self, name: &str) -> Result<RevisionRef, DigestError> {
        let object = self
            .repo
            .revparse_single(name)
            .map_err(|_| DigestError::UnknownRevision(name.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| DigestError::UnknownRevision(name.to_string()))?;
        Ok(RevisionRef {
            name: name.to_string(),
            id: commit.id().to_string(),
        })
    }

    /// Resolve both sides of a comparison. The source is checked first, so
    /// when both are missing the error names the source.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::UnknownRevision`] for the first side that fails.
    pub fn resolve_pair(&self, source: &str, target: &str) -> Result<RevisionPair, DigestError> {
        let source = self.resolve(source)?;
        let target = self.resolve(target)?;
        debug!(source = %source.id, target = %target.id, "resolved revisions");
        Ok(RevisionPair { source, target })
    }

    /// Paths of every file in the index, in index (byte-wise path) order.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Git`] if the index cannot be read.
    pub fn tracked_files(&self) -> Result<Vec<String>, DigestError> {
        let index = self
            .repo
            .index()
            .map_err(|e| DigestError::Git(format!("failed to read index: {e}")))?;
        Ok(index
            .iter()
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .collect())
    }
}

/// Extract the repository name from a remote URL.
///
/// Handles scp-like (`git@host:owner/name.git`) and URL forms, and strips a
/// trailing `.git`.
///
/// # Examples
///
/// ```
/// use revdigest_git::repo::parse_remote_name;
///
/// assert_eq!(parse_remote_name("git@github.com:acme/widgets.git").as_deref(), Some("widgets"));
/// assert_eq!(parse_remote_name("https://github.com/acme/widgets").as_deref(), Some("widgets"));
/// assert_eq!(parse_remote_name(""), None);
/// ```
pub fn parse_remote_name(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    let path = if url.contains("://") {
        url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
    } else if let Some((_, rest)) = url.split_once(':') {
        rest
    } else {
        url
    };
    let name = path.rsplit('/').next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
