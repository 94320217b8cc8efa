//! Change-set collection via git2.
//!
//! Gathers the shortstat summary, the in-range commit list, the changed
//! paths, and per-file unified diff text between two resolved revisions.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use git2::{Delta, Diff, DiffFindOptions, DiffFormat, DiffOptions, Sort, Tree};
use revdigest_core::{ChangeSet, CommitRecord, DigestError, RevisionPair};
use tracing::debug;

use crate::repo::GitRepo;

/// Options for change collection.
///
/// # Examples
///
/// ```
/// use revdigest_git::collect::CollectOptions;
///
/// let opts = CollectOptions::default();
/// assert_eq!(opts.context_lines, 3);
/// assert!(opts.detect_renames);
/// ```
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Unchanged lines of context around each hunk (default: 3).
    pub context_lines: u32,
    /// Report renames under their new path (default: true).
    pub detect_renames: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            detect_renames: true,
        }
    }
}

/// Collects the facts describing the difference between two revisions.
pub struct ChangeSetCollector<'r> {
    repo: &'r GitRepo,
    options: CollectOptions,
}

impl<'r> ChangeSetCollector<'r> {
    /// Create a collector over an opened repository.
    pub fn new(repo: &'r GitRepo, options: CollectOptions) -> Self {
        Self { repo, options }
    }

    /// Build the [`ChangeSet`] for `pair`.
    ///
    /// Identical revisions produce an empty change set, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Collection`] if a tree, diff, or history query
    /// fails.
    pub fn collect(&self, pair: &RevisionPair) -> Result<ChangeSet, DigestError> {
        let diff = self.tree_diff(pair)?;

        let stats = diff
            .stats()
            .map_err(|e| DigestError::Collection(format!("failed to compute diff stats: {e}")))?;
        let stat_summary =
            format_shortstat(stats.files_changed(), stats.insertions(), stats.deletions());

        let changed_files: BTreeSet<String> = diff.deltas().filter_map(|d| delta_path(&d)).collect();
        let commits = self.commits_in_range(pair)?;
        let file_subjects = self.file_subjects(pair, &changed_files)?;

        debug!(
            files = changed_files.len(),
            commits = commits.len(),
            "collected change set"
        );

        Ok(ChangeSet {
            pair: pair.clone(),
            stat_summary,
            commits,
            changed_files,
            file_subjects,
        })
    }

    /// Unified diff text for every changed path, keyed by the same path used
    /// in [`ChangeSet::changed_files`].
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Collection`] if the diff cannot be computed or
    /// printed.
    pub fn diff_texts(&self, pair: &RevisionPair) -> Result<BTreeMap<String, String>, DigestError> {
        let diff = self.tree_diff(pair)?;
        let mut texts: BTreeMap<String, String> = BTreeMap::new();

        diff.print(DiffFormat::Patch, |delta, _hunk, line| {
            let Some(path) = delta_path(&delta) else {
                return true;
            };
            let text = texts.entry(path).or_default();
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(|e| DigestError::Collection(format!("failed to render diff: {e}")))?;

        // Mode-only changes print nothing; keep every changed path present.
        for delta in diff.deltas() {
            if let Some(path) = delta_path(&delta) {
                texts.entry(path).or_default();
            }
        }

        Ok(texts)
    }

    fn tree_diff(&self, pair: &RevisionPair) -> Result<Diff<'r>, DigestError> {
        let repo: &'r git2::Repository = self.repo.raw();
        let source_tree = commit_tree(repo, &pair.source.id)?;
        let target_tree = commit_tree(repo, &pair.target.id)?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(self.options.context_lines);
        let mut diff = repo
            .diff_tree_to_tree(Some(&source_tree), Some(&target_tree), Some(&mut diff_opts))
            .map_err(|e| DigestError::Collection(format!("failed to compute diff: {e}")))?;

        if self.options.detect_renames {
            let mut find_opts = DiffFindOptions::new();
            find_opts.renames(true);
            diff.find_similar(Some(&mut find_opts))
                .map_err(|e| DigestError::Collection(format!("failed to find renames: {e}")))?;
        }

        Ok(diff)
    }

    /// Commits reachable from target but not source, newest first.
    fn commits_in_range(&self, pair: &RevisionPair) -> Result<Vec<CommitRecord>, DigestError> {
        let mut commits = Vec::new();

        for commit in self.walk_range(pair)? {
            let commit = commit?;
            let id = commit
                .as_object()
                .short_id()
                .ok()
                .and_then(|buf| buf.as_str().map(str::to_string))
                .unwrap_or_else(|| commit.id().to_string()[..7].to_string());
            let author = commit.author();
            commits.push(CommitRecord {
                id,
                author: author.name().unwrap_or("unknown").to_string(),
                subject: commit.summary().unwrap_or("").to_string(),
            });
        }

        debug!(count = commits.len(), "walked commit range");
        Ok(commits)
    }

    /// Subject of the newest in-range commit touching each changed path.
    ///
    /// A merge counts only for paths that differ from every parent, as with
    /// the default history simplification of a path-limited `git log`. A
    /// conflict resolution therefore names the merge; a clean merge does not.
    fn file_subjects(
        &self,
        pair: &RevisionPair,
        changed: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, String>, DigestError> {
        let repo = self.repo.raw();
        let mut subjects = BTreeMap::new();
        if changed.is_empty() {
            return Ok(subjects);
        }

        for commit in self.walk_range(pair)? {
            let commit = commit?;
            let tree = commit
                .tree()
                .map_err(|e| DigestError::Collection(format!("failed to get commit tree: {e}")))?;

            let mut touched: Option<BTreeSet<String>> = None;
            for parent in commit.parents() {
                let parent_tree = parent.tree().map_err(|e| {
                    DigestError::Collection(format!("failed to get parent tree: {e}"))
                })?;
                let paths = touched_paths(repo, Some(&parent_tree), &tree)?;
                touched = Some(match touched {
                    Some(prev) => prev.intersection(&paths).cloned().collect(),
                    None => paths,
                });
            }
            let touched = match touched {
                Some(paths) => paths,
                None => touched_paths(repo, None, &tree)?,
            };

            let subject = commit.summary().unwrap_or("");
            for path in touched.intersection(changed) {
                subjects
                    .entry(path.clone())
                    .or_insert_with(|| subject.to_string());
            }

            if subjects.len() == changed.len() {
                break;
            }
        }

        Ok(subjects)
    }

    fn walk_range(
        &self,
        pair: &RevisionPair,
    ) -> Result<impl Iterator<Item = Result<git2::Commit<'r>, DigestError>> + 'r, DigestError> {
        let repo: &'r git2::Repository = self.repo.raw();
        let mut revwalk = repo
            .revwalk()
            .map_err(|e| DigestError::Collection(format!("failed to create revwalk: {e}")))?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(|e| DigestError::Collection(format!("failed to sort revwalk: {e}")))?;
        revwalk
            .push(parse_oid(&pair.target.id)?)
            .map_err(|e| DigestError::Collection(format!("failed to push target: {e}")))?;
        revwalk
            .hide(parse_oid(&pair.source.id)?)
            .map_err(|e| DigestError::Collection(format!("failed to hide source: {e}")))?;

        Ok(revwalk.map(move |oid| {
            let oid = oid.map_err(|e| DigestError::Collection(format!("revwalk error: {e}")))?;
            repo.find_commit(oid)
                .map_err(|e| DigestError::Collection(format!("failed to find commit: {e}")))
        }))
    }
}

/// Render a shortstat line the way `git diff --shortstat` words it.
///
/// Returns an empty string when no files changed.
///
/// # Examples
///
/// ```
/// use revdigest_git::collect::format_shortstat;
///
/// assert_eq!(format_shortstat(0, 0, 0), "");
/// assert_eq!(format_shortstat(1, 1, 0), "1 file changed, 1 insertion(+)");
/// assert_eq!(format_shortstat(3, 10, 2), "3 files changed, 10 insertions(+), 2 deletions(-)");
/// ```
pub fn format_shortstat(files: usize, insertions: usize, deletions: usize) -> String {
    if files == 0 {
        return String::new();
    }
    let mut out = format!("{files} file{} changed", plural(files));
    if insertions > 0 || deletions == 0 {
        out.push_str(&format!(", {insertions} insertion{}(+)", plural(insertions)));
    }
    if deletions > 0 || insertions == 0 {
        out.push_str(&format!(", {deletions} deletion{}(-)", plural(deletions)));
    }
    out
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn parse_oid(id: &str) -> Result<git2::Oid, DigestError> {
    git2::Oid::from_str(id).map_err(|e| DigestError::Collection(format!("invalid commit id {id}: {e}")))
}

fn commit_tree<'a>(repo: &'a git2::Repository, id: &str) -> Result<Tree<'a>, DigestError> {
    repo.find_commit(parse_oid(id)?)
        .and_then(|c| c.tree())
        .map_err(|e| DigestError::Collection(format!("failed to load tree for {id}: {e}")))
}

/// Every path, old or new side, that differs between `parent` and `tree`.
fn touched_paths(
    repo: &git2::Repository,
    parent: Option<&Tree<'_>>,
    tree: &Tree<'_>,
) -> Result<BTreeSet<String>, DigestError> {
    let diff = repo
        .diff_tree_to_tree(parent, Some(tree), None)
        .map_err(|e| DigestError::Collection(format!("failed to compute diff: {e}")))?;
    let mut paths = BTreeSet::new();
    for delta in diff.deltas() {
        for path in [delta.old_file().path(), delta.new_file().path()]
            .into_iter()
            .flatten()
        {
            paths.insert(path_string(path));
        }
    }
    Ok(paths)
}

/// The path a delta is reported under: the old path for deletions, the new
/// path otherwise.
fn delta_path(delta: &git2::DiffDelta<'_>) -> Option<String> {
    let file = if delta.status() == Delta::Deleted {
        delta.old_file()
    } else {
        delta.new_file()
    };
    file.path().map(path_string)
}

/// Git paths always use `/`; a `\` is part of the file name.
fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
