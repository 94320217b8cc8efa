//! Project-structure listing for the report.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use revdigest_core::{DigestError, StructureSource, ROOT_GROUP};
use revdigest_git::GitRepo;
use tracing::debug;

/// Placeholder shown when the listing is empty.
pub const EMPTY_LISTING: &str = "(empty or no tracked files)";

/// List the project's files using `source`.
///
/// `Tracked` reads the git index; `Walk` walks the working tree honouring
/// `.gitignore`. Paths are repository-relative with forward slashes.
///
/// # Errors
///
/// Returns [`DigestError::Git`] if the index cannot be read.
pub fn list_files(repo: &GitRepo, source: StructureSource) -> Result<Vec<String>, DigestError> {
    match source {
        StructureSource::Tracked => repo.tracked_files(),
        StructureSource::Walk => Ok(walk_files(repo.root())),
    }
}

/// Files under `root` that are not ignored, sorted.
///
/// Hidden entries (including `.git`) are skipped. Unreadable entries are
/// skipped with a debug log.
pub fn walk_files(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            let parts: Vec<_> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            files.push(parts.join("/"));
        }
    }
    files.sort();
    files
}

/// Render a two-level listing: one `dir/` line per top-level directory
/// (`./` for root files) followed by its files, indented two spaces and
/// relative to that directory.
///
/// # Examples
///
/// ```
/// use revdigest_report::structure::render_tree;
///
/// let paths = vec!["src/lib.rs".to_string(), "Cargo.toml".to_string()];
/// assert_eq!(render_tree(&paths), "./\n  Cargo.toml\nsrc/\n  lib.rs\n");
/// assert_eq!(render_tree(&[]), "(empty or no tracked files)\n");
/// ```
pub fn render_tree(paths: &[String]) -> String {
    if paths.is_empty() {
        return format!("{EMPTY_LISTING}\n");
    }

    let mut tree: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for path in paths {
        let (dir, rest) = path.split_once('/').unwrap_or((ROOT_GROUP, path.as_str()));
        tree.entry(dir).or_default().insert(rest);
    }

    let mut out = String::new();
    for (dir, files) in tree {
        out.push_str(dir);
        out.push_str("/\n");
        for file in files {
            out.push_str("  ");
            out.push_str(file);
            out.push('\n');
        }
    }
    out
}
