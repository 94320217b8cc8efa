//! Partition changed paths by top-level directory.

use std::collections::{BTreeMap, BTreeSet};

use revdigest_core::{FileGroup, ROOT_GROUP};

/// Normalize a path to forward slashes.
///
/// # Examples
///
/// ```
/// use revdigest_difflens::grouping::normalize_path;
///
/// assert_eq!(normalize_path(r"src\net\mod.rs"), "src/net/mod.rs");
/// ```
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// The group key for a path: its first segment, or [`ROOT_GROUP`] when the
/// path has no separator.
///
/// # Examples
///
/// ```
/// use revdigest_difflens::grouping::group_key;
///
/// assert_eq!(group_key("src/lib.rs"), "src");
/// assert_eq!(group_key(r"docs\guide.md"), "docs");
/// assert_eq!(group_key("Cargo.toml"), ".");
/// ```
pub fn group_key(path: &str) -> String {
    let path = normalize_path(path);
    match path.split_once('/') {
        Some((first, _)) => first.to_string(),
        None => ROOT_GROUP.to_string(),
    }
}

/// Group paths by top-level directory.
///
/// Groups come out in lexicographic key order and files within a group in
/// lexicographic order. Separators are normalized only to compute the key,
/// so grouping does not depend on the platform's path convention; the paths
/// themselves are kept as given. Every distinct input path appears in exactly
/// one group.
///
/// # Examples
///
/// ```
/// use revdigest_difflens::grouping::group_files;
///
/// let groups = group_files(["src/b.rs", "README.md", "src/a.rs"]);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].directory_key, ".");
/// assert_eq!(groups[1].files, vec!["src/a.rs", "src/b.rs"]);
/// ```
pub fn group_files<I, S>(paths: I) -> Vec<FileGroup>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        groups
            .entry(group_key(path))
            .or_default()
            .insert(path.to_string());
    }

    groups
        .into_iter()
        .map(|(directory_key, files)| FileGroup {
            directory_key,
            files: files.into_iter().collect(),
        })
        .collect()
}
