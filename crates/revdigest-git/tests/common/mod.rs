#![allow(dead_code)]

use std::fs;
use std::path::Path;

use git2::{Commit, Oid, Repository, Signature, Time};

/// Write or delete files in the working tree, stage them, and commit on HEAD.
///
/// `None` content deletes the path. Commit times increase by a minute per
/// commit so history order is stable.
pub fn commit_files(
    repo: &Repository,
    author: &str,
    message: &str,
    changes: &[(&str, Option<&str>)],
) -> Oid {
    let root = repo.workdir().expect("non-bare repo").to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, content) in changes {
        let full = root.join(path);
        match content {
            Some(text) => {
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&full, text).unwrap();
                index.add_path(Path::new(path)).unwrap();
            }
            None => {
                fs::remove_file(&full).unwrap();
                index.remove_path(Path::new(path)).unwrap();
            }
        }
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let parents: Vec<Commit> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => Vec::new(),
    };
    let seconds = parents
        .first()
        .map(|p| p.time().seconds() + 60)
        .unwrap_or(1_700_000_000);
    let email = format!("{}@example.com", author.to_lowercase());
    let sig = Signature::new(author, &email, &Time::new(seconds, 0)).unwrap();
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Point a branch named `name` at `oid`, overwriting it if present.
pub fn branch(repo: &Repository, name: &str, oid: Oid) {
    let commit = repo.find_commit(oid).unwrap();
    repo.branch(name, &commit, true).unwrap();
}

/// Commit a merge of `parents` without touching HEAD or the working tree.
///
/// The tree starts from the first parent's tree with the root-level `files`
/// written over it.
pub fn merge_files(
    repo: &Repository,
    author: &str,
    message: &str,
    parents: &[Oid],
    files: &[(&str, &str)],
) -> Oid {
    let commits: Vec<Commit> = parents
        .iter()
        .map(|id| repo.find_commit(*id).unwrap())
        .collect();
    let mut builder = repo.treebuilder(Some(&commits[0].tree().unwrap())).unwrap();
    for (name, text) in files {
        let blob = repo.blob(text.as_bytes()).unwrap();
        builder.insert(*name, blob, 0o100644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let seconds = commits.iter().map(|c| c.time().seconds()).max().unwrap() + 60;
    let email = format!("{}@example.com", author.to_lowercase());
    let sig = Signature::new(author, &email, &Time::new(seconds, 0)).unwrap();
    let parent_refs: Vec<&Commit> = commits.iter().collect();
    repo.commit(None, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Move HEAD, index and working tree back to `oid`.
pub fn reset_hard(repo: &Repository, oid: Oid) {
    let object = repo.find_object(oid, None).unwrap();
    repo.reset(&object, git2::ResetType::Hard, None).unwrap();
}
