mod common;

use git2::Repository;
use revdigest_core::{DigestError, NO_COMMITS};
use revdigest_git::{ChangeSetCollector, CollectOptions, GitRepo};

use common::{branch, commit_files, merge_files, reset_hard};

fn fixture() -> (tempfile::TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let base = commit_files(
        &repo,
        "Alice",
        "initial import",
        &[
            ("README.md", Some("# demo\n")),
            ("src/a.py", Some("def a():\n    return 1\n")),
            ("src/b.py", Some("def b():\n    return 2\n")),
            ("docs/guide.md", Some("guide\n")),
        ],
    );
    branch(&repo, "base", base);
    (dir, repo)
}

#[test]
fn unknown_revision_names_the_offending_reference() {
    let (dir, _repo) = fixture();
    let git = GitRepo::open(dir.path()).unwrap();

    let err = git.resolve_pair("base", "does-not-exist").unwrap_err();
    match err {
        DigestError::UnknownRevision(name) => assert_eq!(name, "does-not-exist"),
        other => panic!("expected UnknownRevision, got {other:?}"),
    }
}

#[test]
fn identical_revisions_give_an_empty_change_set() {
    let (dir, _repo) = fixture();
    let git = GitRepo::open(dir.path()).unwrap();
    let pair = git.resolve_pair("base", "base").unwrap();
    assert!(pair.is_identical());

    let collector = ChangeSetCollector::new(&git, CollectOptions::default());
    let set = collector.collect(&pair).unwrap();
    assert!(set.stat_summary.is_empty());
    assert!(set.commits.is_empty());
    assert!(set.changed_files.is_empty());
    assert!(collector.diff_texts(&pair).unwrap().is_empty());
}

#[test]
fn collects_commits_files_and_subjects() {
    let (dir, repo) = fixture();
    commit_files(
        &repo,
        "Bob",
        "tweak a",
        &[("src/a.py", Some("def a():\n    return 10\n"))],
    );
    let head = commit_files(
        &repo,
        "Carol",
        "add tool and drop guide",
        &[("tool.sh", Some("echo hi\n")), ("docs/guide.md", None)],
    );
    branch(&repo, "topic", head);

    let git = GitRepo::open(dir.path()).unwrap();
    let pair = git.resolve_pair("base", "topic").unwrap();
    let collector = ChangeSetCollector::new(&git, CollectOptions::default());
    let set = collector.collect(&pair).unwrap();

    let subjects: Vec<&str> = set.commits.iter().map(|c| c.subject.as_str()).collect();
    assert_eq!(subjects, vec!["add tool and drop guide", "tweak a"]);
    assert_eq!(set.commits[0].author, "Carol");
    assert!(set.commits[0].id.len() >= 7);

    let files: Vec<&str> = set.changed_files.iter().map(String::as_str).collect();
    assert_eq!(files, vec!["docs/guide.md", "src/a.py", "tool.sh"]);

    assert_eq!(set.last_commit_subject("src/a.py"), "tweak a");
    assert_eq!(set.last_commit_subject("docs/guide.md"), "add tool and drop guide");
    assert_eq!(set.last_commit_subject("src/b.py"), NO_COMMITS);

    assert_eq!(
        set.stat_summary,
        "3 files changed, 2 insertions(+), 2 deletions(-)"
    );
}

#[test]
fn diff_texts_are_unified_diffs_per_file() {
    let (dir, repo) = fixture();
    let head = commit_files(
        &repo,
        "Bob",
        "tweak a",
        &[("src/a.py", Some("def a():\n    return 10\n"))],
    );
    branch(&repo, "topic", head);

    let git = GitRepo::open(dir.path()).unwrap();
    let pair = git.resolve_pair("base", "topic").unwrap();
    let collector = ChangeSetCollector::new(&git, CollectOptions::default());
    let texts = collector.diff_texts(&pair).unwrap();

    assert_eq!(texts.len(), 1);
    let diff = &texts["src/a.py"];
    assert!(diff.starts_with("diff --git a/src/a.py b/src/a.py\n"));
    assert!(diff.contains("-    return 1\n"));
    assert!(diff.contains("+    return 10\n"));
    assert!(diff.contains(" def a():\n"));
}

#[test]
fn renames_are_reported_under_the_new_path() {
    let (dir, repo) = fixture();
    let content = "def b():\n    return 2\n";
    let head = commit_files(
        &repo,
        "Dana",
        "move b",
        &[("src/b.py", None), ("lib/b.py", Some(content))],
    );
    branch(&repo, "topic", head);

    let git = GitRepo::open(dir.path()).unwrap();
    let pair = git.resolve_pair("base", "topic").unwrap();
    let set = ChangeSetCollector::new(&git, CollectOptions::default())
        .collect(&pair)
        .unwrap();

    let files: Vec<&str> = set.changed_files.iter().map(String::as_str).collect();
    assert_eq!(files, vec!["lib/b.py"]);
    assert_eq!(set.last_commit_subject("lib/b.py"), "move b");
}

#[test]
fn tags_and_commit_ids_resolve_like_branches() {
    let (dir, repo) = fixture();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.tag_lightweight("v1.0", head.as_object(), false).unwrap();

    let git = GitRepo::open(dir.path()).unwrap();
    let by_tag = git.resolve("v1.0").unwrap();
    let by_id = git.resolve(&head.id().to_string()).unwrap();
    assert_eq!(by_tag.id, by_id.id);
    assert_eq!(by_tag.name, "v1.0");
}

#[test]
fn tracked_files_and_identity() {
    let (dir, repo) = fixture();
    repo.remote("origin", "git@github.com:acme/widgets.git")
        .unwrap();

    let nested = dir.path().join("src");
    let git = GitRepo::open(&nested).unwrap();
    assert_eq!(
        git.tracked_files().unwrap(),
        vec!["README.md", "docs/guide.md", "src/a.py", "src/b.py"]
    );

    let identity = git.identity("origin");
    assert_eq!(identity.remote_name.as_deref(), Some("widgets"));
    assert_eq!(
        identity.remote_url.as_deref(),
        Some("git@github.com:acme/widgets.git")
    );
    let expected_name = dir
        .path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert_eq!(identity.name, expected_name);

    let missing = git.identity("upstream");
    assert!(missing.remote_url.is_none());
}

#[test]
fn merges_name_a_file_only_when_they_change_it_against_every_parent() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let base = commit_files(
        &repo,
        "Alice",
        "initial import",
        &[("f.txt", Some("a\n")), ("g.txt", Some("0\n"))],
    );
    branch(&repo, "base", base);
    let one = commit_files(&repo, "Bob", "side one", &[("f.txt", Some("b\n"))]);
    reset_hard(&repo, base);
    let two = commit_files(&repo, "Carol", "side two", &[("g.txt", Some("x\n"))]);

    let clean = merge_files(&repo, "Dan", "clean merge", &[one, two], &[("g.txt", "x\n")]);
    branch(&repo, "clean", clean);
    let resolved = merge_files(
        &repo,
        "Dan",
        "resolve conflict",
        &[one, two],
        &[("f.txt", "c\n"), ("g.txt", "x\n")],
    );
    branch(&repo, "resolved", resolved);

    let git = GitRepo::open(dir.path()).unwrap();
    let collector = ChangeSetCollector::new(&git, CollectOptions::default());

    let set = collector
        .collect(&git.resolve_pair("base", "clean").unwrap())
        .unwrap();
    assert_eq!(set.last_commit_subject("f.txt"), "side one");
    assert_eq!(set.last_commit_subject("g.txt"), "side two");

    let set = collector
        .collect(&git.resolve_pair("base", "resolved").unwrap())
        .unwrap();
    assert_eq!(set.last_commit_subject("f.txt"), "resolve conflict");
    assert_eq!(set.last_commit_subject("g.txt"), "side two");
}

#[cfg(unix)]
#[test]
fn backslash_in_a_file_name_is_kept_verbatim() {
    let (dir, repo) = fixture();
    let head = commit_files(&repo, "Bob", "odd name", &[(r"we\ird.txt", Some("x\n"))]);
    branch(&repo, "topic", head);

    let git = GitRepo::open(dir.path()).unwrap();
    let pair = git.resolve_pair("base", "topic").unwrap();
    let collector = ChangeSetCollector::new(&git, CollectOptions::default());
    let set = collector.collect(&pair).unwrap();

    assert!(set.changed_files.contains(r"we\ird.txt"));
    assert_eq!(set.last_commit_subject(r"we\ird.txt"), "odd name");
    assert!(collector.diff_texts(&pair).unwrap().contains_key(r"we\ird.txt"));
}
