//! Git access for revdigest: revision resolution and change collection.
//!
//! Opens a working tree with git2, resolves the two compared revisions,
//! and collects the shortstat summary, in-range commits, changed paths,
//! per-file diff text, and tracked-file listing that the report is built from.

pub mod collect;
pub mod repo;

pub use collect::{ChangeSetCollector, CollectOptions};
pub use repo::{GitRepo, RepoIdentity};
