//! Core types, configuration, and error handling for revdigest.
//!
//! This crate provides the shared foundation used by all other revdigest crates:
//! - [`DigestError`]: unified error type using `thiserror` and `miette`
//! - [`DigestConfig`]: configuration loaded from `.revdigest.toml`
//! - The change-set data model: [`RevisionPair`], [`CommitRecord`],
//!   [`ChangeSet`], [`FileGroup`], [`Enrichment`], [`FileReport`]

mod config;
mod error;
mod types;

pub use config::{
    AnalyzerConfig, DigestConfig, EnrichConfig, FileTypeConfig, ReportConfig, RepositoryConfig,
};
pub use error::DigestError;
pub use types::{
    ChangeSet, CommitRecord, Enrichment, EnrichmentKind, FileGroup, FileReport, OutputFormat,
    RevisionPair, RevisionRef, StructureSource, NO_COMMITS, ROOT_GROUP,
};

/// A convenience `Result` type for revdigest operations.
pub type Result<T> = std::result::Result<T, DigestError>;
