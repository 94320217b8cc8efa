//! Optional per-file enrichment from external analyzers.
//!
//! Detects a file's type tags from its extension, looks up registered
//! analyzers by `(kind, tag)`, and runs the available ones with a timeout
//! and a bounded number of concurrent invocations. A missing, failing, or
//! slow analyzer only removes its own contribution.

pub mod adapter;
pub mod analyzer;
pub mod filetype;
pub mod registry;
pub mod runner;

pub use adapter::{EnrichSettings, Enricher};
pub use analyzer::{AnalysisRequest, Analyzer, CommandAnalyzer};
pub use filetype::{FileTypes, TypeTags};
pub use registry::AnalyzerRegistry;
