//! Report assembly and the end-to-end summary pipeline.
//!
//! [`pipeline::summarize`] drives a run; [`assemble::assemble`] renders the
//! document from already-collected data and has no I/O of its own.

pub mod assemble;
pub mod output;
pub mod pipeline;
pub mod structure;

pub use assemble::{assemble, Report, ReportInput};
pub use pipeline::{summarize, SummaryOptions, SummaryOutcome};
