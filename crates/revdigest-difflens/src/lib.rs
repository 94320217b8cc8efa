//! Diff text shaping: chunking and directory grouping.
//!
//! Splits per-file diff text into bounded, lossless chunks and partitions
//! changed paths into deterministically ordered top-level directory groups.

pub mod chunker;
pub mod grouping;
