//! Markdown rendering of the review document.
//!
//! The layout is fixed and meant to be parsed by locating headings in order:
//!
//! 1. `## Context Notes` and `## Task Instructions` (only when supplied)
//! 2. `## Project Structure (tracked files)` or `(directory walk)`
//! 3. `## Change Summary`
//! 4. `## Commits`
//! 5. `## File Changes with Details`, then `### Directory:` and `#### File:`
//!
//! Nothing here sorts: groups, files and commits come out in input order.

use std::collections::HashMap;
use std::fmt::{self, Write};

use revdigest_core::{
    CommitRecord, EnrichmentKind, FileGroup, FileReport, StructureSource, NO_COMMITS,
};

use crate::structure::render_tree;

/// Everything the assembler renders.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Context notes, written verbatim.
    pub context: Option<&'a str>,
    /// Task instructions, written verbatim.
    pub task: Option<&'a str>,
    /// How `structure` was produced.
    pub structure_source: StructureSource,
    /// Project file listing.
    pub structure: &'a [String],
    /// Shortstat-style summary line; may be empty.
    pub stat_summary: &'a str,
    /// Commits in history order.
    pub commits: &'a [CommitRecord],
    /// Changed files grouped by directory.
    pub groups: &'a [FileGroup],
    /// Per-file details.
    pub files: &'a [FileReport],
}

/// A finished document. Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    text: String,
}

impl Report {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Heading for the project-structure section.
pub fn structure_heading(source: StructureSource) -> &'static str {
    match source {
        StructureSource::Tracked => "## Project Structure (tracked files)",
        StructureSource::Walk => "## Project Structure (directory walk)",
    }
}

/// Render `input` into a [`Report`].
///
/// A file listed in a group without a matching [`FileReport`] is rendered
/// with no commits and no chunks.
///
/// # Examples
///
/// ```
/// use revdigest_core::StructureSource;
/// use revdigest_report::assemble::{assemble, ReportInput};
///
/// let report = assemble(&ReportInput {
///     context: None,
///     task: None,
///     structure_source: StructureSource::Tracked,
///     structure: &[],
///     stat_summary: "",
///     commits: &[],
///     groups: &[],
///     files: &[],
/// });
/// assert!(report.as_str().starts_with("## Project Structure (tracked files)\n"));
/// assert!(report.as_str().contains("## File Changes with Details\n"));
/// ```
pub fn assemble(input: &ReportInput<'_>) -> Report {
    let mut out = String::new();

    if let Some(context) = input.context.filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "## Context Notes");
        push_fenced(&mut out, "", context);
        out.push('\n');
    }
    if let Some(task) = input.task.filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "## Task Instructions");
        push_fenced(&mut out, "", task);
        out.push('\n');
    }

    let _ = writeln!(out, "{}", structure_heading(input.structure_source));
    push_fenced(&mut out, "", &render_tree(input.structure));
    out.push('\n');

    let _ = writeln!(out, "## Change Summary");
    if !input.stat_summary.is_empty() {
        let _ = writeln!(out, "{}", input.stat_summary);
    }
    out.push('\n');

    let _ = writeln!(out, "## Commits");
    for commit in input.commits {
        let _ = writeln!(out, "- {commit}");
    }
    out.push('\n');

    let _ = writeln!(out, "## File Changes with Details");
    let by_path: HashMap<&str, &FileReport> =
        input.files.iter().map(|f| (f.path.as_str(), f)).collect();
    for group in input.groups {
        let _ = writeln!(out, "### Directory: {}", group.directory_key);
        for path in &group.files {
            push_file(&mut out, path, by_path.get(path.as_str()).copied());
        }
    }

    Report { text: out }
}

fn push_file(out: &mut String, path: &str, report: Option<&FileReport>) {
    let _ = writeln!(out, "#### File: {path}");
    let subject = report.map_or(NO_COMMITS, |r| r.last_commit_subject.as_str());
    let _ = writeln!(out, "*Summary:* {subject}");
    out.push('\n');

    if let Some(lint) = report.and_then(|r| r.enrichment(EnrichmentKind::Lint)) {
        let _ = writeln!(out, "**{}:**", lint.label);
        if lint.payload.trim().is_empty() {
            let _ = writeln!(out, "_No warnings_");
        } else {
            push_fenced(out, "", &lint.payload);
        }
    }
    push_optional(out, report, EnrichmentKind::SemanticDiff, "");

    let _ = writeln!(out, "**Raw Diff (chunked):**");
    let chunks = report.map(|r| r.diff_chunks.as_slice()).unwrap_or_default();
    if chunks.is_empty() {
        let _ = writeln!(out, "_No chunks_");
    }
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = writeln!(out, "_Chunk {}_", i + 1);
        let fence = fence_for(chunk);
        let _ = writeln!(out, "{fence}");
        out.push_str(chunk);
        out.push('\n');
        let _ = writeln!(out, "{fence}");
    }

    push_optional(out, report, EnrichmentKind::CallGraph, "json");
    push_optional(out, report, EnrichmentKind::Metrics, "json");
    out.push('\n');
}

/// Heading plus fenced payload, or nothing when the payload is absent or
/// blank.
fn push_optional(out: &mut String, report: Option<&FileReport>, kind: EnrichmentKind, info: &str) {
    let Some(enrichment) = report.and_then(|r| r.enrichment(kind)) else {
        return;
    };
    if enrichment.payload.trim().is_empty() {
        return;
    }
    let _ = writeln!(out, "**{}:**", enrichment.label);
    push_fenced(out, info, &enrichment.payload);
}

/// Write `text` in a fenced block, adding a final newline if it lacks one.
fn push_fenced(out: &mut String, info: &str, text: &str) {
    let fence = fence_for(text);
    let _ = writeln!(out, "{fence}{info}");
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{fence}");
}

/// A backtick fence longer than any backtick run in `text`, at least three
/// long.
///
/// # Examples
///
/// ```
/// use revdigest_report::assemble::fence_for;
///
/// assert_eq!(fence_for("plain"), "```");
/// assert_eq!(fence_for("has ``` inside"), "````");
/// ```
pub fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}
