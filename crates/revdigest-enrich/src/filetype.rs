//! File-type detection from extensions.

use std::collections::HashMap;
use std::path::Path;

use revdigest_core::FileTypeConfig;

/// The tags that select analyzers for one file.
///
/// The lint tag and the language tag are independent: `.py` files have a
/// lint tag but no language tag, so they only get lint output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTags {
    /// Tag for lint analyzers, e.g. `py`.
    pub lint: Option<String>,
    /// Tag for semantic diff, call graph and metrics analyzers, e.g. `csharp`.
    pub language: Option<String>,
}

impl TypeTags {
    fn new(lint: Option<&str>, language: Option<&str>) -> Self {
        Self {
            lint: lint.map(str::to_string),
            language: language.map(str::to_string),
        }
    }

    /// True when the file has neither tag.
    pub fn is_empty(&self) -> bool {
        self.lint.is_none() && self.language.is_none()
    }

    /// The tag used to decide whether the file is enabled: the lint tag,
    /// falling back to the language tag.
    pub fn selector(&self) -> Option<&str> {
        self.lint.as_deref().or(self.language.as_deref())
    }
}

const BUILTIN: &[(&[&str], Option<&str>, Option<&str>)] = &[
    (&["cs"], Some("cs"), Some("csharp")),
    (&["dart"], Some("dart"), Some("dart")),
    (&["py"], Some("py"), None),
    (&["js", "jsx"], Some("js"), None),
];

/// Extension to [`TypeTags`] table.
///
/// # Examples
///
/// ```
/// use revdigest_enrich::FileTypes;
///
/// let types = FileTypes::builtin();
/// let tags = types.detect("src/Program.cs");
/// assert_eq!(tags.lint.as_deref(), Some("cs"));
/// assert_eq!(tags.language.as_deref(), Some("csharp"));
/// assert!(types.detect("README.md").is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct FileTypes {
    by_extension: HashMap<String, TypeTags>,
}

impl FileTypes {
    /// The built-in table: C#, Dart, Python and JavaScript.
    pub fn builtin() -> Self {
        let mut by_extension = HashMap::new();
        for (extensions, lint, language) in BUILTIN {
            for ext in *extensions {
                by_extension.insert(ext.to_string(), TypeTags::new(*lint, *language));
            }
        }
        Self { by_extension }
    }

    /// The built-in table with configured entries layered on top.
    ///
    /// A configured extension replaces the built-in mapping for it.
    pub fn with_overrides(overrides: &[FileTypeConfig]) -> Self {
        let mut table = Self::builtin();
        for entry in overrides {
            let tags = TypeTags::new(entry.lint_tag.as_deref(), entry.language.as_deref());
            for ext in &entry.extensions {
                table
                    .by_extension
                    .insert(normalize_extension(ext), tags.clone());
            }
        }
        table
    }

    /// Tags for `path`. Unknown extensions, and paths without one, get empty
    /// tags. Extension matching ignores case.
    pub fn detect(&self, path: &str) -> TypeTags {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.by_extension.get(&normalize_extension(ext)))
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for FileTypes {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}
