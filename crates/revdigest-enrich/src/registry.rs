//! `(kind, tag)` lookup of analyzers.

use std::sync::Arc;

use revdigest_core::{EnrichConfig, EnrichmentKind};

use crate::analyzer::{builtin_analyzers, Analyzer, CommandAnalyzer};

/// Ordered set of analyzers. The first analyzer registered for a
/// `(kind, tag)` pair wins.
///
/// # Examples
///
/// ```
/// use revdigest_core::{EnrichConfig, EnrichmentKind};
/// use revdigest_enrich::AnalyzerRegistry;
///
/// let registry = AnalyzerRegistry::from_config(&EnrichConfig::default());
/// let lint = registry.lookup(EnrichmentKind::Lint, "py").unwrap();
/// assert_eq!(lint.label(), "Flake8 warnings");
/// assert!(registry.lookup(EnrichmentKind::Metrics, "py").is_none());
/// ```
#[derive(Default, Clone)]
pub struct AnalyzerRegistry {
    entries: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the built-in analyzers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Configured analyzers first, then the built-ins.
    pub fn from_config(config: &EnrichConfig) -> Self {
        let mut registry = Self::new();
        for entry in &config.analyzers {
            registry.register(Arc::new(CommandAnalyzer::from_config(entry)));
        }
        registry.register_builtins();
        registry
    }

    /// Append an analyzer. It is shadowed by any earlier entry with the same
    /// `(kind, tag)`.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.entries.push(analyzer);
    }

    fn register_builtins(&mut self) {
        for analyzer in builtin_analyzers() {
            self.register(Arc::new(analyzer));
        }
    }

    /// The analyzer that handles `(kind, tag)`, if any.
    pub fn lookup(&self, kind: EnrichmentKind, tag: &str) -> Option<&Arc<dyn Analyzer>> {
        self.entries
            .iter()
            .find(|a| a.kind() == kind && a.tag() == tag)
    }

    /// Every analyzer that would be selected by some lookup, in registration
    /// order. Shadowed entries are left out.
    pub fn effective(&self) -> Vec<&Arc<dyn Analyzer>> {
        let mut out: Vec<&Arc<dyn Analyzer>> = Vec::new();
        for analyzer in &self.entries {
            let shadowed = out
                .iter()
                .any(|a| a.kind() == analyzer.kind() && a.tag() == analyzer.tag());
            if !shadowed {
                out.push(analyzer);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|a| format!("{}:{}", a.kind(), a.tag())))
            .finish()
    }
}
