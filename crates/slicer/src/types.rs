use cslice_syntax::FunctionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A function the slice root depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    /// Function name
    pub name: String,

    /// Shortest call distance from the slice root (>= 1)
    pub depth: usize,

    /// Definition of the function
    pub function: FunctionRecord,
}

/// Depth-ranked dependencies of one slice root
#[derive(Debug, Clone, Default)]
pub struct DependencyClosure {
    root: String,
    entries: BTreeMap<String, DependencyEntry>,
}

impl DependencyClosure {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Name of the slice root
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&DependencyEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(|entry| entry.depth)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by ascending depth, then name
    pub fn ordered(&self) -> Vec<&DependencyEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.name.cmp(&b.name)));
        entries
    }

    /// Definitions of every dependency, ordered by name
    pub fn functions(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.entries.values().map(|entry| &entry.function)
    }

    /// Deepest recorded depth (0 when empty)
    pub fn max_depth(&self) -> usize {
        self.entries.values().map(|entry| entry.depth).max().unwrap_or(0)
    }

    /// Record `entry` if it is new or shallower than the recorded one.
    ///
    /// Returns `true` when the closure changed.
    pub(crate) fn record(&mut self, entry: DependencyEntry) -> bool {
        match self.entries.get(&entry.name) {
            Some(existing) if existing.depth <= entry.depth => false,
            _ => {
                self.entries.insert(entry.name.clone(), entry);
                true
            }
        }
    }
}

/// Type declarations kept for a slice, as literal source text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclarations {
    /// Struct and union declarations
    pub structs: Vec<String>,
    pub enums: Vec<String>,
    pub typedefs: Vec<String>,
}

impl TypeDeclarations {
    pub fn is_empty(&self) -> bool {
        self.structs.is_empty() && self.enums.is_empty() && self.typedefs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.structs.len() + self.enums.len() + self.typedefs.len()
    }
}

/// How a helper function is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperInclusion {
    /// Complete definition
    FullBody,

    /// Signature followed by `;`
    Stub,
}

/// Part of a reconstructed unit, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    Types,
    Macros,
    Globals,
    Helpers,
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
}

/// Diagnostic counters for one slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceStats {
    pub target: String,
    pub structs: usize,
    pub enums: usize,
    pub typedefs: usize,
    pub macros: usize,
    pub globals: usize,
    pub helpers: usize,
    pub full_helpers: usize,
    pub stub_helpers: usize,
    pub original_bytes: usize,
    pub reconstructed_bytes: usize,
    pub reduction_percent: f64,
}

/// The minimal translation unit produced for one target function
#[derive(Debug, Clone)]
pub struct ReconstructedUnit {
    pub target: String,
    pub sections: Vec<Section>,
    pub text: String,
    pub stats: SliceStats,
}

impl ReconstructedUnit {
    /// Text of the first section of `kind`, if emitted
    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        self.sections
            .iter()
            .find(|section| section.kind == kind)
            .map(|section| section.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cslice_syntax::ByteRange;

    fn entry(name: &str, depth: usize) -> DependencyEntry {
        DependencyEntry {
            name: name.to_string(),
            depth,
            function: FunctionRecord {
                name: name.to_string(),
                signature: format!("void {name}(void)"),
                byte_range: ByteRange::new(0, 0),
                start_line: 1,
                end_line: 1,
            },
        }
    }

    #[test]
    fn test_record_keeps_shallowest() {
        let mut closure = DependencyClosure::new("root");
        assert!(closure.record(entry("a", 3)));
        assert!(!closure.record(entry("a", 3)));
        assert!(!closure.record(entry("a", 4)));
        assert!(closure.record(entry("a", 1)));
        assert_eq!(closure.depth_of("a"), Some(1));
    }

    #[test]
    fn test_ordered_by_depth_then_name() {
        let mut closure = DependencyClosure::new("root");
        closure.record(entry("zeta", 1));
        closure.record(entry("beta", 2));
        closure.record(entry("alpha", 2));
        closure.record(entry("gamma", 1));

        let order: Vec<_> = closure.ordered().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(order, vec!["gamma", "zeta", "alpha", "beta"]);
        assert_eq!(closure.max_depth(), 2);
    }
}
