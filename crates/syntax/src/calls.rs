use crate::indexer::{node_text, TranslationUnit};
use crate::types::FunctionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tree_sitter::Node;

/// Library and runtime helpers that never count as slice dependencies:
/// allocation, string, I/O, locale and internal debug-assertion primitives.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "printf",
    "fprintf",
    "sprintf",
    "snprintf",
    "malloc",
    "free",
    "realloc",
    "strcmp",
    "strcpy",
    "strlen",
    "memcpy",
    "memset",
    "exit",
    "atexit",
    "setlocale",
    "bindtextdomain",
    "textdomain",
    "fflush",
    "raise",
    "hash_initialize",
    "hash_free",
    "hash_remove",
    "hash_get_n_entries",
    "obstack_init",
    "tzalloc",
    "xmalloc",
    "xgethostname",
    "xalloc_die",
    "assert_matching_dev_ino",
    "affirm",
    "assure",
];

/// Set of call names treated as library calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionList {
    names: BTreeSet<String>,
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self::from_names(DEFAULT_EXCLUSIONS.iter().copied())
    }
}

impl ExclusionList {
    /// An exclusion list that lets every call through
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// Build a list from explicit names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Add more names on top of the current ones
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Extracts direct call targets from syntax subtrees
#[derive(Debug, Clone, Default)]
pub struct CallExtractor {
    exclusions: ExclusionList,
}

impl CallExtractor {
    pub fn new(exclusions: ExclusionList) -> Self {
        Self { exclusions }
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    /// Names called anywhere inside `node`, minus excluded names.
    ///
    /// Only calls whose callee is a plain identifier are resolved; calls
    /// through function pointers or member access are dropped.
    pub fn extract(&self, node: Node, source: &str) -> BTreeSet<String> {
        let mut calls = BTreeSet::new();
        self.traverse_for_calls(node, source, &mut calls);
        calls
    }

    /// Call set of one indexed function, read from its own span
    pub fn calls_in(&self, unit: &TranslationUnit, record: &FunctionRecord) -> BTreeSet<String> {
        match unit.function_node(record) {
            Some(node) => self.extract(node, unit.source()),
            None => {
                log::debug!(
                    "No definition node at {}..{} for `{}`",
                    record.byte_range.start,
                    record.byte_range.end,
                    record.name
                );
                BTreeSet::new()
            }
        }
    }

    /// Call set of the entry function `entry`, restricted to indexed functions.
    ///
    /// This is the batch worklist: every function `main` (or another entry)
    /// calls directly that has a body in the unit.
    pub fn entry_targets(
        &self,
        unit: &TranslationUnit,
        entry: &FunctionRecord,
    ) -> Vec<FunctionRecord> {
        self.calls_in(unit, entry)
            .into_iter()
            .filter(|name| name != &entry.name)
            .filter_map(|name| unit.function(&name).cloned())
            .collect()
    }

    fn traverse_for_calls(&self, node: Node, source: &str, calls: &mut BTreeSet<String>) {
        if node.kind() == "call_expression" {
            if let Some(callee) = node.child_by_field_name("function") {
                if callee.kind() == "identifier" {
                    let name = node_text(callee, source);
                    if !name.is_empty() && !self.exclusions.contains(name) {
                        calls.insert(name.to_string());
                    }
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.traverse_for_calls(child, source, calls);
        }
    }
}
