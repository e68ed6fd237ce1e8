use crate::error::{Result, SyntaxError};
use crate::language::c_parser;
use crate::types::{ByteRange, DuplicatePolicy, FunctionRecord};
use std::collections::BTreeMap;
use tree_sitter::{Node, Tree};

/// A parsed C translation unit with its function index
///
/// The tree is never mutated after construction, so one unit can be sliced
/// for any number of targets without re-parsing.
pub struct TranslationUnit {
    source: String,
    original_len: usize,
    tree: Tree,
    functions: BTreeMap<String, FunctionRecord>,
}

impl TranslationUnit {
    /// Parse source bytes and index every function definition
    pub fn parse(source: &[u8]) -> Result<Self> {
        Self::parse_with_policy(source, DuplicatePolicy::default())
    }

    /// Parse source bytes, resolving duplicate function names with `policy`
    pub fn parse_with_policy(source: &[u8], policy: DuplicatePolicy) -> Result<Self> {
        let original_len = source.len();
        // Offsets below index this string, so the parser must see the same bytes
        let source = String::from_utf8_lossy(source).into_owned();

        let mut parser = c_parser()?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| SyntaxError::parse("Failed to parse source code"))?;

        let root = tree.root_node();
        if root.kind() != "translation_unit" {
            return Err(SyntaxError::parse(format!(
                "Unexpected root node `{}`",
                root.kind()
            )));
        }
        if root.has_error() {
            log::debug!("Syntax tree contains error nodes; indexing what parsed cleanly");
        }

        let mut records = Vec::new();
        collect_functions(root, &source, &mut records);
        let functions = build_index(records, policy)?;

        log::debug!("Indexed {} functions", functions.len());

        Ok(Self {
            source,
            original_len,
            tree,
            functions,
        })
    }

    /// Locate the first definition of `name` by depth-first search
    pub fn find_entry_point(&self, name: &str) -> Result<FunctionRecord> {
        find_definition(self.tree.root_node(), &self.source, name)
            .and_then(|node| function_record(node, &self.source))
            .ok_or_else(|| SyntaxError::missing_entry(name))
    }

    /// Get the indexed record for a function name
    pub fn function(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.get(name)
    }

    /// Check if a function name is indexed
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// All indexed functions, ordered by name
    pub fn functions(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.functions.values()
    }

    /// Number of indexed functions
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Find the `function_definition` node a record was built from
    pub fn function_node(&self, record: &FunctionRecord) -> Option<Node<'_>> {
        let range = record.byte_range;
        let mut node = self
            .tree
            .root_node()
            .descendant_for_byte_range(range.start, range.end)?;

        while node.kind() != "function_definition" {
            node = node.parent()?;
        }

        (node.start_byte() == range.start && node.end_byte() == range.end).then_some(node)
    }

    /// Root node of the syntax tree
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text the tree was built from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Length in bytes of the input as it was handed to `parse`
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Number of lines in the source
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    /// Text covered by a byte range (empty if the range is out of bounds)
    pub fn text(&self, range: ByteRange) -> &str {
        self.source.get(range.start..range.end).unwrap_or("")
    }

    /// Text covered by a node
    pub fn node_text(&self, node: Node<'_>) -> &str {
        node_text(node, &self.source)
    }
}

/// Text covered by `node` in `source` (empty if the span is out of bounds)
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Collect records for every function definition in source order
fn collect_functions(node: Node, source: &str, records: &mut Vec<FunctionRecord>) {
    if node.kind() == "function_definition" {
        // Macro-generated or malformed declarators have no usable name
        if let Some(record) = function_record(node, source) {
            records.push(record);
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_functions(child, source, records);
    }
}

fn build_index(
    records: Vec<FunctionRecord>,
    policy: DuplicatePolicy,
) -> Result<BTreeMap<String, FunctionRecord>> {
    let mut index: BTreeMap<String, FunctionRecord> = BTreeMap::new();

    for record in records {
        match index.get(&record.name) {
            None => {
                index.insert(record.name.clone(), record);
            }
            Some(existing) => {
                log::warn!(
                    "Function `{}` defined at lines {} and {} ({:?})",
                    record.name,
                    existing.start_line,
                    record.start_line,
                    policy
                );
                match policy {
                    DuplicatePolicy::KeepFirst => {}
                    DuplicatePolicy::KeepLast => {
                        index.insert(record.name.clone(), record);
                    }
                    DuplicatePolicy::Reject => {
                        return Err(SyntaxError::DuplicateFunction {
                            first_line: existing.start_line,
                            second_line: record.start_line,
                            name: record.name,
                        });
                    }
                }
            }
        }
    }

    Ok(index)
}

fn find_definition<'t>(node: Node<'t>, source: &str, name: &str) -> Option<Node<'t>> {
    if node.kind() == "function_definition" {
        let matches = function_name(node, source).is_some_and(|found| found == name);
        if matches {
            return Some(node);
        }
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| find_definition(child, source, name))
}

fn function_record(node: Node, source: &str) -> Option<FunctionRecord> {
    let name = function_name(node, source)?;

    let signature_end = node
        .child_by_field_name("body")
        .map_or(node.end_byte(), |body| body.start_byte());
    let signature = source
        .get(node.start_byte()..signature_end)
        .unwrap_or("")
        .trim()
        .to_string();

    Some(FunctionRecord {
        name: name.to_string(),
        signature,
        byte_range: ByteRange::new(node.start_byte(), node.end_byte()),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
    })
}

/// Extract the identifier of a `function_definition`
pub fn function_name<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    let declarator = node.child_by_field_name("declarator")?;
    let ident = declared_function(declarator)?;
    let name = node_text(ident, source);
    (!name.is_empty()).then_some(name)
}

/// Walk a declarator subtree down to the identifier of the function declarator.
///
/// Handles `char *f(void)`, `int (*f(int))(void)` and attribute-wrapped forms.
fn declared_function(node: Node) -> Option<Node> {
    match node.kind() {
        "function_declarator" => {
            let inner = node.child_by_field_name("declarator")?;
            match inner.kind() {
                "identifier" => Some(inner),
                _ => declared_function(inner),
            }
        }
        "pointer_declarator" | "parenthesized_declarator" | "attributed_declarator" => {
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            children.into_iter().find_map(declared_function)
        }
        _ => None,
    }
}

/// Check whether a declarator declares a function (prototype rather than variable)
pub fn declares_function(node: Node) -> bool {
    declared_function(node).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"
#include <stdio.h>

static char *dup_name(const char *s)
{
    return (char *) s;
}

int (*pick_handler(int kind))(void)
{
    return 0;
}

int helper(int x) { return x + 1; }

int main(int argc, char **argv)
{
    return helper(argc);
}
"#;

    #[test]
    fn test_indexes_all_definitions() {
        let unit = TranslationUnit::parse(SOURCE.as_bytes()).unwrap();
        let names: Vec<_> = unit.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["dup_name", "helper", "main", "pick_handler"]);
        assert_eq!(unit.function_count(), 4);
    }

    #[test]
    fn test_signature_and_span() {
        let unit = TranslationUnit::parse(SOURCE.as_bytes()).unwrap();
        let helper = unit.function("helper").unwrap();
        assert_eq!(helper.signature, "int helper(int x)");
        assert_eq!(unit.text(helper.byte_range), "int helper(int x) { return x + 1; }");
        assert_eq!(helper.line_count(), 1);

        let dup = unit.function("dup_name").unwrap();
        assert_eq!(dup.signature, "static char *dup_name(const char *s)");
        assert_eq!(dup.line_count(), 4);
    }

    #[test]
    fn test_find_entry_point() {
        let unit = TranslationUnit::parse(SOURCE.as_bytes()).unwrap();
        let main = unit.find_entry_point("main").unwrap();
        assert_eq!(main.name, "main");
        assert!(unit.text(main.byte_range).contains("return helper(argc);"));
        assert!(unit.function_node(&main).is_some());
    }

    #[test]
    fn test_missing_entry_point() {
        let unit = TranslationUnit::parse(b"int helper(void) { return 1; }").unwrap();
        let err = unit.find_entry_point("main").unwrap_err();
        assert!(matches!(err, SyntaxError::MissingEntryPoint(ref name) if name == "main"));
    }

    #[test]
    fn test_skips_unnamed_definitions() {
        // A macro in declarator position leaves no function_declarator to name
        let code = "int ok(void) { return 1; }\nDEFINE_HANDLER { return 0; }\n";
        let unit = TranslationUnit::parse(code.as_bytes()).unwrap();
        assert!(unit.contains("ok"));
        assert!(!unit.contains("DEFINE_HANDLER"));
    }

    #[test]
    fn test_duplicate_policies() {
        let code = "int twice(void) { return 1; }\nint twice(void) { return 2; }\n";

        let first = TranslationUnit::parse_with_policy(code.as_bytes(), DuplicatePolicy::KeepFirst)
            .unwrap();
        assert!(first.text(first.function("twice").unwrap().byte_range).contains("return 1"));
        assert_eq!(first.function_count(), 1);

        let last = TranslationUnit::parse_with_policy(code.as_bytes(), DuplicatePolicy::KeepLast)
            .unwrap();
        assert!(last.text(last.function("twice").unwrap().byte_range).contains("return 2"));

        let rejected =
            TranslationUnit::parse_with_policy(code.as_bytes(), DuplicatePolicy::Reject);
        assert!(matches!(
            rejected,
            Err(SyntaxError::DuplicateFunction { first_line: 1, second_line: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut bytes = b"/* caf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b" */\nint main(void) { return 0; }\n");

        let unit = TranslationUnit::parse(&bytes).unwrap();
        assert_eq!(unit.original_len(), bytes.len());
        assert!(unit.find_entry_point("main").is_ok());
    }
}
