use crate::config::SlicerConfig;
use crate::types::TypeDeclarations;
use cslice_syntax::nodes::{declares_function, node_text};
use cslice_syntax::{FunctionRecord, TranslationUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use tree_sitter::Node;

static TAG_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:struct|union|enum)\s+([A-Za-z_]\w*)").unwrap());

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z_]\w*\b").unwrap());

static DEFINE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*define\b").unwrap());

/// Containers whose children are still at file scope
const FILE_SCOPE_CONTAINERS: &[&str] = &[
    "translation_unit",
    "preproc_if",
    "preproc_ifdef",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
];

/// Names of types referenced by the functions being sliced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeVocabulary {
    names: BTreeSet<String>,
}

impl TypeVocabulary {
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// First vocabulary name occurring anywhere inside `text`
    pub fn find_in(&self, text: &str) -> Option<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .find(|name| text.contains(name))
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

impl<S: Into<String>> FromIterator<S> for TypeVocabulary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Tag keyword of a file-scope type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
}

impl TagKind {
    fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "struct_specifier" => Some(Self::Struct),
            "union_specifier" => Some(Self::Union),
            "enum_specifier" => Some(Self::Enum),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
        }
    }
}

/// A file-scope struct/union/enum declaration as seen by a resolver
#[derive(Debug, Clone)]
pub struct TaggedDeclaration<'a> {
    pub kind: TagKind,

    /// Tag exposed by the grammar (`name` child), if any
    pub tag: Option<&'a str>,

    /// Literal text of the specifier
    pub text: &'a str,
}

/// Decides which type declarations a slice keeps.
///
/// Implementations may over-approximate; dropping a declaration the code
/// needs breaks compilation of the slice.
pub trait TypeResolver {
    /// Types referenced by `functions` (the slice root and its dependencies)
    fn vocabulary(&self, unit: &TranslationUnit, functions: &[&FunctionRecord]) -> TypeVocabulary;

    /// Whether a struct/union/enum declaration is kept
    fn keeps_tagged(&self, declaration: &TaggedDeclaration<'_>, vocabulary: &TypeVocabulary) -> bool;

    /// Whether a typedef is kept
    fn keeps_typedef(&self, text: &str, vocabulary: &TypeVocabulary) -> bool;
}

/// Pattern-matching resolver: tags from `struct X`/`enum X` text, whitelisted
/// system typedef names, and optionally every type identifier in the functions
#[derive(Debug, Clone)]
pub struct LexicalTypeResolver {
    typedef_whitelist: BTreeSet<String>,
    scan_type_identifiers: bool,
}

impl LexicalTypeResolver {
    pub fn new<I, S>(typedef_whitelist: I, scan_type_identifiers: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            typedef_whitelist: typedef_whitelist.into_iter().map(Into::into).collect(),
            scan_type_identifiers,
        }
    }

    pub fn from_config(config: &SlicerConfig) -> Self {
        Self::new(
            config.typedef_whitelist.iter().cloned(),
            config.scan_type_identifiers,
        )
    }

    /// Tag of a declaration: the grammar's name child, else the first
    /// `struct X` in the text before its body
    fn tag_of<'a>(declaration: &TaggedDeclaration<'a>) -> Option<&'a str> {
        if let Some(tag) = declaration.tag {
            return Some(tag);
        }

        let header = declaration
            .text
            .split('{')
            .next()
            .unwrap_or(declaration.text);
        TAG_REFERENCE
            .captures(header)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for LexicalTypeResolver {
    fn default() -> Self {
        Self::from_config(&SlicerConfig::default())
    }
}

impl TypeResolver for LexicalTypeResolver {
    fn vocabulary(&self, unit: &TranslationUnit, functions: &[&FunctionRecord]) -> TypeVocabulary {
        let mut vocabulary = TypeVocabulary::default();

        for function in functions {
            let text = unit.text(function.byte_range);

            for caps in TAG_REFERENCE.captures_iter(text) {
                if let Some(tag) = caps.get(1) {
                    vocabulary.insert(tag.as_str());
                }
            }

            for ident in IDENTIFIER.find_iter(text) {
                if self.typedef_whitelist.contains(ident.as_str()) {
                    vocabulary.insert(ident.as_str());
                }
            }

            if self.scan_type_identifiers {
                if let Some(node) = unit.function_node(function) {
                    collect_type_identifiers(node, unit.source(), &mut vocabulary);
                }
            }
        }

        log::debug!(
            "Referenced types ({}): {}",
            vocabulary.len(),
            vocabulary.iter().take(10).collect::<Vec<_>>().join(", ")
        );

        vocabulary
    }

    fn keeps_tagged(&self, declaration: &TaggedDeclaration<'_>, vocabulary: &TypeVocabulary) -> bool {
        match Self::tag_of(declaration) {
            Some(tag) => vocabulary.contains(tag),
            None => vocabulary.find_in(declaration.text).is_some(),
        }
    }

    fn keeps_typedef(&self, text: &str, vocabulary: &TypeVocabulary) -> bool {
        vocabulary.find_in(text).is_some()
    }
}

fn collect_type_identifiers(node: Node, source: &str, vocabulary: &mut TypeVocabulary) {
    if node.kind() == "type_identifier" {
        let name = node_text(node, source);
        if !name.is_empty() {
            vocabulary.insert(name);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_type_identifiers(child, source, vocabulary);
    }
}

/// Selects the type declarations a slice needs
pub struct UsageExtractor {
    resolver: Box<dyn TypeResolver>,
}

impl UsageExtractor {
    pub fn new(resolver: Box<dyn TypeResolver>) -> Self {
        Self { resolver }
    }

    /// Type declarations used by `functions`, in source order, deduplicated by text
    pub fn extract(&self, unit: &TranslationUnit, functions: &[&FunctionRecord]) -> TypeDeclarations {
        self.extract_with_globals(unit, functions, &[])
    }

    /// Like [`extract`](Self::extract), also counting tags named by the
    /// global declarations emitted alongside the slice
    pub fn extract_with_globals(
        &self,
        unit: &TranslationUnit,
        functions: &[&FunctionRecord],
        globals: &[String],
    ) -> TypeDeclarations {
        let mut vocabulary = self.resolver.vocabulary(unit, functions);
        for global in globals {
            for caps in TAG_REFERENCE.captures_iter(global) {
                if let Some(tag) = caps.get(1) {
                    vocabulary.insert(tag.as_str());
                }
            }
        }
        let mut collector = DeclarationCollector::default();

        self.walk_file_scope(unit, unit.root(), &vocabulary, &mut collector);

        let declarations = collector.finish();
        log::debug!(
            "Kept {} structs, {} enums, {} typedefs",
            declarations.structs.len(),
            declarations.enums.len(),
            declarations.typedefs.len()
        );
        declarations
    }

    fn walk_file_scope(
        &self,
        unit: &TranslationUnit,
        node: Node,
        vocabulary: &TypeVocabulary,
        collector: &mut DeclarationCollector,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let kind = child.kind();

            if let Some(tag_kind) = TagKind::from_node_kind(kind) {
                self.consider_tagged(unit, child, tag_kind, vocabulary, collector);
            } else if kind == "declaration" {
                // `static enum format { .. } format;` defines the tag too
                if let Some((specifier, tag_kind)) = defined_tag(child) {
                    self.consider_tagged(unit, specifier, tag_kind, vocabulary, collector);
                }
            } else if kind == "type_definition" {
                let text = unit.node_text(child);
                if self.resolver.keeps_typedef(text, vocabulary) {
                    collector.push_typedef(text);
                }
            } else if FILE_SCOPE_CONTAINERS.contains(&kind) {
                self.walk_file_scope(unit, child, vocabulary, collector);
            }
        }
    }

    fn consider_tagged(
        &self,
        unit: &TranslationUnit,
        specifier: Node,
        tag_kind: TagKind,
        vocabulary: &TypeVocabulary,
        collector: &mut DeclarationCollector,
    ) {
        let declaration = TaggedDeclaration {
            kind: tag_kind,
            tag: specifier
                .child_by_field_name("name")
                .map(|name| unit.node_text(name)),
            text: unit.node_text(specifier),
        };

        if self.resolver.keeps_tagged(&declaration, vocabulary) {
            collector.push_tagged(&declaration);
        } else if declaration.tag.is_none() {
            log::debug!("Dropped unresolved anonymous {:?} declaration", tag_kind);
        }
    }
}

/// Named struct/union/enum specifier with a body in a declaration's type position
fn defined_tag(declaration: Node) -> Option<(Node, TagKind)> {
    let specifier = declaration.child_by_field_name("type")?;
    let tag_kind = TagKind::from_node_kind(specifier.kind())?;
    specifier.child_by_field_name("name")?;
    specifier.child_by_field_name("body")?;
    Some((specifier, tag_kind))
}

impl Default for UsageExtractor {
    fn default() -> Self {
        Self::new(Box::new(LexicalTypeResolver::default()))
    }
}

#[derive(Default)]
struct DeclarationCollector {
    declarations: TypeDeclarations,
    seen: HashSet<String>,
}

impl DeclarationCollector {
    fn push_tagged(&mut self, declaration: &TaggedDeclaration<'_>) {
        // specifier text stops before the `;` of its empty declaration
        let text = format!("{};", declaration.text.trim_end());
        if self.seen.insert(text.clone()) {
            match declaration.kind {
                TagKind::Struct | TagKind::Union => self.declarations.structs.push(text),
                TagKind::Enum => self.declarations.enums.push(text),
            }
        }
    }

    fn push_typedef(&mut self, text: &str) {
        if self.seen.insert(text.to_string()) {
            self.declarations.typedefs.push(text.to_string());
        }
    }

    fn finish(self) -> TypeDeclarations {
        self.declarations
    }
}

/// `#define` directives in source order, continuation lines folded in
pub fn scan_macros(source: &str, limit: usize) -> Vec<String> {
    let mut macros = Vec::new();
    let mut lines = source.lines();

    while let Some(line) = lines.next() {
        if !DEFINE_LINE.is_match(line) {
            continue;
        }

        let mut definition = line.to_string();
        let mut continued = line.trim_end().ends_with('\\');
        while continued {
            let Some(next) = lines.next() else { break };
            definition.push('\n');
            definition.push_str(next);
            continued = next.trim_end().ends_with('\\');
        }

        macros.push(definition);
    }

    let total = macros.len();
    macros.truncate(limit);
    log::debug!("Found {} macros, keeping {}", total, macros.len());
    macros
}

/// File-scope declarations that are not function prototypes, in source order
pub fn scan_globals(unit: &TranslationUnit, limit: usize) -> Vec<String> {
    let mut globals = Vec::new();
    collect_globals(unit, unit.root(), &mut globals);

    let total = globals.len();
    globals.truncate(limit);
    log::debug!("Found {} global declarations, keeping {}", total, globals.len());
    globals
}

fn collect_globals(unit: &TranslationUnit, node: Node, globals: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();

        if kind == "declaration" {
            let mut decl_cursor = child.walk();
            let is_prototype = child
                .children_by_field_name("declarator", &mut decl_cursor)
                .any(declares_function);

            if !is_prototype {
                globals.push(global_text(unit, child));
            }
        } else if FILE_SCOPE_CONTAINERS.contains(&kind) {
            collect_globals(unit, child, globals);
        }
    }
}

/// Declaration text with an embedded tag definition cut down to a reference;
/// the definition itself is emitted with the type declarations
fn global_text(unit: &TranslationUnit, declaration: Node) -> String {
    let text = unit.node_text(declaration);
    let Some((specifier, tag_kind)) = defined_tag(declaration) else {
        return text.to_string();
    };
    let Some(name) = specifier.child_by_field_name("name") else {
        return text.to_string();
    };

    let start = declaration.start_byte();
    let source = unit.source();
    format!(
        "{}{} {}{}",
        &source[start..specifier.start_byte()],
        tag_kind.keyword(),
        unit.node_text(name),
        &source[specifier.end_byte()..declaration.end_byte()]
    )
}
