use crate::error::{Result, SyntaxError};
use std::path::Path;
use tree_sitter::Parser;

/// File extensions treated as C translation units
const C_SOURCE_EXTENSIONS: &[&str] = &["c", "i"];

/// Get the Tree-sitter language instance for C
pub fn c_language() -> tree_sitter::Language {
    tree_sitter_c::LANGUAGE.into()
}

/// Create a parser configured for C
pub fn c_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&c_language())
        .map_err(|e| SyntaxError::tree_sitter(format!("Failed to set language: {e}")))?;
    Ok(parser)
}

/// Check whether a path looks like a C translation unit (headers excluded)
pub fn is_c_source(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            C_SOURCE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_parser() {
        let mut parser = c_parser().unwrap();
        let tree = parser.parse("int main(void) { return 0; }", None).unwrap();
        assert_eq!(tree.root_node().kind(), "translation_unit");
    }

    #[test]
    fn test_is_c_source() {
        assert!(is_c_source("src/ls.c"));
        assert!(is_c_source("CAT.C"));
        assert!(is_c_source("pre/ls.i"));
        assert!(!is_c_source("src/system.h"));
        assert!(!is_c_source("no_extension"));
        assert!(!is_c_source("main.rs"));
    }
}
