//! Source rewriting used before generated test code is injected into a unit.

use crate::error::Result;
use crate::indexer::TranslationUnit;

/// Return the unit's source with the definition of `name` cut out.
///
/// Fails with `MissingEntryPoint` when no definition of `name` exists.
pub fn remove_function(unit: &TranslationUnit, name: &str) -> Result<String> {
    let record = unit.find_entry_point(name)?;
    let source = unit.source();
    let range = record.byte_range;

    let mut stripped = String::with_capacity(source.len() - range.len());
    stripped.push_str(&source[..range.start]);
    stripped.push_str(&source[range.end..]);

    log::debug!(
        "Removed `{}` (lines {}-{}, {} bytes)",
        name,
        record.start_line,
        record.end_line,
        range.len()
    );

    Ok(stripped)
}

/// Append `include_line` as the last line of `code` unless it is already present.
///
/// The result always ends with exactly one newline.
pub fn append_include_line(code: &str, include_line: &str) -> String {
    let mut lines: Vec<&str> = code.lines().collect();
    if !lines.iter().any(|line| *line == include_line) {
        lines.push(include_line);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "int helper(void) { return 1; }\nint main(void) { return helper(); }\n";

    #[test]
    fn test_remove_function() {
        let unit = TranslationUnit::parse(SOURCE.as_bytes()).unwrap();
        let stripped = remove_function(&unit, "main").unwrap();
        assert_eq!(stripped, "int helper(void) { return 1; }\n\n");
    }

    #[test]
    fn test_remove_missing_function() {
        let unit = TranslationUnit::parse(SOURCE.as_bytes()).unwrap();
        let err = remove_function(&unit, "usage").unwrap_err();
        assert!(matches!(err, SyntaxError::MissingEntryPoint(_)));
    }

    #[test]
    fn test_append_include_line() {
        let include = "#include \"../tests/cat/cat_tests.c\"";
        let once = append_include_line("int x;\n", include);
        assert_eq!(once, format!("int x;\n{include}\n"));

        // Appending again leaves the text unchanged
        assert_eq!(append_include_line(&once, include), once);
    }
}
