use cslice_syntax::strip::{append_include_line, remove_function};
use cslice_syntax::{CallExtractor, TranslationUnit};

const UNIT: &str = r#"#include <stdlib.h>

#ifdef USE_FAST_PATH
static int fast(int n) { return n << 1; }
#else
static int fast(int n) { return n * 2; }
#endif

static int (*pick(int which))(int) {
    return which ? fast : NULL;
}

int compute(int n) {
    int *buf = malloc(sizeof(int));
    int r = fast(n) + pick(n)(n);
    free(buf);
    return r;
}

int main(int argc, char **argv) {
    return compute(argc);
}
"#;

#[test]
fn indexes_functions_inside_conditional_blocks() {
    let unit = TranslationUnit::parse(UNIT.as_bytes()).unwrap();

    let names: Vec<_> = unit.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["compute", "fast", "main", "pick"]);

    let fast = unit.function("fast").unwrap();
    assert!(
        unit.text(fast.byte_range).contains("n << 1"),
        "first definition wins by default"
    );
}

#[test]
fn calls_through_returned_pointers_are_not_named_callees() {
    let unit = TranslationUnit::parse(UNIT.as_bytes()).unwrap();
    let compute = unit.function("compute").unwrap();

    let calls: Vec<_> = CallExtractor::default()
        .calls_in(&unit, compute)
        .into_iter()
        .collect();
    assert_eq!(calls, vec!["fast", "pick"]);
}

#[test]
fn strip_entry_then_append_harness_include() {
    let unit = TranslationUnit::parse(UNIT.as_bytes()).unwrap();

    let stripped = remove_function(&unit, "main").unwrap();
    assert!(!stripped.contains("int main("));
    assert!(stripped.contains("int compute(int n)"));

    let with_harness = append_include_line(&stripped, "#include \"harness.c\"");
    assert!(with_harness.ends_with("#include \"harness.c\"\n"));
    assert_eq!(
        append_include_line(&with_harness, "#include \"harness.c\""),
        with_harness
    );
}
