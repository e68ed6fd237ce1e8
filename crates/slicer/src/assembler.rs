use crate::config::SlicerConfig;
use crate::types::{
    DependencyEntry, HelperInclusion, ReconstructedUnit, Section, SectionKind, SliceStats,
    TypeDeclarations,
};
use cslice_syntax::{FunctionRecord, TranslationUnit};

/// Everything the assembler stitches together for one target
pub struct AssemblyInput<'a> {
    pub unit: &'a TranslationUnit,

    /// Display name of the original file, used in the header comment
    pub source_name: &'a str,

    pub target: &'a FunctionRecord,

    /// Dependencies in ascending depth order
    pub helpers: &'a [&'a DependencyEntry],

    pub types: &'a TypeDeclarations,
    pub macros: &'a [String],
    pub globals: &'a [String],
}

/// Builds the reconstructed translation unit for a slice
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    full_body_line_limit: usize,
    macro_limit: usize,
    global_limit: usize,
}

impl ContextAssembler {
    pub fn new(config: &SlicerConfig) -> Self {
        Self {
            full_body_line_limit: config.full_body_line_limit,
            macro_limit: config.macro_limit,
            global_limit: config.global_limit,
        }
    }

    /// Direct callees and small helpers keep their body; the rest become stubs
    pub fn inclusion_for(&self, depth: usize, body_lines: usize) -> HelperInclusion {
        if body_lines < self.full_body_line_limit || depth == 1 {
            HelperInclusion::FullBody
        } else {
            HelperInclusion::Stub
        }
    }

    /// Assemble header, types, macros, globals, helpers and target, in that order
    pub fn assemble(&self, input: &AssemblyInput<'_>) -> ReconstructedUnit {
        let target_name = input.target.name.as_str();
        let mut sections = vec![Section {
            kind: SectionKind::Header,
            text: self.header(input),
        }];

        let types = input.types;
        if !types.is_empty() {
            let mut parts = vec!["/* ===== TYPE DEFINITIONS ===== */\n".to_string()];
            push_group(&mut parts, "/* Structs */", &types.structs);
            push_group(&mut parts, "\n/* Enums */", &types.enums);
            push_group(&mut parts, "\n/* Typedefs */", &types.typedefs);
            sections.push(Section {
                kind: SectionKind::Types,
                text: parts.join("\n"),
            });
        }

        let macros: Vec<&str> = input
            .macros
            .iter()
            .take(self.macro_limit)
            .map(String::as_str)
            .collect();
        if !macros.is_empty() {
            sections.push(Section {
                kind: SectionKind::Macros,
                text: format!(
                    "\n/* ===== MACROS AND CONSTANTS ===== */\n\n{}",
                    macros.join("\n")
                ),
            });
        }

        let globals: Vec<&str> = input
            .globals
            .iter()
            .take(self.global_limit)
            .map(String::as_str)
            .collect();
        if !globals.is_empty() {
            sections.push(Section {
                kind: SectionKind::Globals,
                text: format!(
                    "\n/* ===== GLOBAL VARIABLES ===== */\n\n{}",
                    globals.join("\n")
                ),
            });
        }

        let mut full_helpers = 0;
        let mut stub_helpers = 0;
        if !input.helpers.is_empty() {
            let mut parts = vec![
                "\n/* ===== HELPER FUNCTIONS ===== */".to_string(),
                format!(
                    "/* {} functions needed by {} */\n",
                    input.helpers.len(),
                    target_name
                ),
            ];

            for helper in input.helpers {
                let code = input.unit.text(helper.function.byte_range);
                let lines = non_empty_lines(code);

                match self.inclusion_for(helper.depth, lines) {
                    HelperInclusion::FullBody => {
                        full_helpers += 1;
                        parts.push(format!(
                            "/* {} - depth {}, {} lines */",
                            helper.name, helper.depth, lines
                        ));
                        parts.push(format!("{code}\n"));
                    }
                    HelperInclusion::Stub => {
                        stub_helpers += 1;
                        parts.push(format!(
                            "{};  /* depth {}, {} lines */\n",
                            helper.function.signature, helper.depth, lines
                        ));
                    }
                }
            }

            sections.push(Section {
                kind: SectionKind::Helpers,
                text: parts.join("\n"),
            });
        }

        let target_code = input.unit.text(input.target.byte_range);
        sections.push(Section {
            kind: SectionKind::Target,
            text: format!(
                "\n/* ===== TARGET FUNCTION ===== */\n/* {} - {} lines */\n\n{}",
                target_name,
                non_empty_lines(target_code),
                target_code
            ),
        });

        let text = sections
            .iter()
            .map(|section| section.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let original_bytes = input.unit.original_len();
        let reconstructed_bytes = text.len();
        let stats = SliceStats {
            target: target_name.to_string(),
            structs: types.structs.len(),
            enums: types.enums.len(),
            typedefs: types.typedefs.len(),
            macros: macros.len(),
            globals: globals.len(),
            helpers: input.helpers.len(),
            full_helpers,
            stub_helpers,
            original_bytes,
            reconstructed_bytes,
            reduction_percent: reduction_ratio(original_bytes, reconstructed_bytes) * 100.0,
        };

        log::info!(
            "Reconstructed `{}`: {} -> {} bytes ({:.1}% reduction), {} helpers",
            target_name,
            original_bytes,
            reconstructed_bytes,
            stats.reduction_percent,
            stats.helpers
        );

        ReconstructedUnit {
            target: target_name.to_string(),
            sections,
            text,
            stats,
        }
    }

    fn header(&self, input: &AssemblyInput<'_>) -> String {
        format!(
            "/* =====================================================\n \
             * RECONSTRUCTED MINIMAL CONTEXT FOR: {}\n \
             * Original file: {} (~{} lines)\n \
             * This context: Only what's needed for testing\n \
             * ===================================================== */\n",
            input.target.name,
            input.source_name,
            input.unit.line_count()
        )
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(&SlicerConfig::default())
    }
}

fn push_group(parts: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    parts.push(title.to_string());
    parts.extend(items.iter().map(|item| format!("{item}\n")));
}

/// Number of lines with visible content
pub fn non_empty_lines(code: &str) -> usize {
    code.lines().filter(|line| !line.trim().is_empty()).count()
}

/// `1 - reconstructed / original` (0 for an empty original)
pub fn reduction_ratio(original_bytes: usize, reconstructed_bytes: usize) -> f64 {
    if original_bytes == 0 {
        return 0.0;
    }
    1.0 - reconstructed_bytes as f64 / original_bytes as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_function(name: &str, lines: usize) -> String {
        let body: String = (0..lines).map(|i| format!("    x += {i};\n")).collect();
        format!("int {name}(int x)\n{{\n{body}    return x;\n}}\n")
    }

    #[test]
    fn test_inclusion_policy() {
        let assembler = ContextAssembler::default();
        assert_eq!(assembler.inclusion_for(1, 500), HelperInclusion::FullBody);
        assert_eq!(assembler.inclusion_for(2, 49), HelperInclusion::FullBody);
        assert_eq!(assembler.inclusion_for(2, 50), HelperInclusion::Stub);
        assert_eq!(assembler.inclusion_for(7, 120), HelperInclusion::Stub);
    }

    #[test]
    fn test_reduction_ratio() {
        assert!((reduction_ratio(200, 50) - 0.75).abs() < 1e-12);
        assert_eq!(reduction_ratio(0, 10), 0.0);
        assert!(reduction_ratio(10, 20) < 0.0);
    }

    #[test]
    fn test_non_empty_lines() {
        assert_eq!(non_empty_lines("a\n\n  \nb\n"), 2);
        assert_eq!(non_empty_lines(""), 0);
    }

    #[test]
    fn test_sections_in_fixed_order_with_stubs() {
        let source = format!(
            "{}\n{}\n{}\nint target(void) {{ return direct(1) + deep(2); }}\n",
            long_function("direct", 60),
            long_function("deep", 60),
            long_function("small", 3),
        );
        let unit = TranslationUnit::parse(source.as_bytes()).unwrap();
        let entry = |name: &str, depth| DependencyEntry {
            name: name.to_string(),
            depth,
            function: unit.function(name).unwrap().clone(),
        };
        let direct = entry("direct", 1);
        let deep = entry("deep", 2);
        let small = entry("small", 3);
        let helpers = vec![&direct, &deep, &small];

        let types = TypeDeclarations {
            structs: vec!["struct S { int a; };".to_string()],
            ..Default::default()
        };
        let macros = vec!["#define ONE 1".to_string()];
        let globals = vec!["static int g;".to_string()];
        let target = unit.function("target").unwrap();

        let out = ContextAssembler::default().assemble(&AssemblyInput {
            unit: &unit,
            source_name: "prog.c",
            target,
            helpers: &helpers,
            types: &types,
            macros: &macros,
            globals: &globals,
        });

        let kinds: Vec<_> = out.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Header,
                SectionKind::Types,
                SectionKind::Macros,
                SectionKind::Globals,
                SectionKind::Helpers,
                SectionKind::Target,
            ]
        );

        let helpers_text = out.section(SectionKind::Helpers).unwrap();
        assert!(helpers_text.contains("/* direct - depth 1, 64 lines */"));
        assert!(helpers_text.contains("int deep(int x);  /* depth 2, 64 lines */"));
        // only `direct` carries a 60-statement body
        assert_eq!(helpers_text.matches("x += 59;").count(), 1);
        assert!(helpers_text.contains("/* small - depth 3, 7 lines */"));
        assert_eq!(out.stats.full_helpers, 2);
        assert_eq!(out.stats.stub_helpers, 1);

        assert!(out.text.contains("RECONSTRUCTED MINIMAL CONTEXT FOR: target"));
        assert!(out.text.contains("Original file: prog.c"));
        assert!(out.text.ends_with("int target(void) { return direct(1) + deep(2); }"));
        assert_eq!(out.stats.reconstructed_bytes, out.text.len());
    }

    #[test]
    fn test_caps_and_empty_sections() {
        let source = "int lonely(void) { return 0; }\n";
        let unit = TranslationUnit::parse(source.as_bytes()).unwrap();
        let macros: Vec<String> = (0..5).map(|i| format!("#define M{i} {i}")).collect();
        let config = SlicerConfig {
            macro_limit: 2,
            ..Default::default()
        };

        let out = ContextAssembler::new(&config).assemble(&AssemblyInput {
            unit: &unit,
            source_name: "lonely.c",
            target: unit.function("lonely").unwrap(),
            helpers: &[],
            types: &TypeDeclarations::default(),
            macros: &macros,
            globals: &[],
        });

        assert!(out.section(SectionKind::Types).is_none());
        assert!(out.section(SectionKind::Globals).is_none());
        assert!(out.section(SectionKind::Helpers).is_none());
        assert_eq!(out.stats.macros, 2);
        assert!(out.text.contains("#define M1 1"));
        assert!(!out.text.contains("#define M2 2"));
        assert!(out.text.contains("int lonely(void) { return 0; }"));
    }
}
