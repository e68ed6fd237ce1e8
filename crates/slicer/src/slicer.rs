use crate::assembler::{AssemblyInput, ContextAssembler};
use crate::builder::CallGraphBuilder;
use crate::closure::{ClosureResolver, UnitCallSource};
use crate::config::SlicerConfig;
use crate::error::{Result, SliceError};
use crate::graph::CallGraph;
use crate::types::{DependencyClosure, ReconstructedUnit};
use crate::usage::{scan_globals, scan_macros, LexicalTypeResolver, TypeResolver, UsageExtractor};
use cslice_syntax::{CallExtractor, FunctionRecord, SyntaxError, TranslationUnit};
use std::fs;
use std::path::{Path, PathBuf};

/// Program-slicing engine for C translation units
pub struct Slicer {
    config: SlicerConfig,
    extractor: CallExtractor,
    resolver: ClosureResolver,
    usage: UsageExtractor,
    assembler: ContextAssembler,
}

impl Slicer {
    pub fn new(config: SlicerConfig) -> Result<Self> {
        config.validate()?;

        let exclusions = config.exclusion_list();
        Ok(Self {
            extractor: CallExtractor::new(exclusions.clone()),
            resolver: ClosureResolver::new(config.max_depth, exclusions),
            usage: UsageExtractor::new(Box::new(LexicalTypeResolver::from_config(&config))),
            assembler: ContextAssembler::new(&config),
            config,
        })
    }

    /// Replace the type resolution strategy
    pub fn with_type_resolver(mut self, resolver: Box<dyn TypeResolver>) -> Self {
        self.usage = UsageExtractor::new(resolver);
        self
    }

    pub fn config(&self) -> &SlicerConfig {
        &self.config
    }

    /// Parse source bytes with the configured duplicate policy
    pub fn parse(&self, source: &[u8]) -> Result<TranslationUnit> {
        Ok(TranslationUnit::parse_with_policy(
            source,
            self.config.duplicate_policy,
        )?)
    }

    /// Functions the entry point calls directly, sorted by name.
    ///
    /// A unit without the entry point yields an empty list.
    pub fn entry_targets(&self, unit: &TranslationUnit) -> Vec<FunctionRecord> {
        match unit.find_entry_point(&self.config.entry_point) {
            Ok(entry) => {
                let targets = self.extractor.entry_targets(unit, &entry);
                log::info!(
                    "Found {} target functions called from `{}` ({} defined)",
                    targets.len(),
                    entry.name,
                    unit.function_count()
                );
                targets
            }
            Err(SyntaxError::MissingEntryPoint(name)) => {
                log::warn!("Could not find entry point `{}`", name);
                Vec::new()
            }
            Err(err) => {
                log::warn!("Entry point lookup failed: {}", err);
                Vec::new()
            }
        }
    }

    /// Dependencies of `target` within the configured depth
    pub fn closure(&self, unit: &TranslationUnit, target: &FunctionRecord) -> DependencyClosure {
        let source = UnitCallSource::new(unit, &self.extractor);
        self.resolver.resolve(&source, target)
    }

    /// Whole-unit call graph with the configured exclusions applied
    pub fn call_graph(&self, unit: &TranslationUnit) -> CallGraph {
        CallGraphBuilder::new(self.extractor.clone()).build(unit)
    }

    /// Reconstruct the minimal unit for the function named `target`
    pub fn slice(
        &self,
        unit: &TranslationUnit,
        source_name: &str,
        target: &str,
    ) -> Result<ReconstructedUnit> {
        let record = unit
            .function(target)
            .ok_or_else(|| SliceError::UnknownTarget(target.to_string()))?;
        Ok(self.slice_record(unit, source_name, record))
    }

    /// Reconstruct one unit per function called from the entry point
    pub fn slice_entry_calls(
        &self,
        unit: &TranslationUnit,
        source_name: &str,
    ) -> Vec<ReconstructedUnit> {
        self.entry_targets(unit)
            .iter()
            .map(|target| self.slice_record(unit, source_name, target))
            .collect()
    }

    fn slice_record(
        &self,
        unit: &TranslationUnit,
        source_name: &str,
        target: &FunctionRecord,
    ) -> ReconstructedUnit {
        log::debug!("Building context for `{}`", target.name);

        let closure = self.closure(unit, target);
        let helpers = closure.ordered();

        let macros = scan_macros(unit.source(), self.config.macro_limit);
        let globals = scan_globals(unit, self.config.global_limit);

        let mut functions: Vec<&FunctionRecord> = vec![target];
        functions.extend(closure.functions());
        let types = self.usage.extract_with_globals(unit, &functions, &globals);

        self.assembler.assemble(&AssemblyInput {
            unit,
            source_name,
            target,
            helpers: &helpers,
            types: &types,
            macros: &macros,
            globals: &globals,
        })
    }
}

/// File name of the artifact written for `target`
pub fn output_file_name(target: &str) -> String {
    format!("reconstructed_{target}.c")
}

/// Write a reconstructed unit into `dir`, returning the file path
pub fn write_unit(dir: impl AsRef<Path>, unit: &ReconstructedUnit) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(output_file_name(&unit.target));
    fs::write(&path, &unit.text)?;
    log::debug!("Wrote {}", path.display());
    Ok(path)
}
