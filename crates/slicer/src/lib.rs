//! # cslice slicer
//!
//! Program slicing for C: given a translation unit and a target function,
//! reconstruct the smallest unit that still compiles around it.
//!
//! ## Features
//!
//! - **Dependency closure** - shortest-depth call dependencies, bounded by depth
//! - **Type usage** - only the struct/enum/typedef declarations the slice mentions
//! - **Macros and globals** - capped file-scope context
//! - **Assembly** - deterministic output with full bodies or signature stubs
//!
//! ## Architecture
//!
//! ```text
//! TranslationUnit (cslice-syntax)
//!     │
//!     ├──> Closure Resolver
//!     │      ├─ direct calls of the target (depth 1)
//!     │      ├─ callees of callees, shallowest depth wins
//!     │      └─ exclusions re-applied at every step
//!     │
//!     ├──> Usage Extractor
//!     │      ├─ referenced-type vocabulary (TypeResolver)
//!     │      ├─ struct/union/enum/typedef declarations
//!     │      └─ #define lines, file-scope declarations
//!     │
//!     └──> Context Assembler
//!            ├─ header → types → macros → globals → helpers → target
//!            ├─ full body for direct or small helpers, stubs otherwise
//!            └─ size-reduction stats
//! ```

mod assembler;
mod builder;
mod closure;
mod config;
mod error;
mod graph;
mod slicer;
mod types;
mod usage;

pub use assembler::{non_empty_lines, reduction_ratio, AssemblyInput, ContextAssembler};
pub use builder::CallGraphBuilder;
pub use closure::{CallSource, ClosureResolver, UnitCallSource};
pub use config::{SlicerConfig, DEFAULT_TYPEDEF_WHITELIST};
pub use error::{Result, SliceError};
pub use graph::CallGraph;
pub use slicer::{output_file_name, write_unit, Slicer};
pub use types::{
    DependencyClosure, DependencyEntry, HelperInclusion, ReconstructedUnit, Section, SectionKind,
    SliceStats, TypeDeclarations,
};
pub use usage::{
    scan_globals, scan_macros, LexicalTypeResolver, TagKind, TaggedDeclaration, TypeResolver,
    TypeVocabulary, UsageExtractor,
};
