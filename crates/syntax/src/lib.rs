//! # cslice syntax
//!
//! Tree-sitter based indexing of C translation units for program slicing.
//!
//! ## Architecture
//!
//! ```text
//! Source bytes
//!     │
//!     ├──> Tree-sitter Parsing → immutable syntax tree
//!     │
//!     ├──> Function Index (TranslationUnit)
//!     │    ├─> name → FunctionRecord (signature, byte span, lines)
//!     │    ├─> duplicate names resolved by DuplicatePolicy
//!     │    └─> entry point lookup (first match, depth-first)
//!     │
//!     └──> Call-Site Extraction (CallExtractor)
//!          ├─> identifiers in call position
//!          └─> minus the ExclusionList
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cslice_syntax::{CallExtractor, TranslationUnit};
//!
//! let code = b"int helper(void) { return 1; }\nint main(void) { return helper(); }\n";
//! let unit = TranslationUnit::parse(code).unwrap();
//! let main = unit.find_entry_point("main").unwrap();
//!
//! let calls = CallExtractor::default().calls_in(&unit, &main);
//! assert!(calls.contains("helper"));
//! ```

mod calls;
mod error;
mod indexer;
mod language;
pub mod strip;
mod types;

pub use calls::{CallExtractor, ExclusionList, DEFAULT_EXCLUSIONS};
pub use error::{Result, SyntaxError};
pub use indexer::TranslationUnit;
pub use language::{c_language, c_parser, is_c_source};
pub use types::{ByteRange, DuplicatePolicy, FunctionRecord};

/// Node-level helpers shared with the slicing engine
pub mod nodes {
    pub use crate::indexer::{declares_function, function_name, node_text};
}
