use thiserror::Error;

/// Result type for syntax operations
pub type Result<T> = std::result::Result<T, SyntaxError>;

/// Errors raised while parsing and indexing a translation unit
#[derive(Error, Debug)]
pub enum SyntaxError {
    /// The source could not be turned into a usable syntax tree
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// The designated entry function is not defined in the unit
    #[error("Entry point not found: {0}")]
    MissingEntryPoint(String),

    /// Two definitions share a name and the index was asked to reject that
    #[error("Function `{name}` is defined more than once (lines {first_line} and {second_line})")]
    DuplicateFunction {
        name: String,
        first_line: usize,
        second_line: usize,
    },

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl SyntaxError {
    /// Create a parse failure
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseFailure(msg.into())
    }

    /// Create a missing entry point error
    pub fn missing_entry(name: impl Into<String>) -> Self {
        Self::MissingEntryPoint(name.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}
