use crate::error::{Result, SliceError};
use cslice_syntax::{DuplicatePolicy, ExclusionList};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// System typedef names that count as referenced whenever they appear
pub const DEFAULT_TYPEDEF_WHITELIST: &[&str] = &[
    "idx_t", "size_t", "off_t", "mode_t", "time_t", "dev_t", "ino_t", "uintmax_t", "pid_t",
    "uid_t", "gid_t",
];

// Stays representable as a TOML integer
const UNBOUNDED: usize = u32::MAX as usize;

/// Configuration for one slicing engine instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerConfig {
    /// Function whose direct callees form the batch worklist
    pub entry_point: String,

    /// Maximum call depth followed from the slice root (0 = no helpers)
    pub max_depth: usize,

    /// Helpers below this many non-empty lines are always inlined in full
    pub full_body_line_limit: usize,

    /// Maximum number of `#define`s copied into a slice
    pub macro_limit: usize,

    /// Maximum number of file-scope declarations copied into a slice
    pub global_limit: usize,

    /// Library calls never treated as dependencies
    pub exclusions: ExclusionList,

    /// Names added on top of `exclusions`
    pub extra_exclusions: Vec<String>,

    /// Typedef names always looked for in included functions
    pub typedef_whitelist: Vec<String>,

    /// Resolution of functions defined more than once
    pub duplicate_policy: DuplicatePolicy,

    /// Also treat every type identifier used inside included functions as referenced
    pub scan_type_identifiers: bool,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            max_depth: 10,
            full_body_line_limit: 50,
            macro_limit: 100,
            global_limit: 50,
            exclusions: ExclusionList::default(),
            extra_exclusions: vec![],
            typedef_whitelist: DEFAULT_TYPEDEF_WHITELIST
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            duplicate_policy: DuplicatePolicy::default(),
            scan_type_identifiers: true,
        }
    }
}

impl SlicerConfig {
    /// Only the target's direct callees, each inlined in full
    pub fn direct_only() -> Self {
        Self {
            max_depth: 1,
            ..Default::default()
        }
    }

    /// Follow every call chain and never stub a helper
    pub fn exhaustive() -> Self {
        Self {
            max_depth: UNBOUNDED,
            full_body_line_limit: UNBOUNDED,
            macro_limit: UNBOUNDED,
            global_limit: UNBOUNDED,
            ..Default::default()
        }
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Effective exclusion list (`exclusions` plus `extra_exclusions`)
    pub fn exclusion_list(&self) -> ExclusionList {
        let mut list = self.exclusions.clone();
        list.extend(self.extra_exclusions.iter().cloned());
        list
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.entry_point.trim().is_empty() {
            return Err(SliceError::InvalidConfig(
                "entry_point must not be empty".to_string(),
            ));
        }

        if self.full_body_line_limit == 0 {
            return Err(SliceError::InvalidConfig(
                "full_body_line_limit must be > 0".to_string(),
            ));
        }

        if let Some(bad) = self
            .typedef_whitelist
            .iter()
            .find(|name| !is_c_identifier(name))
        {
            return Err(SliceError::InvalidConfig(format!(
                "typedef_whitelist entry `{bad}` is not a C identifier"
            )));
        }

        Ok(())
    }
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
