//! Block manager configuration

use crate::error::ConfigError;
use saga_merge::{SuffixRenamer, DEFAULT_RENAME_INFIX, DEFAULT_SUFFIX_LEN};
use serde::{Deserialize, Serialize};

/// Default id of the synthetic world root
pub const DEFAULT_ROOT_ID: &str = "__WORLD__";

/// Default prefix of generated Block ids
pub const DEFAULT_CHILD_ID_PREFIX: &str = "blk_";

/// Block manager configuration
///
/// ```toml
/// root_id = "__WORLD__"
/// child_id_prefix = "blk_"
/// rename_infix = "_user_created_"
/// rename_suffix_len = 6
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockManagerConfig {
    /// Id of the root Block every tree hangs from
    pub root_id: String,
    /// Prefix of generated child ids
    pub child_id_prefix: String,
    /// Text between a colliding user entity id and its suffix
    pub rename_infix: String,
    /// Random suffix length of renamed user entity ids
    pub rename_suffix_len: usize,
}

impl BlockManagerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_id.trim().is_empty() {
            return Err(ConfigError::Invalid("root_id must not be empty".into()));
        }
        if self.rename_suffix_len == 0 {
            return Err(ConfigError::Invalid(
                "rename_suffix_len must be at least 1".into(),
            ));
        }
        if self.rename_suffix_len > 32 {
            return Err(ConfigError::Invalid(
                "rename_suffix_len must be at most 32".into(),
            ));
        }
        Ok(())
    }

    /// Set the root Block id
    #[inline]
    #[must_use]
    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }

    /// Set the generated child id prefix
    #[inline]
    #[must_use]
    pub fn with_child_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.child_id_prefix = prefix.into();
        self
    }

    /// Set the rename infix
    #[inline]
    #[must_use]
    pub fn with_rename_infix(mut self, infix: impl Into<String>) -> Self {
        self.rename_infix = infix.into();
        self
    }

    /// Set the random rename suffix length
    #[inline]
    #[must_use]
    pub fn with_rename_suffix_len(mut self, len: usize) -> Self {
        self.rename_suffix_len = len;
        self
    }

    /// Renamer matching this configuration
    #[must_use]
    pub fn renamer(&self) -> SuffixRenamer {
        SuffixRenamer::new(self.rename_infix.clone(), self.rename_suffix_len)
    }
}

impl Default for BlockManagerConfig {
    fn default() -> Self {
        Self {
            root_id: DEFAULT_ROOT_ID.to_string(),
            child_id_prefix: DEFAULT_CHILD_ID_PREFIX.to_string(),
            rename_infix: DEFAULT_RENAME_INFIX.to_string(),
            rename_suffix_len: DEFAULT_SUFFIX_LEN,
        }
    }
}
