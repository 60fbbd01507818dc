//! Resource configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FLUSH_THRESHOLD, DEFAULT_PAGE_CACHE_CAPACITY, PAGE_STORE_FILE};
use crate::error::{RevtreeError, RevtreeResult};

/// Configuration of one resource (one versioned document).
///
/// # Example
///
/// ```rust
/// use revtree_common::config::ResourceConfig;
///
/// let config = ResourceConfig::builder()
///     .store_dewey_ids(true)
///     .page_cache_capacity(64)
///     .build();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.flush_threshold, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Directory holding the persistent page store. `None` keeps the
    /// resource in memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Assign and persist order labels (DeweyIDs) for every node.
    #[serde(default)]
    pub store_dewey_ids: bool,

    /// Number of page containers held by the shared page cache.
    #[serde(default = "default_page_cache_capacity")]
    pub page_cache_capacity: usize,

    /// Number of `put` calls between two durability syncs.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: u64,
}

fn default_page_cache_capacity() -> usize {
    DEFAULT_PAGE_CACHE_CAPACITY
}

fn default_flush_threshold() -> u64 {
    DEFAULT_FLUSH_THRESHOLD
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            store_dewey_ids: false,
            page_cache_capacity: default_page_cache_capacity(),
            flush_threshold: default_flush_threshold(),
        }
    }
}

impl ResourceConfig {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration rooted at the given directory.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    /// Loads configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read and `InvalidConfig`
    /// if it is not valid TOML or fails validation.
    pub fn from_file(path: &Path) -> RevtreeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RevtreeError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> RevtreeResult<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration cannot be serialized.
    pub fn to_toml(&self) -> RevtreeResult<String> {
        toml::to_string_pretty(self).map_err(|e| RevtreeError::invalid_config(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> RevtreeResult<()> {
        if self.page_cache_capacity == 0 {
            return Err(RevtreeError::invalid_config(
                "page_cache_capacity must be at least 1",
            ));
        }

        if self.flush_threshold == 0 {
            return Err(RevtreeError::invalid_config(
                "flush_threshold must be at least 1",
            ));
        }

        Ok(())
    }

    /// Returns the path of the page store file, if the resource is on disk.
    #[must_use]
    pub fn page_store_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(PAGE_STORE_FILE))
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> ResourceConfigBuilder {
        ResourceConfigBuilder::new()
    }
}

/// Builder for resource configuration.
#[derive(Debug, Default)]
pub struct ResourceConfigBuilder {
    config: ResourceConfig,
}

impl ResourceConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the data directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    /// Enables or disables order labels.
    #[must_use]
    pub fn store_dewey_ids(mut self, enabled: bool) -> Self {
        self.config.store_dewey_ids = enabled;
        self
    }

    /// Sets the page cache capacity.
    #[must_use]
    pub fn page_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.page_cache_capacity = capacity;
        self
    }

    /// Sets the flush threshold of the persistent store.
    #[must_use]
    pub fn flush_threshold(mut self, threshold: u64) -> Self {
        self.config.flush_threshold = threshold;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ResourceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ResourceConfig::default();
        assert!(config.data_dir.is_none());
        assert!(!config.store_dewey_ids);
        assert_eq!(config.page_cache_capacity, DEFAULT_PAGE_CACHE_CAPACITY);
        assert_eq!(config.flush_threshold, DEFAULT_FLUSH_THRESHOLD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ResourceConfig::builder()
            .data_dir("/tmp/resource")
            .store_dewey_ids(true)
            .flush_threshold(3)
            .build();

        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/resource")));
        assert!(config.store_dewey_ids);
        assert_eq!(config.flush_threshold, 3);
        assert_eq!(
            config.page_store_path(),
            Some(PathBuf::from("/tmp/resource").join(PAGE_STORE_FILE))
        );
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = ResourceConfig::builder().page_cache_capacity(0).build();
        assert!(config.validate().is_err());

        let config = ResourceConfig::builder().flush_threshold(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ResourceConfig = toml::from_str("store_dewey_ids = true").unwrap();
        assert!(config.store_dewey_ids);
        assert_eq!(config.page_cache_capacity, DEFAULT_PAGE_CACHE_CAPACITY);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("resource.toml");

        let config = ResourceConfig::builder()
            .data_dir(dir.path())
            .page_cache_capacity(16)
            .build();
        config.save(&path).unwrap();

        let loaded = ResourceConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resource.toml");
        std::fs::write(&path, "flush_threshold = 0").unwrap();

        let err = ResourceConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, RevtreeError::InvalidConfig { .. }));
    }
}
