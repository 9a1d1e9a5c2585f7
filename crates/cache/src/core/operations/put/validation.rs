//! Put operation validation utilities

use tiercache_core::{Error, Result};

use crate::core::types::Cache;

impl Cache {
    /// Keys name files only through their hash, but must not be empty
    pub(in crate::core) fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::validation("key", "cache keys must not be empty"));
        }
        Ok(())
    }

    /// Validate entry size against the configured limit
    pub(super) fn validate_entry_size(&self, key: &str, size: usize) -> Result<()> {
        let max_size = self.inner.options.max_size;
        if size > max_size {
            return Err(Error::validation(
                key,
                format!("entry of {size} bytes exceeds the maximum of {max_size} bytes"),
            ));
        }
        Ok(())
    }
}
