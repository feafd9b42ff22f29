//! External object storage configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

/// Where relocated attachment payloads are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobStorageConfig {
    /// Object store URL (file://, memory://, s3://)
    #[serde(default = "default_blob_url")]
    pub url: String,

    /// Prefix prepended to every object key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            url: default_blob_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl Validatable for BlobStorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.url, "url", self.domain_name())?;
        validate_required_string(&self.key_prefix, "key_prefix", self.domain_name())?;

        if self.key_prefix.starts_with('/') || self.key_prefix.ends_with('/') {
            return Err(self.validation_error("key_prefix must not start or end with '/'"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "blob_storage"
    }
}

fn default_blob_url() -> String {
    "file:///var/lib/reportstore/blobs".to_string()
}

fn default_key_prefix() -> String {
    "reports".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_storage_defaults() {
        let config = BlobStorageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.key_prefix, "reports");
    }

    #[test]
    fn test_blob_storage_prefix_slashes() {
        let config = BlobStorageConfig {
            key_prefix: "/reports".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BlobStorageConfig {
            key_prefix: "archive/reports".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
