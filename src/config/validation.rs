//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the storage backend has what it needs
//! - Check the region table override
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RegistryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{RegistryConfig, StorageBackend};
use crate::regions::{RegionTable, RegionTableError};

/// A single semantic problem with a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("storage.data_dir must not be empty for the file backend")]
    MissingDataDir,

    #[error("storage.database_url (or DATABASE_URL) is required for the postgres backend")]
    MissingDatabaseUrl,

    #[error("admin.api_key must not be empty when the admin API is enabled")]
    MissingAdminKey,

    #[error("regions: {0}")]
    Regions(#[from] RegionTableError),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RegistryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    match config.storage.backend {
        StorageBackend::File if config.storage.data_dir.trim().is_empty() => {
            errors.push(ValidationError::MissingDataDir);
        }
        StorageBackend::Postgres => {
            let has_url = config
                .storage
                .database_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty());
            if !has_url {
                errors.push(ValidationError::MissingDatabaseUrl);
            }
            if config.storage.max_connections == 0 {
                errors.push(ValidationError::Zero("storage.max_connections"));
            }
        }
        _ => {}
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if let Err(e) = RegionTable::from_config(&config.regions) {
        errors.push(e.into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::RegionEntry;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RegistryConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RegistryConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.timeouts.request_secs = 0;
        config.storage.backend = StorageBackend::Postgres;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::MissingDatabaseUrl));
        assert!(errors.contains(&ValidationError::Zero("timeouts.request_secs")));
    }

    #[test]
    fn test_admin_requires_key() {
        let mut config = RegistryConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = "  ".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingAdminKey]);
    }

    #[test]
    fn test_region_override_checked() {
        let mut config = RegistryConfig::default();
        config.regions = vec![
            RegionEntry { label: "A".into(), key: "a".into(), prefix: 'A' },
            RegionEntry { label: "B".into(), key: "a".into(), prefix: 'B' },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Regions(RegionTableError::DuplicateKey("a".into()))]
        );
    }
}
