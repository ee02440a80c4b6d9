// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, batch capacity bounds, and backend requirements.

use crate::diagnostic::ConfigError;
use crate::model::{BlobBackend, MarginaliaConfig, MAX_BATCH_WRITES_LIMIT};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MarginaliaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    let batch = config.storage.max_batch_writes;
    if batch == 0 || batch > MAX_BATCH_WRITES_LIMIT {
        errors.push(ConfigError::validation(format!(
            "storage.max_batch_writes must be between 1 and {MAX_BATCH_WRITES_LIMIT}, got {batch}"
        )));
    }

    match config.blobs.backend {
        BlobBackend::Local => {
            if config.blobs.root.trim().is_empty() {
                errors.push(ConfigError::validation(
                    "blobs.root must not be empty for the local backend",
                ));
            }
        }
        BlobBackend::Http => match config.blobs.base_url.as_deref().map(str::trim) {
            None | Some("") => errors.push(ConfigError::validation(
                "blobs.base_url is required when blobs.backend = \"http\"",
            )),
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                errors.push(ConfigError::validation(format!(
                    "blobs.base_url `{url}` must start with http:// or https://"
                )));
            }
            Some(_) => {}
        },
    }

    if config.blobs.timeout_secs == 0 {
        errors.push(ConfigError::validation("blobs.timeout_secs must be at least 1"));
    }

    let prefix = &config.ingest.upload_prefix;
    if prefix.trim().is_empty() || prefix.contains('/') {
        errors.push(ConfigError::validation(format!(
            "ingest.upload_prefix `{prefix}` must be a single non-empty path segment"
        )));
    }

    let filename = &config.ingest.source_filename;
    if filename.trim().is_empty() || filename.contains('/') || filename.contains('\\') {
        errors.push(ConfigError::validation(format!(
            "ingest.source_filename `{filename}` must be a bare file name"
        )));
    }

    if let Some(dir) = &config.ingest.scratch_dir
        && dir.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "ingest.scratch_dir must not be empty when set",
        ));
    }

    if config.watch.bucket.trim().is_empty() || config.watch.bucket.contains('/') {
        errors.push(ConfigError::validation(format!(
            "watch.bucket `{}` must be a single non-empty path segment",
            config.watch.bucket
        )));
    }

    if config.watch.debounce_ms == 0 {
        errors.push(ConfigError::validation("watch.debounce_ms must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = MarginaliaConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = MarginaliaConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn batch_capacity_is_bounded() {
        let mut config = MarginaliaConfig::default();
        config.storage.max_batch_writes = 0;
        assert!(has_error(&validate_config(&config).unwrap_err(), "max_batch_writes"));

        config.storage.max_batch_writes = MAX_BATCH_WRITES_LIMIT + 1;
        assert!(has_error(&validate_config(&config).unwrap_err(), "max_batch_writes"));

        config.storage.max_batch_writes = 1;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn http_backend_requires_base_url() {
        let mut config = MarginaliaConfig::default();
        config.blobs.backend = BlobBackend::Http;
        assert!(has_error(&validate_config(&config).unwrap_err(), "base_url"));

        config.blobs.base_url = Some("ftp://example.com".to_string());
        assert!(has_error(&validate_config(&config).unwrap_err(), "http://"));

        config.blobs.base_url = Some("https://storage.example.com".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn source_filename_must_be_bare() {
        let mut config = MarginaliaConfig::default();
        config.ingest.source_filename = "sub/KoboReader.sqlite".to_string();
        assert!(has_error(&validate_config(&config).unwrap_err(), "source_filename"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = MarginaliaConfig::default();
        config.service.log_level = "loud".to_string();
        config.storage.database_path = " ".to_string();
        config.watch.debounce_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
