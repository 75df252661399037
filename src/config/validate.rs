// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{EtldagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = EtldagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_sources(cfg)?;
    validate_sources(cfg)?;
    validate_run_section(cfg)?;
    validate_api_section(cfg)?;
    validate_storage_section(cfg)?;
    Ok(())
}

fn ensure_has_sources(cfg: &RawConfigFile) -> Result<()> {
    if cfg.sources.is_empty() {
        return Err(EtldagError::ConfigError(
            "config must contain at least one [[source]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_sources(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for source in &cfg.sources {
        if source.name.is_empty() {
            return Err(EtldagError::ConfigError(
                "[[source]].name must not be empty".to_string(),
            ));
        }

        // Source names become task ids and staging filenames.
        if !source
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(EtldagError::ConfigError(format!(
                "[[source]].name '{}' may only contain alphanumerics, '_' and '-'",
                source.name
            )));
        }

        if !seen.insert(source.name.as_str()) {
            return Err(EtldagError::ConfigError(format!(
                "duplicate [[source]].name '{}'",
                source.name
            )));
        }

        if source.query.is_empty() {
            return Err(EtldagError::ConfigError(format!(
                "[[source]] '{}' has an empty query",
                source.name
            )));
        }
    }

    Ok(())
}

fn validate_run_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.max_attempts == 0 {
        return Err(EtldagError::ConfigError(
            "[run].max_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_api_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.api.base_url.is_empty() {
        return Err(EtldagError::ConfigError(
            "[api].base_url must not be empty".to_string(),
        ));
    }
    if cfg.api.poll_interval_secs == 0 {
        return Err(EtldagError::ConfigError(
            "[api].poll_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_storage_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.storage.staging_dir == cfg.storage.destination {
        return Err(EtldagError::ConfigError(
            "[storage].staging_dir and [storage].destination must differ".to_string(),
        ));
    }
    Ok(())
}
