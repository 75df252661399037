#![allow(dead_code)]

use etldag::config::{ConfigFile, RawConfigFile, SourceSpec};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_source(mut self, name: &str, query: &str) -> Self {
        self.config.sources.push(SourceSpec {
            name: name.to_string(),
            query: query.to_string(),
        });
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.run.max_attempts = attempts;
        self
    }

    pub fn retry_delay_secs(mut self, secs: u64) -> Self {
        self.config.run.retry_delay_secs = secs;
        self
    }

    pub fn ready_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api.ready_timeout_secs = secs;
        self
    }

    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.api.poll_interval_secs = secs;
        self
    }

    pub fn staging_dir(mut self, dir: &str) -> Self {
        self.config.storage.staging_dir = dir.into();
        self
    }

    pub fn destination(mut self, dir: &str) -> Self {
        self.config.storage.destination = dir.into();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
