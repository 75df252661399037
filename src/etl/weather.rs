// src/etl/weather.rs

//! Weather API client: readiness probe and per-source extraction.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::model::{ApiSection, SourceSpec};
use crate::errors::{EtldagError, Result, TaskError};
use crate::etl::{Extractor, RawRecord, ReadinessGate};

/// HTTP client for the weather API, serving both as the readiness gate and
/// as the extractor.
///
/// The API key is read from the environment at construction time so it never
/// lives in the config file.
#[derive(Debug, Clone)]
pub struct WeatherApi {
    client: Client,
    base_url: String,
    api_key: String,
    /// Query used by the readiness probe (the first configured source).
    probe_query: String,
}

impl WeatherApi {
    pub fn from_config(api: &ApiSection, probe_query: &str) -> Result<Self> {
        let api_key = std::env::var(&api.api_key_env).map_err(|_| {
            EtldagError::ConfigError(format!(
                "environment variable '{}' (weather API key) is not set",
                api.api_key_env
            ))
        })?;

        Ok(Self {
            client: Client::new(),
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key,
            probe_query: probe_query.to_string(),
        })
    }

    fn weather_url(&self, query: &str) -> String {
        format!(
            "{}/data/2.5/weather?q={}&APPID={}",
            self.base_url, query, self.api_key
        )
    }

    async fn fetch(&self, query: &str) -> std::result::Result<reqwest::Response, TaskError> {
        self.client
            .get(self.weather_url(query))
            .send()
            .await
            .map_err(|err| TaskError::Extraction {
                status: 0,
                message: err.to_string(),
            })
    }
}

#[async_trait]
impl ReadinessGate for WeatherApi {
    async fn is_ready(&self) -> std::result::Result<bool, TaskError> {
        let response = self.fetch(&self.probe_query).await?;
        let ready = response.status().is_success();
        debug!(status = %response.status(), ready, "readiness probe");
        Ok(ready)
    }
}

#[async_trait]
impl Extractor for WeatherApi {
    async fn extract(&self, source: &SourceSpec) -> std::result::Result<RawRecord, TaskError> {
        let response = self.fetch(&source.query).await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TaskError::Extraction {
                status: status.as_u16(),
                message,
            });
        }

        debug!(source = %source.name, status = %status, "extracted raw record");
        response
            .json::<RawRecord>()
            .await
            .map_err(|err| TaskError::Extraction {
                status: status.as_u16(),
                message: format!("response is not valid JSON: {err}"),
            })
    }
}
