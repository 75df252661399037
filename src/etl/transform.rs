// src/etl/transform.rs

//! Normalization of raw weather payloads.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::TaskError;
use crate::etl::{RawRecord, Transformer};

const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Flat, typed projection of one source's weather observation.
///
/// The `*_local` timestamps are shifted by the payload's UTC offset, so they
/// read as local time at the observed location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub city: String,
    pub description: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub time_of_record: NaiveDateTime,
    pub sunrise_local: NaiveDateTime,
    pub sunset_local: NaiveDateTime,
}

/// Transformer for the weather API's observation payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherTransformer;

impl Transformer for WeatherTransformer {
    fn transform(&self, raw: &RawRecord) -> Result<NormalizedRecord, TaskError> {
        let tz_offset = i64_at(raw, "/timezone")?;

        Ok(NormalizedRecord {
            city: str_at(raw, "/name")?,
            description: str_at(raw, "/weather/0/description")?,
            temperature_c: kelvin_to_celsius(f64_at(raw, "/main/temp")?),
            feels_like_c: kelvin_to_celsius(f64_at(raw, "/main/feels_like")?),
            min_temp_c: kelvin_to_celsius(f64_at(raw, "/main/temp_min")?),
            max_temp_c: kelvin_to_celsius(f64_at(raw, "/main/temp_max")?),
            pressure: f64_at(raw, "/main/pressure")?,
            humidity: f64_at(raw, "/main/humidity")?,
            wind_speed: f64_at(raw, "/wind/speed")?,
            time_of_record: local_time(i64_at(raw, "/dt")?, tz_offset)?,
            sunrise_local: local_time(i64_at(raw, "/sys/sunrise")?, tz_offset)?,
            sunset_local: local_time(i64_at(raw, "/sys/sunset")?, tz_offset)?,
        })
    }
}

fn value_at<'a>(raw: &'a RawRecord, pointer: &str) -> Result<&'a serde_json::Value, TaskError> {
    raw.pointer(pointer)
        .ok_or_else(|| TaskError::Schema(format!("missing field '{pointer}'")))
}

fn str_at(raw: &RawRecord, pointer: &str) -> Result<String, TaskError> {
    value_at(raw, pointer)?
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| TaskError::Schema(format!("field '{pointer}' is not a string")))
}

fn f64_at(raw: &RawRecord, pointer: &str) -> Result<f64, TaskError> {
    value_at(raw, pointer)?
        .as_f64()
        .ok_or_else(|| TaskError::Schema(format!("field '{pointer}' is not a number")))
}

fn i64_at(raw: &RawRecord, pointer: &str) -> Result<i64, TaskError> {
    value_at(raw, pointer)?
        .as_i64()
        .ok_or_else(|| TaskError::Schema(format!("field '{pointer}' is not an integer")))
}

/// Epoch seconds plus the payload's UTC offset, as a naive local timestamp.
fn local_time(epoch_secs: i64, tz_offset: i64) -> Result<NaiveDateTime, TaskError> {
    DateTime::from_timestamp(epoch_secs + tz_offset, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| TaskError::Schema(format!("timestamp {epoch_secs} out of range")))
}
