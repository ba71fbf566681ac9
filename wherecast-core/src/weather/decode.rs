//! Decoding of weather service responses.
//!
//! The response is walked as a `serde_json::Value` rather than derived, so that
//! every failure can name the exact field path (`currently.temperature`).
//! Unknown fields, including the `daily` forecast block, are ignored.

use serde_json::{Map, Value};

use crate::model::{Epoch, Temperature, TemperatureUnit, WeatherObservation};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{path}` has the wrong type: expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Path used in errors when the document itself is not an object.
const ROOT_PATH: &str = "$";

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder {
    native_unit: TemperatureUnit,
}

impl ResponseDecoder {
    /// `native_unit` is the unit the service reports `temperature` in.
    pub fn new(native_unit: TemperatureUnit) -> Self {
        Self { native_unit }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<WeatherObservation, DecodeError> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

        let root = Fields::root(&document)?;
        let latitude = root.number("latitude")?;
        let longitude = root.number("longitude")?;

        let currently = root.object("currently")?;
        let observed_at = currently.epoch("time")?;
        let icon = currently.string("icon")?;
        let summary = currently.string("summary")?;
        let wind_speed = currently.number("windSpeed")?;
        let temperature = currently.number("temperature")?;

        Ok(WeatherObservation::new(
            latitude,
            longitude,
            observed_at,
            wind_speed,
            Temperature::new(temperature, self.native_unit),
            icon,
            summary,
        ))
    }
}

/// Decodes `bytes` assuming the service's default Fahrenheit temperatures.
pub fn decode(bytes: &[u8]) -> Result<WeatherObservation, DecodeError> {
    ResponseDecoder::default().decode(bytes)
}

/// A JSON object together with its path from the document root.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn root(document: &'a Value) -> Result<Self, DecodeError> {
        match document {
            Value::Object(map) => Ok(Self { map, path: String::new() }),
            other => Err(DecodeError::TypeMismatch {
                path: ROOT_PATH.to_string(),
                expected: "object",
                actual: kind(other),
            }),
        }
    }

    fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() { key.to_string() } else { format!("{}.{}", self.path, key) }
    }

    fn required(&self, key: &str) -> Result<&'a Value, DecodeError> {
        self.map.get(key).ok_or_else(|| DecodeError::MissingField(self.path_of(key)))
    }

    fn mismatch(&self, key: &str, expected: &'static str, actual: &Value) -> DecodeError {
        DecodeError::TypeMismatch { path: self.path_of(key), expected, actual: kind(actual) }
    }

    fn object(&self, key: &str) -> Result<Fields<'a>, DecodeError> {
        match self.required(key)? {
            Value::Object(map) => Ok(Fields { map, path: self.path_of(key) }),
            other => Err(self.mismatch(key, "object", other)),
        }
    }

    fn number(&self, key: &str) -> Result<f64, DecodeError> {
        let value = self.required(key)?;
        value.as_f64().ok_or_else(|| self.mismatch(key, "number", value))
    }

    fn string(&self, key: &str) -> Result<String, DecodeError> {
        match self.required(key)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.mismatch(key, "string", other)),
        }
    }

    /// Unix seconds, kept exactly as sent. Negative and out-of-range values
    /// are accepted; only the JSON type is checked.
    fn epoch(&self, key: &str) -> Result<Epoch, DecodeError> {
        match self.required(key)? {
            Value::Number(number) => Ok(Epoch::from(number.clone())),
            other => Err(self.mismatch(key, "number", other)),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
