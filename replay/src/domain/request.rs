use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the test request file, exactly as it was written on disk.
///
/// `body` is kept loose here so a single entry with a missing or malformed
/// payload can be rejected on its own instead of failing the whole file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RawDescriptor {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// A validated descriptor: an optional test date and the JSON object posted
/// as the request body.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RequestDescriptor {
    pub date: Option<String>,
    pub body: Map<String, Value>,
}

#[derive(Debug, PartialEq)]
pub struct DescriptorValidationError(pub String);

impl std::fmt::Display for DescriptorValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<RawDescriptor> for RequestDescriptor {
    type Error = DescriptorValidationError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        match raw.body {
            Some(Value::Object(body)) if body.is_empty() => {
                Err(DescriptorValidationError(String::from("empty body")))
            }
            Some(Value::Object(body)) => Ok(RequestDescriptor {
                date: raw.date,
                body,
            }),
            Some(Value::Null) | None => Err(DescriptorValidationError(String::from(
                "missing body",
            ))),
            Some(other) => Err(DescriptorValidationError(format!(
                "body must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl RequestDescriptor {
    pub fn reading(&self) -> SensorReading<'_> {
        SensorReading { body: &self.body }
    }

    /// Whether the date looks like something the analysis API can parse.
    /// The date is sent verbatim either way.
    pub fn has_iso_date(&self) -> bool {
        match &self.date {
            Some(date) => is_iso_date(date),
            None => true,
        }
    }
}

/// Label used in progress lines and in the list of failed requests.
pub fn descriptor_label(index: usize, date: Option<&str>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => format!("#{}", index),
    }
}

pub fn is_iso_date(date: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(date).is_ok()
        || NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read-only view of the sensor fields inside a descriptor body.
#[derive(Clone, Copy, Debug)]
pub struct SensorReading<'a> {
    body: &'a Map<String, Value>,
}

impl<'a> SensorReading<'a> {
    pub fn plant_id(&self) -> Option<&'a str> {
        self.body.get("plant_id").and_then(Value::as_str)
    }
    pub fn plant_type(&self) -> Option<&'a str> {
        self.body.get("plant_type").and_then(Value::as_str)
    }
    pub fn humidity(&self) -> Option<&'a Value> {
        self.body.get("humidity")
    }
    pub fn light(&self) -> Option<&'a Value> {
        self.body.get("light")
    }
    pub fn temperature(&self) -> Option<&'a Value> {
        self.body.get("temperature")
    }
}
