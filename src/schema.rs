//! Structural checks for WTSS response documents.
//!
//! Every payload is checked here before a model is built from it. The checks
//! are plain functions over [`serde_json::Value`] and stop at the first
//! violation, which is reported with a JSON-pointer-like path.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::util::parse_date;

/// The WTSS operation a payload was returned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListCoverages,
    DescribeCoverage,
    TimeSeries,
}

/// Checks `payload` against the response schema of `op`.
pub fn validate(op: Operation, payload: &Value) -> Result<(), ValidationError> {
    match op {
        Operation::ListCoverages => validate_list(payload),
        Operation::DescribeCoverage => validate_describe(payload),
        Operation::TimeSeries => time_series_parts(payload).map(|_| ()),
    }
}

fn validate_list(payload: &Value) -> Result<(), ValidationError> {
    let obj = object(payload, "")?;
    let coverages = array(required(obj, "coverages", "")?, "/coverages")?;
    for (i, c) in coverages.iter().enumerate() {
        non_empty_string(c, &format!("/coverages/{}", i))?;
    }
    Ok(())
}

fn validate_describe(payload: &Value) -> Result<(), ValidationError> {
    let obj = object(payload, "")?;
    non_empty_string(required(obj, "name", "")?, "/name")?;

    for key in ["description", "detail"] {
        if let Some(v) = optional(obj, key) {
            string(v, &format!("/{}", key))?;
        }
    }

    let attributes = array(required(obj, "attributes", "")?, "/attributes")?;
    for (i, attr) in attributes.iter().enumerate() {
        validate_attribute(attr, &format!("/attributes/{}", i))?;
    }

    if let Some(timeline) = optional(obj, "timeline") {
        timeline_entries(timeline, "/timeline")?;
    }

    if let Some(extent) = optional(obj, "spatial_extent") {
        let e = object(extent, "/spatial_extent")?;
        let n = |k: &str| -> Result<f64, ValidationError> {
            number(required(e, k, "/spatial_extent")?, &format!("/spatial_extent/{}", k))
        };
        let (xmin, ymin, xmax, ymax) = (n("xmin")?, n("ymin")?, n("xmax")?, n("ymax")?);
        if xmin > xmax || ymin > ymax {
            return Err(ValidationError::new(
                "/spatial_extent",
                "minimum coordinate exceeds maximum",
            ));
        }
    }

    if let Some(res) = optional(obj, "spatial_resolution") {
        let r = object(res, "/spatial_resolution")?;
        for key in ["x", "y"] {
            let path = format!("/spatial_resolution/{}", key);
            if number(required(r, key, "/spatial_resolution")?, &path)? <= 0.0 {
                return Err(ValidationError::new(path, "resolution must be positive"));
            }
        }
    }

    if let Some(crs) = optional(obj, "crs") {
        object(crs, "/crs")?;
    }

    Ok(())
}

fn validate_attribute(attr: &Value, path: &str) -> Result<(), ValidationError> {
    let a = object(attr, path)?;
    non_empty_string(required(a, "name", path)?, &format!("{}/name", path))?;
    string(required(a, "datatype", path)?, &format!("{}/datatype", path))?;

    for key in ["description", "common_name"] {
        if let Some(v) = optional(a, key) {
            string(v, &format!("{}/{}", path, key))?;
        }
    }
    for key in ["scale_factor", "missing_value"] {
        if let Some(v) = optional(a, key) {
            number(v, &format!("{}/{}", path, key))?;
        }
    }

    if let Some(range) = optional(a, "valid_range") {
        let range_path = format!("{}/valid_range", path);
        let r = object(range, &range_path)?;
        let min = number(required(r, "min", &range_path)?, &format!("{}/min", range_path))?;
        let max = number(required(r, "max", &range_path)?, &format!("{}/max", range_path))?;
        if min > max {
            return Err(ValidationError::new(range_path, "min exceeds max"));
        }
    }

    Ok(())
}

/// Borrowed pieces of a time series document, independent of its layout.
#[derive(Debug)]
pub(crate) struct TimeSeriesParts<'a> {
    pub(crate) timeline: Vec<&'a str>,
    pub(crate) values: Vec<(&'a str, Vec<f64>)>,
    /// Echo of the request (`query` object), when the server sends one.
    pub(crate) query: Option<&'a Map<String, Value>>,
}

/// Extracts and checks a time series document.
///
/// Two layouts are accepted:
/// - flat: `{"timeline": [...], "result": {"red": [...], ...}}`
/// - nested (WTSS 1.0): `{"query": {...}, "result": {"timeline": [...],
///   "attributes": [{"attribute": "red", "values": [...]}]}}`
pub(crate) fn time_series_parts(payload: &Value) -> Result<TimeSeriesParts<'_>, ValidationError> {
    let obj = object(payload, "")?;
    let result = required(obj, "result", "")?;

    let query = match optional(obj, "query") {
        Some(q) => Some(object(q, "/query")?),
        None => None,
    };

    let (timeline, values) = if let Some(timeline) = optional(obj, "timeline") {
        let timeline = timeline_entries(timeline, "/timeline")?;
        let result = object(result, "/result")?;
        let mut values = Vec::with_capacity(result.len());
        for (name, series) in result {
            let path = format!("/result/{}", name);
            values.push((name.as_str(), numbers(series, &path)?));
        }
        (timeline, values)
    } else {
        let result = object(result, "/result")?;
        let timeline = timeline_entries(required(result, "timeline", "/result")?, "/result/timeline")?;
        let attrs = array(required(result, "attributes", "/result")?, "/result/attributes")?;
        let mut values = Vec::with_capacity(attrs.len());
        for (i, entry) in attrs.iter().enumerate() {
            let path = format!("/result/attributes/{}", i);
            let e = object(entry, &path)?;
            let name = non_empty_string(required(e, "attribute", &path)?, &format!("{}/attribute", path))?;
            let series = numbers(required(e, "values", &path)?, &format!("{}/values", path))?;
            values.push((name, series));
        }
        (timeline, values)
    };

    for (name, series) in &values {
        if series.len() != timeline.len() {
            return Err(ValidationError::new(
                format!("/result/{}", name),
                format!(
                    "attribute has {} value(s) but the timeline has {} date(s)",
                    series.len(),
                    timeline.len()
                ),
            ));
        }
    }

    Ok(TimeSeriesParts {
        timeline,
        values,
        query,
    })
}

fn object<'a>(v: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    v.as_object()
        .ok_or_else(|| ValidationError::new(path, format!("expected an object, found {}", kind(v))))
}

fn array<'a>(v: &'a Value, path: &str) -> Result<&'a Vec<Value>, ValidationError> {
    v.as_array()
        .ok_or_else(|| ValidationError::new(path, format!("expected an array, found {}", kind(v))))
}

fn string<'a>(v: &'a Value, path: &str) -> Result<&'a str, ValidationError> {
    v.as_str()
        .ok_or_else(|| ValidationError::new(path, format!("expected a string, found {}", kind(v))))
}

fn non_empty_string<'a>(v: &'a Value, path: &str) -> Result<&'a str, ValidationError> {
    let s = string(v, path)?;
    if s.trim().is_empty() {
        return Err(ValidationError::new(path, "string must not be empty"));
    }
    Ok(s)
}

fn number(v: &Value, path: &str) -> Result<f64, ValidationError> {
    v.as_f64()
        .ok_or_else(|| ValidationError::new(path, format!("expected a number, found {}", kind(v))))
}

fn numbers(v: &Value, path: &str) -> Result<Vec<f64>, ValidationError> {
    array(v, path)?
        .iter()
        .enumerate()
        .map(|(i, x)| number(x, &format!("{}/{}", path, i)))
        .collect()
}

fn timeline_entries<'a>(v: &'a Value, path: &str) -> Result<Vec<&'a str>, ValidationError> {
    array(v, path)?
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let entry_path = format!("{}/{}", path, i);
            let s = string(d, &entry_path)?;
            if parse_date(s).is_none() {
                return Err(ValidationError::new(
                    entry_path,
                    format!("'{}' is not a date", s),
                ));
            }
            Ok(s)
        })
        .collect()
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Value, ValidationError> {
    obj.get(key).ok_or_else(|| {
        ValidationError::new(path, format!("missing required field '{}'", key))
    })
}

/// A present, non-null field.
fn optional<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
