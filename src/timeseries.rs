use chrono::NaiveDate;
use serde_json::{Value, json};
use std::fmt;

use crate::client::TimeSeriesQuery;
use crate::error::{ValidationError, WtssError};
use crate::render;
use crate::schema::time_series_parts;
use crate::util::{format_date, parse_date, parse_timeline};

/// Values of a set of attributes at one location, one value per timeline date.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    coverage: String,
    latitude: f64,
    longitude: f64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    timeline: Vec<NaiveDate>,
    values: Vec<(String, Vec<f64>)>,
    raw: Value,
}

impl TimeSeries {
    /// Validates a `time_series` document returned for `query` and wraps it.
    ///
    /// Attributes are kept in the order they were requested in. Every
    /// requested attribute must be present in the document.
    pub fn from_json(payload: Value, query: &TimeSeriesQuery) -> Result<Self, WtssError> {
        let parts = time_series_parts(&payload)?;

        let timeline = parse_timeline(parts.timeline.iter().copied())
            .map_err(|i| ValidationError::new(format!("/timeline/{}", i), "not a date"))?;

        let mut values: Vec<(String, Vec<f64>)> = parts
            .values
            .into_iter()
            .map(|(name, series)| (name.to_string(), series))
            .collect();
        let rank = |name: &str| {
            query
                .attributes()
                .iter()
                .position(|a| a == name)
                .unwrap_or(usize::MAX)
        };
        values.sort_by_key(|(name, _)| rank(name));

        if let Some(missing) = query
            .attributes()
            .iter()
            .find(|a| !values.iter().any(|(name, _)| name == *a))
        {
            return Err(ValidationError::new(
                format!("/result/{}", missing),
                "requested attribute missing from response",
            )
            .into());
        }

        let echoed = |key: &str| {
            parts
                .query
                .and_then(|q| q.get(key))
                .and_then(Value::as_str)
                .and_then(parse_date)
        };
        let start = query.start().or_else(|| echoed("start_date"));
        let end = query.end().or_else(|| echoed("end_date"));

        Ok(Self {
            coverage: query.coverage().to_string(),
            latitude: query.latitude(),
            longitude: query.longitude(),
            start,
            end,
            timeline,
            values,
            raw: payload,
        })
    }

    pub fn coverage(&self) -> &str {
        &self.coverage
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn timeline(&self) -> &[NaiveDate] {
        &self.timeline
    }

    /// Number of timeline dates.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    pub fn attributes(&self) -> Vec<&str> {
        self.values.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn get_attribute(&self, name: &str) -> Result<&[f64], WtssError> {
        self.get(name).ok_or_else(|| {
            WtssError::UnknownAttribute(format!(
                "{} (time series has: {})",
                name,
                self.attributes().join(", ")
            ))
        })
    }

    /// `(attribute, values)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Every attribute's value on `date`, or `None` if the date is not in the timeline.
    pub fn values_at(&self, date: NaiveDate) -> Option<Vec<(&str, f64)>> {
        let idx = self.timeline.iter().position(|d| *d == date)?;
        Some(self.iter().map(|(n, v)| (n, v[idx])).collect())
    }

    pub fn as_json(&self) -> &Value {
        &self.raw
    }

    /// Normalized document, independent of the layout the server used.
    pub fn to_json(&self) -> Value {
        let result: serde_json::Map<String, Value> = self
            .values
            .iter()
            .map(|(n, v)| (n.clone(), json!(v)))
            .collect();
        json!({
            "coverage": self.coverage,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "start_date": self.start.map(format_date),
            "end_date": self.end.map(format_date),
            "timeline": self.timeline.iter().copied().map(format_date).collect::<Vec<_>>(),
            "result": result,
        })
    }

    pub fn to_html(&self) -> String {
        render::timeseries_html(self)
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TimeSeries: {} at latitude={}, longitude={}",
            self.coverage, self.latitude, self.longitude
        )?;
        for (name, values) in self.iter() {
            writeln!(f, "\t{}: {:?}", name, values)?;
        }
        let dates: Vec<String> = self.timeline.iter().map(|d| d.to_string()).collect();
        write!(f, "\ttimeline: [{}]", dates.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> TimeSeriesQuery {
        TimeSeriesQuery::new("MOD13Q1", -12.0, -54.0).with_attributes(["red", "nir"])
    }

    fn flat() -> Value {
        json!({
            "timeline": ["2001-01-01", "2001-01-17"],
            "result": {"red": [236.0, 289.0], "nir": [3463.0, 3656.0]}
        })
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn every_series_matches_the_timeline() {
        let ts = TimeSeries::from_json(flat(), &query()).unwrap();
        for attr in query().attributes() {
            assert_eq!(ts.get_attribute(attr).unwrap().len(), ts.timeline().len());
        }
        assert_eq!(ts.len(), 2);
        assert!(!ts.is_empty());
    }

    #[test]
    fn attributes_follow_request_order() {
        // serde_json objects iterate in key order, so "nir" would come first.
        let ts = TimeSeries::from_json(flat(), &query()).unwrap();
        assert_eq!(ts.attributes(), vec!["red", "nir"]);
        let names: Vec<&str> = ts.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["red", "nir"]);
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let ts = TimeSeries::from_json(flat(), &query()).unwrap();
        assert!(ts.get("evi").is_none());
        let err = ts.get_attribute("evi").unwrap_err();
        assert!(matches!(err, WtssError::UnknownAttribute(_)));
        assert!(err.to_string().contains("red, nir"));
    }

    #[test]
    fn nested_layout_and_query_echo() {
        let payload = json!({
            "query": {"coverage": "MOD13Q1", "attributes": ["nir"],
                      "latitude": -12.0, "longitude": -54.0,
                      "start_date": "2001-01-01", "end_date": "2001-01-17"},
            "result": {
                "timeline": ["2001-01-01", "2001-01-17"],
                "attributes": [{"attribute": "nir", "values": [3463, 3656]}],
                "coordinates": {"latitude": -12.0, "longitude": -54.0, "col": 1, "row": 2}
            }
        });
        let q = TimeSeriesQuery::new("MOD13Q1", -12.0, -54.0).with_attributes(["nir"]);
        let ts = TimeSeries::from_json(payload, &q).unwrap();
        assert_eq!(ts.get("nir"), Some(&[3463.0, 3656.0][..]));
        assert_eq!(ts.start(), Some(date(2001, 1, 1)));
        assert_eq!(ts.end(), Some(date(2001, 1, 17)));
    }

    #[test]
    fn values_at_a_date() {
        let ts = TimeSeries::from_json(flat(), &query()).unwrap();
        assert_eq!(
            ts.values_at(date(2001, 1, 17)),
            Some(vec![("red", 289.0), ("nir", 3656.0)])
        );
        assert_eq!(ts.values_at(date(2001, 1, 2)), None);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let payload = json!({
            "timeline": ["2001-01-01", "2001-01-17"],
            "result": {"red": [236.0, 289.0], "nir": [3463.0]}
        });
        let err = TimeSeries::from_json(payload, &query()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn missing_requested_attribute_is_rejected() {
        let payload = json!({
            "timeline": ["2001-01-01", "2001-01-17"],
            "result": {"red": [236.0, 289.0]}
        });
        match TimeSeries::from_json(payload, &query()) {
            Err(WtssError::Validation(e)) => {
                assert_eq!(e.path, "/result/nir");
                assert!(e.message.contains("missing"));
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_result_is_rejected() {
        let payload = json!({"timeline": ["2001-01-01"], "result": {}});
        let err = TimeSeries::from_json(payload, &query()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn display_lists_series_and_timeline() {
        let ts = TimeSeries::from_json(flat(), &query()).unwrap();
        assert_eq!(
            ts.to_string(),
            "TimeSeries: MOD13Q1 at latitude=-12, longitude=-54\n\
             \tred: [236.0, 289.0]\n\
             \tnir: [3463.0, 3656.0]\n\
             \ttimeline: [2001-01-01, 2001-01-17]"
        );
    }

    #[test]
    fn normalized_json() {
        let ts = TimeSeries::from_json(flat(), &query()).unwrap();
        let doc = ts.to_json();
        assert_eq!(doc["coverage"], "MOD13Q1");
        assert_eq!(doc["timeline"], json!(["2001-01-01", "2001-01-17"]));
        assert_eq!(doc["result"]["red"], json!([236.0, 289.0]));
        assert!(doc["start_date"].is_null());
    }
}
