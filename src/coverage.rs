use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::client::{TimeSeriesQuery, Wtss};
use crate::error::{ValidationError, WtssError};
use crate::render;
use crate::schema::{Operation, validate};
use crate::timeseries::TimeSeries;
use crate::transport::Transport;
use crate::util::parse_timeline;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialResolution {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    #[serde(default)]
    pub proj4: Option<String>,
    #[serde(default)]
    pub wkt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

/// One band (attribute) of a coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAttribute {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub datatype: String,
    #[serde(default)]
    pub valid_range: Option<ValidRange>,
    #[serde(default)]
    pub scale_factor: Option<f64>,
    #[serde(default)]
    pub missing_value: Option<f64>,
    #[serde(default)]
    pub common_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoverageDoc {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    spatial_extent: Option<SpatialExtent>,
    #[serde(default)]
    spatial_resolution: Option<SpatialResolution>,
    #[serde(default)]
    crs: Option<Crs>,
    #[serde(default)]
    timeline: Option<Vec<String>>,
    attributes: Vec<CoverageAttribute>,
}

/// Metadata of a coverage, as returned by `describe_coverage`.
///
/// Typed fields are exposed through getters; the untouched document stays
/// reachable through [`Coverage::get`] for fields this type does not model.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    name: String,
    description: String,
    detail: Option<String>,
    spatial_extent: Option<SpatialExtent>,
    spatial_resolution: Option<SpatialResolution>,
    crs: Crs,
    timeline: Vec<NaiveDate>,
    attributes: Vec<CoverageAttribute>,
    raw: Value,
}

impl Coverage {
    /// Validates a `describe_coverage` document and wraps it.
    pub fn from_json(payload: Value) -> Result<Self, WtssError> {
        validate(Operation::DescribeCoverage, &payload)?;

        let doc: CoverageDoc = serde_json::from_value(payload.clone())
            .map_err(|e| ValidationError::new("", e.to_string()))?;
        let entries = doc.timeline.unwrap_or_default();
        let timeline = parse_timeline(entries.iter().map(String::as_str))
            .map_err(|i| ValidationError::new(format!("/timeline/{}", i), "not a date"))?;

        Ok(Self {
            name: doc.name,
            description: doc.description.unwrap_or_default(),
            detail: doc.detail,
            spatial_extent: doc.spatial_extent,
            spatial_resolution: doc.spatial_resolution,
            crs: doc.crs.unwrap_or_default(),
            timeline,
            attributes: doc.attributes,
            raw: payload,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn spatial_extent(&self) -> Option<&SpatialExtent> {
        self.spatial_extent.as_ref()
    }

    pub fn spatial_resolution(&self) -> Option<&SpatialResolution> {
        self.spatial_resolution.as_ref()
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn timeline(&self) -> &[NaiveDate] {
        &self.timeline
    }

    /// First and last timeline dates.
    pub fn temporal_extent(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.timeline.first()?, *self.timeline.last()?))
    }

    pub fn attributes(&self) -> &[CoverageAttribute] {
        &self.attributes
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn attribute(&self, name: &str) -> Result<&CoverageAttribute, WtssError> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| WtssError::UnknownAttribute(format!("{} (coverage {})", name, self.name)))
    }

    /// Mapping-style access to any top-level field of the original document.
    pub fn get(&self, key: &str) -> Result<&Value, WtssError> {
        self.raw
            .get(key)
            .ok_or_else(|| WtssError::UnknownAttribute(key.to_string()))
    }

    pub fn as_json(&self) -> &Value {
        &self.raw
    }

    /// Retrieves a time series of this coverage.
    ///
    /// Unlike [`Wtss::time_series`], the requested attributes are checked
    /// against the ones this coverage declares before anything is sent.
    pub fn time_series<T: Transport>(
        &self,
        service: &Wtss<T>,
        query: TimeSeriesQuery,
    ) -> Result<TimeSeries, WtssError> {
        if let Some(missing) = query.attributes().iter().find(|a| !self.has_attribute(a)) {
            return Err(WtssError::UnknownAttribute(format!(
                "{} (coverage {} has: {})",
                missing,
                self.name,
                self.attribute_names().join(", ")
            )));
        }
        service.time_series(&query.with_coverage(&self.name))
    }

    pub fn to_html(&self) -> String {
        render::coverage_html(self)
    }
}

impl<'a> IntoIterator for &'a Coverage {
    type Item = &'a CoverageAttribute;
    type IntoIter = std::slice::Iter<'a, CoverageAttribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Coverage: {}", self.name)?;
        if !self.description.is_empty() {
            writeln!(f, "  description: {}", self.description)?;
        }
        if let Some(e) = &self.spatial_extent {
            writeln!(
                f,
                "  spatial extent: xmin={}, ymin={}, xmax={}, ymax={}",
                e.xmin, e.ymin, e.xmax, e.ymax
            )?;
        }
        if let Some(r) = &self.spatial_resolution {
            writeln!(f, "  spatial resolution: x={}, y={}", r.x, r.y)?;
        }
        if let Some(proj4) = &self.crs.proj4 {
            writeln!(f, "  crs: {}", proj4)?;
        }
        if let Some((first, last)) = self.temporal_extent() {
            writeln!(
                f,
                "  timeline: {} .. {} ({} dates)",
                first,
                last,
                self.timeline.len()
            )?;
        }
        write!(f, "  attributes: {}", self.attribute_names().join(", "))
    }
}
