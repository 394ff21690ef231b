use chrono::NaiveDate;
use log::debug;
use reqwest::StatusCode;
use serde_json::Value;
use std::cell::OnceCell;
use std::fmt;
use std::time::Duration;

use crate::config::{ServiceConfig, load_config};
use crate::coverage::Coverage;
use crate::error::{ServerErrorResponse, ValidationError, WtssError};
use crate::render;
use crate::schema::{Operation, validate};
use crate::timeseries::TimeSeries;
use crate::transport::{HttpTransport, Transport};
use crate::util::{format_date, parse_date};

/// Client for a Web Time Series Service.
///
/// Each call performs at most one blocking HTTP round trip. The list of
/// coverage names is fetched once and kept for the life of the value; build a
/// new `Wtss` to refresh it.
#[derive(Debug)]
pub struct Wtss<T = HttpTransport> {
    url: String,
    transport: T,
    coverages: OnceCell<Vec<String>>,
}

impl Wtss<HttpTransport> {
    /// Creates a client using environment variables and/or `.wtssrc`.
    ///
    /// This is equivalent to `Wtss::from_config(None, None)`.
    pub fn from_env() -> Result<Self, WtssError> {
        Self::from_config(None, None)
    }

    /// Creates a client for the server at `url`.
    pub fn new(url: impl Into<String>, access_token: Option<String>) -> Result<Self, WtssError> {
        Self::from_config(Some(url.into()), access_token)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`access_token` arguments
    /// - environment variables `WTSS_URL` / `WTSS_ACCESS_TOKEN`
    /// - config file from `WTSS_RC` or `.wtssrc`
    pub fn from_config(
        url: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self, WtssError> {
        let cfg = load_config(url, access_token, None)?;
        Self::with_config(&cfg)
    }

    pub fn with_config(cfg: &ServiceConfig) -> Result<Self, WtssError> {
        let transport = HttpTransport::new(cfg)?;
        Ok(Self::with_transport(cfg.url.clone(), transport))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }
}

impl<T: Transport> Wtss<T> {
    /// Creates a client that sends its requests through `transport`.
    pub fn with_transport(url: impl Into<String>, transport: T) -> Self {
        Self {
            url: url.into(),
            transport,
            coverages: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Names of the coverages offered by the server, in server order.
    ///
    /// Only the first call goes to the network.
    pub fn list_coverages(&self) -> Result<&[String], WtssError> {
        if let Some(names) = self.coverages.get() {
            debug!("coverage list served from cache ({} entries)", names.len());
            return Ok(names);
        }

        let payload = self.transport.get_json("list_coverages", &[])?;
        validate(Operation::ListCoverages, &payload)?;

        let names = payload["coverages"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(self.coverages.get_or_init(|| names))
    }

    /// Retrieves the metadata of coverage `name`.
    pub fn describe_coverage(&self, name: &str) -> Result<Coverage, WtssError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WtssError::argument("coverage name must not be empty"));
        }

        if let Some(names) = self.coverages.get() {
            if !names.iter().any(|n| n == name) {
                return Err(WtssError::NotFound(name.to_string()));
            }
        }

        let payload = self
            .transport
            .get_json("describe_coverage", &[("name", name.to_string())])
            .map_err(|e| not_found_on_404(e, name))?;

        if is_empty_payload(&payload) {
            return Err(WtssError::NotFound(name.to_string()));
        }
        if let Some(err) = ServerErrorResponse::from_payload(&payload) {
            return Err(server_error(err, name));
        }

        Coverage::from_json(payload)
    }

    /// Item lookup by coverage name; same as [`Wtss::describe_coverage`].
    pub fn coverage(&self, name: &str) -> Result<Coverage, WtssError> {
        self.describe_coverage(name)
    }

    /// Describes every listed coverage, one request per item.
    pub fn coverages(
        &self,
    ) -> Result<impl Iterator<Item = Result<Coverage, WtssError>> + '_, WtssError> {
        let names = self.list_coverages()?;
        Ok(names.iter().map(move |n| self.describe_coverage(n)))
    }

    /// Retrieves the time series described by `query`.
    ///
    /// The query is checked before any request is made.
    pub fn time_series(&self, query: &TimeSeriesQuery) -> Result<TimeSeries, WtssError> {
        query.check()?;

        let payload = self
            .transport
            .get_json("time_series", &query.params())
            .map_err(|e| not_found_on_404(e, &query.coverage))?;

        if is_empty_payload(&payload) {
            return Err(WtssError::NotFound(query.coverage.clone()));
        }
        if let Some(err) = ServerErrorResponse::from_payload(&payload) {
            return Err(server_error(err, &query.coverage));
        }

        TimeSeries::from_json(payload, query)
    }

    /// Shorthand for [`Wtss::time_series`] taking dates as `YYYY-MM-DD` strings.
    ///
    /// Omitted dates are not sent; the server then covers the whole timeline.
    pub fn time_series_at<S: AsRef<str>>(
        &self,
        coverage: &str,
        attributes: &[S],
        latitude: f64,
        longitude: f64,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<TimeSeries, WtssError> {
        let query = TimeSeriesQuery::new(coverage, latitude, longitude)
            .with_attributes(attributes.iter().map(|a| a.as_ref()))
            .with_date_strings(start, end)?;
        self.time_series(&query)
    }

    /// HTML listing of the server and its coverages.
    pub fn to_html(&self) -> Result<String, WtssError> {
        let names = self.list_coverages()?;
        Ok(render::service_html(&self.url, names))
    }
}

impl<T> fmt::Display for Wtss<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WTSS:\n\tURL: {}", self.url)
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

fn not_found_on_404(err: WtssError, name: &str) -> WtssError {
    match err {
        WtssError::Http { status, .. } if status == StatusCode::NOT_FOUND => {
            WtssError::NotFound(name.to_string())
        }
        other => other,
    }
}

fn server_error(err: ServerErrorResponse, name: &str) -> WtssError {
    if err.is_not_found() {
        return WtssError::NotFound(name.to_string());
    }
    ValidationError::new(
        "",
        format!(
            "server returned an error document: {}",
            err.text().unwrap_or("(no description)")
        ),
    )
    .into()
}

/// Parameters of a `time_series` request.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesQuery {
    coverage: String,
    attributes: Vec<String>,
    latitude: f64,
    longitude: f64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl TimeSeriesQuery {
    pub fn new(coverage: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            coverage: coverage.into(),
            attributes: Vec::new(),
            latitude,
            longitude,
            start: None,
            end: None,
        }
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets the interval from date strings (`YYYY-MM-DD` or RFC 3339).
    pub fn with_date_strings(
        mut self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, WtssError> {
        let parse = |label: &str, s: &str| {
            parse_date(s).ok_or_else(|| {
                WtssError::argument(format!("{} '{}' is not a date (expected YYYY-MM-DD)", label, s))
            })
        };
        if let Some(s) = start {
            self.start = Some(parse("start date", s)?);
        }
        if let Some(s) = end {
            self.end = Some(parse("end date", s)?);
        }
        Ok(self)
    }

    pub(crate) fn with_coverage(mut self, coverage: &str) -> Self {
        self.coverage = coverage.to_string();
        self
    }

    pub fn coverage(&self) -> &str {
        &self.coverage
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
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

    pub(crate) fn check(&self) -> Result<(), WtssError> {
        if self.coverage.trim().is_empty() {
            return Err(WtssError::argument("coverage name must not be empty"));
        }
        if self.attributes.is_empty() {
            return Err(WtssError::argument("at least one attribute is required"));
        }
        if self.attributes.iter().any(|a| a.trim().is_empty()) {
            return Err(WtssError::argument("attribute names must not be empty"));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(WtssError::argument(format!(
                "latitude {} is out of range [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(WtssError::argument(format!(
                "longitude {} is out of range [-180, 180]",
                self.longitude
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(WtssError::argument(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("coverage", self.coverage.clone()),
            ("attributes", self.attributes.join(",")),
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
        ];
        if let Some(start) = self.start {
            params.push(("start_date", format_date(start)));
        }
        if let Some(end) = self.end {
            params.push(("end_date", format_date(end)));
        }
        params
    }
}
