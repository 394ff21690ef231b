//! A small Rust client for the Web Time Series Service (WTSS).
//!
//! WTSS serves satellite image time series: list the coverages a server
//! offers, describe one of them, then retrieve the values of some of its
//! attributes at a point for a date interval. Every response is checked
//! against the expected document shape before a typed value is handed back.
//!
//! ## Quick start
//! - Pass the server URL explicitly, or configure it via environment variables
//!   (`WTSS_URL`, `WTSS_ACCESS_TOKEN`) or a `.wtssrc` file (supported in the
//!   current directory and in your home directory).
//! - Call [`Wtss::time_series`] with a [`TimeSeriesQuery`].
//!
//! ```no_run
//! use wtss::{TimeSeriesQuery, Wtss, WtssError};
//!
//! fn main() -> Result<(), WtssError> {
//!     let service = Wtss::new("https://brazildatacube.dpi.inpe.br/wtss", None)?;
//!     for name in service.list_coverages()? {
//!         println!("{}", name);
//!     }
//!
//!     let query = TimeSeriesQuery::new("MOD13Q1", -12.0, -54.0)
//!         .with_attributes(["red", "nir"])
//!         .with_date_strings(Some("2001-01-01"), Some("2001-12-31"))?;
//!     let ts = service.time_series(&query)?;
//!     println!("{:?}", ts.get_attribute("nir")?);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod coverage;
mod error;
mod render;
pub mod schema;
mod timeseries;
mod transport;
mod util;

pub use client::{TimeSeriesQuery, Wtss};
pub use config::ServiceConfig;
pub use coverage::{
    Coverage, CoverageAttribute, Crs, SpatialExtent, SpatialResolution, ValidRange,
};
pub use error::{ValidationError, WtssError};
pub use timeseries::TimeSeries;
pub use transport::{DEFAULT_TIMEOUT, HttpTransport, Transport};
pub use util::split_attributes;
