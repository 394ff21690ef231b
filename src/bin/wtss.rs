//! Command-line client for the Web Time Series Service.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use wtss::{Coverage, TimeSeriesQuery, Wtss, split_attributes};

#[derive(Parser)]
#[command(
    name = "wtss",
    version,
    about = "Query a Web Time Series Service (WTSS) server"
)]
struct Cli {
    /// WTSS server address (falls back to WTSS_URL or .wtssrc).
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// User personal access token (falls back to WTSS_ACCESS_TOKEN or .wtssrc).
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Print progress and debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available coverages.
    ListCoverages,

    /// Retrieve the coverage metadata.
    Describe {
        /// Coverage name.
        #[arg(short, long)]
        coverage: String,
    },

    /// Retrieve the time series of a location.
    Ts {
        /// Coverage name.
        #[arg(short, long)]
        coverage: String,

        /// Attribute list (items separated by comma); all attributes when omitted.
        #[arg(short, long)]
        attributes: Option<String>,

        /// Latitude in EPSG:4326.
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,

        /// Longitude in EPSG:4326.
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start_date: Option<String>,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end_date: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let spinner = Spinner::new(cli.verbose);

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(writer) = spinner.log_writer() {
        logger.target(env_logger::Target::Pipe(Box::new(writer)));
    }
    logger.init();

    let result = run(cli, &spinner);
    spinner.finish();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, spinner: &Spinner) -> Result<()> {
    let service = Wtss::from_config(cli.url, cli.access_token)
        .context("failed to set up the WTSS client")?;

    if cli.verbose {
        spinner.println(&format!("Server: {}", service.url()));
    }

    match cli.command {
        Command::ListCoverages => {
            spinner.message("Retrieving the list of available coverages...");
            let names = service
                .list_coverages()
                .context("failed to list coverages")?;
            spinner.finish();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({ "coverages": names }))?);
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }

        Command::Describe { coverage } => {
            spinner.message("Retrieving the coverage metadata...");
            let cov = service
                .describe_coverage(&coverage)
                .with_context(|| format!("failed to describe coverage {}", coverage))?;
            spinner.finish();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(cov.as_json())?);
            } else {
                println!("{}", cov);
            }
        }

        Command::Ts {
            coverage,
            attributes,
            latitude,
            longitude,
            start_date,
            end_date,
        } => {
            spinner.message("Retrieving the coverage metadata...");
            let cov = service
                .describe_coverage(&coverage)
                .with_context(|| format!("failed to describe coverage {}", coverage))?;

            let attributes = requested_attributes(attributes.as_deref(), &cov);
            let query = TimeSeriesQuery::new(cov.name(), latitude, longitude)
                .with_attributes(attributes)
                .with_date_strings(start_date.as_deref(), end_date.as_deref())?;

            spinner.message("Retrieving time series...");
            let ts = cov
                .time_series(&service, query)
                .with_context(|| format!("failed to retrieve time series of {}", coverage))?;
            spinner.finish();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&ts.to_json())?);
            } else {
                println!("{}", ts);
            }
        }
    }

    if cli.verbose {
        spinner.println("Finished!");
    }
    Ok(())
}

/// Attributes named on the command line, or every attribute of the coverage.
fn requested_attributes(list: Option<&str>, cov: &Coverage) -> Vec<String> {
    match list {
        Some(list) => split_attributes(list),
        None => cov.attribute_names().into_iter().map(str::to_string).collect(),
    }
}

/// Spinner shown on stderr while a request is in flight (verbose mode only).
struct Spinner(Option<ProgressBar>);

impl Spinner {
    fn new(enabled: bool) -> Self {
        if !enabled {
            return Self(None);
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} {elapsed}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        Self(Some(pb))
    }

    fn message(&self, msg: &'static str) {
        if let Some(pb) = &self.0 {
            pb.set_message(msg);
        }
    }

    /// Prints a line on stderr without tearing the spinner.
    fn println(&self, msg: &str) {
        match &self.0 {
            Some(pb) => pb.suspend(|| eprintln!("{}", msg)),
            None => eprintln!("{}", msg),
        }
    }

    /// Writer for log records that hides the spinner while each record is written.
    fn log_writer(&self) -> Option<SuspendingWriter> {
        self.0.clone().map(SuspendingWriter)
    }

    fn finish(&self) {
        if let Some(pb) = &self.0 {
            pb.finish_and_clear();
        }
    }
}

struct SuspendingWriter(ProgressBar);

impl Write for SuspendingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.suspend(|| io::stderr().flush())
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn coverage() -> Coverage {
        Coverage::from_json(json!({
            "name": "MOD13Q1",
            "attributes": [
                {"name": "red", "datatype": "int16"},
                {"name": "nir", "datatype": "int16"},
                {"name": "ndvi", "datatype": "int16"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn omitted_attributes_default_to_the_whole_coverage() {
        assert_eq!(requested_attributes(None, &coverage()), ["red", "nir", "ndvi"]);
    }

    #[test]
    fn listed_attributes_are_split() {
        assert_eq!(requested_attributes(Some("nir, red"), &coverage()), ["nir", "red"]);
    }

    #[test]
    fn negative_coordinates_parse() {
        let cli = Cli::try_parse_from([
            "wtss", "ts", "-c", "MOD13Q1", "--latitude", "-12", "--longitude", "-54",
        ])
        .unwrap();
        match cli.command {
            Command::Ts { latitude, longitude, attributes, .. } => {
                assert_eq!((latitude, longitude), (-12.0, -54.0));
                assert_eq!(attributes, None);
            }
            _ => panic!("expected the ts command"),
        }
    }

    #[test]
    fn disabled_spinner_has_no_log_writer() {
        let spinner = Spinner::new(false);
        assert!(spinner.log_writer().is_none());
        spinner.println("plain stderr line");
    }
}
