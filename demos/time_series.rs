use wtss::{TimeSeriesQuery, Wtss, WtssError};

fn main() -> Result<(), WtssError> {
    // Example program that calls the library API.
    // Configure the server via WTSS_URL (and WTSS_ACCESS_TOKEN) or a `.wtssrc` file.
    env_logger::init();
    let service = Wtss::from_env()?;

    let coverage = service.coverage("MOD13Q1")?;
    println!("{}", coverage);

    let query = TimeSeriesQuery::new("MOD13Q1", -12.0, -54.0)
        .with_attributes(["red", "nir"])
        .with_date_strings(Some("2001-01-01"), Some("2001-12-31"))?;
    let ts = coverage.time_series(&service, query)?;

    for (date, (red, nir)) in ts
        .timeline()
        .iter()
        .zip(ts.get_attribute("red")?.iter().zip(ts.get_attribute("nir")?))
    {
        println!("{}  red={:>8}  nir={:>8}", date, red, nir);
    }
    Ok(())
}
