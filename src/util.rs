use chrono::{DateTime, NaiveDate};

/// Date format used on the wire for `start_date`, `end_date` and timelines.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

/// Parses `YYYY-MM-DD`, or an RFC 3339 timestamp truncated to its date.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

pub(crate) fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Parses a whole timeline; returns the index of the first bad entry on failure.
pub(crate) fn parse_timeline<'a, I>(entries: I) -> Result<Vec<NaiveDate>, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    entries
        .into_iter()
        .enumerate()
        .map(|(i, s)| parse_date(s).ok_or(i))
        .collect()
}

/// Splits a comma-separated attribute list, dropping blanks.
pub fn split_attributes(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urljoin_handles_slashes() {
        assert_eq!(urljoin("http://h/wtss/", "/list_coverages"), "http://h/wtss/list_coverages");
        assert_eq!(urljoin("http://h/wtss", "time_series"), "http://h/wtss/time_series");
        assert_eq!(urljoin("http://h", "https://other/x"), "https://other/x");
    }

    #[test]
    fn dates_accept_plain_and_rfc3339() {
        let d = NaiveDate::from_ymd_opt(2001, 1, 17).unwrap();
        assert_eq!(parse_date("2001-01-17"), Some(d));
        assert_eq!(parse_date("2001-01-17T00:00:00Z"), Some(d));
        assert_eq!(parse_date("17/01/2001"), None);
        assert_eq!(format_date(d), "2001-01-17");
    }

    #[test]
    fn timeline_reports_first_bad_index() {
        assert_eq!(parse_timeline(["2001-01-01", "bogus", "x"]), Err(1));
        assert_eq!(parse_timeline(["2001-01-01"]).unwrap().len(), 1);
    }

    #[test]
    fn attributes_are_split_and_trimmed() {
        assert_eq!(split_attributes("red, nir,,"), vec!["red", "nir"]);
        assert!(split_attributes(" , ").is_empty());
    }
}
