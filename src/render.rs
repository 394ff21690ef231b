//! Rich (HTML) representations, for notebooks and report pages.

use std::fmt::Write;

use crate::coverage::Coverage;
use crate::timeseries::TimeSeries;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = write!(out, "<tr><th>{}</th><td>{}</td></tr>", label, escape(value));
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn service_html(url: &str, coverages: &[String]) -> String {
    let mut out = String::from("<div class=\"wtss\"><h3>WTSS</h3>");
    let _ = write!(out, "<p>URL: {}</p><p>Coverages:</p><ul>", escape(url));
    for c in coverages {
        let _ = write!(out, "<li>{}</li>", escape(c));
    }
    out.push_str("</ul></div>");
    out
}

pub(crate) fn coverage_html(cov: &Coverage) -> String {
    let mut out = String::from("<div class=\"wtss-coverage\">");
    let _ = write!(out, "<h3>Coverage {}</h3><table>", escape(cov.name()));
    row(&mut out, "Description", cov.description());
    if let Some(detail) = cov.detail() {
        row(&mut out, "Detail", detail);
    }
    if let Some(e) = cov.spatial_extent() {
        row(
            &mut out,
            "Spatial extent",
            &format!("xmin={}, ymin={}, xmax={}, ymax={}", e.xmin, e.ymin, e.xmax, e.ymax),
        );
    }
    if let Some(r) = cov.spatial_resolution() {
        row(&mut out, "Spatial resolution", &format!("x={}, y={}", r.x, r.y));
    }
    if let Some(proj4) = &cov.crs().proj4 {
        row(&mut out, "CRS", proj4);
    }
    if let Some((first, last)) = cov.temporal_extent() {
        row(
            &mut out,
            "Timeline",
            &format!("{} .. {} ({} dates)", first, last, cov.timeline().len()),
        );
    }
    out.push_str("</table>");

    out.push_str(
        "<table><thead><tr><th>Attribute</th><th>Description</th><th>Data type</th>\
         <th>Valid range</th><th>Scale</th><th>Missing value</th><th>Common name</th></tr></thead><tbody>",
    );
    for a in cov {
        let range = a
            .valid_range
            .map(|r| format!("[{}, {}]", r.min, r.max))
            .unwrap_or_default();
        let cells = [
            a.name.clone(),
            opt(a.description.as_deref()),
            a.datatype.clone(),
            range,
            opt(a.scale_factor),
            opt(a.missing_value),
            opt(a.common_name.as_deref()),
        ];
        out.push_str("<tr>");
        for cell in &cells {
            let _ = write!(out, "<td>{}</td>", escape(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></div>");
    out
}

pub(crate) fn timeseries_html(ts: &TimeSeries) -> String {
    let mut out = String::from("<div class=\"wtss-timeseries\">");
    let _ = write!(
        out,
        "<h3>Time series of {}</h3><p>latitude: {}, longitude: {}</p>",
        escape(ts.coverage()),
        ts.latitude(),
        ts.longitude()
    );

    out.push_str("<table><thead><tr><th>Date</th>");
    for name in ts.attributes() {
        let _ = write!(out, "<th>{}</th>", escape(name));
    }
    out.push_str("</tr></thead><tbody>");
    for (i, date) in ts.timeline().iter().enumerate() {
        let _ = write!(out, "<tr><td>{}</td>", date);
        for (_, values) in ts.iter() {
            let _ = write!(out, "<td>{}</td>", values[i]);
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TimeSeriesQuery;
    use crate::coverage::tests::mod13q1;
    use serde_json::json;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn coverage_table_lists_attributes() {
        let cov = Coverage::from_json(mod13q1()).unwrap();
        let html = cov.to_html();
        assert!(html.starts_with("<div class=\"wtss-coverage\"><h3>Coverage MOD13Q1</h3>"));
        assert!(html.contains("<td>red</td>"));
        assert!(html.contains("<td>[0, 10000]</td>"));
        assert!(html.ends_with("</tbody></table></div>"));
    }

    #[test]
    fn timeseries_table_has_one_row_per_date() {
        let ts = crate::TimeSeries::from_json(
            json!({
                "timeline": ["2001-01-01", "2001-01-17"],
                "result": {"red": [236.0, 289.0], "nir": [3463.0, 3656.0]}
            }),
            &TimeSeriesQuery::new("MOD13Q1", -12.0, -54.0).with_attributes(["red", "nir"]),
        )
        .unwrap();
        let html = ts.to_html();
        assert!(html.contains("<th>Date</th><th>red</th><th>nir</th>"));
        assert!(html.contains("<tr><td>2001-01-17</td><td>289</td><td>3656</td></tr>"));
        assert_eq!(html.matches("<tr><td>").count(), 2);
    }
}
