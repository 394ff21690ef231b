use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wtss::{ServiceConfig, TimeSeriesQuery, Wtss, WtssError};

/// Serves a single canned response; the handle yields the raw request head.
fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }
        stream.write_all(response.as_bytes()).unwrap();
        String::from_utf8_lossy(&head).into_owned()
    });

    (format!("http://{addr}/wtss"), handle)
}

fn client(url: String, token: Option<&str>) -> Wtss {
    let cfg = ServiceConfig {
        url,
        access_token: token.map(str::to_string),
        verify: true,
    };
    Wtss::with_config(&cfg)
        .unwrap()
        .with_timeout(Duration::from_secs(5))
}

#[test]
fn list_coverages_sends_token_header() {
    let (url, server) = serve_once("200 OK", r#"{"coverages": ["MOD13Q1", "MOD13Q1_M"]}"#);
    let wtss = client(url, Some("secret-token"));

    assert_eq!(wtss.list_coverages().unwrap(), ["MOD13Q1", "MOD13Q1_M"]);
    // Served from cache; the stub server would not answer a second request.
    assert_eq!(wtss.list_coverages().unwrap().len(), 2);

    let request = server.join().unwrap().to_lowercase();
    assert!(request.starts_with("get /wtss/list_coverages http/1.1\r\n"), "{request}");
    assert!(request.contains("x-api-key: secret-token\r\n"), "{request}");
    assert!(request.contains("user-agent: wtss-rs/"), "{request}");
}

#[test]
fn time_series_query_string() {
    let body = r#"{"timeline": ["2001-01-01", "2001-01-17"],
                   "result": {"red": [236.0, 289.0], "nir": [3463.0, 3656.0]}}"#;
    let (url, server) = serve_once("200 OK", body);
    let wtss = client(url, None);

    let query = TimeSeriesQuery::new("MOD13Q1", -12.0, -54.0)
        .with_attributes(["red", "nir"])
        .with_date_strings(Some("2001-01-01"), Some("2001-12-31"))
        .unwrap();
    let ts = wtss.time_series(&query).unwrap();
    assert_eq!(ts.get_attribute("red").unwrap(), [236.0, 289.0]);
    assert_eq!(ts.get_attribute("nir").unwrap(), [3463.0, 3656.0]);

    let request = server.join().unwrap();
    let request_line = request.lines().next().unwrap();
    assert_eq!(
        request_line,
        "GET /wtss/time_series?coverage=MOD13Q1&attributes=red%2Cnir&latitude=-12&longitude=-54&start_date=2001-01-01&end_date=2001-12-31 HTTP/1.1"
    );
    assert!(!request.to_lowercase().contains("x-api-key"));
}

#[test]
fn describe_404_is_not_found() {
    let (url, server) = serve_once(
        "404 Not Found",
        r#"{"code": 404, "description": "Coverage nonexistent not found"}"#,
    );
    let wtss = client(url, None);

    let err = wtss.describe_coverage("nonexistent").unwrap_err();
    assert!(matches!(&err, WtssError::NotFound(n) if n == "nonexistent"), "{err:?}");

    let request = server.join().unwrap();
    assert!(request.starts_with("GET /wtss/describe_coverage?name=nonexistent HTTP/1.1"));
}

#[test]
fn server_error_is_an_http_error() {
    let (url, server) = serve_once("500 Internal Server Error", r#"{"description": "database offline"}"#);
    let wtss = client(url, None);

    let err = wtss.list_coverages().unwrap_err();
    assert!(err.is_transport());
    match err {
        WtssError::Http { status, message, .. } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "database offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn non_json_body_is_a_validation_failure() {
    let (url, server) = serve_once("200 OK", "<html>maintenance</html>");
    let wtss = client(url, None);

    let err = wtss.list_coverages().unwrap_err();
    assert!(matches!(err, WtssError::InvalidJson { .. }));
    assert!(err.is_validation());
    server.join().unwrap();
}

#[test]
fn unreachable_server_is_a_connection_error() {
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let wtss = client(format!("http://{addr}/wtss"), None);

    let err = wtss.list_coverages().unwrap_err();
    assert!(matches!(err, WtssError::Connection { .. }), "{err:?}");
    assert!(err.is_transport());
}
