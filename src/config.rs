use std::path::{Path, PathBuf};

use crate::error::WtssError;

/// Resolved connection settings for a WTSS server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base WTSS URL, e.g. `https://brazildatacube.dpi.inpe.br/wtss`.
    pub url: String,
    /// Personal access token, sent as the `x-api-key` header.
    pub access_token: Option<String>,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RcConfig {
    url: Option<String>,
    access_token: Option<String>,
    verify: Option<bool>,
}

/// Resolves the configuration using (in order of precedence):
/// - explicit arguments
/// - environment variables `WTSS_URL` / `WTSS_ACCESS_TOKEN` / `REQUEST_SSL_VERIFY`
/// - config file from `WTSS_RC` or `.wtssrc`
///
/// The process environment and the rc search path are passed to
/// `resolve_config` as arguments, so its tests never touch the real env.
pub(crate) fn load_config(
    url: Option<String>,
    access_token: Option<String>,
    verify: Option<bool>,
) -> Result<ServiceConfig, WtssError> {
    resolve_config(
        url,
        access_token,
        verify,
        |name| std::env::var(name).ok(),
        &rc_candidates(),
    )
}

/// Same as `load_config`, with the env lookup and rc candidates injected.
fn resolve_config<E>(
    url: Option<String>,
    access_token: Option<String>,
    verify: Option<bool>,
    env: E,
    rc_candidates: &[PathBuf],
) -> Result<ServiceConfig, WtssError>
where
    E: Fn(&str) -> Option<String>,
{
    let mut url = url.or_else(|| env("WTSS_URL"));
    let mut access_token = access_token.or_else(|| env("WTSS_ACCESS_TOKEN"));
    let env_verify = env("REQUEST_SSL_VERIFY").map(|v| parse_bool(&v));
    let mut file_verify: Option<bool> = None;

    if url.is_none() || access_token.is_none() || (verify.is_none() && env_verify.is_none()) {
        if let Some(rc_path) = rc_candidates.iter().find(|p| p.exists()) {
            let cfg = read_rc(rc_path)?;
            if url.is_none() {
                url = cfg.url;
            }
            if access_token.is_none() {
                access_token = cfg.access_token;
            }
            file_verify = cfg.verify;
        }
    }

    let url = match url {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => {
            let hint = if rc_candidates.is_empty() {
                "create .wtssrc".to_string()
            } else {
                format!(
                    "put `url:` in one of: {}",
                    rc_candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            return Err(WtssError::Config(format!(
                "Missing configuration: url (pass --url, set WTSS_URL or {})",
                hint
            )));
        }
    };

    let access_token = access_token.filter(|t| !t.trim().is_empty());
    let verify = verify.or(env_verify).or(file_verify).unwrap_or(true);

    Ok(ServiceConfig {
        url,
        access_token,
        verify,
    })
}

fn read_rc(path: &Path) -> Result<RcConfig, WtssError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        WtssError::Config(format!(
            "failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // URLs contain ':' themselves, so only split on the first one.
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        let v = strip_quotes(v.trim());
        if v.is_empty() {
            continue;
        }
        match k.trim() {
            "url" => cfg.url = Some(v.to_string()),
            "access_token" | "token" => cfg.access_token = Some(v.to_string()),
            "verify" => cfg.verify = Some(parse_bool(v)),
            _ => {}
        }
    }

    cfg
}

fn parse_bool(v: &str) -> bool {
    !matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off" | "n" | "f"
    )
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) WTSS_RC (explicit)
    // 2) ./.wtssrc
    // 3) ~/.wtssrc
    if let Ok(p) = std::env::var("WTSS_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".wtssrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".wtssrc"));
    }
    v
}
