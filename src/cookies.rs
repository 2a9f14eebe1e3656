use crate::{ArchiverError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// `Strict`, `Lax` or `None`, as browsers export it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    /// Seconds since the epoch; session cookies have none.
    #[serde(default, alias = "expiry", skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            same_site: None,
            expires: None,
        }
    }
}

/// Read a cookie file.
///
/// Accepts a JSON array of cookie objects, an object holding a `cookies`
/// array, or a flat `name -> value` map. Later duplicates win.
pub fn load_cookies(path: &Path) -> Result<Vec<SessionCookie>> {
    let cookie_error = |reason: String| ArchiverError::CookieFile {
        path: path.to_path_buf(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| cookie_error(e.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| cookie_error(e.to_string()))?;

    let mut collected = Vec::new();
    collect_from_value(&value, &mut collected);
    if collected.is_empty() {
        return Err(cookie_error("no cookies found".to_string()));
    }

    let mut seen = HashSet::new();
    let mut out: Vec<SessionCookie> = Vec::new();
    for cookie in collected.into_iter().rev() {
        if seen.insert((cookie.name.clone(), cookie.domain.clone())) {
            out.push(cookie);
        }
    }
    out.reverse();
    Ok(out)
}

pub fn save_cookies(path: &Path, cookies: &[SessionCookie]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(cookies)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

fn usable_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && !name.contains(';') && !name.contains('=')
}

fn collect_from_value(value: &serde_json::Value, out: &mut Vec<SessionCookie>) {
    match value {
        serde_json::Value::Array(values) => {
            for item in values {
                collect_from_value(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            if let (Some(name), Some(cookie_value)) = (map.get("name"), map.get("value")) {
                if let (Some(name), Some(cookie_value)) = (name.as_str(), cookie_value.as_str()) {
                    if !usable_name(name) {
                        return;
                    }
                    let cookie = serde_json::from_value::<SessionCookie>(value.clone())
                        .unwrap_or_else(|_| SessionCookie::new(name, cookie_value));
                    out.push(cookie);
                }
                return;
            }

            if let Some(cookies) = map.get("cookies") {
                collect_from_value(cookies, out);
                return;
            }

            for (key, value) in map {
                if let Some(value) = value.as_str() {
                    if usable_name(key) {
                        out.push(SessionCookie::new(key.trim(), value.trim()));
                    }
                }
            }
        }
        _ => {}
    }
}
