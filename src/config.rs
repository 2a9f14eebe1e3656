use crate::{ArchiverError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TARGET_URL: &str = "https://x.com/home";
const DEFAULT_LIKES_URL: &str = "https://x.com/i/likes";
const DEFAULT_COOKIES_FILE: &str = "cookies.json";
const DEFAULT_MEDIA_DB_PATH: &str = "databases/media_data.db";
const DEFAULT_IMAGES_DIR: &str = "images_png";
const DEFAULT_LOGS_DIR: &str = "logs";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_SCROLL_STEPS: u32 = 3;
const DEFAULT_SCROLL_PAUSE_MS: u64 = 500;
const DEFAULT_THUMBNAIL_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_MEDIA_URL_TEMPLATE: &str =
    "https://pbs.twimg.com/media/{media_id}?format=png&name=4096x4096";

/// Settings resolved once at startup and handed to every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Page opened first so replayed cookies land on the right domain.
    pub target_url: String,
    /// The likes timeline that gets scrolled.
    pub likes_url: String,
    pub cookies_file: PathBuf,
    pub media_db_path: PathBuf,
    pub images_dir: PathBuf,
    pub logs_dir: PathBuf,
    /// Chrome/Chromium binary; `None` lets the driver auto-detect one.
    pub browser_path: Option<PathBuf>,
    pub headless: bool,
    pub poll_interval: Duration,
    pub scroll_steps: u32,
    pub scroll_pause: Duration,
    pub thumbnail_timeout: Duration,
    pub download_timeout: Duration,
    pub media_url_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            likes_url: DEFAULT_LIKES_URL.to_string(),
            cookies_file: PathBuf::from(DEFAULT_COOKIES_FILE),
            media_db_path: PathBuf::from(DEFAULT_MEDIA_DB_PATH),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            logs_dir: PathBuf::from(DEFAULT_LOGS_DIR),
            browser_path: None,
            headless: true,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            scroll_steps: DEFAULT_SCROLL_STEPS,
            scroll_pause: Duration::from_millis(DEFAULT_SCROLL_PAUSE_MS),
            thumbnail_timeout: Duration::from_secs(DEFAULT_THUMBNAIL_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            media_url_template: DEFAULT_MEDIA_URL_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Config::default();
        Ok(Self {
            target_url: get("TARGET_URL").unwrap_or(defaults.target_url),
            likes_url: get("LIKES_URL").unwrap_or(defaults.likes_url),
            cookies_file: get("COOKIES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.cookies_file),
            media_db_path: get("MEDIA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_db_path),
            images_dir: get("IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.images_dir),
            logs_dir: get("LOGS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.logs_dir),
            browser_path: get("CHROME_PATH").map(PathBuf::from),
            headless: parse_bool("HEADLESS", get("HEADLESS"))?.unwrap_or(defaults.headless),
            poll_interval: parse_num::<u64>("POLL_INTERVAL_SECS", get("POLL_INTERVAL_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            scroll_steps: parse_num("SCROLL_STEPS", get("SCROLL_STEPS"))?
                .unwrap_or(defaults.scroll_steps),
            scroll_pause: parse_num::<u64>("SCROLL_PAUSE_MS", get("SCROLL_PAUSE_MS"))?
                .map(Duration::from_millis)
                .unwrap_or(defaults.scroll_pause),
            thumbnail_timeout: parse_num::<u64>(
                "THUMBNAIL_TIMEOUT_SECS",
                get("THUMBNAIL_TIMEOUT_SECS"),
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.thumbnail_timeout),
            download_timeout: parse_num::<u64>(
                "DOWNLOAD_TIMEOUT_SECS",
                get("DOWNLOAD_TIMEOUT_SECS"),
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.download_timeout),
            media_url_template: get("MEDIA_URL_TEMPLATE").unwrap_or(defaults.media_url_template),
        })
    }
}

fn parse_num<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ArchiverError::InvalidConfig {
                key: key.to_string(),
                value,
            }),
    }
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<Option<bool>> {
    let Some(value) = raw else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ArchiverError::InvalidConfig {
            key: key.to_string(),
            value,
        }),
    }
}
