use crate::config::Config;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

const ASSET_EXTENSION: &str = "png";
const PARTIAL_SUFFIX: &str = "part";
const COOKIE_TOOL_LOG: &str = "save_cookies.log";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub media_db_path: PathBuf,
    pub images_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl AppPaths {
    pub fn new(media_db_path: PathBuf, images_dir: PathBuf, logs_dir: PathBuf) -> Self {
        Self {
            media_db_path,
            images_dir,
            logs_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.media_db_path.clone(),
            config.images_dir.clone(),
            config.logs_dir.clone(),
        )
    }

    /// All files under one base directory; handy for tests and scratch runs.
    pub fn under(base_dir: &Path) -> Self {
        Self::new(
            base_dir.join("databases").join("media_data.db"),
            base_dir.join("images_png"),
            base_dir.join("logs"),
        )
    }

    pub fn db_dir(&self) -> Option<&Path> {
        self.media_db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn asset_path(&self, media_id: &str) -> PathBuf {
        self.images_dir
            .join(format!("{media_id}.{ASSET_EXTENSION}"))
    }

    pub fn partial_asset_path(&self, media_id: &str) -> PathBuf {
        self.images_dir
            .join(format!("{media_id}.{ASSET_EXTENSION}.{PARTIAL_SUFFIX}"))
    }

    pub fn run_log_path(&self, started_at: DateTime<Local>) -> PathBuf {
        self.logs_dir
            .join(format!("{}.log", started_at.format("%Y-%m-%d_%H-%M-%S")))
    }

    pub fn cookie_tool_log_path(&self) -> PathBuf {
        self.logs_dir.join(COOKIE_TOOL_LOG)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if let Some(db_dir) = self.db_dir() {
            std::fs::create_dir_all(db_dir)?;
        }
        std::fs::create_dir_all(&self.images_dir)?;
        std::fs::create_dir_all(&self.logs_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn asset_paths_are_named_by_media_id() {
        let paths = AppPaths::under(Path::new("/data"));
        assert_eq!(
            paths.asset_path("ABC123"),
            PathBuf::from("/data/images_png/ABC123.png")
        );
        assert_eq!(
            paths.partial_asset_path("ABC123"),
            PathBuf::from("/data/images_png/ABC123.png.part")
        );
    }

    #[test]
    fn run_log_is_named_by_start_time() {
        let paths = AppPaths::under(Path::new("/data"));
        let started = Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .expect("unambiguous local time");
        assert_eq!(
            paths.run_log_path(started),
            PathBuf::from("/data/logs/2024-03-09_07-05-01.log")
        );
    }

    #[test]
    fn bare_db_file_name_has_no_directory_to_create() {
        let paths = AppPaths::new(
            PathBuf::from("media.db"),
            PathBuf::from("images"),
            PathBuf::from("logs"),
        );
        assert!(paths.db_dir().is_none());
    }
}
