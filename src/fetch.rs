use crate::media::is_valid_media_id;
use crate::paths::AppPaths;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";
const DOWNLOAD_CHUNK_BYTES: usize = 8 * 1024;
const MEDIA_ID_PLACEHOLDER: &str = "{media_id}";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can stream a response body for a URL.
pub trait AssetTransport {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, FetchError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let mut config = ureq::Agent::config_builder();
        config = config
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .user_agent(DEFAULT_USER_AGENT);
        let agent: ureq::Agent = config.build().into();
        Self { agent }
    }
}

impl AssetTransport for UreqTransport {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, FetchError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }
        Ok(Box::new(response.into_body().into_reader()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Downloaded { bytes: u64 },
    Failed,
}

/// Downloads full-resolution assets into `{images_dir}/{media_id}.png`.
///
/// The file on disk is the only completion marker, so fetching is idempotent.
pub struct ImageFetcher<T: AssetTransport> {
    paths: AppPaths,
    url_template: String,
    transport: T,
}

impl<T: AssetTransport> ImageFetcher<T> {
    pub fn new(paths: AppPaths, url_template: impl Into<String>, transport: T) -> Self {
        Self {
            paths,
            url_template: url_template.into(),
            transport,
        }
    }

    pub fn asset_url(&self, media_id: &str) -> String {
        self.url_template.replace(MEDIA_ID_PLACEHOLDER, media_id)
    }

    /// Never fails outward; problems are logged and reported as `Failed`.
    pub fn fetch(&self, media_id: &str) -> FetchOutcome {
        if !is_valid_media_id(media_id) {
            error!(media_id = %media_id, "refusing to fetch invalid media id");
            return FetchOutcome::Failed;
        }

        let dest = self.paths.asset_path(media_id);
        if dest.exists() {
            info!(media_id = %media_id, path = %dest.display(), "image already present, skipping download");
            return FetchOutcome::AlreadyPresent;
        }

        let url = self.asset_url(media_id);
        info!(media_id = %media_id, "downloading image");
        match self.download(&url, media_id, &dest) {
            Ok(bytes) => {
                info!(media_id = %media_id, bytes, path = %dest.display(), "image downloaded");
                FetchOutcome::Downloaded { bytes }
            }
            Err(err) => {
                error!(media_id = %media_id, error = %err, "failed to download image");
                FetchOutcome::Failed
            }
        }
    }

    fn download(&self, url: &str, media_id: &str, dest: &Path) -> Result<u64, FetchError> {
        std::fs::create_dir_all(&self.paths.images_dir)?;
        let mut body = self.transport.get(url)?;

        let partial = self.paths.partial_asset_path(media_id);
        match stream_to_file(&mut body, &partial) {
            Ok(bytes) => {
                std::fs::rename(&partial, dest)?;
                Ok(bytes)
            }
            Err(err) => {
                let _ = std::fs::remove_file(&partial);
                Err(err.into())
            }
        }
    }
}

fn stream_to_file(body: &mut dyn Read, path: &Path) -> std::io::Result<u64> {
    let mut file = std::fs::File::create(path)?;
    let mut buf = vec![0_u8; DOWNLOAD_CHUNK_BYTES];
    let mut total = 0_u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        file.write_all(&buf[..n])?;
        total += n as u64;
    }
    file.flush()?;
    file.sync_all()?;
    Ok(total)
}
