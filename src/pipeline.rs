use crate::classify::classify_link;
use crate::dom::LinkElement;
use crate::extract::{extract, ThumbnailStatus};
use crate::fetch::{AssetTransport, FetchOutcome, ImageFetcher, UreqTransport};
use crate::paths::AppPaths;
use crate::store::MediaStore;
use crate::{Config, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub links_seen: usize,
    pub classified: usize,
    pub records: usize,
    pub insert_attempts: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub store_errors: usize,
    pub thumbnail_timeouts: usize,
    pub dropped: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub fetch_failures: usize,
}

/// Classify -> extract -> store -> fetch over one DOM snapshot.
pub struct Pipeline<T: AssetTransport> {
    media_db_path: PathBuf,
    thumbnail_timeout: Duration,
    fetcher: ImageFetcher<T>,
}

impl Pipeline<UreqTransport> {
    pub fn from_config(config: &Config) -> Self {
        let fetcher = ImageFetcher::new(
            AppPaths::from_config(config),
            config.media_url_template.clone(),
            UreqTransport::new(config.download_timeout),
        );
        Self::new(config.media_db_path.clone(), config.thumbnail_timeout, fetcher)
    }
}

impl<T: AssetTransport> Pipeline<T> {
    pub fn new(media_db_path: PathBuf, thumbnail_timeout: Duration, fetcher: ImageFetcher<T>) -> Self {
        Self {
            media_db_path,
            thumbnail_timeout,
            fetcher,
        }
    }

    /// Process one batch. Per-link problems are logged and counted; only a
    /// store that cannot be opened or closed is returned as an error.
    pub fn process_batch<L: LinkElement>(&self, links: &[L]) -> Result<BatchSummary> {
        let mut summary = BatchSummary {
            links_seen: links.len(),
            ..BatchSummary::default()
        };

        let candidates: Vec<&L> = links.iter().filter(|link| classify_link(*link)).collect();
        summary.classified = candidates.len();
        info!(
            links = summary.links_seen,
            photo_links = summary.classified,
            "filtered links"
        );
        if candidates.is_empty() {
            info!("no photo links in this batch");
            return Ok(summary);
        }

        let store = MediaStore::open(&self.media_db_path)?;
        for link in candidates {
            self.process_link(&store, link, &mut summary);
        }
        store.close()?;

        info!(
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            downloaded = summary.downloaded,
            already_present = summary.already_present,
            fetch_failures = summary.fetch_failures,
            dropped = summary.dropped,
            "batch complete"
        );
        Ok(summary)
    }

    fn process_link<L: LinkElement>(&self, store: &MediaStore, link: &L, summary: &mut BatchSummary) {
        let extraction = extract(link, self.thumbnail_timeout);
        if extraction.thumbnail == ThumbnailStatus::TimedOut {
            summary.thumbnail_timeouts += 1;
        }

        let draft = extraction.draft;
        if !draft.has_media_id() {
            summary.dropped += 1;
            return;
        }
        let Some(record) = draft.clone().into_record() else {
            warn!(?draft, "media id found but post identity is incomplete; dropping");
            summary.dropped += 1;
            return;
        };
        summary.records += 1;

        summary.insert_attempts += 1;
        match store.insert_if_new(&record) {
            Ok(true) => {
                summary.inserted += 1;
                info!(
                    media_id = %record.media_id,
                    user_name = %record.user_name,
                    post_id = %record.post_id,
                    photo_index = %record.photo_index,
                    "recorded new media"
                );
            }
            Ok(false) => {
                summary.duplicates += 1;
                info!(media_id = %record.media_id, "media already recorded, skipping insert");
            }
            Err(err) => {
                summary.store_errors += 1;
                error!(media_id = %record.media_id, error = %err, "failed to record media");
            }
        }

        // The file on disk decides whether a download happens, not the insert result.
        match self.fetcher.fetch(&record.media_id) {
            FetchOutcome::Downloaded { .. } => summary.downloaded += 1,
            FetchOutcome::AlreadyPresent => summary.already_present += 1,
            FetchOutcome::Failed => summary.fetch_failures += 1,
        }
    }
}
