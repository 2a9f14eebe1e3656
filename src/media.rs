use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One photo attachment as persisted in the store. `media_id` is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub user_name: String,
    pub post_id: String,
    pub photo_index: String,
    pub media_id: String,
    pub download_time: Option<NaiveDateTime>,
}

/// A record still being assembled from a link; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaDraft {
    pub user_name: Option<String>,
    pub post_id: Option<String>,
    pub photo_index: Option<String>,
    pub media_id: Option<String>,
    pub download_time: Option<NaiveDateTime>,
}

impl MediaDraft {
    pub fn has_media_id(&self) -> bool {
        self.media_id.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Promote to a storable record. Needs the media id and all three identity fields.
    pub fn into_record(self) -> Option<MediaRecord> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }

        Some(MediaRecord {
            user_name: present(self.user_name)?,
            post_id: present(self.post_id)?,
            photo_index: present(self.photo_index)?,
            media_id: present(self.media_id)?,
            download_time: self.download_time,
        })
    }
}

/// Media ids become file names. A single path segment is taken as-is; only
/// values that could leave the images directory are refused.
pub fn is_valid_media_id(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0'])
}
