use crate::dom::{DomError, LinkElement};
use crate::media::{is_valid_media_id, MediaDraft};
use chrono::Local;
use std::time::Duration;
use tracing::{debug, error, warn};

const HREF_MIN_PARTS: usize = 8;
const USER_PART: usize = 3;
const POST_PART: usize = 5;
const PHOTO_INDEX_PART: usize = 7;
const SRC_MEDIA_PART: usize = 4;

/// How the thumbnail lookup for one link ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStatus {
    Found,
    /// Image present but without a usable `src`/media id.
    Unusable,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub draft: MediaDraft,
    pub thumbnail: ThumbnailStatus,
}

/// Pull the media identity out of a classified link and its nested thumbnail.
///
/// Each step fails on its own: a broken `href` still lets the thumbnail be read
/// and vice versa. The timestamp is always stamped.
pub fn extract<L: LinkElement>(link: &L, thumbnail_timeout: Duration) -> Extraction {
    let mut draft = MediaDraft::default();

    match link.href() {
        Ok(Some(href)) => {
            let parts = split_path(&href);
            if parts.len() >= HREF_MIN_PARTS {
                draft.user_name = Some(parts[USER_PART].to_string());
                draft.post_id = Some(parts[POST_PART].to_string());
                draft.photo_index = Some(parts[PHOTO_INDEX_PART].to_string());
            }
        }
        Ok(None) => {}
        Err(err) => error!(error = %err, "failed to read link href"),
    }

    let thumbnail = match link.thumbnail_src(thumbnail_timeout) {
        Ok(Some(src)) => match media_id_from_src(&src) {
            Some(media_id) if is_valid_media_id(&media_id) => {
                draft.media_id = Some(media_id);
                ThumbnailStatus::Found
            }
            Some(media_id) => {
                warn!(media_id = %media_id, "rejecting media id that is not a plain file name");
                ThumbnailStatus::Unusable
            }
            None => {
                debug!(src = %src, "thumbnail src carries no media id");
                ThumbnailStatus::Unusable
            }
        },
        Ok(None) => ThumbnailStatus::Unusable,
        Err(DomError::Timeout(waited)) => {
            warn!(
                user_name = draft.user_name.as_deref().unwrap_or("?"),
                post_id = draft.post_id.as_deref().unwrap_or("?"),
                waited_ms = waited.as_millis() as u64,
                "thumbnail did not render in time"
            );
            ThumbnailStatus::TimedOut
        }
        Err(err) => {
            error!(error = %err, "failed to read thumbnail");
            ThumbnailStatus::Failed
        }
    };

    draft.download_time = Some(Local::now().naive_local());
    debug!(?draft, "processed link");

    Extraction { draft, thumbnail }
}

/// `https://pbs.twimg.com/media/<id>?format=jpg` -> `<id>`
pub fn media_id_from_src(src: &str) -> Option<String> {
    split_path(src)
        .get(SRC_MEDIA_PART)
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
}

fn split_path(raw: &str) -> Vec<&str> {
    let without_query = raw.split('?').next().unwrap_or("");
    let without_fragment = without_query.split('#').next().unwrap_or("");
    without_fragment.split('/').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLink {
        href: Result<Option<&'static str>, &'static str>,
        src: Result<Option<&'static str>, Option<&'static str>>,
    }

    impl LinkElement for FakeLink {
        fn href(&self) -> Result<Option<String>, DomError> {
            self.href
                .map(|v| v.map(str::to_string))
                .map_err(|e| DomError::Access(e.to_string()))
        }

        fn thumbnail_src(&self, timeout: Duration) -> Result<Option<String>, DomError> {
            match self.src {
                Ok(v) => Ok(v.map(str::to_string)),
                Err(None) => Err(DomError::Timeout(timeout)),
                Err(Some(msg)) => Err(DomError::Access(msg.to_string())),
            }
        }
    }

    const WAIT: Duration = Duration::from_millis(10);

    #[test]
    fn extracts_full_identity() {
        let link = FakeLink {
            href: Ok(Some("https://site/alice/status/123/photo/1")),
            src: Ok(Some("https://cdn/media/ABC123?format=png")),
        };
        let out = extract(&link, WAIT);
        assert_eq!(out.thumbnail, ThumbnailStatus::Found);
        let record = out.draft.into_record().expect("complete record");
        assert_eq!(record.user_name, "alice");
        assert_eq!(record.post_id, "123");
        assert_eq!(record.photo_index, "1");
        assert_eq!(record.media_id, "ABC123");
        assert!(record.download_time.is_some());
    }

    #[test]
    fn query_and_fragment_are_stripped_before_splitting() {
        let link = FakeLink {
            href: Ok(Some("https://x.com/bob/status/987/photo/2?s=20#top")),
            src: Ok(Some("https://pbs.twimg.com/media/Fq9_zX-1#frag")),
        };
        let draft = extract(&link, WAIT).draft;
        assert_eq!(draft.photo_index.as_deref(), Some("2"));
        assert_eq!(draft.media_id.as_deref(), Some("Fq9_zX-1"));
    }

    #[test]
    fn media_id_keeps_file_extension() {
        let link = FakeLink {
            href: Ok(Some("https://x.com/alice/status/123/photo/1")),
            src: Ok(Some("https://pbs.twimg.com/media/Fabc123.jpg")),
        };
        let out = extract(&link, WAIT);
        assert_eq!(out.thumbnail, ThumbnailStatus::Found);
        assert_eq!(out.draft.media_id.as_deref(), Some("Fabc123.jpg"));
        let record = out.draft.into_record().expect("complete record");
        assert_eq!(record.media_id, "Fabc123.jpg");
    }

    #[test]
    fn short_href_leaves_identity_unset_but_keeps_media_id() {
        let link = FakeLink {
            href: Ok(Some("https://x.com/bob/status/987")),
            src: Ok(Some("https://cdn/media/XYZ")),
        };
        let draft = extract(&link, WAIT).draft;
        assert!(draft.user_name.is_none());
        assert_eq!(draft.media_id.as_deref(), Some("XYZ"));
        assert!(draft.download_time.is_some());
        assert!(draft.into_record().is_none());
    }

    #[test]
    fn timeout_yields_no_media_id_but_a_timestamp() {
        let link = FakeLink {
            href: Ok(Some("https://site/alice/status/123/photo/1")),
            src: Err(None),
        };
        let out = extract(&link, WAIT);
        assert_eq!(out.thumbnail, ThumbnailStatus::TimedOut);
        assert_eq!(out.draft.user_name.as_deref(), Some("alice"));
        assert!(!out.draft.has_media_id());
        assert!(out.draft.download_time.is_some());
    }

    #[test]
    fn broken_href_does_not_stop_thumbnail_read() {
        let link = FakeLink {
            href: Err("stale element"),
            src: Ok(Some("https://cdn/media/ABC123")),
        };
        let out = extract(&link, WAIT);
        assert_eq!(out.draft.media_id.as_deref(), Some("ABC123"));
        assert!(out.draft.user_name.is_none());
    }

    #[test]
    fn unusable_src_values() {
        for src in ["https://cdn/media", "https://cdn/media/", "https://cdn/media/../x"] {
            let link = FakeLink {
                href: Ok(Some("https://site/alice/status/123/photo/1")),
                src: Ok(Some(src)),
            };
            let out = extract(&link, WAIT);
            assert_eq!(out.thumbnail, ThumbnailStatus::Unusable, "src={src}");
            assert!(!out.draft.has_media_id(), "src={src}");
        }

        let failing = FakeLink {
            href: Ok(Some("https://site/alice/status/123/photo/1")),
            src: Err(Some("target closed")),
        };
        assert_eq!(extract(&failing, WAIT).thumbnail, ThumbnailStatus::Failed);
    }

    #[test]
    fn media_id_from_src_uses_fifth_part() {
        assert_eq!(
            media_id_from_src("https://cdn/media/ABC123?format=png").as_deref(),
            Some("ABC123")
        );
        assert!(media_id_from_src("https://cdn/media").is_none());
    }
}
