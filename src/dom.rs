//! The narrow slice of DOM access the extraction pipeline needs.
//!
//! Anything that can read an anchor's `href` and find the thumbnail `img`
//! nested inside it can feed the pipeline: the live browser tab, a parsed
//! HTML snapshot, or a stub in tests.

use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum DomError {
    /// The nested element did not show up before the deadline.
    #[error("element did not appear within {0:?}")]
    Timeout(Duration),

    /// The element was detached, the session hiccuped, or an attribute read failed.
    #[error("dom access failed: {0}")]
    Access(String),
}

pub trait LinkElement {
    /// The link target resolved to an absolute URL, or `None` when the anchor has no `href`.
    fn href(&self) -> Result<Option<String>, DomError>;

    /// The `src` of the first descendant `img`, waiting up to `timeout` for it to render.
    ///
    /// `Ok(None)` means the image exists but carries no `src`.
    fn thumbnail_src(&self, timeout: Duration) -> Result<Option<String>, DomError>;
}

impl<T: LinkElement + ?Sized> LinkElement for &T {
    fn href(&self) -> Result<Option<String>, DomError> {
        (**self).href()
    }

    fn thumbnail_src(&self, timeout: Duration) -> Result<Option<String>, DomError> {
        (**self).thumbnail_src(timeout)
    }
}

/// Resolve an attribute value against the page URL the way a browser's `.href` property does.
pub(crate) fn resolve_against(base_url: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") {
        return None;
    }
    base_url.join(raw).ok().map(|joined| joined.to_string())
}
