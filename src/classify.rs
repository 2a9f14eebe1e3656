use crate::dom::LinkElement;

const MIN_PARTS: usize = 8;
const STATUS_PART: usize = 4;
const PHOTO_PART: usize = 6;

/// True for `scheme://host/<user>/status/<post>/photo/<index>` shaped links.
///
/// Only the slash-separated parts are inspected; scheme and host are not validated.
pub fn classify(href: &str) -> bool {
    let parts: Vec<&str> = href.split('/').collect();
    parts.len() >= MIN_PARTS && parts[STATUS_PART] == "status" && parts[PHOTO_PART] == "photo"
}

/// Classify a DOM link. Missing or unreadable `href`s are excluded, never errors.
pub fn classify_link<L: LinkElement>(link: &L) -> bool {
    match link.href() {
        Ok(Some(href)) => classify(&href),
        Ok(None) => false,
        Err(err) => {
            tracing::debug!(error = %err, "skipping link with unreadable href");
            false
        }
    }
}
