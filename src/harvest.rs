use crate::dom::LinkElement;
use crate::fetch::AssetTransport;
use crate::pipeline::Pipeline;
use crate::Result;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// A live page that can be snapshotted for links and scrolled further.
pub trait TimelineSession {
    type Link<'a>: LinkElement
    where
        Self: 'a;

    fn harvest_links(&self) -> Result<Vec<Self::Link<'_>>>;

    fn scroll(&self, steps: u32, pause: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub scroll_steps: u32,
    pub scroll_pause: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            scroll_steps: 3,
            scroll_pause: Duration::from_millis(500),
        }
    }
}

impl LoopSettings {
    pub fn from_config(config: &crate::Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            scroll_steps: config.scroll_steps,
            scroll_pause: config.scroll_pause,
        }
    }
}

/// Sleep, harvest, process, scroll; repeat until `should_stop` says so.
///
/// A failing batch is logged and the loop moves on. Failing to harvest or to
/// scroll means the session itself is gone, which ends the run. Returns the
/// number of completed cycles.
pub fn run_loop<S, T, F>(
    session: &S,
    pipeline: &Pipeline<T>,
    settings: &LoopSettings,
    mut should_stop: F,
) -> Result<u64>
where
    S: TimelineSession,
    T: AssetTransport,
    F: FnMut() -> bool,
{
    let mut cycles = 0_u64;
    while !should_stop() {
        if !settings.poll_interval.is_zero() {
            thread::sleep(settings.poll_interval);
        }

        let links = session.harvest_links()?;
        match pipeline.process_batch(&links) {
            Ok(summary) => info!(cycle = cycles + 1, ?summary, "cycle processed"),
            Err(err) => error!(cycle = cycles + 1, error = %err, "batch failed"),
        }

        session.scroll(settings.scroll_steps, settings.scroll_pause)?;
        info!("scrolled down the page");
        cycles += 1;
    }
    Ok(cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomError;
    use crate::fetch::{FetchError, ImageFetcher};
    use crate::paths::AppPaths;
    use crate::ArchiverError;
    use std::cell::{Cell, RefCell};
    use std::io::{Cursor, Read};

    struct NullTransport;

    impl AssetTransport for NullTransport {
        fn get(&self, _url: &str) -> std::result::Result<Box<dyn Read>, FetchError> {
            Ok(Box::new(Cursor::new(Vec::new())))
        }
    }

    struct PageLink(String, String);

    impl LinkElement for PageLink {
        fn href(&self) -> std::result::Result<Option<String>, DomError> {
            Ok(Some(self.0.clone()))
        }

        fn thumbnail_src(&self, _timeout: Duration) -> std::result::Result<Option<String>, DomError> {
            Ok(Some(self.1.clone()))
        }
    }

    /// Each scroll reveals one more photo post.
    struct FakeTimeline {
        revealed: Cell<usize>,
        scrolls: RefCell<Vec<u32>>,
        die_after_scrolls: Option<usize>,
    }

    impl FakeTimeline {
        fn new(die_after_scrolls: Option<usize>) -> Self {
            Self {
                revealed: Cell::new(1),
                scrolls: RefCell::new(Vec::new()),
                die_after_scrolls,
            }
        }
    }

    impl TimelineSession for FakeTimeline {
        type Link<'a>
            = PageLink
        where
            Self: 'a;

        fn harvest_links(&self) -> Result<Vec<Self::Link<'_>>> {
            if let Some(limit) = self.die_after_scrolls {
                if self.scrolls.borrow().len() >= limit {
                    return Err(ArchiverError::Browser("tab crashed".to_string()));
                }
            }
            Ok((1..=self.revealed.get())
                .map(|n| {
                    PageLink(
                        format!("https://x.com/user{n}/status/{n}/photo/1"),
                        format!("https://pbs.twimg.com/media/M{n}"),
                    )
                })
                .collect())
        }

        fn scroll(&self, steps: u32, _pause: Duration) -> Result<()> {
            self.scrolls.borrow_mut().push(steps);
            self.revealed.set(self.revealed.get() + 1);
            Ok(())
        }
    }

    fn quick_settings() -> LoopSettings {
        LoopSettings {
            poll_interval: Duration::ZERO,
            scroll_steps: 3,
            scroll_pause: Duration::ZERO,
        }
    }

    fn pipeline(paths: &AppPaths) -> Pipeline<NullTransport> {
        Pipeline::new(
            paths.media_db_path.clone(),
            Duration::from_millis(1),
            ImageFetcher::new(paths.clone(), "https://cdn/{media_id}", NullTransport),
        )
    }

    #[test]
    fn loop_processes_each_snapshot_and_scrolls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::under(dir.path());
        let timeline = FakeTimeline::new(None);

        let mut remaining = 3;
        let cycles = run_loop(&timeline, &pipeline(&paths), &quick_settings(), || {
            if remaining == 0 {
                return true;
            }
            remaining -= 1;
            false
        })
        .expect("loop");

        assert_eq!(cycles, 3);
        assert_eq!(timeline.scrolls.borrow().as_slice(), [3, 3, 3]);
        let store = crate::store::MediaStore::open(&paths.media_db_path).expect("open");
        assert_eq!(store.count().expect("count"), 3);
    }

    #[test]
    fn session_failure_ends_the_loop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::under(dir.path());
        let timeline = FakeTimeline::new(Some(2));

        let err = run_loop(&timeline, &pipeline(&paths), &quick_settings(), || false)
            .expect_err("session death is fatal");
        assert!(matches!(err, ArchiverError::Browser(_)));
        assert_eq!(timeline.scrolls.borrow().len(), 2);
    }

    #[test]
    fn broken_store_does_not_stop_polling() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::under(dir.path());
        // A directory where the database file should be makes every open fail.
        std::fs::create_dir_all(&paths.media_db_path).expect("mkdir");
        let timeline = FakeTimeline::new(None);

        let mut remaining = 2;
        let cycles = run_loop(&timeline, &pipeline(&paths), &quick_settings(), || {
            if remaining == 0 {
                return true;
            }
            remaining -= 1;
            false
        })
        .expect("loop keeps going");
        assert_eq!(cycles, 2);
    }
}
