//! Live Chrome session driven over CDP.

use crate::config::Config;
use crate::cookies::SessionCookie;
use crate::dom::{resolve_against, DomError, LinkElement};
use crate::harvest::TimelineSession;
use crate::{ArchiverError, Result};
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const THUMBNAIL_POLL: Duration = Duration::from_millis(250);
const WINDOW_SIZE: (u32, u32) = (1280, 2000);

fn browser_err(err: impl std::fmt::Display) -> ArchiverError {
    ArchiverError::Browser(format!("{err:#}"))
}

pub struct BrowserSession {
    // Dropping the browser kills the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(config: &Config) -> Result<Self> {
        Self::launch_with(config, config.headless)
    }

    pub fn launch_with(config: &Config, headless: bool) -> Result<Self> {
        let options = LaunchOptions {
            headless,
            sandbox: false,
            path: config.browser_path.clone(),
            window_size: Some(WINDOW_SIZE),
            idle_browser_timeout: IDLE_BROWSER_TIMEOUT,
            args: vec![OsStr::new("--disable-dev-shm-usage")],
            ..Default::default()
        };
        let browser = Browser::new(options).map_err(browser_err)?;
        let tab = browser.new_tab().map_err(browser_err)?;
        info!(headless, "browser session started");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(browser_err)?;
        info!(url = %url, "navigated");
        Ok(())
    }

    pub fn current_url(&self) -> String {
        self.tab.get_url()
    }

    /// Replay saved cookies into the tab. Cookies without a domain are bound to `fallback_url`.
    pub fn apply_cookies(&self, cookies: &[SessionCookie], fallback_url: &str) -> Result<usize> {
        let mut applied = 0_usize;
        for cookie in cookies {
            match self.tab.call_method(set_cookie_request(cookie, fallback_url)) {
                Ok(_) => applied += 1,
                Err(err) => warn!(cookie = %cookie.name, error = %err, "failed to set cookie"),
            }
        }
        info!(applied, total = cookies.len(), "cookies applied");
        Ok(applied)
    }

    pub fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self.tab.get_cookies().map_err(browser_err)?;
        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
                secure: c.secure,
                http_only: c.http_only,
                same_site: c.same_site.as_ref().map(|policy| same_site_name(policy).to_string()),
                expires: (c.expires > 0.0).then_some(c.expires),
            })
            .collect())
    }

    fn is_alive(&self) -> bool {
        self.tab.evaluate("1", false).is_ok()
    }
}

fn set_cookie_request(cookie: &SessionCookie, fallback_url: &str) -> Network::SetCookie {
    let url = match cookie.domain {
        Some(_) => None,
        None => Some(fallback_url.to_string()),
    };
    Network::SetCookie {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        url,
        domain: cookie.domain.clone(),
        path: cookie.path.clone(),
        secure: Some(cookie.secure),
        http_only: Some(cookie.http_only),
        same_site: cookie.same_site.as_deref().and_then(same_site_policy),
        // Session cookies carry no expiry.
        expires: cookie.expires.filter(|at| *at > 0.0),
        priority: None,
        same_party: None,
        source_scheme: None,
        source_port: None,
        partition_key: None,
    }
}

fn same_site_policy(raw: &str) -> Option<Network::CookieSameSite> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "strict" => Some(Network::CookieSameSite::Strict),
        "lax" => Some(Network::CookieSameSite::Lax),
        "none" | "no_restriction" => Some(Network::CookieSameSite::None),
        _ => None,
    }
}

fn same_site_name(policy: &Network::CookieSameSite) -> &'static str {
    match policy {
        Network::CookieSameSite::Strict => "Strict",
        Network::CookieSameSite::Lax => "Lax",
        Network::CookieSameSite::None => "None",
    }
}

impl TimelineSession for BrowserSession {
    type Link<'a>
        = ChromeLink<'a>
    where
        Self: 'a;

    fn harvest_links(&self) -> Result<Vec<Self::Link<'_>>> {
        let base_url = Url::parse(&self.tab.get_url()).map_err(browser_err)?;
        let elements = match self.tab.find_elements("a") {
            Ok(elements) => elements,
            Err(err) if self.is_alive() => {
                debug!(error = %err, "no anchors in current snapshot");
                Vec::new()
            }
            Err(err) => return Err(browser_err(err)),
        };
        debug!(count = elements.len(), "harvested anchors");
        Ok(elements
            .into_iter()
            .map(|element| ChromeLink {
                element,
                base_url: base_url.clone(),
            })
            .collect())
    }

    fn scroll(&self, steps: u32, pause: Duration) -> Result<()> {
        for _ in 0..steps {
            self.tab.press_key("PageDown").map_err(browser_err)?;
            thread::sleep(pause);
        }
        Ok(())
    }
}

pub struct ChromeLink<'a> {
    element: Element<'a>,
    base_url: Url,
}

impl LinkElement for ChromeLink<'_> {
    fn href(&self) -> std::result::Result<Option<String>, DomError> {
        let raw = self
            .element
            .get_attribute_value("href")
            .map_err(|e| DomError::Access(format!("{e:#}")))?;
        Ok(raw.and_then(|raw| resolve_against(&self.base_url, &raw)))
    }

    fn thumbnail_src(&self, timeout: Duration) -> std::result::Result<Option<String>, DomError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.element.find_element("img") {
                Ok(img) => {
                    let raw = img
                        .get_attribute_value("src")
                        .map_err(|e| DomError::Access(format!("{e:#}")))?;
                    return Ok(raw.and_then(|raw| resolve_against(&self.base_url, &raw)));
                }
                Err(_) if Instant::now() < deadline => thread::sleep(THUMBNAIL_POLL),
                Err(_) => return Err(DomError::Timeout(timeout)),
            }
        }
    }
}
