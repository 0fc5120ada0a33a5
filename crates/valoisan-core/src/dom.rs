//! Bounded polling for elements the mail UI renders late.
//!
//! Every helper probes once immediately, then every poll interval until
//! the target shows up or the timeout has elapsed. Timeouts and query
//! errors are logged and surface as absence, never as errors. Lookups
//! cover the whole document unless the waiter is scoped with
//! [`DomWaiter::within`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use valoisan_platform::PlatformError;
use valoisan_platform::dom::{DomQuery, Element};
use valoisan_types::config::RelayConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DomWaiter {
    dom: Arc<dyn DomQuery>,
    root: Option<Element>,
    poll_interval: Duration,
    default_timeout: Duration,
}

impl DomWaiter {
    pub fn new(dom: Arc<dyn DomQuery>) -> Self {
        Self {
            dom,
            root: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn from_config(dom: Arc<dyn DomQuery>, config: &RelayConfig) -> Self {
        Self {
            dom,
            root: None,
            poll_interval: config.poll_interval(),
            default_timeout: config.wait_timeout(),
        }
    }

    /// Builder: override the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// A waiter with the same timings that only searches under `root`.
    pub fn within(&self, root: Element) -> DomWaiter {
        DomWaiter {
            dom: Arc::clone(&self.dom),
            root: Some(root),
            poll_interval: self.poll_interval,
            default_timeout: self.default_timeout,
        }
    }

    /// Single XPath lookup returning the first match.
    pub fn find_element(&self, xpath: &str) -> Option<Element> {
        match self.dom.evaluate_xpath(self.root.as_ref(), xpath) {
            Ok(found) => found.into_iter().next(),
            Err(e) => {
                warn!(error = %e, xpath, "element lookup failed");
                None
            }
        }
    }

    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Option<Element> {
        self.poll(selector, timeout, || {
            self.dom.query_selector(self.root.as_ref(), selector)
        })
        .await
    }

    /// Wait until `selector` matches at least one element and return all
    /// matches at that moment.
    pub async fn wait_for_selector_all(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Option<Vec<Element>> {
        self.poll(selector, timeout, || {
            self.dom
                .query_selector_all(self.root.as_ref(), selector)
                .map(|found| (!found.is_empty()).then_some(found))
        })
        .await
    }

    pub async fn wait_for_element(&self, xpath: &str, timeout: Option<Duration>) -> Option<Element> {
        self.poll(xpath, timeout, || {
            self.dom
                .evaluate_xpath(self.root.as_ref(), xpath)
                .map(|found| found.into_iter().next())
        })
        .await
    }

    /// Wait until `xpath` matches at least one element. Empty on timeout.
    pub async fn wait_for_elements(&self, xpath: &str, timeout: Option<Duration>) -> Vec<Element> {
        self.poll(xpath, timeout, || {
            self.dom
                .evaluate_xpath(self.root.as_ref(), xpath)
                .map(|found| (!found.is_empty()).then_some(found))
        })
        .await
        .unwrap_or_default()
    }

    async fn poll<T, F>(&self, query: &str, timeout: Option<Duration>, probe: F) -> Option<T>
    where
        F: Fn() -> Result<Option<T>, PlatformError>,
    {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();
        loop {
            match probe() {
                Ok(Some(found)) => {
                    debug!(query, elapsed_ms = start.elapsed().as_millis() as u64, "element found");
                    return Some(found);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, query, "element query failed");
                    return None;
                }
            }
            if start.elapsed() >= timeout {
                warn!(query, timeout_ms = timeout.as_millis() as u64, "timed out waiting for element");
                return None;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
