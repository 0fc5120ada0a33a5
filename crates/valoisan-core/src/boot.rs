//! Which mail pages get the extension injected.
//!
//! Pop-out windows and other secondary views carry a `view` query
//! parameter. Only the main view (no `view`) and full-screen compose
//! (`view=cm`) host the relay.

use tracing::{debug, warn};
use url::Url;

/// `view` values that still get the extension.
pub const INJECTED_VIEWS: &[&str] = &["cm"];

/// Whether the content script should inject into the page at `page_url`.
///
/// Unparseable URLs are never injected.
pub fn should_inject(page_url: &str) -> bool {
    let url = match Url::parse(page_url) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, page_url, "not injecting into unparseable page url");
            return false;
        }
    };

    let view = url
        .query_pairs()
        .find(|(key, _)| key == "view")
        .map(|(_, value)| value.into_owned());
    let inject = match view.as_deref() {
        None | Some("") => true,
        Some(view) => INJECTED_VIEWS.contains(&view),
    };
    debug!(page_url, view = view.as_deref().unwrap_or(""), inject, "boot gating");
    inject
}
