//! Context bootstrap and dependency wiring.
//!
//! [`BackgroundContext`] owns the router and the install hook.
//! [`ContentContext`] is one page session: boot listener, correlator,
//! state store and DOM helpers sharing a single document.
//!
//! # Usage
//!
//! ```rust,ignore
//! let runtime = BrowserRuntime::new(manifest);
//! let background = BackgroundContext::new(&config, storage, Arc::new(runtime.background()));
//! background.start();
//!
//! let tab = Arc::new(runtime.open_tab(url));
//! if let Some(page) = ContentContext::boot(&config, url, document, tab, local) {
//!     let state = page.load_state().await?;
//! }
//! ```

use std::sync::Arc;

use tracing::info;
use valoisan_platform::dom::DomQuery;
use valoisan_platform::events::PageEvents;
use valoisan_platform::messaging::{BackgroundMessaging, ContentMessaging, TabId};
use valoisan_platform::storage::{ExtensionStorage, LocalStorage};
use valoisan_types::config::RelayConfig;
use valoisan_types::error::Result;
use valoisan_types::manifest::InstallDetails;

use crate::boot::should_inject;
use crate::bridge::{BootListener, PageBridge};
use crate::correlator::Correlator;
use crate::dom::DomWaiter;
use crate::install::InstallHook;
use crate::router::BackgroundRouter;
use crate::state::{SessionState, StateError, StateStore};

/// The background context.
pub struct BackgroundContext {
    router: Arc<BackgroundRouter>,
    install: InstallHook,
}

impl BackgroundContext {
    pub fn new(
        config: &RelayConfig,
        storage: Arc<dyn ExtensionStorage>,
        messaging: Arc<dyn BackgroundMessaging>,
    ) -> Self {
        Self {
            router: Arc::new(BackgroundRouter::from_config(
                storage,
                Arc::clone(&messaging),
                config,
            )),
            install: InstallHook::from_config(messaging, config),
        }
    }

    pub fn router(&self) -> &Arc<BackgroundRouter> {
        &self.router
    }

    /// Start serving content-script requests.
    pub fn start(&self) -> bool {
        self.router.start()
    }

    pub async fn stop(&self) {
        self.router.stop().await;
    }

    pub async fn on_installed(&self, details: &InstallDetails) -> Result<Option<TabId>> {
        self.install.on_installed(details).await
    }
}

/// One page session in the content context.
pub struct ContentContext {
    listener: BootListener,
    correlator: Arc<Correlator>,
    store: StateStore,
    dom: DomWaiter,
}

impl ContentContext {
    /// Wire up a page and start its boot listener.
    ///
    /// Returns `None` without touching the document when the page is not
    /// one the extension runs on.
    pub fn boot<D>(
        config: &RelayConfig,
        page_url: &str,
        document: Arc<D>,
        messaging: Arc<dyn ContentMessaging>,
        local: Arc<dyn LocalStorage>,
    ) -> Option<Self>
    where
        D: PageEvents + DomQuery + 'static,
    {
        if !should_inject(page_url) {
            info!(page_url, "skipping page");
            return None;
        }

        let events: Arc<dyn PageEvents> = document.clone();
        let listener = BootListener::new(Arc::clone(&events), messaging);
        listener.start();

        let correlator = Arc::new(Correlator::from_config(PageBridge::new(events), config));
        let store = StateStore::from_config(Arc::clone(&correlator), local, config);
        let dom = DomWaiter::from_config(document, config);

        info!(page_url, "page booted");
        Some(Self {
            listener,
            correlator,
            store,
            dom,
        })
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    pub fn dom(&self) -> &DomWaiter {
        &self.dom
    }

    pub fn listener(&self) -> &BootListener {
        &self.listener
    }

    pub async fn load_state(&self) -> std::result::Result<SessionState, StateError> {
        self.store.load().await
    }

    /// Stop relaying for this page.
    pub async fn shutdown(&self) {
        self.listener.stop().await;
    }
}
