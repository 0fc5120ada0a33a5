//! In-memory document: custom-event target plus DOM lookups.
//!
//! Elements are registered against the exact selector or XPath string
//! that should find them, which is enough to drive the relay's polling
//! helpers without a real DOM. Subtrees are keyed by the root element's
//! `id`; a root without one has nothing under it.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::trace;

use crate::dom::{DomQuery, Element};
use crate::error::PlatformError;
use crate::events::{CustomEvent, EventSubscription, PageEvents};

/// Per-event-type buffer. A listener that falls this far behind loses events.
const EVENT_CAPACITY: usize = 256;

/// A single page document.
#[derive(Default)]
pub struct MemoryDocument {
    listeners: Mutex<HashMap<String, broadcast::Sender<CustomEvent>>>,
    elements: Mutex<HashMap<(Option<String>, String), Vec<Element>>>,
    invalid: Mutex<HashSet<String>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `element` the next document-wide match for `query`.
    pub fn insert(&self, query: &str, element: Element) {
        self.push(None, query, element);
    }

    /// Make `element` the next match for `query` under `root`.
    ///
    /// The element is also a document-wide match, as it would be in a
    /// real tree.
    pub fn insert_within(&self, root: &Element, query: &str, element: Element) {
        if let Some(id) = &root.id {
            self.push(Some(id.clone()), query, element.clone());
        }
        self.push(None, query, element);
    }

    fn push(&self, scope: Option<String>, query: &str, element: Element) {
        self.elements
            .lock()
            .expect("MemoryDocument mutex poisoned")
            .entry((scope, query.to_owned()))
            .or_default()
            .push(element);
    }

    /// Remove every match for `query`, document-wide and in every subtree.
    pub fn remove(&self, query: &str) {
        self.elements
            .lock()
            .expect("MemoryDocument mutex poisoned")
            .retain(|(_, q), _| q != query);
    }

    /// Make evaluation of `query` fail, as a malformed expression would.
    pub fn mark_invalid(&self, query: &str) {
        self.invalid
            .lock()
            .expect("MemoryDocument mutex poisoned")
            .insert(query.to_owned());
    }

    fn lookup(&self, root: Option<&Element>, query: &str) -> Result<Vec<Element>, PlatformError> {
        if self
            .invalid
            .lock()
            .expect("MemoryDocument mutex poisoned")
            .contains(query)
        {
            return Err(PlatformError::InvalidQuery {
                query: query.to_owned(),
                reason: "the string did not match the expected pattern".into(),
            });
        }
        let scope = match root {
            None => None,
            Some(root) => match &root.id {
                Some(id) => Some(id.clone()),
                None => return Ok(Vec::new()),
            },
        };
        Ok(self
            .elements
            .lock()
            .expect("MemoryDocument mutex poisoned")
            .get(&(scope, query.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}

impl PageEvents for MemoryDocument {
    fn dispatch_event(&self, event: CustomEvent) -> usize {
        let listeners = self.listeners.lock().expect("MemoryDocument mutex poisoned");
        let delivered = listeners
            .get(&event.event_type)
            .and_then(|tx| tx.send(event.clone()).ok())
            .unwrap_or(0);
        trace!(event_type = %event.event_type, delivered, "event dispatched");
        delivered
    }

    fn add_listener(&self, event_type: &str) -> EventSubscription {
        let mut listeners = self.listeners.lock().expect("MemoryDocument mutex poisoned");
        let tx = listeners
            .entry(event_type.to_owned())
            .or_insert_with(|| broadcast::channel(EVENT_CAPACITY).0);
        EventSubscription::new(event_type, tx.subscribe())
    }

    fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .lock()
            .expect("MemoryDocument mutex poisoned")
            .get(event_type)
            .map_or(0, |tx| tx.receiver_count())
    }
}

impl DomQuery for MemoryDocument {
    fn query_selector(
        &self,
        root: Option<&Element>,
        selector: &str,
    ) -> Result<Option<Element>, PlatformError> {
        Ok(self.lookup(root, selector)?.into_iter().next())
    }

    fn query_selector_all(
        &self,
        root: Option<&Element>,
        selector: &str,
    ) -> Result<Vec<Element>, PlatformError> {
        self.lookup(root, selector)
    }

    fn evaluate_xpath(
        &self,
        root: Option<&Element>,
        xpath: &str,
    ) -> Result<Vec<Element>, PlatformError> {
        self.lookup(root, xpath)
    }
}
