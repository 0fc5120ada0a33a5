//! DOM lookups.

use crate::error::PlatformError;

/// A snapshot of a DOM element returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub text: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            text: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Selector and XPath evaluation against a document or subtree.
///
/// `root` limits the search to the subtree under that element; `None`
/// searches the whole document. Implementations return `Err` only when
/// the expression itself cannot be evaluated; "no match" is `Ok(None)` or
/// an empty list.
pub trait DomQuery: Send + Sync {
    /// `querySelector`: first match in document order.
    fn query_selector(
        &self,
        root: Option<&Element>,
        selector: &str,
    ) -> Result<Option<Element>, PlatformError>;

    /// `querySelectorAll`: every match in document order.
    fn query_selector_all(
        &self,
        root: Option<&Element>,
        selector: &str,
    ) -> Result<Vec<Element>, PlatformError>;

    /// `document.evaluate` with an ordered snapshot result, using `root`
    /// as the context node.
    fn evaluate_xpath(
        &self,
        root: Option<&Element>,
        xpath: &str,
    ) -> Result<Vec<Element>, PlatformError>;
}
