// src/dom.rs

//! Document adapter used by the record builder.
//!
//! The selector cascade only talks to [`DocumentAdapter`], so it runs the
//! same against a live page snapshot or a fixture tree.

use scraper::{ElementRef, Html, Selector};

/// Read-only view of a rendered document.
///
/// Queries never fail: a selector that does not parse matches nothing.
pub trait DocumentAdapter {
    /// Handle to one element of the document.
    type Node<'a>: Copy
    where
        Self: 'a;

    /// The document element.
    fn root(&self) -> Self::Node<'_>;

    /// All descendants of `scope` matching `selector`, in document order.
    fn query_all<'a>(&'a self, scope: Self::Node<'a>, selector: &str) -> Vec<Self::Node<'a>>;

    /// First descendant of `scope` matching `selector`.
    fn query<'a>(&'a self, scope: Self::Node<'a>, selector: &str) -> Option<Self::Node<'a>> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Direct element children of `node`.
    fn children<'a>(&'a self, node: Self::Node<'a>) -> Vec<Self::Node<'a>>;

    /// `node` itself or its nearest ancestor matching `selector`.
    fn closest<'a>(&'a self, node: Self::Node<'a>, selector: &str) -> Option<Self::Node<'a>>;

    /// Concatenated text content of `node`, untrimmed.
    fn text<'a>(&'a self, node: Self::Node<'a>) -> String;

    /// Value of attribute `name` on `node`.
    fn attr<'a>(&'a self, node: Self::Node<'a>, name: &str) -> Option<String>;
}

/// HTML document parsed with `scraper`.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parse a full HTML document.
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    fn selector(selector: &str) -> Option<Selector> {
        match Selector::parse(selector) {
            Ok(sel) => Some(sel),
            Err(e) => {
                log::debug!("Ignoring unparsable selector '{}': {:?}", selector, e);
                None
            }
        }
    }
}

impl DocumentAdapter for HtmlDocument {
    type Node<'a> = ElementRef<'a>;

    fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    fn query_all<'a>(&'a self, scope: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
        let Some(sel) = Self::selector(selector) else {
            return Vec::new();
        };
        scope
            .select(&sel)
            .filter(|el| el.id() != scope.id())
            .collect()
    }

    fn children<'a>(&'a self, node: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        node.children().filter_map(ElementRef::wrap).collect()
    }

    fn closest<'a>(&'a self, node: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
        let sel = Self::selector(selector)?;
        std::iter::once(node)
            .chain(node.ancestors().filter_map(ElementRef::wrap))
            .find(|el| sel.matches(el))
    }

    fn text<'a>(&'a self, node: ElementRef<'a>) -> String {
        node.text().collect()
    }

    fn attr<'a>(&'a self, node: ElementRef<'a>, name: &str) -> Option<String> {
        node.value().attr(name).map(str::to_string)
    }
}
