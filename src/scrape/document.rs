//! Thin query layer over a parsed HTML tree.
//!
//! Everything here is infallible: markup that does not have the expected
//! shape simply produces fewer matches.

use scraper::{ElementRef, Html};

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
    }

    /// Anchors whose `href` contains `needle` as a plain substring.
    pub fn anchors_with_href_containing<'a>(
        &'a self,
        needle: &'a str,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.elements().filter(move |el| {
            el.value().name() == "a"
                && attr(*el, "href").map_or(false, |href| href.contains(needle))
        })
    }

    pub fn headings(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.elements()
            .filter(|el| HEADING_TAGS.contains(&el.value().name()))
    }
}

pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Nearest ancestor (the element itself included) whose tag is one of `tags`.
pub fn closest<'a>(element: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|el| tags.contains(&el.value().name()))
}

pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// First following sibling element with the given tag.
pub fn next_sibling_named<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag)
}

pub fn descendants_named<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}
