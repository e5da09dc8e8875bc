//! CSS extractors, tried in order until one yields data.
//!
//! An extractor is a CSS selector, optionally followed by `::attr(name)` to
//! read an attribute instead of the element text.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::text::clean_text;

/// Elements whose text is never part of an article.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

/// Block elements read as separate paragraphs inside a content container.
const BLOCKS: &str = "p, li, h2, h3, h4, blockquote, pre";

#[derive(Debug, Clone)]
enum Target {
    Text,
    Attr(String),
}

#[derive(Debug, Clone)]
pub struct Extractor {
    selector: Selector,
    target: Target,
}

impl Extractor {
    pub fn parse(spec: &str) -> Result<Self, String> {
        let (css, target) = match spec.split_once("::attr(") {
            Some((css, attr)) => {
                let attr = attr
                    .strip_suffix(')')
                    .ok_or_else(|| format!("Unclosed `::attr(` in `{spec}`"))?;
                (css, Target::Attr(attr.trim().to_string()))
            }
            None => (spec, Target::Text),
        };
        let selector = Selector::parse(css.trim()).map_err(|e| format!("`{spec}`: {e}"))?;
        Ok(Self {
            selector,
            target,
        })
    }

    fn value(&self, elem: ElementRef) -> Option<String> {
        let value = match &self.target {
            Target::Text => visible_text(elem),
            Target::Attr(attr) => clean_text(elem.value().attr(attr)?),
        };
        (!value.is_empty()).then_some(value)
    }

    /// Every non empty value, in document order.
    pub fn all(&self, html: &Html) -> Vec<String> {
        html.select(&self.selector)
            .filter_map(|elem| self.value(elem))
            .collect()
    }

    pub fn first(&self, html: &Html) -> Option<String> {
        html.select(&self.selector).find_map(|elem| self.value(elem))
    }

    /// Paragraphs of the first matching container, separated by blank lines.
    pub fn paragraphs(&self, html: &Html) -> Option<String> {
        // Static selector, always valid
        let blocks = Selector::parse(BLOCKS).ok()?;
        html.select(&self.selector).find_map(|container| {
            // A block nested in another block is already part of its text
            let nested = |block: &ElementRef| {
                block
                    .ancestors()
                    .take_while(|node| node.id() != container.id())
                    .filter_map(ElementRef::wrap)
                    .any(|parent| blocks.matches(&parent))
            };
            let paragraphs: Vec<_> = container
                .select(&blocks)
                .filter(|block| !nested(block))
                .map(visible_text)
                .filter(|p| !p.is_empty())
                .collect();
            let content = if paragraphs.is_empty() {
                visible_text(container)
            } else {
                paragraphs.join("\n\n")
            };
            (!content.is_empty()).then_some(content)
        })
    }
}

/// Compiles `specs`, logging and skipping the invalid ones.
pub fn compile(specs: &[&str]) -> Vec<Extractor> {
    specs
        .iter()
        .filter_map(|spec| match Extractor::parse(spec) {
            Ok(extractor) => Some(extractor),
            Err(e) => {
                log::warn!("Ignoring invalid selector {e}");
                None
            }
        })
        .collect()
}

/// Values of the first extractor that yields any.
pub fn first_all(extractors: &[Extractor], html: &Html) -> Vec<String> {
    extractors
        .iter()
        .map(|ex| ex.all(html))
        .find(|values| !values.is_empty())
        .unwrap_or_default()
}

pub fn first_value(extractors: &[Extractor], html: &Html) -> Option<String> {
    extractors.iter().find_map(|ex| ex.first(html))
}

pub fn first_paragraphs(extractors: &[Extractor], html: &Html) -> Option<String> {
    extractors.iter().find_map(|ex| ex.paragraphs(html))
}

/// Text of `elem` without scripts and styles, whitespace collapsed.
pub fn visible_text(elem: ElementRef) -> String {
    let mut text = String::new();
    for node in elem.descendants() {
        let Node::Text(t) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|parent| HIDDEN.contains(&parent.value().name()));
        if !hidden {
            text.push_str(t);
        }
    }
    clean_text(&text)
}
