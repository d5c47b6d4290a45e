//! JNLP descriptor model, parsing and resource extraction
//!
//! The descriptor is turned into a small owned element tree so that the
//! tolerant and strict parsing backends feed the same extractor.
//!
//! - `charset`: declared or marked input encoding to UTF-8 text
//! - `parser`: bytes to [`Document`] in either [`ParserMode`]
//! - `extract`: [`Document`] to base URL plus [`ResourceReference`]s

mod charset;
pub mod extract;
pub mod parser;

pub use extract::{extract, Extraction, RejectedEntry, RejectionReason, ResourceKind, ResourceReference};
pub use parser::{DescriptorParser, ParserMode};

/// One element of the descriptor tree
///
/// Names are local names (namespace prefixes dropped). Text content is not
/// retained since nothing downstream reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of the first attribute with this name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every descendant (not including self) with this name, in document order
    pub fn descendants_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(element) = stack.pop() {
                stack.extend(element.children.iter().rev());
                if element.name == name {
                    return Some(element);
                }
            }
            None
        })
    }
}

/// Parsed descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, children: Vec<Element>) -> Element {
        Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children,
        }
    }

    #[test]
    fn test_descendants_in_document_order() {
        let mut first = element("jar", vec![]);
        first.attributes.push(("href".into(), "a/1.jar".into()));
        let mut nested = element("jar", vec![]);
        nested.attributes.push(("href".into(), "a/2.jar".into()));
        let mut last = element("jar", vec![]);
        last.attributes.push(("href".into(), "a/3.jar".into()));

        let root = element(
            "jnlp",
            vec![
                element("resources", vec![first, element("group", vec![nested])]),
                element("resources", vec![last]),
            ],
        );

        let hrefs: Vec<_> = root
            .descendants_named("jar")
            .filter_map(|jar| jar.attr("href"))
            .collect();
        assert_eq!(hrefs, vec!["a/1.jar", "a/2.jar", "a/3.jar"]);
    }

    #[test]
    fn test_attr_returns_first_match() {
        let mut el = Element::new("jar");
        el.attributes.push(("href".into(), "x/one.jar".into()));
        el.attributes.push(("href".into(), "x/two.jar".into()));
        assert_eq!(el.attr("href"), Some("x/one.jar"));
        assert_eq!(el.attr("version"), None);
    }
}
