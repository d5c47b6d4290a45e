//! Resource extraction from a parsed descriptor
//!
//! Reads the codebase off the root and collects every `jar` and `nativelib`
//! element wherever it sits in the tree. Entries whose href cannot be split
//! into a path and a file name are set aside rather than failing the run.

use std::fmt;

use super::{Document, Element};
use crate::constants::descriptor;
use crate::errors::{DescriptorError, DescriptorResult};

/// Which element a resource came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Jar,
    NativeLib,
}

impl ResourceKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ResourceKind::Jar => descriptor::JAR_TAG,
            ResourceKind::NativeLib => descriptor::NATIVELIB_TAG,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One archive referenced by the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    pub kind: ResourceKind,
    /// Relative URI exactly as written in the descriptor
    pub href: String,
    /// Everything up to and including the first `/`
    pub path: String,
    /// Segment immediately after the first `/`
    pub file_name: String,
    pub version: Option<String>,
}

impl ResourceReference {
    /// Builds a reference from an href, or says why the href is unusable
    pub fn from_href(
        kind: ResourceKind,
        href: &str,
        version: Option<String>,
    ) -> Result<Self, RejectionReason> {
        let (head, rest) = href
            .split_once('/')
            .ok_or(RejectionReason::NoPathSeparator)?;
        let file_name = rest.split('/').next().unwrap_or_default();
        if file_name.is_empty() {
            return Err(RejectionReason::EmptyFileName);
        }

        Ok(Self {
            kind,
            href: href.to_string(),
            path: format!("{}/", head),
            file_name: file_name.to_string(),
            version,
        })
    }
}

/// Why a descriptor entry was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    MissingHref,
    NoPathSeparator,
    EmptyFileName,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::MissingHref => write!(f, "no href attribute"),
            RejectionReason::NoPathSeparator => write!(f, "href has no '/' separator"),
            RejectionReason::EmptyFileName => write!(f, "href has an empty file name"),
        }
    }
}

/// Descriptor entry that could not become a [`ResourceReference`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub kind: ResourceKind,
    pub href: Option<String>,
    pub reason: RejectionReason,
}

/// Everything the fetch stage needs from a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Codebase with a trailing `/` appended
    pub base_url: String,
    pub resources: Vec<ResourceReference>,
    pub rejected: Vec<RejectedEntry>,
}

/// Extracts the base URL and resource references from a descriptor
///
/// All `jar` elements come first, in document order, followed by all
/// `nativelib` elements in document order.
///
/// # Errors
///
/// Returns `DescriptorError` if the root has no codebase or an empty one.
pub fn extract(document: &Document) -> DescriptorResult<Extraction> {
    let root = &document.root;
    let codebase = root
        .attr(descriptor::CODEBASE_ATTR)
        .ok_or_else(|| DescriptorError::MissingCodebase {
            root: root.name.clone(),
        })?;
    if codebase.trim().is_empty() {
        return Err(DescriptorError::EmptyCodebase {
            root: root.name.clone(),
        });
    }

    let mut extraction = Extraction {
        base_url: format!("{}/", codebase),
        resources: Vec::new(),
        rejected: Vec::new(),
    };

    for kind in [ResourceKind::Jar, ResourceKind::NativeLib] {
        for element in root.descendants_named(kind.tag()) {
            match reference_from(kind, element) {
                Ok(resource) => extraction.resources.push(resource),
                Err(rejected) => extraction.rejected.push(rejected),
            }
        }
    }

    Ok(extraction)
}

fn reference_from(kind: ResourceKind, element: &Element) -> Result<ResourceReference, RejectedEntry> {
    let href = element.attr(descriptor::HREF_ATTR).ok_or(RejectedEntry {
        kind,
        href: None,
        reason: RejectionReason::MissingHref,
    })?;
    let version = element.attr(descriptor::VERSION_ATTR).map(str::to_string);

    ResourceReference::from_href(kind, href, version).map_err(|reason| RejectedEntry {
        kind,
        href: Some(href.to_string()),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::descriptor::{DescriptorParser, ParserMode};

    fn parse(xml: &str) -> Document {
        DescriptorParser::new(ParserMode::Tolerant)
            .parse(xml.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_codebase_gets_trailing_slash() {
        let doc = parse(r#"<jnlp codebase="https://example.com/java"><jar href="x/y.jar"/></jnlp>"#);
        let extraction = extract(&doc).unwrap();
        assert_eq!(extraction.base_url, "https://example.com/java/");
        assert_eq!(extraction.resources.len(), 1);
        assert_eq!(extraction.resources[0].path, "x/");
        assert_eq!(extraction.resources[0].file_name, "y.jar");
        assert_eq!(extraction.resources[0].version, None);
    }

    #[test]
    fn test_missing_codebase_fails() {
        let doc = parse(r#"<jnlp><jar href="x/y.jar"/></jnlp>"#);
        assert!(matches!(
            extract(&doc),
            Err(DescriptorError::MissingCodebase { .. })
        ));
    }

    #[test]
    fn test_empty_codebase_fails() {
        let doc = parse(r#"<jnlp codebase=""><jar href="x/y.jar"/></jnlp>"#);
        assert!(matches!(
            extract(&doc),
            Err(DescriptorError::EmptyCodebase { .. })
        ));
    }

    #[test]
    fn test_codebase_only_read_from_root() {
        let doc = parse(r#"<jnlp><resources codebase="https://h/c"><jar href="x/y.jar"/></resources></jnlp>"#);
        assert!(extract(&doc).is_err());
    }

    #[test]
    fn test_jars_before_nativelibs_each_in_document_order() {
        let doc = parse(
            r#"<jnlp codebase="https://h/c">
  <resources os="Windows"><nativelib href="n/win.jar"/><jar href="a/first.jar"/></resources>
  <resources>
    <jar href="a/second.jar" version="2.0"/>
    <extension><jar href="a/third.jar"/></extension>
  </resources>
  <resources os="Linux"><nativelib href="n/linux.jar"/></resources>
</jnlp>"#,
        );
        let extraction = extract(&doc).unwrap();
        let files: Vec<_> = extraction
            .resources
            .iter()
            .map(|r| (r.kind, r.file_name.as_str()))
            .collect();
        assert_eq!(
            files,
            vec![
                (ResourceKind::Jar, "first.jar"),
                (ResourceKind::Jar, "second.jar"),
                (ResourceKind::Jar, "third.jar"),
                (ResourceKind::NativeLib, "win.jar"),
                (ResourceKind::NativeLib, "linux.jar"),
            ]
        );
        assert_eq!(extraction.resources[1].version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_split_uses_first_separator() {
        let reference =
            ResourceReference::from_href(ResourceKind::Jar, "lib/sub/app.jar", None).unwrap();
        assert_eq!(reference.path, "lib/");
        assert_eq!(reference.file_name, "sub");
        assert_eq!(reference.href, "lib/sub/app.jar");
    }

    #[test]
    fn test_unusable_hrefs_are_rejected_individually() {
        let doc = parse(
            r#"<jnlp codebase="https://h/c">
  <jar href="app.jar"/>
  <jar/>
  <jar href="lib/"/>
  <jar href="lib/ok.jar"/>
</jnlp>"#,
        );
        let extraction = extract(&doc).unwrap();
        assert_eq!(extraction.resources.len(), 1);
        assert_eq!(extraction.resources[0].file_name, "ok.jar");

        let reasons: Vec<_> = extraction.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                RejectionReason::NoPathSeparator,
                RejectionReason::MissingHref,
                RejectionReason::EmptyFileName,
            ]
        );
        assert_eq!(extraction.rejected[0].href.as_deref(), Some("app.jar"));
        assert_eq!(extraction.rejected[1].href, None);
    }
}
