//! Candidate resolution: which URIs to try for a resource, and under which names
//!
//! Java Web Start servers publish versioned archives in two ways, either
//! through a `version-id` query on the plain href or as a file whose name
//! embeds the version (`app__V1.2.jar`). A plan lists the plain href first,
//! then both versioned forms when the descriptor names a version.

use std::fmt;

use crate::app::descriptor::ResourceReference;
use crate::constants::descriptor;

/// How an attempt's URI was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Primary,
    VersionQuery,
    VersionedName,
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptKind::Primary => write!(f, "primary"),
            AttemptKind::VersionQuery => write!(f, "version query"),
            AttemptKind::VersionedName => write!(f, "versioned name"),
        }
    }
}

/// One (remote URI, local file name) candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub kind: AttemptKind,
    /// URI relative to the codebase
    pub remote: String,
    /// File name to write on success
    pub local_name: String,
}

/// Ordered candidates for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptPlan {
    pub resource: ResourceReference,
    pub attempts: Vec<Attempt>,
}

impl AttemptPlan {
    /// `(remote, local_name)` pairs in priority order
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.attempts
            .iter()
            .map(|attempt| (attempt.remote.as_str(), attempt.local_name.as_str()))
            .collect()
    }
}

/// Computes the attempt plan for a resource
pub fn resolve(resource: &ResourceReference) -> AttemptPlan {
    let local_name = flatten_separators(&resource.file_name);
    let mut attempts = vec![Attempt {
        kind: AttemptKind::Primary,
        remote: resource.href.clone(),
        local_name: local_name.clone(),
    }];

    if let Some(version) = &resource.version {
        attempts.push(Attempt {
            kind: AttemptKind::VersionQuery,
            remote: format!("{}{}{}", resource.href, descriptor::VERSION_QUERY, version),
            local_name: local_name.clone(),
        });

        let versioned_name = format!(
            "{}{}{}{}",
            jar_stem(&resource.file_name),
            descriptor::VERSION_MARKER,
            version,
            descriptor::JAR_EXTENSION
        );
        attempts.push(Attempt {
            kind: AttemptKind::VersionedName,
            local_name: flatten_separators(&versioned_name),
            remote: format!("{}{}", resource.path, versioned_name),
        });
    }

    AttemptPlan {
        resource: resource.clone(),
        attempts,
    }
}

/// Resolves every resource, keeping input order
pub fn resolve_all(resources: &[ResourceReference]) -> Vec<AttemptPlan> {
    resources.iter().map(resolve).collect()
}

/// Everything before the first `.jar`, wherever it occurs in the name
fn jar_stem(file_name: &str) -> &str {
    file_name
        .split(descriptor::JAR_EXTENSION)
        .next()
        .unwrap_or(file_name)
}

/// Keeps a version string from steering the write outside the destination
fn flatten_separators(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
