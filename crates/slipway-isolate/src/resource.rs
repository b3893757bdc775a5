//! Scope-tagged resource locations.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::scope::ResolutionScope;

/// A resource location together with the scope it belongs to.
///
/// The textual form is `[scope:]path`. A prefix is treated as a tag only
/// when it names a known scope; anything else reads as part of the path.
/// Untagged resources count as compile-scoped and are therefore visible to
/// every requested scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    scope: ResolutionScope,
    path: Utf8PathBuf,
}

impl ResourceSpec {
    /// Builds a spec from explicit parts.
    pub fn new(scope: ResolutionScope, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            scope,
            path: path.into(),
        }
    }

    /// Scope this resource is tagged with.
    #[must_use]
    pub const fn scope(&self) -> ResolutionScope {
        self.scope
    }

    /// Location of the resource.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl fmt::Display for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.path)
    }
}

/// Failure parsing a `[scope:]path` resource directive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceSpecError {
    /// The directive was empty.
    #[error("resource directive is empty")]
    Empty,
    /// The directive carried a scope tag but no path.
    #[error("resource directive `{directive}` has no path")]
    MissingPath {
        /// Offending directive.
        directive: String,
    },
}

impl FromStr for ResourceSpec {
    type Err = ResourceSpecError;

    fn from_str(directive: &str) -> Result<Self, Self::Err> {
        let trimmed = directive.trim();
        if trimmed.is_empty() {
            return Err(ResourceSpecError::Empty);
        }
        if let Some((prefix, rest)) = trimmed.split_once(':') {
            if let Ok(scope) = prefix.trim().parse::<ResolutionScope>() {
                let path = rest.trim();
                if path.is_empty() {
                    return Err(ResourceSpecError::MissingPath {
                        directive: trimmed.to_owned(),
                    });
                }
                return Ok(Self::new(scope, path));
            }
        }
        Ok(Self::new(ResolutionScope::Compile, trimmed))
    }
}
