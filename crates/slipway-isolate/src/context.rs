//! Isolation contexts: the sealed resource set a provider resolves against.

use camino::Utf8PathBuf;

use crate::error::IsolateError;
use crate::resource::ResourceSpec;
use crate::scope::ResolutionScope;

/// Builder collecting the raw material of an isolation context.
#[derive(Debug, Clone, Default)]
pub struct ContextProfile {
    scope: ResolutionScope,
    resources: Vec<ResourceSpec>,
}

impl ContextProfile {
    /// Starts an empty profile for the requested scope.
    #[must_use]
    pub const fn new(scope: ResolutionScope) -> Self {
        Self {
            scope,
            resources: Vec::new(),
        }
    }

    /// Appends a resource. Order is significant: earlier resources win
    /// both deduplication and resolution.
    #[must_use]
    pub fn with_resource(mut self, resource: ResourceSpec) -> Self {
        self.resources.push(resource);
        self
    }

    /// Appends every resource from an iterator, preserving order.
    #[must_use]
    pub fn with_resources(mut self, resources: impl IntoIterator<Item = ResourceSpec>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Seals the profile: resources invisible to the requested scope are
    /// dropped and the survivors are deduplicated by their path value as
    /// given, keeping first-seen order.
    #[must_use]
    pub fn seal(self) -> IsolationContext {
        let mut roots: Vec<Utf8PathBuf> = Vec::new();
        for resource in &self.resources {
            if !self.scope.sees(resource.scope()) {
                continue;
            }
            if roots.iter().any(|existing| existing == resource.path()) {
                continue;
            }
            roots.push(resource.path().to_owned());
        }
        IsolationContext {
            scope: self.scope,
            roots,
        }
    }
}

/// A sealed resolution boundary.
///
/// Implementation names resolve against the visible roots and nothing else;
/// in particular there is no fallthrough to the host's own environment. One
/// context backs exactly one provider handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationContext {
    scope: ResolutionScope,
    roots: Vec<Utf8PathBuf>,
}

impl IsolationContext {
    /// Scope this context was sealed for.
    #[must_use]
    pub const fn scope(&self) -> ResolutionScope {
        self.scope
    }

    /// Visible roots in resolution order.
    #[must_use]
    pub fn roots(&self) -> &[Utf8PathBuf] {
        &self.roots
    }

    /// Locates the implementation `name` inside the context.
    ///
    /// Only bare file names can match: a name carrying path separators or
    /// parent components addresses something outside the visible set and is
    /// treated as not found.
    ///
    /// # Errors
    ///
    /// Returns [`IsolateError::ImplementationNotFound`] when no visible root
    /// holds a regular file of that name.
    pub fn resolve(&self, name: &str) -> Result<Utf8PathBuf, IsolateError> {
        if is_bare_name(name) {
            for root in &self.roots {
                let candidate = root.join(name);
                if candidate.as_std_path().is_file() {
                    return Ok(candidate);
                }
            }
        }
        Err(IsolateError::ImplementationNotFound {
            name: name.to_owned(),
            searched: self.roots.len(),
        })
    }
}

fn is_bare_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8Path;
    use tempfile::TempDir;

    use super::*;

    fn root_with_files(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        for file in files {
            fs::write(dir.path().join(file), b"#!/bin/sh\n").expect("write file");
        }
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 tempdir");
        (dir, path)
    }

    fn test_resource(path: &Utf8Path) -> ResourceSpec {
        ResourceSpec::new(ResolutionScope::Test, path)
    }

    #[test]
    fn seal_deduplicates_preserving_first_seen_order() {
        let context = ContextProfile::new(ResolutionScope::Test)
            .with_resource(ResourceSpec::new(ResolutionScope::Test, "/b"))
            .with_resource(ResourceSpec::new(ResolutionScope::Compile, "/a"))
            .with_resource(ResourceSpec::new(ResolutionScope::Test, "/b"))
            .with_resource(ResourceSpec::new(ResolutionScope::Runtime, "/a"))
            .seal();
        assert_eq!(
            context.roots(),
            [Utf8PathBuf::from("/b"), Utf8PathBuf::from("/a")]
        );
    }

    #[test]
    fn seal_filters_resources_invisible_to_the_scope() {
        let context = ContextProfile::new(ResolutionScope::Runtime)
            .with_resource(ResourceSpec::new(ResolutionScope::Compile, "/compile"))
            .with_resource(ResourceSpec::new(ResolutionScope::Runtime, "/runtime"))
            .with_resource(ResourceSpec::new(ResolutionScope::Test, "/test-only"))
            .seal();
        assert_eq!(
            context.roots(),
            [Utf8PathBuf::from("/compile"), Utf8PathBuf::from("/runtime")]
        );
    }

    #[test]
    fn resolve_finds_a_file_in_the_first_matching_root() {
        let (_guard_a, root_a) = root_with_files(&["other-tool"]);
        let (_guard_b, root_b) = root_with_files(&["slipway-echo"]);
        let context = ContextProfile::new(ResolutionScope::Test)
            .with_resource(test_resource(&root_a))
            .with_resource(test_resource(&root_b))
            .seal();
        let resolved = context.resolve("slipway-echo").expect("resolve");
        assert_eq!(resolved, root_b.join("slipway-echo"));
    }

    #[test]
    fn resolution_order_follows_root_order() {
        let (_guard_a, root_a) = root_with_files(&["impl"]);
        let (_guard_b, root_b) = root_with_files(&["impl"]);
        let context = ContextProfile::new(ResolutionScope::Test)
            .with_resource(test_resource(&root_a))
            .with_resource(test_resource(&root_b))
            .seal();
        let resolved = context.resolve("impl").expect("resolve");
        assert_eq!(resolved, root_a.join("impl"));
    }

    #[test]
    fn resolve_reports_not_found_outside_the_visible_set() {
        let (_guard, root) = root_with_files(&["present"]);
        let context = ContextProfile::new(ResolutionScope::Test)
            .with_resource(test_resource(&root))
            .seal();
        let err = context.resolve("absent").expect_err("must fail");
        assert!(
            matches!(err, IsolateError::ImplementationNotFound { ref name, searched: 1 } if name == "absent")
        );
    }

    #[test]
    fn disjoint_contexts_cannot_see_each_other() {
        let (_guard_a, root_a) = root_with_files(&["impl-a"]);
        let (_guard_b, root_b) = root_with_files(&["impl-b"]);
        let context_a = ContextProfile::new(ResolutionScope::Test)
            .with_resource(test_resource(&root_a))
            .seal();
        let context_b = ContextProfile::new(ResolutionScope::Test)
            .with_resource(test_resource(&root_b))
            .seal();

        assert!(context_a.resolve("impl-a").is_ok());
        assert!(context_b.resolve("impl-b").is_ok());
        assert!(matches!(
            context_a.resolve("impl-b"),
            Err(IsolateError::ImplementationNotFound { .. })
        ));
        assert!(matches!(
            context_b.resolve("impl-a"),
            Err(IsolateError::ImplementationNotFound { .. })
        ));
    }

    #[test]
    fn names_with_separators_or_parent_components_never_match() {
        let (_guard, root) = root_with_files(&["impl"]);
        let outside = root.join("impl");
        let context = ContextProfile::new(ResolutionScope::Test)
            .with_resource(test_resource(&root))
            .seal();
        for name in [outside.as_str(), "../impl", "sub/impl", ".", ".."] {
            assert!(
                matches!(
                    context.resolve(name),
                    Err(IsolateError::ImplementationNotFound { .. })
                ),
                "name {name:?} must not resolve"
            );
        }
    }

    #[test]
    fn an_empty_context_resolves_nothing() {
        let context = ContextProfile::new(ResolutionScope::Test).seal();
        assert!(matches!(
            context.resolve("anything"),
            Err(IsolateError::ImplementationNotFound { searched: 0, .. })
        ));
    }
}
