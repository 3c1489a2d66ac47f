use crate::core::models::{SearchScope, WorkspaceContext};
use crate::core::path_utils;
use ignore::{WalkBuilder, overrides::OverrideBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/*
 * This module translates a SearchScope plus the workspace context into the
 * concrete, deduplicated, normalized list of document paths a scan visits.
 * It defines a trait `ScopeResolverOperations` for abstracting the
 * resolution logic and a concrete implementation `CoreScopeResolver` built
 * on the `ignore` crate's directory walker.
 *
 * Resolution is pure with respect to its inputs and never touches the
 * watcher. A scope with no configured root resolves to an empty list, not an
 * error; callers treat that as "no results".
 */
pub trait ScopeResolverOperations: Send + Sync {
    /*
     * Produces the ordered set of document paths the given scope covers.
     * Output is sorted ascending by path, deduplicated by normalized path,
     * and filtered to supported text extensions for folder-backed scopes.
     */
    fn resolve(&self, scope: SearchScope, context: &WorkspaceContext) -> Vec<PathBuf>;
}

pub struct CoreScopeResolver {
    supported_extensions: Vec<String>,
}

impl CoreScopeResolver {
    pub fn new(supported_extensions: Vec<String>) -> Self {
        CoreScopeResolver {
            supported_extensions,
        }
    }

    /*
     * Walks one root recursively and collects every supported document file
     * underneath it. Symlinks are followed; collecting canonicalized paths
     * into the shared set keeps a symlinked alias from appearing twice and,
     * together with the walker's own cycle detection, keeps link loops from
     * recursing forever.
     */
    fn collect_root(&self, root: &Path, into: &mut BTreeSet<PathBuf>) {
        if !root.is_dir() {
            log::debug!("ScopeResolver: Root {root:?} is not a directory; resolving to nothing.");
            return;
        }

        let mut walker_builder = WalkBuilder::new(root);
        walker_builder
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .sort_by_file_path(|a, b| a.cmp(b));

        // Whitelist the supported document extensions. The override builder
        // treats plain patterns as includes, so anything else is skipped
        // while directories are still descended.
        let mut override_builder = OverrideBuilder::new(root);
        for extension in &self.supported_extensions {
            let pattern = format!("*.{extension}");
            if let Err(err) = override_builder.add(&pattern) {
                log::warn!("ScopeResolver: Invalid extension pattern '{pattern}': {err}");
            }
        }
        match override_builder.build() {
            Ok(overrides) => {
                walker_builder.overrides(overrides);
            }
            Err(err) => {
                log::warn!("ScopeResolver: Failed to build extension overrides: {err}");
            }
        }

        for entry_result in walker_builder.build() {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable subtrees and detected link cycles degrade to
                    // fewer results, never to a failed resolution.
                    log::warn!("ScopeResolver: Skipping unreadable entry under {root:?}: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            into.insert(path_utils::normalize_document_path(entry.path()));
        }
    }
}

impl ScopeResolverOperations for CoreScopeResolver {
    fn resolve(&self, scope: SearchScope, context: &WorkspaceContext) -> Vec<PathBuf> {
        let mut paths: BTreeSet<PathBuf> = BTreeSet::new();

        match scope {
            SearchScope::CurrentFolder => {
                if let Some(root) = &context.active_folder {
                    self.collect_root(root, &mut paths);
                } else {
                    log::debug!("ScopeResolver: No active folder; CurrentFolder resolves empty.");
                }
            }
            SearchScope::OpenFiles => {
                for document in &context.open_documents {
                    paths.insert(path_utils::normalize_document_path(&document.path));
                }
            }
            SearchScope::EntireWorkspace => {
                let roots = context.all_roots();
                if roots.is_empty() {
                    log::debug!("ScopeResolver: No connected roots; EntireWorkspace is empty.");
                }
                for root in roots {
                    self.collect_root(&root, &mut paths);
                }
            }
        }

        log::trace!(
            "ScopeResolver: Resolved {scope:?} to {} document path(s).",
            paths.len()
        );
        paths.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::OpenDocument;
    use std::fs;
    use tempfile::tempdir;

    fn resolver() -> CoreScopeResolver {
        CoreScopeResolver::new(vec!["md".to_string(), "txt".to_string()])
    }

    fn context_for_folder(root: &Path) -> WorkspaceContext {
        WorkspaceContext {
            active_folder: Some(root.to_path_buf()),
            workspace_roots: Vec::new(),
            open_documents: Vec::new(),
        }
    }

    #[test]
    fn test_current_folder_filters_to_supported_extensions() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.md"), "alpha").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "beta").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let paths = resolver().resolve(
            SearchScope::CurrentFolder,
            &context_for_folder(dir.path()),
        );

        assert_eq!(paths.len(), 2, "Only supported documents belong: {paths:?}");
        assert!(paths.iter().any(|p| p.ends_with("a.md")));
        assert!(paths.iter().any(|p| p.ends_with("sub/b.txt")));
    }

    #[test]
    fn test_resolution_is_sorted_and_idempotent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("z.md"), "z").unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("m.md"), "m").unwrap();

        let resolver = resolver();
        let ctx = context_for_folder(dir.path());
        let first = resolver.resolve(SearchScope::CurrentFolder, &ctx);
        let second = resolver.resolve(SearchScope::CurrentFolder, &ctx);

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted, "Resolution must be ordered by path.");
        assert_eq!(first, second, "Resolution must be idempotent without changes.");
    }

    #[test]
    fn test_open_files_dedups_same_path_open_twice() {
        let dir = tempdir().unwrap();
        let doc_path = dir.path().join("shared.md");
        fs::write(&doc_path, "shared").unwrap();

        let ctx = WorkspaceContext {
            active_folder: None,
            workspace_roots: Vec::new(),
            open_documents: vec![
                OpenDocument::new(doc_path.clone(), "shared.md"),
                OpenDocument::new(doc_path.clone(), "shared.md (2)"),
            ],
        };

        let paths = resolver().resolve(SearchScope::OpenFiles, &ctx);
        assert_eq!(
            paths.len(),
            1,
            "The same path open in two tabs is one underlying document."
        );
    }

    #[test]
    fn test_no_configured_root_resolves_empty_not_error() {
        let ctx = WorkspaceContext::default();
        let resolver = resolver();
        assert!(resolver.resolve(SearchScope::CurrentFolder, &ctx).is_empty());
        assert!(resolver.resolve(SearchScope::EntireWorkspace, &ctx).is_empty());
        assert!(resolver.resolve(SearchScope::OpenFiles, &ctx).is_empty());
    }

    #[test]
    fn test_entire_workspace_unions_all_roots() {
        let local = tempdir().unwrap();
        let mirror = tempdir().unwrap();
        fs::write(local.path().join("local.md"), "local").unwrap();
        fs::write(mirror.path().join("remote.md"), "remote").unwrap();

        let ctx = WorkspaceContext {
            active_folder: Some(local.path().to_path_buf()),
            workspace_roots: vec![mirror.path().to_path_buf()],
            open_documents: Vec::new(),
        };

        let paths = resolver().resolve(SearchScope::EntireWorkspace, &ctx);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().any(|p| p.ends_with("local.md")));
        assert!(paths.iter().any(|p| p.ends_with("remote.md")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_does_not_recurse_forever() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("doc.md"), "content").unwrap();
        // A directory symlink pointing back at the root creates a cycle.
        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();

        let paths = resolver().resolve(
            SearchScope::CurrentFolder,
            &context_for_folder(dir.path()),
        );

        assert_eq!(
            paths.len(),
            1,
            "The looped alias must not duplicate documents: {paths:?}"
        );
        assert!(paths[0].ends_with("doc.md"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_dedups_with_its_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("real.md");
        fs::write(&target, "content").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("alias.md")).unwrap();

        let paths = resolver().resolve(
            SearchScope::CurrentFolder,
            &context_for_folder(dir.path()),
        );

        assert_eq!(
            paths.len(),
            1,
            "A symlinked file and its target are one document: {paths:?}"
        );
    }
}
