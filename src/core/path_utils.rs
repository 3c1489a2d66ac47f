/*
 * This module provides utility functions for path handling: normalizing
 * document paths so that identity comparisons are stable across tabs and
 * scopes, and retrieving the application's configuration directory. It
 * centralizes the path logic used by the resolver, the coordinator, and the
 * config manager.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::{Component, Path, PathBuf};

/*
 * Normalizes a document path for identity purposes. Canonicalization is
 * preferred because it resolves symlinks and relative components against the
 * real file system; when the path no longer exists (e.g. a Deleted change
 * event), falls back to a lexical cleanup that removes `.` components and
 * resolves `..` against preceding components.
 */
pub fn normalize_document_path(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(real) => real,
        Err(e) => {
            log::trace!("PathUtils: canonicalize failed for {path:?} ({e}); using lexical form");
            lexical_normalize(path)
        }
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/*
 * Returns true when `path` names a document this application browses and
 * searches, based on its extension (compared case-insensitively against the
 * configured list, e.g. ["md", "markdown", "txt"]).
 */
pub fn is_supported_document(path: &Path, supported_extensions: &[String]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy().to_lowercase();
    supported_extensions.iter().any(|s| s.eq_ignore_ascii_case(&ext))
}

// True when `path` is lexically inside `root` (or is `root` itself).
pub fn is_within_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/*
 * Retrieves the application's primary local configuration directory,
 * creating it if necessary. The path is derived without an organization
 * qualifier, placing it directly under the user's local application data
 * directory structure.
 *
 * Returns `None` if the directory could not be determined or created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Attempting to get base app config local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| {
        let config_path = proj_dirs.config_local_dir();
        if !config_path.exists() {
            if let Err(e) = fs::create_dir_all(config_path) {
                log::error!(
                    "PathUtils: Failed to create base app config directory {config_path:?}: {e}"
                );
                return None;
            }
            log::debug!("PathUtils: Created base app config directory: {config_path:?}");
        }
        Some(config_path.to_path_buf())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_normalize_resolves_relative_components_for_missing_paths() {
        let input = PathBuf::from("/workspace/notes/./drafts/../journal.md");
        assert_eq!(
            normalize_document_path(&input),
            PathBuf::from("/workspace/notes/journal.md")
        );
    }

    #[test]
    fn test_normalize_canonicalizes_existing_paths() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("doc.md");
        File::create(&file_path).unwrap();

        let indirect = dir.path().join(".").join("doc.md");
        let normalized = normalize_document_path(&indirect);
        assert_eq!(normalized, file_path.canonicalize().unwrap());
    }

    #[test]
    fn test_normalize_resolves_symlinks_to_one_identity() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.md");
        fs::write(&target, "content").unwrap();
        let link = dir.path().join("alias.md");

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&target, &link).unwrap();
            assert_eq!(
                normalize_document_path(&link),
                normalize_document_path(&target),
                "A symlink and its target must share one document identity."
            );
        }
    }

    #[test]
    fn test_is_supported_document_matches_extensions_case_insensitively() {
        let extensions = vec!["md".to_string(), "txt".to_string()];
        assert!(is_supported_document(Path::new("/a/b.md"), &extensions));
        assert!(is_supported_document(Path::new("/a/B.MD"), &extensions));
        assert!(is_supported_document(Path::new("/a/readme.txt"), &extensions));
        assert!(!is_supported_document(Path::new("/a/image.png"), &extensions));
        assert!(!is_supported_document(Path::new("/a/no_extension"), &extensions));
    }

    #[test]
    fn test_is_within_root() {
        let root = Path::new("/workspace/notes");
        assert!(is_within_root(Path::new("/workspace/notes/a.md"), root));
        assert!(is_within_root(Path::new("/workspace/notes"), root));
        assert!(!is_within_root(Path::new("/workspace/other/a.md"), root));
    }

    #[test]
    fn test_get_base_app_config_local_dir_creates_if_not_exists() {
        // Using a highly unique app name to avoid collision with actual user
        // configs or other test runs.
        let unique_app_name = format!("TestApp_MarkScout_PathUtils_{}", rand::random::<u128>());

        let path_opt = get_base_app_config_local_dir(&unique_app_name);

        assert!(path_opt.is_some(), "Should return a path for a new app name");
        let path = path_opt.unwrap();
        assert!(path.exists(), "Directory should have been created at {path:?}");
        assert!(path.is_dir());

        // Cleanup the created directory.
        if let Some(proj_dirs) = ProjectDirs::from("", "", &unique_app_name) {
            let dir_to_remove = proj_dirs.config_local_dir();
            if dir_to_remove.exists() {
                if let Err(e) = fs::remove_dir_all(dir_to_remove) {
                    eprintln!("Test cleanup error for {}: {e}", path.display());
                }
            }
        }
    }
}
