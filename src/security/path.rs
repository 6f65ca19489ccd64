//! Request path → filesystem target, confined to the server root.
//!
//! Containment is decided on canonical paths only: symlinks, `.` and `..`
//! are resolved before the target is compared against the root. A path that
//! leaves the root is always reported as [`PathError::Forbidden`], even when
//! the target does not exist, so traversal probes cannot be told apart from
//! real files by a 403/404 difference.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;

/// File served in place of a directory listing when present.
pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("{} escapes the server root", .0.display())]
    Forbidden(PathBuf),
}

/// Where a request path landed inside the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Canonical path of the target, or of `index.html` inside it.
    pub absolute_path: PathBuf,
    /// `true` only for directories without an index file (list them).
    pub is_directory: bool,
    pub exists: bool,
}

/// Maps decoded request paths to files under a fixed root.
///
/// # Examples
///
/// ```rust,no_run
/// use lserve::security::{PathError, PathResolver};
///
/// # async fn demo() -> std::io::Result<()> {
/// let resolver = PathResolver::new("/srv/www")?;
/// let denied = resolver.resolve("/../../etc/passwd").await;
/// assert!(matches!(denied, Err(PathError::Forbidden(_))));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for `root`, which is canonicalized once here.
    ///
    /// # Errors
    ///
    /// Fails if `root` does not exist or cannot be canonicalized.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: std::fs::canonicalize(root)?,
        })
    }

    /// The canonical root every target must stay under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `decoded_path` against the root.
    ///
    /// The request path is always relative to the root; a leading `/` does
    /// not restart at the filesystem root.
    ///
    /// # Errors
    ///
    /// [`PathError::Forbidden`] if the canonical target is not inside the
    /// root, including when an `index.html` symlink points outside it.
    pub async fn resolve(&self, decoded_path: &str) -> Result<ResolvedTarget, PathError> {
        let joined = self.root.join(decoded_path.trim_start_matches('/'));
        let (canonical, exists) = match fs::canonicalize(&joined).await {
            Ok(path) => (path, true),
            Err(_) => (self.canonicalize_missing(&joined).await, false),
        };
        self.ensure_contained(&canonical)?;

        if !exists {
            return Ok(ResolvedTarget {
                absolute_path: canonical,
                is_directory: false,
                exists: false,
            });
        }

        let is_dir = fs::metadata(&canonical)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Ok(ResolvedTarget {
                absolute_path: canonical,
                is_directory: false,
                exists: true,
            });
        }

        let index = canonical.join(INDEX_FILE);
        if let Ok(index) = fs::canonicalize(&index).await {
            if fs::metadata(&index).await.is_ok_and(|m| m.is_file()) {
                self.ensure_contained(&index)?;
                return Ok(ResolvedTarget {
                    absolute_path: index,
                    is_directory: false,
                    exists: true,
                });
            }
        }

        Ok(ResolvedTarget {
            absolute_path: canonical,
            is_directory: true,
            exists: true,
        })
    }

    fn ensure_contained(&self, canonical: &Path) -> Result<(), PathError> {
        // Component-wise: `/srv/www-private` is not inside `/srv/www`.
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(PathError::Forbidden(canonical.to_path_buf()))
        }
    }

    /// Canonical form of a path whose tail does not exist: the deepest
    /// existing ancestor is canonicalized and the rest applied lexically.
    async fn canonicalize_missing(&self, path: &Path) -> PathBuf {
        let components: Vec<Component<'_>> = path.components().collect();

        for split in (1..components.len()).rev() {
            let ancestor: PathBuf = components[..split].iter().collect();
            let Ok(mut resolved) = fs::canonicalize(&ancestor).await else {
                continue;
            };
            for component in &components[split..] {
                match component {
                    Component::Normal(name) => resolved.push(name),
                    Component::ParentDir => {
                        resolved.pop();
                    }
                    Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                }
            }
            return resolved;
        }

        // Only reachable if the root itself vanished.
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempRoot;

    fn resolver(tmp: &TempRoot) -> PathResolver {
        PathResolver::new(tmp.path()).unwrap()
    }

    #[tokio::test]
    async fn plain_file() {
        let tmp = TempRoot::new();
        let file = tmp.file("a.txt", "hello");
        let target = resolver(&tmp).resolve("/a.txt").await.unwrap();
        assert!(target.exists);
        assert!(!target.is_directory);
        assert_eq!(target.absolute_path, std::fs::canonicalize(file).unwrap());
    }

    #[tokio::test]
    async fn root_with_index() {
        let tmp = TempRoot::new();
        tmp.file("index.html", "<p>hi</p>");
        let target = resolver(&tmp).resolve("/").await.unwrap();
        assert!(!target.is_directory);
        assert!(target.absolute_path.ends_with("index.html"));
    }

    #[tokio::test]
    async fn empty_path_is_root() {
        let tmp = TempRoot::new();
        let r = resolver(&tmp);
        let target = r.resolve("").await.unwrap();
        assert!(target.is_directory);
        assert_eq!(target.absolute_path, r.root());
    }

    #[tokio::test]
    async fn directory_without_index_needs_listing() {
        let tmp = TempRoot::new();
        tmp.file("docs/readme.txt", "x");
        let target = resolver(&tmp).resolve("/docs").await.unwrap();
        assert!(target.exists);
        assert!(target.is_directory);
    }

    #[tokio::test]
    async fn index_directory_is_not_an_index() {
        let tmp = TempRoot::new();
        tmp.dir("site/index.html");
        let target = resolver(&tmp).resolve("/site/").await.unwrap();
        assert!(target.is_directory);
        assert!(target.absolute_path.ends_with("site"));
    }

    #[tokio::test]
    async fn missing_inside_root() {
        let tmp = TempRoot::new();
        let target = resolver(&tmp).resolve("/nope/deeper.txt").await.unwrap();
        assert!(!target.exists);
    }

    #[tokio::test]
    async fn dot_dot_that_stays_inside() {
        let tmp = TempRoot::new();
        tmp.file("a.txt", "hello");
        tmp.dir("sub");
        let target = resolver(&tmp).resolve("/sub/../a.txt").await.unwrap();
        assert!(target.exists);
        assert!(target.absolute_path.ends_with("a.txt"));
    }

    #[tokio::test]
    async fn traversal_is_forbidden_even_when_missing() {
        let tmp = TempRoot::new();
        let r = resolver(&tmp);
        for path in [
            "/../../etc/passwd",
            "/..",
            "../",
            "/sub/../../x",
            "/no/such/../../../../../tmp",
        ] {
            assert!(
                matches!(r.resolve(path).await, Err(PathError::Forbidden(_))),
                "{path} should be forbidden"
            );
        }
    }

    #[tokio::test]
    async fn absolute_injection_stays_inside() {
        let tmp = TempRoot::new();
        let target = resolver(&tmp).resolve("//etc/passwd").await.unwrap();
        assert!(!target.exists);
        assert!(target.absolute_path.starts_with(resolver(&tmp).root()));
    }

    #[tokio::test]
    async fn sibling_with_shared_prefix_is_forbidden() {
        let tmp = TempRoot::new();
        std::fs::write(tmp.outside().join("secret.txt"), "s").unwrap();
        let result = resolver(&tmp).resolve("/../www-private/secret.txt").await;
        assert!(matches!(result, Err(PathError::Forbidden(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_out_of_root_is_forbidden() {
        let tmp = TempRoot::new();
        std::fs::write(tmp.outside().join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(tmp.outside(), tmp.path().join("escape")).unwrap();
        let result = resolver(&tmp).resolve("/escape/secret.txt").await;
        assert!(matches!(result, Err(PathError::Forbidden(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn index_symlink_out_of_root_is_forbidden() {
        let tmp = TempRoot::new();
        let secret = tmp.outside().join("index.html");
        std::fs::write(&secret, "s").unwrap();
        tmp.dir("site");
        std::os::unix::fs::symlink(&secret, tmp.path().join("site/index.html")).unwrap();
        let result = resolver(&tmp).resolve("/site/").await;
        assert!(matches!(result, Err(PathError::Forbidden(_))));
    }
}
