//! Filesystem fixtures shared by the unit tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A scratch directory under the system temp dir, removed on drop.
///
/// The directory itself is the server root; `outside()` is a sibling that
/// shares the root's name as a prefix, for containment tests.
pub struct TempRoot {
    base: PathBuf,
    root: PathBuf,
}

impl TempRoot {
    pub fn new() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let base = std::env::temp_dir().join(format!("lserve-test-{}-{id}", std::process::id()));
        let root = base.join("www");
        fs::create_dir_all(&root).expect("create temp root");
        fs::create_dir_all(base.join("www-private")).expect("create sibling dir");
        Self { base, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// A sibling directory whose name starts with the root's name.
    pub fn outside(&self) -> PathBuf {
        self.base.join("www-private")
    }

    /// Writes `contents` to `rel` under the root, creating parent directories.
    pub fn file(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).expect("create fixture dir");
        path
    }
}

impl Drop for TempRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.base);
    }
}
