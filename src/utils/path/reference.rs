//! Root-relative references.
//!
//! Script `src` values and group keys are written as URL-ish paths
//! (`/js/app.js`, `min/app.min.js`). They are always resolved against a
//! root directory, never against the template that mentions them.

use std::path::{Component, Path, PathBuf};

/// Join a root-relative reference onto `root`.
///
/// Leading slashes are ignored so `/js/a.js` and `js/a.js` resolve to the
/// same file.
///
/// # Examples
/// ```ignore
/// assert_eq!(join_reference(Path::new("/site"), "/js/a.js"), PathBuf::from("/site/js/a.js"));
/// assert_eq!(join_reference(Path::new("/site"), "js/a.js"), PathBuf::from("/site/js/a.js"));
/// ```
#[inline]
pub fn join_reference(root: &Path, reference: &str) -> PathBuf {
    root.join(reference.trim_start_matches('/'))
}

/// Like [`join_reference`], but `None` when `..` segments climb out of
/// `root`. Used for every path the build writes to.
pub fn contained_reference(root: &Path, reference: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(reference.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(relative))
}

/// Display `path` relative to `root` when possible (for logging).
pub fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
