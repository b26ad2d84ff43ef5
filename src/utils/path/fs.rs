//! Turning configured paths into absolute ones.

use std::path::{Path, PathBuf};

/// Absolute form of `path`: canonical when it exists, otherwise joined
/// onto the current directory (if relative) and left uncanonicalized.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}

/// Expand a leading `~`, resolve against `base`, then normalize.
///
/// `base` is the config file's directory for paths read from the file and
/// the working directory for paths given on the command line.
pub fn expand_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = path
        .to_str()
        .map_or_else(|| path.to_path_buf(), |s| PathBuf::from(shellexpand::tilde(s).as_ref()));
    if expanded.is_relative() {
        normalize_path(&base.join(expanded))
    } else {
        normalize_path(&expanded)
    }
}
