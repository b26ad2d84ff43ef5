//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Absolute paths from configured ones (`normalize_path`, `expand_path`)
//! - [`reference`]: Root-relative references found in markup (`join_reference`, `contained_reference`, `relative_display`)

pub mod fs;
pub mod reference;

pub use fs::{expand_path, normalize_path};
pub use reference::{contained_reference, join_reference, relative_display};
