//! Configuration section definitions.
//!
//! Each module corresponds to a section in `scriptmin.toml`:
//!
//! | Module      | TOML Section  | Purpose                                   |
//! |-------------|---------------|-------------------------------------------|
//! | `build`     | `[build]`     | Trees, templates, minifier, action rules  |
//! | `transform` | `[transform]` | External source-to-source step            |

pub mod build;
pub mod transform;

pub use build::{ActionRule, ActionsConfig, BuildSectionConfig};
pub use transform::{OnFailure, TransformConfig};
