//! Utility modules for the asset pipeline.

pub mod exec;
pub mod html;
pub mod path;
mod plural;

pub use plural::plural_count;
