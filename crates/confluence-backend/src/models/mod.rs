//! Confluence REST API data models

pub mod content;

pub use content::*;
