// src/core/mod.rs

pub mod html;
pub mod sanitize;

pub use html::{Markup, TagBlock};
pub use sanitize::normalize_key;
