//! Plain-text rendering of operation results.

pub mod text;

pub use text::{banner, render_text_report};
