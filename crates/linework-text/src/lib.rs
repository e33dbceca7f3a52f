//! Linework Text
//!
//! Text support for the scene builder:
//! - Abstract font interface (glyph outlines, advances, kerning)
//! - Glyph outline triangulation via lyon
//! - Lazy glyph cache with fallback characters and a missing-glyph latch
//! - MTEXT inline-format parser
//! - Single-line and multi-column paragraph layout

mod cache;
mod font;
mod layout;
mod mtext;
mod tessellate;

pub mod testing;

pub use cache::*;
pub use font::*;
pub use layout::*;
pub use mtext::*;
pub use tessellate::*;
