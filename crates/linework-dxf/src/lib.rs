//! Linework DXF object model.
//!
//! The typed, fully normalized representation of a parsed DXF drawing that
//! the scene builder consumes: header variables, layer and line-type tables,
//! block definitions and a flat entity stream. A DXF tokenizer/parser is an
//! external collaborator; it produces these records with group codes already
//! resolved (angles converted, vertices collected, boundary paths grouped).

pub mod drawing;
pub mod entity;
pub mod header;
pub mod tables;

pub use drawing::{BlockRecord, Drawing};
pub use entity::*;
pub use header::{AngularDirection, Header, Measurement};
pub use tables::{Layer, LineType, Tables};
