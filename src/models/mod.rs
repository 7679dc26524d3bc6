//! Model capability surface.
//!
//! The registry never owns a model and never inspects how its fields are
//! declared. Everything it needs is the [`Fields`] capability: enumerate
//! field names and get/set a value by name. Models stay owned by whoever
//! created them; the tree holds weak references only, so a model's owner
//! can release it at any time without consulting the registry.
//!
//! [`Document`] is the bundled implementation: a JSON-object-backed model
//! for callers (such as the HTTP adapter) that have no typed struct of
//! their own.

mod document;

pub use document::*;
