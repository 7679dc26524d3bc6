//! trellis — a path-addressed model registry.
//!
//! Externally-owned models register at slash-delimited paths in a rooted
//! tree. The registry lazily materializes every ancestor of a registered
//! path, attaches a non-owning reference to the model at the terminal
//! node, and mirrors each model field as an addressable proxy. Readers
//! list children, fetch resolved field values, or rebuild sub-hierarchies
//! as nested keys; unbinding a model prunes ancestors that no longer
//! serve a purpose.
//!
//! The core ([`tree`], [`registry`], and the proxies) is synchronous and
//! purely in-memory. Around it sit an HTTP adapter ([`api`]) that maps
//! verbs and URL paths onto registry calls and republishes registry
//! events over SSE, and a query client ([`client`]) for the CLI.

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod registry;
pub mod render;
pub mod tree;

pub use error::{RegistryError, Result};
