//! Registry facade
//!
//! Wires the concurrency components to a storage engine and wraps every
//! top-level operation in the retry controller. This is the crate an
//! embedding API layer talks to; the components underneath stay usable on
//! their own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod registry;

pub use config::RegistryConfig;
pub use registry::Registry;
