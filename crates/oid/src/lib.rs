//! # oid
//!
//! Typed object identifiers for observability platform resources.
//!
//! Declared configuration stores every cross-resource reference as a plain
//! string such as `o:dataset:42:7`. This crate turns those strings into typed
//! values and back, checks that a field points at the kind of object it
//! expects, and decides when a changed reference is only a version bump.
//!
//! ## Core Concepts
//!
//! - **ResourceType**: the closed set of object kinds, each with a tag
//! - **TypeRegistry**: the types a process accepts, built once and passed around
//! - **Oid**: a parsed reference; simple types carry an optional version,
//!   composite types (folders) carry the id of their owning scope
//! - **Policy**: diff suppression and stale-input detection
//!
//! ## Example
//!
//! ```
//! use oid::{Oid, ResourceType, TypeRegistry, is_insignificant};
//!
//! let registry = TypeRegistry::standard();
//!
//! let allowed = [ResourceType::Dataset];
//! let input = Oid::parse_field(&registry, "inputs.main", "o:dataset:42:7", &allowed)?;
//! assert_eq!(input.version(), Some("7"));
//!
//! let folder = Oid::folder("12", "41000001")?;
//! assert_eq!(folder.to_string(), "o:folder:12:41000001");
//!
//! assert!(is_insignificant(&registry, "o:dataset:42:7", "o:dataset:42:9"));
//! # Ok::<(), oid::Error>(())
//! ```

mod error;
pub mod policy;
mod reference;
mod registry;

pub use error::{Error, Result};
pub use policy::{RecomputePolicy, is_insignificant, is_newer, stale_inputs};
pub use reference::{CompositeRef, Oid, PREFIX, SEPARATOR, SimpleRef};
pub use registry::{Identity, ResourceType, TypeRegistry};
