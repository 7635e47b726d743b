//! # Scalar
//!
//! Single typed values exchanged with resource configuration.
//!
//! Configuration exposes a value as a "bag" of six optional slots (`bool`,
//! `int64`, `float64`, `string`, `duration`, `timestamp`) of which exactly one
//! must be set. This crate decodes a bag into the closed [`ScalarValue`] enum
//! and encodes it back, so callers match exhaustively on the kind instead of
//! probing slots at runtime.
//!
//! ## Example
//!
//! ```
//! use scalar::{ScalarValue, ValueBag};
//!
//! let bag: ValueBag = serde_json::from_str(r#"{"int64": 5}"#).unwrap();
//! let value = ScalarValue::decode(&bag)?;
//! assert_eq!(value, ScalarValue::Int64(5));
//!
//! let both: ValueBag = serde_json::from_str(r#"{"int64": 5, "string": "5"}"#).unwrap();
//! assert!(ScalarValue::decode(&both).is_err());
//! # Ok::<(), scalar::Error>(())
//! ```

mod error;
pub mod suppress;
pub mod text;
mod value;

pub use error::{Error, Result};
pub use value::{ScalarValue, ValueBag, ValueKind};
