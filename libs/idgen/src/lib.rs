//! # idgen
//!
//! Prefixed, lexically sortable, URL-safe unique identifiers.
//!
//! ## ID Format
//!
//! Every id is `{prefix}_{ulid}`:
//!
//! - `cus_01F8MECHZX3TBDSZ7XRADM79XV`
//! - `inv_01F8MEDT6S1RZ0Q8NHXB3W5TKG`
//!
//! The ULID payload is 26 Crockford base32 characters: a 48-bit millisecond
//! timestamp followed by 80 bits of randomness. The alphabet has no `I`,
//! `L`, `O` or `U` and never needs percent-encoding.
//!
//! This format provides:
//! - Type discrimination (prefix names the kind of object)
//! - Sortability (string order follows creation order)
//! - Uniqueness (80 random bits per millisecond)
//!
//! ## Ordering
//!
//! Random bits come from pooled [`entropy::MonotonicEntropy`] sources. Ids
//! generated back to back on one thread share a source and sort in creation
//! order even within a millisecond. Across threads this is best effort:
//! concurrent callers may draw different sources.
//!
//! ## Example
//!
//! ```
//! let id = idgen::generate("cus");
//! assert_eq!(idgen::extract_prefix(&id), "cus");
//! assert!(idgen::extract_time(&id).is_ok());
//! ```

mod accessor;
pub mod entropy;
mod error;
mod generator;

pub use accessor::{extract_datetime, extract_prefix, extract_time, extract_ulid};
pub use error::{IdError, Result};
pub use generator::{generate, generate_at, Generator};

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;

/// The separator between prefix and payload.
pub const SEPARATOR: char = '_';

/// [`SEPARATOR`] as a byte.
pub const SEPARATOR_BYTE: u8 = b'_';

/// [`SEPARATOR`] as a string slice.
pub const SEPARATOR_STR: &str = "_";

/// Length of the encoded ULID payload.
pub const PAYLOAD_LEN: usize = ulid::ULID_LEN;
