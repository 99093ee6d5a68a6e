//! Id generation.

use std::borrow::Cow;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::accessor::extract_prefix;
use crate::entropy::EntropyPool;
use crate::SEPARATOR;

/// Generates a lexically sortable, URL-safe id with the given prefix.
///
/// The result has the form `{prefix}_{ulid}`, e.g.
/// `cus_01F8MECHZX3TBDSZ7XRADM79XV`. The prefix is not validated; a prefix
/// containing `_` produces an id whose prefix cannot be read back.
#[must_use]
pub fn generate(prefix: &str) -> String {
    generate_at(prefix, now_ms())
}

/// Generates an id with the given prefix and an explicit timestamp.
#[must_use]
pub fn generate_at(prefix: &str, timestamp_ms: u64) -> String {
    let ulid = EntropyPool::global().with(|source| source.next(timestamp_ms));
    format!("{prefix}{SEPARATOR}{ulid}")
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Generates ids with a fixed prefix.
///
/// Serializes as `{ "prefix": "..." }` so generators can be declared in
/// configuration.
///
/// # Example
///
/// ```
/// use idgen::Generator;
///
/// const CUSTOMERS: Generator = Generator::from_static("cus");
///
/// let id = CUSTOMERS.generate();
/// assert!(CUSTOMERS.matches(&id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generator {
    prefix: Cow<'static, str>,
}

impl Generator {
    /// Creates a generator for a static prefix.
    #[must_use]
    pub const fn from_static(prefix: &'static str) -> Self {
        Self {
            prefix: Cow::Borrowed(prefix),
        }
    }

    /// Creates a generator for any prefix.
    #[must_use]
    pub fn new(prefix: impl Into<Cow<'static, str>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generates a new id with this generator's prefix.
    #[must_use]
    pub fn generate(&self) -> String {
        generate(&self.prefix)
    }

    /// Generates a new id with this generator's prefix at `timestamp_ms`.
    #[must_use]
    pub fn generate_at(&self, timestamp_ms: u64) -> String {
        generate_at(&self.prefix, timestamp_ms)
    }

    /// Returns true if `id` carries this generator's prefix.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        id.contains(SEPARATOR) && extract_prefix(id) == self.prefix
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}
