//! Composite cache keys.

use std::fmt;

use thiserror::Error;

/// Maximum number of parts in a [`CacheKey`].
pub const MAX_KEY_PARTS: usize = 3;

/// One scalar component of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Int(i64),
    Text(String),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{}", v),
            KeyPart::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! key_part_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for KeyPart {
            fn from(v: $t) -> Self {
                KeyPart::Int(i64::from(v))
            }
        })*
    };
}

key_part_from_int!(u8, u16, u32, i8, i16, i32, i64);

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Text(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyError {
    #[error("Cache key needs 1 to 3 parts, got {0}")]
    PartCount(usize),
}

/// Lookup key made of 1–3 parts joined with `_`.
///
/// `("a", 1)` and `"a_1"` name the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(parts: &[KeyPart]) -> Result<Self, CacheKeyError> {
        if parts.is_empty() || parts.len() > MAX_KEY_PARTS {
            return Err(CacheKeyError::PartCount(parts.len()));
        }
        let joined = parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("_");
        Ok(Self(joined))
    }

    /// Key of a tile resource: `level_row_col`.
    pub fn tile(level: u8, row: u32, col: u32) -> Self {
        Self(format!("{}_{}_{}", level, row, col))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<A: Into<KeyPart>> From<(A,)> for CacheKey {
    fn from((a,): (A,)) -> Self {
        Self(a.into().to_string())
    }
}

impl<A: Into<KeyPart>, B: Into<KeyPart>> From<(A, B)> for CacheKey {
    fn from((a, b): (A, B)) -> Self {
        Self(format!("{}_{}", a.into(), b.into()))
    }
}

impl<A: Into<KeyPart>, B: Into<KeyPart>, C: Into<KeyPart>> From<(A, B, C)> for CacheKey {
    fn from((a, b, c): (A, B, C)) -> Self {
        Self(format!("{}_{}_{}", a.into(), b.into(), c.into()))
    }
}
