//! Structural query keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// One element of a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegment {
    Int(i64),
    Text(String),
}

impl From<&str> for KeySegment {
    fn from(s: &str) -> Self {
        KeySegment::Text(s.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(s: String) -> Self {
        KeySegment::Text(s)
    }
}

impl From<&String> for KeySegment {
    fn from(s: &String) -> Self {
        KeySegment::Text(s.clone())
    }
}

impl From<i64> for KeySegment {
    fn from(n: i64) -> Self {
        KeySegment::Int(n)
    }
}

impl From<u8> for KeySegment {
    fn from(n: u8) -> Self {
        KeySegment::Int(i64::from(n))
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Int(n) => write!(f, "{}", n),
            KeySegment::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Identifier of one cached result set, e.g. `["places", "42"]`.
///
/// Equality is element-wise. A key also acts as a prefix selecting every
/// key that starts with the same segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    /// Append a segment
    pub fn with(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` selects this key. The empty key selects everything.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", segment)?;
        }
        f.write_str("]")
    }
}

/// Build a [`QueryKey`] from segments: `query_key!["places", id]`
#[macro_export]
macro_rules! query_key {
    ($($segment:expr),* $(,)?) => {
        $crate::query::QueryKey::new(vec![$($crate::query::KeySegment::from($segment)),*])
    };
}
