//! Uniform addressing type for the containers.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A tagged identifier: integer, float or string.
///
/// Keys of different kinds never compare. Ordered containers record the kind
/// of their first key and reject keys of another kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Key {
    /// Integer key (positions in a [`List`](super::List))
    Int(i64),
    /// Float key (pixel values when ranking extrema)
    Float(f32),
    /// String key (names)
    Str(String),
}

/// The tag of a [`Key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// [`Key::Int`]
    Int,
    /// [`Key::Float`]
    Float,
    /// [`Key::Str`]
    Str,
}

impl Key {
    /// Tag of this key.
    pub fn kind(&self) -> KeyKind {
        match self {
            Key::Int(_) => KeyKind::Int,
            Key::Float(_) => KeyKind::Float,
            Key::Str(_) => KeyKind::Str,
        }
    }

    /// Integer payload, if this is an integer key.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float payload, if this is a float key.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Key::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String payload, if this is a string key.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Compare two keys of the same kind.
    ///
    /// Returns `None` for keys of different kinds. Floats use IEEE total
    /// ordering so NaN keys still have a stable place.
    pub fn compare(&self, other: &Key) -> Option<Ordering> {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => Some(a.cmp(b)),
            (Key::Float(a), Key::Float(b)) => Some(a.total_cmp(b)),
            (Key::Str(a), Key::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value as i64)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

impl From<f32> for Key {
    fn from(value: f32) -> Self {
        Key::Float(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Float(x) => write!(f, "{}", x),
            Key::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Int => write!(f, "INT"),
            KeyKind::Float => write!(f, "FLOAT"),
            KeyKind::Str => write!(f, "STRING"),
        }
    }
}
