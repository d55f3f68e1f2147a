#![forbid(unsafe_code)]

//! Dynamically-typed content input and its coercion to a source string.
//!
//! `set_text`/`set_html` accept anything convertible into [`ContentValue`].
//! Strings pass through, numbers become their decimal form, and the empty
//! values (`Null`, `Undefined`, NaN) become `""`. Every other shape is
//! rejected before any instance state is touched.

use std::collections::BTreeMap;

use crate::error::{Result, VirtualContentError};

/// A loosely-typed value handed to `set_text` / `set_html`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentValue {
    Str(String),
    Number(f64),
    Integer(i128),
    Bool(bool),
    Null,
    Undefined,
    Array(Vec<ContentValue>),
    Object(BTreeMap<String, ContentValue>),
}

impl ContentValue {
    /// Short name of the value's shape, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Number(_) | Self::Integer(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Coerce into the source string of a content generation.
    pub fn coerce(self) -> Result<String> {
        match self {
            Self::Str(s) => Ok(s),
            Self::Number(n) => Ok(format_number(n)),
            Self::Integer(i) => Ok(i.to_string()),
            Self::Null | Self::Undefined => Ok(String::new()),
            other => Err(VirtualContentError::InvalidContentType {
                found: other.kind(),
            }),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.is_infinite() {
        let label = if n > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_string()
    } else if n == 0.0 {
        // Covers -0.0 as well.
        "0".to_string()
    } else {
        format!("{n}")
    }
}

impl From<&str> for ContentValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ContentValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for ContentValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<f64> for ContentValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for ContentValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

macro_rules! integer_content {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ContentValue {
                fn from(value: $ty) -> Self {
                    Self::Integer(i128::from(value))
                }
            }
        )*
    };
}

integer_content!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<bool> for ContentValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<()> for ContentValue {
    fn from((): ()) -> Self {
        Self::Undefined
    }
}

impl<T: Into<ContentValue>> From<Option<T>> for ContentValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<ContentValue>> From<Vec<T>> for ContentValue {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Value> for ContentValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i128::from(i)),
                None => match n.as_u64() {
                    Some(u) => Self::Integer(i128::from(u)),
                    None => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
                },
            },
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}
