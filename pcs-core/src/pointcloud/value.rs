use thiserror::Error;

/// A single per-point or header scalar.
///
/// Point cloud formats carry attributes of many widths; everything is
/// representable as one of these four kinds. Comparisons never happen on
/// the raw kinds, they go through one of the two comparison domains:
/// numeric (widened to f64, see [`GenericValue::to_numeric`]) or textual
/// (see [`GenericValue::to_text`]).
#[derive(Debug, Clone, PartialEq)]
pub enum GenericValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("text value {0:?} is not representable as a number")]
    NotNumeric(String),
}

impl GenericValue {
    /// Whether the value belongs to the numeric comparison domain.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, GenericValue::Text(_))
    }

    /// Widen into the numeric comparison domain.
    ///
    /// Text converts only when it parses as a decimal number; anything else
    /// is a loud failure rather than a silent truncation.
    pub fn to_numeric(&self) -> Result<f64, ValueError> {
        match self {
            GenericValue::Int(v) => Ok(*v as f64),
            GenericValue::UInt(v) => Ok(*v as f64),
            GenericValue::Float(v) => Ok(*v),
            GenericValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValueError::NotNumeric(s.clone())),
        }
    }

    /// Widen into the textual comparison domain. Total: every kind has a
    /// canonical text form.
    pub fn to_text(&self) -> String {
        match self {
            GenericValue::Int(v) => v.to_string(),
            GenericValue::UInt(v) => v.to_string(),
            GenericValue::Float(v) => v.to_string(),
            GenericValue::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for GenericValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<i32> for GenericValue {
    fn from(v: i32) -> Self {
        GenericValue::Int(v as i64)
    }
}

impl From<i64> for GenericValue {
    fn from(v: i64) -> Self {
        GenericValue::Int(v)
    }
}

impl From<u8> for GenericValue {
    fn from(v: u8) -> Self {
        GenericValue::UInt(v as u64)
    }
}

impl From<u16> for GenericValue {
    fn from(v: u16) -> Self {
        GenericValue::UInt(v as u64)
    }
}

impl From<u32> for GenericValue {
    fn from(v: u32) -> Self {
        GenericValue::UInt(v as u64)
    }
}

impl From<u64> for GenericValue {
    fn from(v: u64) -> Self {
        GenericValue::UInt(v)
    }
}

impl From<f32> for GenericValue {
    fn from(v: f32) -> Self {
        GenericValue::Float(v as f64)
    }
}

impl From<f64> for GenericValue {
    fn from(v: f64) -> Self {
        GenericValue::Float(v)
    }
}

impl From<&str> for GenericValue {
    fn from(v: &str) -> Self {
        GenericValue::Text(v.to_string())
    }
}

impl From<String> for GenericValue {
    fn from(v: String) -> Self {
        GenericValue::Text(v)
    }
}
