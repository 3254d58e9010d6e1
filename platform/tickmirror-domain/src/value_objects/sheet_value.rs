use serde::{Serialize, Serializer};

/// A single display cell written to the destination worksheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetValue {
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl SheetValue {
    pub fn text(value: impl Into<String>) -> Self {
        SheetValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SheetValue::Empty)
    }
}

impl From<u32> for SheetValue {
    fn from(value: u32) -> Self {
        SheetValue::Int(i64::from(value))
    }
}

impl From<u64> for SheetValue {
    fn from(value: u64) -> Self {
        SheetValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for SheetValue {
    fn from(value: f64) -> Self {
        SheetValue::Float(value)
    }
}

impl From<Option<f64>> for SheetValue {
    fn from(value: Option<f64>) -> Self {
        value.map(SheetValue::Float).unwrap_or(SheetValue::Empty)
    }
}

impl Serialize for SheetValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SheetValue::Int(v) => serializer.serialize_i64(*v),
            SheetValue::Float(v) => serializer.serialize_f64(*v),
            SheetValue::Text(v) => serializer.serialize_str(v),
            SheetValue::Empty => serializer.serialize_str(""),
        }
    }
}

impl std::fmt::Display for SheetValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetValue::Int(v) => write!(f, "{v}"),
            SheetValue::Float(v) => write!(f, "{v}"),
            SheetValue::Text(v) => f.write_str(v),
            SheetValue::Empty => Ok(()),
        }
    }
}
