//! Serialization normalizer.
//!
//! Analyzers hand back loosely shaped values: plain scalars, nested
//! containers, numeric tensors, or library objects that only know how to
//! convert themselves. [`normalize`] reduces any of them to a
//! [`MetaValue`] by applying the first matching rule:
//!
//! 1. none → `Null`
//! 2. scalar (bool, integer, float, string) → itself; non-finite floats are
//!    kept as floats
//! 3. sequence / mapping → same shape, elements normalized recursively
//! 4. tensor → nested lists in row-major order
//! 5. object with an extraction capability → the extracted value,
//!    normalized recursively
//! 6. anything else → its text rendering, or a placeholder naming its type
//!
//! Tensors are handled before the text fallback so numeric data never
//! degrades to an opaque string.

use std::fmt;

use frameaudit_summary_model::{MetaMap, MetaValue};

/// Nesting depth after which extraction stops and rule 6 applies.
const MAX_EXTRACT_DEPTH: usize = 32;

/// A value as returned by an analyzer, before normalization.
#[derive(Debug)]
pub enum RawValue {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Seq(Vec<RawValue>),
    /// Keyed container. Entry order is preserved; a repeated key keeps its
    /// first position and its last value.
    Map(Vec<(String, RawValue)>),
    Tensor(Tensor),
    Object(Box<dyn OpaqueValue>),
}

/// A value whose shape is only known to the library that produced it.
pub trait OpaqueValue: Send {
    /// Type name used in the fallback placeholder.
    fn type_name(&self) -> &str;

    /// Scalar extraction or to-list conversion, when supported.
    fn extract(&self) -> Option<RawValue> {
        None
    }

    /// Best-effort text rendering.
    fn render(&self) -> Option<String> {
        None
    }
}

impl fmt::Debug for dyn OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueValue({})", self.type_name())
    }
}

/// Flat element storage of a [`Tensor`].
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    Bool(Vec<bool>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, i: usize) -> MetaValue {
        match self {
            Self::F32(v) => MetaValue::Float(f64::from(v[i])),
            Self::F64(v) => MetaValue::Float(v[i]),
            Self::I64(v) => MetaValue::Int(v[i]),
            Self::U8(v) => MetaValue::Int(i64::from(v[i])),
            Self::Bool(v) => MetaValue::Bool(v[i]),
        }
    }
}

/// Dense n-dimensional array in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

/// The element count does not match the product of the shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tensor shape {shape:?} needs {expected} elements, got {actual}")]
pub struct ShapeMismatch {
    pub shape: Vec<usize>,
    pub expected: usize,
    pub actual: usize,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self, ShapeMismatch> {
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(ShapeMismatch {
                expected,
                actual: data.len(),
                shape,
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional tensor.
    pub fn vector(data: TensorData) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Nested lists, outermost dimension first. A zero-dimensional tensor
    /// becomes its single scalar.
    fn to_nested(&self) -> MetaValue {
        nest(&self.shape, &self.data, 0)
    }
}

fn nest(shape: &[usize], data: &TensorData, offset: usize) -> MetaValue {
    match shape.split_first() {
        None => data.element(offset),
        Some((&dim, rest)) => {
            let stride = rest.iter().product::<usize>();
            MetaValue::List(
                (0..dim)
                    .map(|i| nest(rest, data, offset + i * stride))
                    .collect(),
            )
        }
    }
}

/// Reduce an analyzer value to its canonical form.
pub fn normalize(value: RawValue) -> MetaValue {
    normalize_at(value, 0)
}

fn normalize_at(value: RawValue, depth: usize) -> MetaValue {
    match value {
        RawValue::None => MetaValue::Null,
        RawValue::Bool(b) => MetaValue::Bool(b),
        RawValue::Int(i) => MetaValue::Int(i),
        RawValue::UInt(u) => i64::try_from(u)
            .map(MetaValue::Int)
            .unwrap_or(MetaValue::Float(u as f64)),
        RawValue::Float(f) => MetaValue::Float(f),
        RawValue::Str(s) => MetaValue::String(s),
        RawValue::Seq(items) => MetaValue::List(
            items
                .into_iter()
                .map(|item| normalize_at(item, depth))
                .collect(),
        ),
        RawValue::Map(entries) => {
            let mut map = MetaMap::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key, normalize_at(item, depth));
            }
            MetaValue::Map(map)
        }
        RawValue::Tensor(tensor) => tensor.to_nested(),
        RawValue::Object(object) => {
            if depth < MAX_EXTRACT_DEPTH {
                if let Some(extracted) = object.extract() {
                    return normalize_at(extracted, depth + 1);
                }
            }
            match object.render() {
                Some(text) => MetaValue::String(text),
                None => MetaValue::String(format!(
                    "Unserializable object: {}",
                    object.type_name()
                )),
            }
        }
    }
}

impl From<MetaValue> for RawValue {
    fn from(value: MetaValue) -> Self {
        match value {
            MetaValue::Null => Self::None,
            MetaValue::Bool(b) => Self::Bool(b),
            MetaValue::Int(i) => Self::Int(i),
            MetaValue::Float(f) => Self::Float(f),
            MetaValue::String(s) => Self::Str(s),
            MetaValue::List(items) => Self::Seq(items.into_iter().map(Into::into).collect()),
            MetaValue::Map(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Seq(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for RawValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Tensor> for RawValue {
    fn from(v: Tensor) -> Self {
        Self::Tensor(v)
    }
}

impl RawValue {
    /// Keyed container from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<RawValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
