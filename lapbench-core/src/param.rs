//! Benchmark Parameters and Conditions
//!
//! A `BenchmarkCondition` is the thread count plus a read-only dictionary of
//! named parameters. The reserved `"threads"` parameter selects the thread
//! count when a condition is built from a dictionary.

use crate::Error;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Name of the parameter holding the thread count
pub const THREADS_PARAM: &str = "threads";

/// Parameter lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// No parameter with that name
    #[error("Parameter `{0}` not found")]
    NotFound(String),

    /// The parameter holds a different type
    #[error("Parameter `{name}` is {actual}, not {expected}")]
    TypeMismatch {
        /// Parameter name
        name: String,
        /// Requested type
        expected: &'static str,
        /// Stored type
        actual: &'static str,
    },
}

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f64 => Float,
    String => Str,
    &str => Str,
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::UInt(v as u64)
    }
}

/// Types readable from a `ParamValue`
pub trait FromParamValue: Sized {
    /// Type name used in mismatch errors
    const TYPE_NAME: &'static str;

    /// Convert, or `None` when the stored variant does not fit
    fn from_param_value(value: &ParamValue) -> Option<Self>;
}

impl FromParamValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromParamValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Int(v) => Some(*v),
            ParamValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromParamValue for u64 {
    const TYPE_NAME: &'static str = "uint";

    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::UInt(v) => Some(*v),
            ParamValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromParamValue for usize {
    const TYPE_NAME: &'static str = "uint";

    fn from_param_value(value: &ParamValue) -> Option<Self> {
        u64::from_param_value(value).and_then(|v| usize::try_from(v).ok())
    }
}

impl FromParamValue for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromParamValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_param_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Read-only map of named parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterDict {
    values: FxHashMap<String, ParamValue>,
}

impl ParameterDict {
    /// Empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Typed lookup
    pub fn get<T: FromParamValue>(&self, name: &str) -> Result<T, ParamError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ParamError::NotFound(name.to_string()))?;
        T::from_param_value(value).ok_or_else(|| ParamError::TypeMismatch {
            name: name.to_string(),
            expected: T::TYPE_NAME,
            actual: value.type_name(),
        })
    }

    /// Raw lookup
    pub fn get_value(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Whether a parameter exists
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameters rendered as strings, ordered by name
    pub fn as_string_map(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Thread count plus parameters of one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition")]
pub struct BenchmarkCondition {
    threads: usize,
    params: ParameterDict,
}

/// Unvalidated wire form of `BenchmarkCondition`
#[derive(Deserialize)]
struct RawCondition {
    threads: usize,
    #[serde(default)]
    params: ParameterDict,
}

impl TryFrom<RawCondition> for BenchmarkCondition {
    type Error = Error;

    fn try_from(raw: RawCondition) -> Result<Self, Error> {
        Self::new(raw.threads, raw.params)
    }
}

impl BenchmarkCondition {
    /// Create a condition; `threads` must be at least 1
    pub fn new(threads: usize, params: ParameterDict) -> Result<Self, Error> {
        if threads == 0 {
            return Err(Error::InvalidConfiguration(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(Self { threads, params })
    }

    /// Single thread, no parameters
    pub fn single_thread() -> Self {
        Self {
            threads: 1,
            params: ParameterDict::new(),
        }
    }

    /// Build from parameters, reading the thread count from `"threads"` (default 1)
    pub fn from_params(params: ParameterDict) -> Result<Self, Error> {
        let threads = if params.has(THREADS_PARAM) {
            params.get::<usize>(THREADS_PARAM)?
        } else {
            1
        };
        Self::new(threads, params)
    }

    /// Same parameters with a different thread count
    pub(crate) fn with_threads(&self, threads: usize) -> Result<Self, Error> {
        Self::new(threads, self.params.clone())
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Parameters
    pub fn params(&self) -> &ParameterDict {
        &self.params
    }
}

impl Default for BenchmarkCondition {
    fn default() -> Self {
        Self::single_thread()
    }
}
