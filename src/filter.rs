//! Query parameter validation
//!
//! Every filter of an object query accepts "unset", a single value or a
//! collection of values. `Filter` models the three shapes and `resolve`
//! normalizes them into the concrete list of values to query for.

use crate::model::{AccessClass, Partition, Purpose};
use crate::{Error, Result};
use std::fmt::Display;

/// A closed enumeration that can be named on the command line.
pub trait Choice: Copy + PartialEq + Display + std::str::FromStr<Err = Error> + 'static {
    /// Field name used in validation errors
    const FIELD: &'static str;

    /// Every allowed value
    fn choices() -> &'static [Self];
}

/// Format an allowed-value set for error messages: `('world', 'dev', 'test')`
pub fn describe<T: Display>(valid: &[T]) -> String {
    let quoted: Vec<String> = valid.iter().map(|v| format!("'{}'", v)).collect();
    format!("({})", quoted.join(", "))
}

/// Raw filter input: unset, one value, or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter<T> {
    Any,
    One(T),
    Many(Vec<T>),
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Filter::Any
    }
}

impl<T> Filter<T> {
    /// True when nothing was specified (an empty collection counts as unset)
    pub fn is_any(&self) -> bool {
        match self {
            Filter::Any => true,
            Filter::One(_) => false,
            Filter::Many(values) => values.is_empty(),
        }
    }

    /// The values given by the caller
    pub fn values(&self) -> &[T] {
        match self {
            Filter::Any => &[],
            Filter::One(value) => std::slice::from_ref(value),
            Filter::Many(values) => values,
        }
    }

    pub fn many(values: impl IntoIterator<Item = T>) -> Self {
        Filter::Many(values.into_iter().collect())
    }
}

impl<T: Clone + PartialEq + Display> Filter<T> {
    /// Normalize against the allowed values.
    ///
    /// Unset resolves to `default`, or to every value in `valid` when no
    /// default is given. Fails with `InvalidParameter` on the first value
    /// not contained in `valid`.
    pub fn resolve(&self, description: &'static str, valid: &[T], default: Option<&[T]>) -> Result<Vec<T>> {
        let values: Vec<T> = if self.is_any() {
            default.unwrap_or(valid).to_vec()
        } else {
            self.values().to_vec()
        };

        if let Some(bad) = values.iter().find(|v| !valid.contains(v)) {
            return Err(Error::InvalidParameter {
                field: description,
                value: bad.to_string(),
                allowed: describe(valid),
            });
        }

        Ok(values)
    }
}

impl<T: Choice> Filter<T> {
    /// Build a filter from raw strings, e.g. repeated CLI flags
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let mut values = raw
            .iter()
            .map(|s| s.as_ref().parse::<T>())
            .collect::<Result<Vec<T>>>()?;

        Ok(match values.len() {
            0 => Filter::Any,
            1 => Filter::One(values.remove(0)),
            _ => Filter::Many(values),
        })
    }

    /// Resolve against the full enumeration
    pub fn resolve_choice(&self) -> Result<Vec<T>> {
        self.resolve(T::FIELD, T::choices(), None)
    }
}

impl<T> From<Vec<T>> for Filter<T> {
    fn from(values: Vec<T>) -> Self {
        Filter::Many(values)
    }
}

impl<T: Clone> From<&[T]> for Filter<T> {
    fn from(values: &[T]) -> Self {
        Filter::Many(values.to_vec())
    }
}

macro_rules! single_value_filter {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Filter<$ty> {
                fn from(value: $ty) -> Self {
                    Filter::One(value)
                }
            }
        )*
    };
}

single_value_filter!(Partition, Purpose, AccessClass, i64, String);

impl From<&str> for Filter<String> {
    fn from(value: &str) -> Self {
        Filter::One(value.to_string())
    }
}

impl From<Vec<&str>> for Filter<String> {
    fn from(values: Vec<&str>) -> Self {
        Filter::Many(values.into_iter().map(str::to_string).collect())
    }
}
