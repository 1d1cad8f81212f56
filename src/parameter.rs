// Querymapper - maps query result sets to rows and structs
//
//-----------------------------------------------------------------------------
// Copyright (c) 2024 querymapper developers. All rights reserved.
// This program is free software: you can modify it and/or redistribute it
// under the terms of:
//
// (i)  the Universal Permissive License v 1.0 or at your option, any
//      later version (http://oss.oracle.com/licenses/upl); and/or
//
// (ii) the Apache License v 2.0. (http://www.apache.org/licenses/LICENSE-2.0)
//-----------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;

use crate::Value;
use crate::ValueType;

/// Direction of a bind parameter
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Direction {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl Direction {
    /// Returns `true` when a value is sent to the data source.
    pub fn is_input(&self) -> bool {
        matches!(*self, Direction::Input | Direction::InputOutput)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
            Direction::InputOutput => write!(f, "input/output"),
            Direction::ReturnValue => write!(f, "return value"),
        }
    }
}

/// A named bind parameter
///
/// The name is passed to the data source as it is, including the prefix
/// such as `@` or `:`.
///
/// ```
/// use querymapper::{Direction, Parameter, Value, ValueType};
///
/// let param = Parameter::new("@name", "Smith")
///     .with_direction(Direction::InputOutput)
///     .with_size(40);
/// assert_eq!(param.name(), "@name");
/// assert_eq!(param.value(), &Value::from("Smith"));
/// assert_eq!(param.value_type(), ValueType::String);
/// assert_eq!(param.direction(), Direction::InputOutput);
/// assert_eq!(param.size(), Some(40));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    value: Value,
    direction: Direction,
    value_type: ValueType,
    size: Option<usize>,
}

impl Parameter {
    /// Creates an input parameter. The type tag is taken from the value,
    /// `ValueType::String` for a null value.
    pub fn new<N, V>(name: N, value: V) -> Parameter
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let value = value.into();
        Parameter {
            name: name.into(),
            value_type: value.value_type().unwrap_or_default(),
            value,
            direction: Direction::Input,
            size: None,
        }
    }

    /// Sets the direction. The default is `Direction::Input`.
    pub fn with_direction(mut self, direction: Direction) -> Parameter {
        self.direction = direction;
        self
    }

    /// Sets the declared type of the parameter.
    pub fn with_value_type(mut self, value_type: ValueType) -> Parameter {
        self.value_type = value_type;
        self
    }

    /// Sets the maximum size in bytes or characters, used mainly for output parameters.
    pub fn with_size(mut self, size: usize) -> Parameter {
        self.size = Some(size);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// A set of parameter values keyed by their logical names
///
/// [`QueryMapper::with_params`](crate::QueryMapper::with_params) adds
/// a prefix and a suffix to each name. The implementations for maps, slices,
/// arrays and vectors of pairs are provided. Structs get it by
/// `#[derive(ToParams)]`.
///
/// ```
/// use querymapper::{ToParams, Value};
///
/// #[derive(ToParams)]
/// struct Filter {
///     deptno: i32,
///     #[params(rename = "job")]
///     job_name: Option<String>,
///     #[params(skip)]
///     _internal: u32,
/// }
///
/// let filter = Filter { deptno: 10, job_name: None, _internal: 0 };
/// assert_eq!(
///     filter.to_params(),
///     vec![
///         ("deptno".to_string(), Value::Int64(10)),
///         ("job".to_string(), Value::Null),
///     ]
/// );
/// ```
pub trait ToParams {
    fn to_params(&self) -> Vec<(String, Value)>;
}

impl<T> ToParams for &T
where
    T: ToParams + ?Sized,
{
    fn to_params(&self) -> Vec<(String, Value)> {
        (**self).to_params()
    }
}

impl<K, V, S> ToParams for HashMap<K, V, S>
where
    K: AsRef<str>,
    V: Clone + Into<Value>,
    S: BuildHasher,
{
    fn to_params(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.clone().into()))
            .collect()
    }
}

impl<K, V> ToParams for BTreeMap<K, V>
where
    K: AsRef<str>,
    V: Clone + Into<Value>,
{
    fn to_params(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.clone().into()))
            .collect()
    }
}

impl<K, V> ToParams for [(K, V)]
where
    K: AsRef<str>,
    V: Clone + Into<Value>,
{
    fn to_params(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.clone().into()))
            .collect()
    }
}

impl<K, V, const N: usize> ToParams for [(K, V); N]
where
    K: AsRef<str>,
    V: Clone + Into<Value>,
{
    fn to_params(&self) -> Vec<(String, Value)> {
        self[..].to_params()
    }
}

impl<K, V> ToParams for Vec<(K, V)>
where
    K: AsRef<str>,
    V: Clone + Into<Value>,
{
    fn to_params(&self) -> Vec<(String, Value)> {
        self[..].to_params()
    }
}

/// No parameters.
impl ToParams for () {
    fn to_params(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}
