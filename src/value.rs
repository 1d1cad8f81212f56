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

use std::fmt;

#[cfg(feature = "chrono")]
use chrono::naive::{NaiveDate, NaiveDateTime};

use crate::util::set_hex_string;
use crate::Error;
use crate::Result;

/// A column value or a parameter value
///
/// `Null` is a distinct variant. Null cells are kept as `Value::Null` in
/// loosely-typed rows instead of being left out.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Available when `chrono` feature is enabled.
    #[cfg(feature = "chrono")]
    Timestamp(NaiveDateTime),
}

/// Declared type of a bind parameter
///
/// The default is `String` as in most data-access libraries where an
/// undeclared parameter is a string parameter.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ValueType {
    Boolean,
    Int64,
    Float64,
    #[default]
    String,
    Binary,
    DateTime,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Int64 => write!(f, "int64"),
            ValueType::Float64 => write!(f, "float64"),
            ValueType::String => write!(f, "string"),
            ValueType::Binary => write!(f, "binary"),
            ValueType::DateTime => write!(f, "datetime"),
        }
    }
}

macro_rules! define_accessors {
    ($($variant:ident($type:ty),)+) => {
        paste::item! {
            $(
                #[doc = "Returns a reference to the inner value when this is `Value::" $variant "`."]
                pub fn [<as_ $variant:snake>](&self) -> Option<&$type> {
                    if let Value::$variant(ref val) = *self {
                        Some(val)
                    } else {
                        None
                    }
                }
            )+
        }
    };
}

impl Value {
    /// Returns `true` for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(*self, Value::Null)
    }

    /// Returns the name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            #[cfg(feature = "chrono")]
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Returns the [`ValueType`] matching this value. `None` for `Value::Null`.
    pub fn value_type(&self) -> Option<ValueType> {
        match *self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Boolean),
            Value::Int64(_) => Some(ValueType::Int64),
            Value::Float64(_) => Some(ValueType::Float64),
            Value::String(_) => Some(ValueType::String),
            Value::Bytes(_) => Some(ValueType::Binary),
            #[cfg(feature = "chrono")]
            Value::Timestamp(_) => Some(ValueType::DateTime),
        }
    }

    define_accessors! {
        Bool(bool),
        Int64(i64),
        Float64(f64),
        String(String),
        Bytes(Vec<u8>),
    }

    /// Converts the value to the specified type.
    pub fn get<T>(self) -> Result<T>
    where
        T: FromValue,
    {
        T::from_value(self)
    }

    fn invalid_conversion_to_rust_type<T>(&self, to_type: &str) -> Result<T> {
        Err(Error::invalid_type_conversion(self.type_name(), to_type))
    }

    fn to_i64(&self, to_type: &str) -> Result<i64> {
        match *self {
            Value::Null => Err(Error::null_value()),
            Value::Bool(val) => Ok(val as i64),
            Value::Int64(val) => Ok(val),
            Value::String(ref val) => Ok(val.trim().parse()?),
            _ => self.invalid_conversion_to_rust_type(to_type),
        }
    }

    fn to_f64(&self, to_type: &str) -> Result<f64> {
        match *self {
            Value::Null => Err(Error::null_value()),
            Value::Int64(val) => Ok(val as f64),
            Value::Float64(val) => Ok(val),
            Value::String(ref val) => Ok(val.trim().parse()?),
            _ => self.invalid_conversion_to_rust_type(to_type),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(val) => write!(f, "{}", val),
            Value::Int64(val) => write!(f, "{}", val),
            Value::Float64(val) => write!(f, "{}", val),
            Value::String(ref val) => write!(f, "{}", val),
            Value::Bytes(ref val) => {
                let mut s = String::with_capacity(val.len() * 2);
                set_hex_string(&mut s, val);
                write!(f, "{}", s)
            }
            #[cfg(feature = "chrono")]
            Value::Timestamp(ref val) => write!(f, "{}", val),
        }
    }
}

/// Conversion from [`Value`] to rust values.
///
/// | Value | Rust Type |
/// | --- | --- |
/// | `Int64` | i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, bool (nonzero is `true`) |
/// | `Float64` | f32, f64, String, integer types when the value is in range |
/// | `String` | String, numeric types and bool by `str::parse()` |
/// | `Bool` | bool, integer types (0 or 1), String |
/// | `Bytes` | Vec\<u8>, String (hexadecimal) |
/// | `Timestamp` | `chrono::NaiveDateTime`, `chrono::NaiveDate`, String |
///
/// `Null` can be converted only to `Option<T>` and to `Value`. Other
/// types return an error of [`ErrorKind::NullValue`](crate::ErrorKind::NullValue).
pub trait FromValue {
    fn from_value(val: Value) -> Result<Self>
    where
        Self: Sized;
}

macro_rules! flt_to_int {
    ($expr:expr, $src_type:ident, $dest_type:ident) => {{
        let src_val = $expr;
        if $dest_type::MIN as $src_type <= src_val && src_val <= $dest_type::MAX as $src_type {
            Ok(src_val as $dest_type)
        } else {
            Err(Error::out_of_range(format!(
                "{} overflow: {}",
                stringify!($dest_type),
                src_val.to_string(),
            )))
        }
    }};
}

macro_rules! impl_from_value_for_int {
    ($($type:ident)+) => {
        $(
            impl FromValue for $type {
                fn from_value(val: Value) -> Result<$type> {
                    match val {
                        Value::Float64(f) => flt_to_int!(f, f64, $type),
                        _ => Ok(val.to_i64(stringify!($type))?.try_into()?),
                    }
                }
            }

            impl From<$type> for Value {
                fn from(val: $type) -> Value {
                    Value::Int64(val as i64)
                }
            }
        )+
    };
}

impl_from_value_for_int!(i8 i16 i32 i64 isize u8 u16 u32);

// u64 and usize may not fit in i64.
macro_rules! impl_from_value_for_wide_uint {
    ($($type:ident)+) => {
        $(
            impl FromValue for $type {
                fn from_value(val: Value) -> Result<$type> {
                    match val {
                        Value::Float64(f) => flt_to_int!(f, f64, $type),
                        Value::String(ref s) => Ok(s.trim().parse()?),
                        _ => Ok(val.to_i64(stringify!($type))?.try_into()?),
                    }
                }
            }

            impl TryFrom<$type> for Value {
                type Error = Error;

                fn try_from(val: $type) -> Result<Value> {
                    Ok(Value::Int64(val.try_into()?))
                }
            }
        )+
    };
}

impl_from_value_for_wide_uint!(u64 usize);

impl FromValue for f64 {
    fn from_value(val: Value) -> Result<f64> {
        val.to_f64("f64")
    }
}

impl FromValue for f32 {
    fn from_value(val: Value) -> Result<f32> {
        Ok(val.to_f64("f32")? as f32)
    }
}

impl FromValue for bool {
    fn from_value(val: Value) -> Result<bool> {
        match val {
            Value::Null => Err(Error::null_value()),
            Value::Bool(val) => Ok(val),
            Value::Int64(val) => Ok(val != 0),
            Value::String(ref val) => match val.trim() {
                s if s.eq_ignore_ascii_case("true") => Ok(true),
                s if s.eq_ignore_ascii_case("false") => Ok(false),
                s => Ok(s.parse::<i64>()? != 0),
            },
            _ => val.invalid_conversion_to_rust_type("bool"),
        }
    }
}

impl FromValue for String {
    fn from_value(val: Value) -> Result<String> {
        match val {
            Value::Null => Err(Error::null_value()),
            Value::String(val) => Ok(val),
            val => Ok(val.to_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(val: Value) -> Result<Vec<u8>> {
        match val {
            Value::Null => Err(Error::null_value()),
            Value::Bytes(val) => Ok(val),
            Value::String(val) => Ok(val.into_bytes()),
            val => val.invalid_conversion_to_rust_type("Vec<u8>"),
        }
    }
}

impl FromValue for Value {
    fn from_value(val: Value) -> Result<Value> {
        Ok(val)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(val: Value) -> Result<Option<T>> {
        match val {
            Value::Null => Ok(None),
            val => Ok(Some(T::from_value(val)?)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromValue for NaiveDateTime {
    fn from_value(val: Value) -> Result<NaiveDateTime> {
        match val {
            Value::Null => Err(Error::null_value()),
            Value::Timestamp(val) => Ok(val),
            Value::String(ref s) => {
                let s = s.trim();
                match NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                    Ok(ts) => Ok(ts),
                    Err(_) => Ok(NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")?),
                }
            }
            val => val.invalid_conversion_to_rust_type("NaiveDateTime"),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromValue for NaiveDate {
    fn from_value(val: Value) -> Result<NaiveDate> {
        match val {
            Value::String(ref s) if s.trim().len() == 10 => {
                Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
            }
            val => Ok(NaiveDateTime::from_value(val)?.date()),
        }
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Value {
        Value::Bool(val)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Value {
        Value::Float64(val)
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Value {
        Value::Float64(val as f64)
    }
}

impl From<String> for Value {
    fn from(val: String) -> Value {
        Value::String(val)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(val: &'a str) -> Value {
        Value::String(val.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(val: Vec<u8>) -> Value {
        Value::Bytes(val)
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(val: &'a [u8]) -> Value {
        Value::Bytes(val.to_vec())
    }
}

#[cfg(feature = "chrono")]
impl From<NaiveDateTime> for Value {
    fn from(val: NaiveDateTime) -> Value {
        Value::Timestamp(val)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(val: Option<T>) -> Value {
        match val {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
