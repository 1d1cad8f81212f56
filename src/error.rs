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

use crate::AssertSend;
use crate::AssertSync;
#[cfg(doc)]
use crate::{Command, Connection, Cursor, QueryMapper};
use std::borrow::Cow;
use std::convert;
use std::error;
use std::fmt;
use std::num;
use std::str;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
/// A list of error categories.
///
/// It is used with the [`Error`] type.
///
/// Use `_` to match “all other errors” in `match` expression because it has [`#[non_exhaustive]`](https://doc.rust-lang.org/reference/attributes/type_system.html#the-non_exhaustive-attribute) attribute.
pub enum ErrorKind {
    /// Error when the borrowed [`Connection`] cannot be opened.
    Connection,

    /// Error when parameters are bound after the cursor of a
    /// [`QueryMapper`] was created.
    InvalidState,

    /// Error from the underlying data source while preparing, executing
    /// or fetching a query.
    Execution,

    /// Error when a value cannot be converted to the type of the field
    /// it is assigned to.
    InvalidTypeConversion,

    /// Error when NULL value is got but the target rust type cannot handle NULL.
    /// Use `Option<...>` in this case.
    NullValue,

    /// Error when conversion from a type to another fails due to out-of-range
    OutOfRange,

    /// Error when conversion from a string to a value fails
    ParseError,

    /// Error when the column index is out of range. (zero based)
    InvalidColumnIndex,

    /// Error when the column name is not in the result set.
    InvalidColumnName,

    /// Error when the bind parameter name is not in the SQL.
    InvalidBindName,

    /// Error when invalid method is called such as executing a stored
    /// procedure on a data source without them.
    InvalidOperation,

    /// Internal error. When you get this error, please report it with a test case to reproduce it.
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::Connection => "connection error",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::Execution => "execution error",
            ErrorKind::InvalidTypeConversion => "invalid type conversion",
            ErrorKind::NullValue => "null value",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::ParseError => "parse error",
            ErrorKind::InvalidColumnIndex => "invalid column index",
            ErrorKind::InvalidColumnName => "invalid column name",
            ErrorKind::InvalidBindName => "invalid bind name",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::InternalError => "internal error",
        };
        f.write_str(name)
    }
}

/// The error type for querymapper
///
/// Errors raised by a [`Connection`], [`Command`] or [`Cursor`]
/// implementation are passed to the caller as they are. Use [`Error::new`]
/// and [`Error::add_source`] to create them.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    source: Option<Box<dyn error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error.
    pub fn new<M>(kind: ErrorKind, message: M) -> Error
    where
        M: Into<Cow<'static, str>>,
    {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying error, returned later by [`error::Error::source`].
    pub fn add_source<E>(self, source: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            source: Some(source.into()),
            ..self
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message without the source.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creates an error of [`ErrorKind::Connection`].
    pub fn connection<M>(message: M) -> Error
    where
        M: Into<Cow<'static, str>>,
    {
        Error::new(ErrorKind::Connection, message)
    }

    /// Creates an error of [`ErrorKind::Execution`] wrapping the data source error.
    pub fn execution<E>(source: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        let source = source.into();
        Error::new(ErrorKind::Execution, source.to_string()).add_source(source)
    }

    pub(crate) fn invalid_state<M>(message: M) -> Error
    where
        M: Into<Cow<'static, str>>,
    {
        Error::new(ErrorKind::InvalidState, message)
    }

    pub fn null_value() -> Error {
        Error::new(ErrorKind::NullValue, "NULL value found")
    }

    pub(crate) fn parse_error<T>(source: T) -> Error
    where
        T: Into<Box<dyn error::Error + Send + Sync>>,
    {
        let source = source.into();
        Error::new(ErrorKind::ParseError, format!("{}", source)).add_source(source)
    }

    pub fn out_of_range<T>(message: T) -> Error
    where
        T: Into<Cow<'static, str>>,
    {
        Error::new(ErrorKind::OutOfRange, message.into())
    }

    pub fn invalid_type_conversion<T1, T2>(from: T1, to: T2) -> Error
    where
        T1: fmt::Display,
        T2: fmt::Display,
    {
        Error::new(
            ErrorKind::InvalidTypeConversion,
            format!("invalid type conversion from {} to {}", from, to),
        )
    }

    /// Used also by code generated by `#[derive(FromRow)]`.
    pub fn invalid_column_index<T>(index: T) -> Error
    where
        T: fmt::Display,
    {
        Error::new(
            ErrorKind::InvalidColumnIndex,
            format!("invalid column index {} (zero-based)", index),
        )
    }

    pub fn invalid_column_name<T>(name: T) -> Error
    where
        T: fmt::Display,
    {
        Error::new(
            ErrorKind::InvalidColumnName,
            format!("invalid column name {}", name),
        )
    }

    pub fn invalid_bind_name<T>(name: T) -> Error
    where
        T: fmt::Display,
    {
        Error::new(
            ErrorKind::InvalidBindName,
            format!("invalid bind name {}", name),
        )
    }

    pub fn invalid_operation<T>(message: T) -> Error
    where
        T: Into<Cow<'static, str>>,
    {
        Error::new(ErrorKind::InvalidOperation, message.into())
    }

    pub(crate) fn internal_error<T>(message: T) -> Error
    where
        T: Into<Cow<'static, str>>,
    {
        Error::new(ErrorKind::InternalError, message.into())
    }
}

impl AssertSend for Error {}
impl AssertSync for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        if let Some(ref err) = self.source {
            Some(err.as_ref())
        } else {
            None
        }
    }
}

impl From<convert::Infallible> for Error {
    fn from(err: convert::Infallible) -> Self {
        match err {}
    }
}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Self {
        Error::parse_error(err)
    }
}

impl From<num::ParseFloatError> for Error {
    fn from(err: num::ParseFloatError) -> Self {
        Error::parse_error(err)
    }
}

impl From<num::TryFromIntError> for Error {
    fn from(err: num::TryFromIntError) -> Self {
        Error::new(ErrorKind::OutOfRange, err.to_string()).add_source(err)
    }
}

impl From<str::Utf8Error> for Error {
    fn from(err: str::Utf8Error) -> Self {
        Error::parse_error(err)
    }
}

#[cfg(feature = "chrono")]
impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Error::parse_error(err)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::execution(err)
    }
}
