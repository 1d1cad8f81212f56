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

use std::rc::Rc;

use crate::binding::Binding;
use crate::mapper::QueryMapper;
use crate::util::names_match;
use crate::Connection;
use crate::Error;
use crate::FromRow;
use crate::FromValue;
use crate::Result;
use crate::Value;

/// A loosely-typed row
///
/// Columns are kept in the order of the result set together with their
/// names. A null cell is kept as [`Value::Null`]. When the result set has
/// two or more columns with the same name, all of them are kept and
/// lookup by name returns the first one.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    column_names: Rc<[String]>,
    column_values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(column_names: Rc<[String]>, column_values: Vec<Value>) -> Row {
        Row {
            column_names,
            column_values,
        }
    }

    /// Gets the column value at the specified index.
    ///
    /// The index is zero-based position when it is `usize`. The column name is
    /// compared case-insensitively when it is `&str`.
    pub fn get<I, T>(&self, colidx: I) -> Result<T>
    where
        I: ColumnIndex,
        T: FromValue,
    {
        let pos = colidx.idx(&self.column_names)?;
        T::from_value(self.column_values[pos].clone())
    }

    /// Gets a reference to the column value at the specified index.
    pub fn get_value<I>(&self, colidx: I) -> Result<&Value>
    where
        I: ColumnIndex,
    {
        let pos = colidx.idx(&self.column_names)?;
        Ok(&self.column_values[pos])
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns column values in column order
    pub fn values(&self) -> &[Value] {
        &self.column_values
    }

    pub fn len(&self) -> usize {
        self.column_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_values.is_empty()
    }

    /// Returns an iterator over `(column name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.column_values.iter())
    }

    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.column_values)
            .collect()
    }

    /// Maps the row to `T` in the same way as
    /// [`QueryMapper::take_as`](crate::QueryMapper::take_as).
    pub fn get_as<T>(&self) -> Result<T>
    where
        T: FromRow,
    {
        let binding = Binding::new::<T>(&self.column_names)?;
        let mut obj = T::default();
        binding.apply(&mut obj, |idx| Ok(self.column_values[idx].clone()))?;
        Ok(obj)
    }
}

/// A trait to specify a column position or name
///
/// This is implemented for `usize` (zero-based position) and `&str`
/// (case-insensitive name). It is sealed.
pub trait ColumnIndex: private::Sealed {
    /// Returns the index of the column specified by `self`.
    fn idx(&self, column_names: &[String]) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn idx(&self, column_names: &[String]) -> Result<usize> {
        let ncols = column_names.len();
        if *self < ncols {
            Ok(*self)
        } else {
            Err(Error::invalid_column_index(*self))
        }
    }
}

impl<'a> ColumnIndex for &'a str {
    fn idx(&self, column_names: &[String]) -> Result<usize> {
        column_names
            .iter()
            .position(|colname| names_match(colname, self))
            .ok_or_else(|| Error::invalid_column_name(self))
    }
}

mod private {
    pub trait Sealed {}

    impl Sealed for usize {}
    impl<'a> Sealed for &'a str {}
}

/// Lazy iterator over loosely-typed rows
///
/// Created by [`QueryMapper::take`] and [`QueryMapper::take_all`]. The
/// query is executed at the first call of `next()` unless it was already
/// executed. After an error, the iterator returns `None`.
pub struct Rows<'m, 'conn, C>
where
    C: Connection + 'conn,
{
    mapper: &'m mut QueryMapper<'conn, C>,
    remaining: usize,
    done: bool,
}

impl<'m, 'conn, C> Rows<'m, 'conn, C>
where
    C: Connection + 'conn,
{
    pub(crate) fn new(mapper: &'m mut QueryMapper<'conn, C>, limit: usize) -> Rows<'m, 'conn, C> {
        Rows {
            mapper,
            remaining: limit,
            done: false,
        }
    }

    /// Returns the column names. The query is executed if it was not.
    pub fn column_names(&mut self) -> Result<&[String]> {
        self.mapper.column_names()
    }
}

impl<'m, 'conn, C> Iterator for Rows<'m, 'conn, C>
where
    C: Connection + 'conn,
{
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        if self.done || self.remaining == 0 {
            return None;
        }
        match self.mapper.read_row() {
            Ok(Some(row)) => {
                self.remaining -= 1;
                Some(Ok(row))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
