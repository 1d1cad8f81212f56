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
use std::hash::BuildHasher;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::trace;

use crate::mapper::QueryMapper;
use crate::util::names_match;
use crate::util::parse_numeric_name;
use crate::Connection;
use crate::Error;
use crate::FromValue;
use crate::Result;
use crate::Value;

/// A trait for structs populated from rows
///
/// A new instance is made by `Default::default()` for each row and then
/// each column bound to a field is assigned by [`FromRow::set_field`].
/// Null cells are never assigned; the field keeps its default value.
///
/// Implement it by `#[derive(FromRow)]` in most cases. See the derive
/// macro for available attributes.
///
/// The binding is resolved from the column names once per mapper and
/// struct type, at the first fetch of the first `take_as::<T>` iterator,
/// and reused by later iterators of the same mapper.
///
/// Columns are bound to fields as follows:
///
/// 1. A column whose name matches a name returned by
///    [`FromRow::field_names`] case-insensitively is bound to that field.
///    (Override [`FromRow::field_for_column`] to change it.)
/// 2. Otherwise, when the column name consists of decimal digits only and
///    the struct has an indexer, the column is bound to the indexer with
///    the number as the index.
/// 3. Otherwise, the column is ignored.
///
/// Manual implementation:
///
/// ```
/// use querymapper::{FromRow, FromValue, Result, Value};
///
/// #[derive(Default)]
/// struct Emp {
///     empno: i32,
///     ename: String,
/// }
///
/// impl FromRow for Emp {
///     fn field_names() -> &'static [&'static str] {
///         &["empno", "ename"]
///     }
///
///     fn set_field(&mut self, field: usize, value: Value) -> Result<()> {
///         match field {
///             0 => self.empno = i32::from_value(value)?,
///             1 => self.ename = String::from_value(value)?,
///             _ => return Err(querymapper::Error::invalid_column_index(field)),
///         }
///         Ok(())
///     }
/// }
///
/// assert_eq!(Emp::field_for_column("ENAME"), Some(1));
/// assert_eq!(Emp::field_for_column("sal"), None);
/// ```
pub trait FromRow: Default {
    /// Names of writable fields. Positions in the slice are passed to
    /// [`FromRow::set_field`].
    fn field_names() -> &'static [&'static str];

    /// Assigns a value to the field at `field` in [`FromRow::field_names`].
    fn set_field(&mut self, field: usize, value: Value) -> Result<()>;

    /// Returns `true` when the struct has a writable indexer.
    fn has_indexer() -> bool {
        false
    }

    /// Assigns a value to the indexer.
    fn set_indexed(&mut self, index: usize, value: Value) -> Result<()> {
        let _ = value;
        Err(Error::invalid_operation(format!(
            "no indexer to set a value at {}",
            index
        )))
    }

    /// Returns the position of the field bound to `column`.
    fn field_for_column(column: &str) -> Option<usize> {
        Self::field_names()
            .iter()
            .position(|name| names_match(name, column))
    }
}

/// A field receiving values by numeric column names
///
/// Mark a field by `#[from_row(indexer)]` to route columns named such as
/// `"0"`, `"1"` or `"12"` to it.
///
/// `Vec<T>` accepts only indexes below its current length; create it with
/// the expected length in `Default`.
pub trait Indexer {
    fn set_index(&mut self, index: usize, value: Value) -> Result<()>;
}

impl<T, S> Indexer for HashMap<usize, T, S>
where
    T: FromValue,
    S: BuildHasher,
{
    fn set_index(&mut self, index: usize, value: Value) -> Result<()> {
        self.insert(index, T::from_value(value)?);
        Ok(())
    }
}

impl<T> Indexer for BTreeMap<usize, T>
where
    T: FromValue,
{
    fn set_index(&mut self, index: usize, value: Value) -> Result<()> {
        self.insert(index, T::from_value(value)?);
        Ok(())
    }
}

impl<T> Indexer for Vec<T>
where
    T: FromValue,
{
    fn set_index(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.len();
        match self.get_mut(index) {
            Some(elem) => {
                *elem = T::from_value(value)?;
                Ok(())
            }
            None => Err(Error::out_of_range(format!(
                "index {} is out of range for {} element(s)",
                index, len
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Target {
    Field(usize),
    Index(usize),
}

/// Columns bound to fields of one struct type
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Binding {
    targets: Vec<Option<Target>>,
}

impl Binding {
    pub(crate) fn new<T>(column_names: &[String]) -> Result<Binding>
    where
        T: FromRow,
    {
        let mut targets = Vec::with_capacity(column_names.len());
        for name in column_names {
            let target = if let Some(field) = T::field_for_column(name) {
                Some(Target::Field(field))
            } else if T::has_indexer() {
                match parse_numeric_name(name) {
                    Some(index) => Some(Target::Index(index?)),
                    None => None,
                }
            } else {
                None
            };
            targets.push(target);
        }
        trace!(
            target_type = std::any::type_name::<T>(),
            columns = column_names.len(),
            bound = targets.iter().filter(|t| t.is_some()).count(),
            "column binding resolved"
        );
        Ok(Binding { targets })
    }

    #[cfg(test)]
    pub(crate) fn targets(&self) -> &[Option<Target>] {
        &self.targets
    }

    /// Assigns bound columns to `obj`. `value_at` returns the value of a
    /// column and is called only for bound columns.
    pub(crate) fn apply<T, F>(&self, obj: &mut T, mut value_at: F) -> Result<()>
    where
        T: FromRow,
        F: FnMut(usize) -> Result<Value>,
    {
        for (idx, target) in self.targets.iter().enumerate() {
            let target = match target {
                Some(target) => target,
                None => continue,
            };
            let value = value_at(idx)?;
            if value.is_null() {
                continue;
            }
            match *target {
                Target::Field(field) => obj.set_field(field, value)?,
                Target::Index(index) => obj.set_indexed(index, value)?,
            }
        }
        Ok(())
    }
}

/// Lazy iterator over rows mapped to `T`
///
/// Created by [`QueryMapper::take_as`] and [`QueryMapper::take_all_as`].
/// The column binding is taken from the mapper at the first call of
/// `next()`. After an error, the iterator returns `None`.
pub struct MappedRows<'m, 'conn, C, T>
where
    C: Connection + 'conn,
    T: FromRow + 'static,
{
    mapper: &'m mut QueryMapper<'conn, C>,
    binding: Option<Rc<Binding>>,
    remaining: usize,
    done: bool,
    phantom: PhantomData<T>,
}

impl<'m, 'conn, C, T> MappedRows<'m, 'conn, C, T>
where
    C: Connection + 'conn,
    T: FromRow + 'static,
{
    pub(crate) fn new(
        mapper: &'m mut QueryMapper<'conn, C>,
        limit: usize,
    ) -> MappedRows<'m, 'conn, C, T> {
        MappedRows {
            mapper,
            binding: None,
            remaining: limit,
            done: false,
            phantom: PhantomData,
        }
    }

    fn next_obj(&mut self) -> Result<Option<T>> {
        let binding = match &self.binding {
            Some(binding) => binding.clone(),
            None => {
                let binding = self.mapper.binding::<T>()?;
                self.binding = Some(binding.clone());
                binding
            }
        };
        self.mapper.read_mapped(&binding)
    }
}

impl<'m, 'conn, C, T> Iterator for MappedRows<'m, 'conn, C, T>
where
    C: Connection + 'conn,
    T: FromRow + 'static,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.done || self.remaining == 0 {
            return None;
        }
        match self.next_obj() {
            Ok(Some(obj)) => {
                self.remaining -= 1;
                Some(Ok(obj))
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
