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

use crate::util::names_match;
use crate::ColumnIndex;
use crate::Cursor;
use crate::Error;
use crate::FromValue;
use crate::Result;
use crate::Row;
use crate::Value;

/// An in-memory table filled with a whole result set
///
/// Column names are unique case-insensitively. Filling a table which
/// already has columns appends rows: result columns are matched to the
/// existing ones by name, unknown ones are added and cells of table
/// columns missing in the result are `Value::Null`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new() -> DataTable {
        DataTable::default()
    }

    /// Creates an empty table with the specified columns.
    pub fn with_columns<I, S>(names: I) -> DataTable
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = DataTable::new();
        for name in names {
            table.add_column(name);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Returns the position of the column, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| names_match(col, name))
    }

    /// Adds a column and returns its position. Existing rows get `Value::Null`.
    /// When a column with the same name exists, its position is returned.
    pub fn add_column<S>(&mut self, name: S) -> usize
    where
        S: Into<String>,
    {
        let name = name.into();
        if let Some(idx) = self.column_index(&name) {
            return idx;
        }
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    /// Appends a row. The number of values must be equal to the number of columns.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::invalid_operation(format!(
                "a row with {} value(s) cannot be added to a table with {} column(s)",
                values.len(),
                self.columns.len()
            )));
        }
        self.rows.push(values);
        Ok(())
    }

    /// Gets the value in the specified row and column.
    pub fn get<I, T>(&self, row: usize, colidx: I) -> Result<T>
    where
        I: ColumnIndex,
        T: FromValue,
    {
        let pos = colidx.idx(&self.columns)?;
        match self.rows.get(row) {
            Some(values) => T::from_value(values[pos].clone()),
            None => Err(Error::out_of_range(format!(
                "row {} is out of range for {} row(s)",
                row,
                self.rows.len()
            ))),
        }
    }

    /// Returns the rows as loosely-typed rows sharing the column names.
    pub fn to_rows(&self) -> Vec<Row> {
        let names: Rc<[String]> = Rc::from(self.columns.clone());
        self.rows
            .iter()
            .map(|values| Row::new(names.clone(), values.clone()))
            .collect()
    }

    /// Removes all rows and keeps the columns.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Reads all remaining rows of the cursor into the table.
    /// Returns the number of appended rows.
    pub fn load<R>(&mut self, cursor: &mut R) -> Result<usize>
    where
        R: Cursor + ?Sized,
    {
        let mapping = self.map_columns(&cursor.field_names()?);
        let mut count = 0;
        while cursor.read()? {
            let mut values = vec![Value::Null; self.columns.len()];
            for (idx, pos) in mapping.iter().enumerate() {
                if !cursor.is_null(idx)? {
                    values[*pos] = cursor.get_value(idx)?;
                }
            }
            self.rows.push(values);
            count += 1;
        }
        Ok(count)
    }

    // Returns the table column position for each result column.
    fn map_columns(&mut self, names: &[String]) -> Vec<usize> {
        let mut mapping: Vec<usize> = Vec::with_capacity(names.len());
        for name in names {
            let existing = if name.is_empty() {
                None
            } else {
                self.column_index(name)
            };
            let pos = match existing {
                Some(pos) if !mapping.contains(&pos) => pos,
                None if !name.is_empty() => self.add_column(name.as_str()),
                _ => self.suffixed_column(name, &mapping),
            };
            mapping.push(pos);
        }
        mapping
    }

    // Finds or adds `name1`, `name2`, ... not in `taken`.
    fn suffixed_column(&mut self, name: &str, taken: &[usize]) -> usize {
        let base = if name.is_empty() { "Column" } else { name };
        let mut suffix = 1;
        loop {
            let candidate = format!("{}{}", base, suffix);
            match self.column_index(&candidate) {
                Some(pos) if !taken.contains(&pos) => return pos,
                Some(_) => suffix += 1,
                None => return self.add_column(candidate),
            }
        }
    }
}
