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

//! Traits implemented by a data source.
//!
//! The mapper doesn't talk to any database by itself. It borrows a
//! [`Connection`], creates a [`Command`] from it and reads rows through a
//! [`Cursor`]. All calls block until the data source responds. Timeouts
//! and cancellation, if any, belong to the implementation.

use std::fmt;

use crate::DataTable;
use crate::Parameter;
use crate::Result;
use crate::Value;

/// Kind of the query text
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CommandType {
    /// SQL statement
    #[default]
    Text,

    /// Name of a stored procedure
    StoredProcedure,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CommandType::Text => write!(f, "text"),
            CommandType::StoredProcedure => write!(f, "stored procedure"),
        }
    }
}

/// A connection to a data source
///
/// The mapper only borrows connections. It opens a closed connection but
/// never closes one. Methods take `&self`, so implementations keep their
/// state behind interior mutability.
pub trait Connection {
    /// Command type created by this connection
    type Command<'conn>: Command
    where
        Self: 'conn;

    fn is_open(&self) -> bool;

    /// Opens the connection. Failures should be errors of
    /// [`ErrorKind::Connection`](crate::ErrorKind::Connection).
    fn open(&self) -> Result<()>;

    /// Creates a command which will execute `sql`.
    fn create_command(&self, sql: &str, command_type: CommandType) -> Result<Self::Command<'_>>;
}

/// A query waiting for its parameters and execution
///
/// Dropping a command releases it.
pub trait Command {
    /// Cursor type returned by [`Command::execute_reader`]
    ///
    /// A cursor doesn't borrow the command. It may borrow the connection.
    type Cursor: Cursor;

    fn add_parameter(&mut self, param: Parameter) -> Result<()>;

    /// Executes the query and returns a cursor positioned before the first row.
    fn execute_reader(&mut self) -> Result<Self::Cursor>;

    /// Executes the query and appends the whole result set to `table`.
    /// Returns the number of appended rows.
    ///
    /// The default implementation reads all rows through
    /// [`Command::execute_reader`].
    fn fill(&mut self, table: &mut DataTable) -> Result<usize> {
        let mut cursor = self.execute_reader()?;
        table.load(&mut cursor)
    }
}

/// A forward-only result set
///
/// Column positions are zero-based. Dropping a cursor releases it.
pub trait Cursor {
    fn field_count(&self) -> usize;

    fn field_name(&self, idx: usize) -> Result<&str>;

    /// Advances to the next row. Returns `false` at the end of the result set.
    fn read(&mut self) -> Result<bool>;

    fn is_null(&self, idx: usize) -> Result<bool>;

    fn get_value(&self, idx: usize) -> Result<Value>;

    /// Returns the names of all columns.
    fn field_names(&self) -> Result<Vec<String>> {
        (0..self.field_count())
            .map(|idx| self.field_name(idx).map(str::to_string))
            .collect()
    }
}
