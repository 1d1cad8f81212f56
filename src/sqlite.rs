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

//! Data source implementation for SQLite
//!
//! Available when `sqlite` feature is enabled (default).

use std::path::Path;
use std::path::PathBuf;
use std::str;

use once_cell::unsync::OnceCell;
use ouroboros::self_referencing;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::Value as SqlValue;
use rusqlite::types::ValueRef;
use rusqlite::ToSql;
use tracing::debug;
use tracing::trace;

use crate::Command;
use crate::CommandType;
use crate::Connection;
use crate::Cursor;
use crate::Error;
use crate::Parameter;
use crate::Result;
use crate::Value;

/// A SQLite database connection
///
/// The database file is opened by [`Connection::open`], which
/// [`QueryMapper`](crate::QueryMapper) calls when the connection is closed.
///
/// Parameters are bound by their full names such as `@id`, `:id` or `$id`.
/// A parameter whose name doesn't appear in the statement is ignored, so a
/// struct with more fields than the query uses can be passed to
/// [`QueryMapper::with_params`](crate::QueryMapper::with_params). A
/// statement parameter without a value is an
/// [`ErrorKind::InvalidBindName`](crate::ErrorKind::InvalidBindName) error
/// at execution. Output parameters are not supported by SQLite and are
/// not sent.
pub struct SqliteConnection {
    path: Option<PathBuf>,
    conn: OnceCell<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Creates a closed connection to the database file.
    pub fn new<P>(path: P) -> SqliteConnection
    where
        P: AsRef<Path>,
    {
        SqliteConnection {
            path: Some(path.as_ref().to_path_buf()),
            conn: OnceCell::new(),
        }
    }

    /// Creates a closed connection to a private in-memory database.
    ///
    /// The database disappears when the connection is closed.
    pub fn in_memory() -> SqliteConnection {
        SqliteConnection {
            path: None,
            conn: OnceCell::new(),
        }
    }

    /// Returns the database path. `None` for an in-memory database.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Executes semicolon-separated SQL statements without parameters,
    /// opening the connection if it is closed.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.open()?;
        Ok(self.raw()?.execute_batch(sql)?)
    }

    /// Closes the connection. It does nothing when the connection is closed.
    ///
    /// Commands and cursors borrow the connection, so all of them must be
    /// dropped before this is called.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| Error::from(err))?;
            debug!(path = ?self.path, "sqlite connection closed");
        }
        Ok(())
    }

    fn raw(&self) -> Result<&rusqlite::Connection> {
        self.conn
            .get()
            .ok_or_else(|| Error::connection("the connection is closed"))
    }

    fn connect(&self) -> Result<rusqlite::Connection> {
        let conn = match &self.path {
            Some(path) => rusqlite::Connection::open(path),
            None => rusqlite::Connection::open_in_memory(),
        }
        .map_err(|err| {
            let target = match &self.path {
                Some(path) => path.display().to_string(),
                None => ":memory:".to_string(),
            };
            Error::connection(format!("could not open {}", target)).add_source(err)
        })?;
        debug!(path = ?self.path, "sqlite connection opened");
        Ok(conn)
    }
}

impl Connection for SqliteConnection {
    type Command<'conn> = SqliteCommand<'conn>;

    fn is_open(&self) -> bool {
        self.conn.get().is_some()
    }

    fn open(&self) -> Result<()> {
        self.conn.get_or_try_init(|| self.connect())?;
        Ok(())
    }

    fn create_command(&self, sql: &str, command_type: CommandType) -> Result<SqliteCommand<'_>> {
        if command_type == CommandType::StoredProcedure {
            return Err(Error::invalid_operation(
                "SQLite doesn't support stored procedures",
            ));
        }
        if !self.is_open() {
            return Err(Error::connection("the connection is closed"));
        }
        Ok(SqliteCommand {
            conn: self,
            sql: sql.to_string(),
            params: Vec::new(),
        })
    }
}

/// A SQL statement executed by [`SqliteConnection`]
///
/// The statement is prepared at execution.
pub struct SqliteCommand<'conn> {
    conn: &'conn SqliteConnection,
    sql: String,
    params: Vec<Parameter>,
}

impl SqliteCommand<'_> {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }
}

impl<'conn> SqliteCommand<'conn> {
    fn bind(&self, stmt: &mut rusqlite::Statement<'conn>) -> Result<()> {
        let mut bound = vec![false; stmt.parameter_count()];
        for param in &self.params {
            let idx = match stmt.parameter_index(param.name())? {
                Some(idx) => idx,
                None => {
                    trace!(name = param.name(), "parameter not used by the statement");
                    continue;
                }
            };
            if param.direction().is_input() {
                stmt.raw_bind_parameter(idx, param.value())?;
            }
            bound[idx - 1] = true;
        }
        match bound.iter().position(|bound| !bound) {
            Some(pos) => {
                let name = stmt
                    .parameter_name(pos + 1)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("?{}", pos + 1));
                Err(Error::invalid_bind_name(format!("{} (no value)", name)))
            }
            None => Ok(()),
        }
    }
}

impl<'conn> Command for SqliteCommand<'conn> {
    type Cursor = SqliteCursor<'conn>;

    fn add_parameter(&mut self, param: Parameter) -> Result<()> {
        if self.params.iter().any(|p| p.name() == param.name()) {
            return Err(Error::invalid_bind_name(param.name()));
        }
        self.params.push(param);
        Ok(())
    }

    fn execute_reader(&mut self) -> Result<SqliteCursor<'conn>> {
        let conn: &'conn SqliteConnection = self.conn;
        let mut stmt = conn.raw()?.prepare(&self.sql)?;
        self.bind(&mut stmt)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        Ok(SqliteCursor {
            columns,
            rows: StatementRows::new(stmt, |stmt| stmt.raw_query()),
            current: None,
        })
    }
}

/// A prepared statement together with the rows being stepped through it
#[self_referencing]
struct StatementRows<'conn> {
    stmt: rusqlite::Statement<'conn>,
    #[borrows(mut stmt)]
    #[not_covariant]
    rows: rusqlite::Rows<'this>,
}

/// Rows returned by [`SqliteCommand`]
///
/// Each [`Cursor::read`] steps the statement by one row, so an error in a
/// later row is returned only after the preceding rows are read.
pub struct SqliteCursor<'conn> {
    columns: Vec<String>,
    rows: StatementRows<'conn>,
    current: Option<Vec<Value>>,
}

impl SqliteCursor<'_> {
    fn value_ref(&self, idx: usize) -> Result<&Value> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| Error::invalid_state("no current row"))?;
        row.get(idx).ok_or_else(|| Error::invalid_column_index(idx))
    }
}

impl Cursor for SqliteCursor<'_> {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn field_name(&self, idx: usize) -> Result<&str> {
        self.columns
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| Error::invalid_column_index(idx))
    }

    fn read(&mut self) -> Result<bool> {
        self.current = None;
        let ncols = self.columns.len();
        let row = self.rows.with_rows_mut(|rows| -> Result<Option<Vec<Value>>> {
            match rows.next()? {
                Some(row) => {
                    let mut values = Vec::with_capacity(ncols);
                    for idx in 0..ncols {
                        values.push(value_from_sql(row.get_ref(idx)?)?);
                    }
                    Ok(Some(values))
                }
                None => Ok(None),
            }
        })?;
        self.current = row;
        Ok(self.current.is_some())
    }

    fn is_null(&self, idx: usize) -> Result<bool> {
        Ok(self.value_ref(idx)?.is_null())
    }

    fn get_value(&self, idx: usize) -> Result<Value> {
        Ok(self.value_ref(idx)?.clone())
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int64(n),
        ValueRef::Real(n) => Value::Float64(n),
        ValueRef::Text(s) => Value::String(str::from_utf8(s)?.to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int64(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::Float64(n) => ToSqlOutput::Owned(SqlValue::Real(*n)),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            #[cfg(feature = "chrono")]
            Value::Timestamp(ts) => ToSqlOutput::Owned(SqlValue::Text(
                ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn conn() -> SqliteConnection {
        let conn = SqliteConnection::in_memory();
        conn.execute_batch(
            "create table t (id integer, name text, data blob, amount real);
             insert into t values (1, 'one', x'0102', 1.5);
             insert into t values (2, null, null, null);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn open_and_close() {
        let mut conn = SqliteConnection::in_memory();
        assert!(!conn.is_open());
        assert_eq!(
            conn.create_command("select 1", CommandType::Text)
                .err()
                .map(|err| err.kind()),
            Some(ErrorKind::Connection)
        );
        conn.open().unwrap();
        assert!(conn.is_open());
        conn.close().unwrap();
        assert!(!conn.is_open());
        conn.close().unwrap();
    }

    #[test]
    fn stored_procedure_is_rejected() {
        let conn = conn();
        let err = conn
            .create_command("proc", CommandType::StoredProcedure)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn read_values() {
        let conn = conn();
        let mut cmd = conn
            .create_command("select * from t where id >= @id order by id", CommandType::Text)
            .unwrap();
        cmd.add_parameter(Parameter::new("@id", 1)).unwrap();
        let mut cursor = cmd.execute_reader().unwrap();
        assert_eq!(cursor.field_names().unwrap(), vec!["id", "name", "data", "amount"]);
        assert_eq!(
            cursor.is_null(0).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert!(cursor.read().unwrap());
        assert_eq!(cursor.get_value(0).unwrap(), Value::Int64(1));
        assert_eq!(cursor.get_value(1).unwrap(), Value::from("one"));
        assert_eq!(cursor.get_value(2).unwrap(), Value::Bytes(vec![1, 2]));
        assert_eq!(cursor.get_value(3).unwrap(), Value::Float64(1.5));
        assert_eq!(
            cursor.get_value(4).unwrap_err().kind(),
            ErrorKind::InvalidColumnIndex
        );
        assert!(cursor.read().unwrap());
        assert!(cursor.is_null(1).unwrap());
        assert!(!cursor.read().unwrap());
        assert!(!cursor.read().unwrap());
    }

    #[test]
    fn missing_parameter_value() {
        let conn = conn();
        let mut cmd = conn
            .create_command("select * from t where id = @id", CommandType::Text)
            .unwrap();
        cmd.add_parameter(Parameter::new("@key", 1)).unwrap();
        assert_eq!(
            cmd.execute_reader().err().map(|err| err.kind()),
            Some(ErrorKind::InvalidBindName)
        );
        assert_eq!(
            cmd.add_parameter(Parameter::new("@key", 2)).unwrap_err().kind(),
            ErrorKind::InvalidBindName
        );
    }

    #[test]
    fn unused_parameter_is_ignored() {
        let conn = conn();
        let mut cmd = conn
            .create_command("select name from t where id = @id", CommandType::Text)
            .unwrap();
        cmd.add_parameter(Parameter::new("@id", 1)).unwrap();
        cmd.add_parameter(Parameter::new("@unused", "x")).unwrap();
        let mut cursor = cmd.execute_reader().unwrap();
        assert!(cursor.read().unwrap());
        assert_eq!(cursor.get_value(0).unwrap(), Value::from("one"));
        assert!(!cursor.read().unwrap());
    }

    #[test]
    fn rows_before_a_failing_row_are_read() {
        let conn = SqliteConnection::in_memory();
        conn.execute_batch(
            "create table n (x integer);
             insert into n values (1);
             insert into n values (-2);
             insert into n values (-9223372036854775807 - 1);",
        )
        .unwrap();
        let mut cmd = conn
            .create_command("select abs(x) from n order by rowid", CommandType::Text)
            .unwrap();
        let mut cursor = cmd.execute_reader().unwrap();
        assert!(cursor.read().unwrap());
        assert_eq!(cursor.get_value(0).unwrap(), Value::Int64(1));
        assert!(cursor.read().unwrap());
        assert_eq!(cursor.get_value(0).unwrap(), Value::Int64(2));
        let err = cursor.read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(
            cursor.get_value(0).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn rows_are_stepped_one_by_one() {
        let conn = conn();
        let mut cmd = conn
            .create_command(
                "with recursive c(x) as (select 1 union all select x + 1 from c) select x from c",
                CommandType::Text,
            )
            .unwrap();
        let mut cursor = cmd.execute_reader().unwrap();
        for n in 1..=3 {
            assert!(cursor.read().unwrap());
            assert_eq!(cursor.get_value(0).unwrap(), Value::Int64(n));
        }
    }

    #[test]
    fn sql_error_is_execution_error() {
        let conn = conn();
        let mut cmd = conn
            .create_command("select * from no_such_table", CommandType::Text)
            .unwrap();
        let err = cmd.execute_reader().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(std::error::Error::source(&err).is_some());
    }
}
