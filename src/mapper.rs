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

use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::debug;
use tracing::trace;

use crate::binding::Binding;
use crate::Command;
use crate::CommandType;
use crate::Connection;
use crate::Cursor;
use crate::DataTable;
use crate::Direction;
use crate::Error;
use crate::FromRow;
use crate::MappedRows;
use crate::Parameter;
use crate::Result;
use crate::Row;
use crate::Rows;
use crate::ToParams;
use crate::Value;
use crate::ValueType;

type CursorOf<'conn, C> = <<C as Connection>::Command<'conn> as Command>::Cursor;

const DEFAULT_PARAM_PREFIX: &str = "@";

/// A builder to create a [`QueryMapper`] with various configuration
pub struct QueryMapperBuilder<'conn, 'sql, C>
where
    C: Connection + 'conn,
{
    conn: &'conn C,
    sql: &'sql str,
    command_type: CommandType,
    param_prefix: String,
    param_suffix: String,
}

impl<'conn, 'sql, C> QueryMapperBuilder<'conn, 'sql, C>
where
    C: Connection + 'conn,
{
    fn new(conn: &'conn C, sql: &'sql str) -> QueryMapperBuilder<'conn, 'sql, C> {
        QueryMapperBuilder {
            conn,
            sql,
            command_type: CommandType::Text,
            param_prefix: DEFAULT_PARAM_PREFIX.into(),
            param_suffix: String::new(),
        }
    }

    /// Sets the kind of the query text. The default is [`CommandType::Text`].
    pub fn command_type(
        &mut self,
        command_type: CommandType,
    ) -> &mut QueryMapperBuilder<'conn, 'sql, C> {
        self.command_type = command_type;
        self
    }

    /// Sets the prefix added to names by [`QueryMapper::with_params`].
    /// The default is `@`.
    pub fn param_prefix<S>(&mut self, prefix: S) -> &mut QueryMapperBuilder<'conn, 'sql, C>
    where
        S: Into<String>,
    {
        self.param_prefix = prefix.into();
        self
    }

    /// Sets the suffix added to names by [`QueryMapper::with_params`].
    /// The default is empty.
    pub fn param_suffix<S>(&mut self, suffix: S) -> &mut QueryMapperBuilder<'conn, 'sql, C>
    where
        S: Into<String>,
    {
        self.param_suffix = suffix.into();
        self
    }

    /// Opens the connection if it is closed and creates a command.
    pub fn build(&self) -> Result<QueryMapper<'conn, C>> {
        let conn = self.conn;
        if !conn.is_open() {
            conn.open()?;
            debug!("connection opened");
        }
        let command = conn.create_command(self.sql, self.command_type)?;
        Ok(QueryMapper {
            conn,
            sql: self.sql.to_string(),
            command_type: self.command_type,
            param_prefix: self.param_prefix.clone(),
            param_suffix: self.param_suffix.clone(),
            params: Vec::new(),
            attached: 0,
            column_names: OnceCell::new(),
            bindings: HashMap::new(),
            cursor: None,
            command,
        })
    }
}

/// Executes a query and maps its result set
///
/// A mapper borrows a connection, owns one command and, after execution,
/// one forward-only cursor. The query is executed lazily by the first
/// [`skip`](QueryMapper::skip), [`column_names`](QueryMapper::column_names)
/// or fetch of the iterators returned by `take*` methods. Parameters can
/// be bound only before that.
///
/// Rows are read as loosely-typed [`Row`]s by [`take`](QueryMapper::take)
/// and [`take_all`](QueryMapper::take_all), or as structs implementing
/// [`FromRow`] by [`take_as`](QueryMapper::take_as) and
/// [`take_all_as`](QueryMapper::take_all_as). All iterators share the
/// cursor, so a second iterator continues where the previous one stopped.
///
/// Bound parameters are kept by the mapper and attached to the command
/// just before execution.
///
/// Dropping a mapper releases the cursor and then the command. The
/// connection is left open.
///
/// ```
/// # use querymapper::*;
/// # fn main() -> Result<()> {
/// let conn = SqliteConnection::in_memory();
/// # conn.execute_batch("create table emp (empno integer, ename text, comm real);
/// #     insert into emp values (7369, 'SMITH', null);
/// #     insert into emp values (7499, 'ALLEN', 300.0);
/// #     insert into emp values (7521, 'WARD', 500.0);")?;
///
/// #[derive(Debug, Default, FromRow)]
/// struct Emp {
///     empno: i32,
///     ename: String,
///     comm: Option<f64>,
/// }
///
/// let sql = "select * from emp where empno >= @empno order by empno";
/// let mut mapper = QueryMapper::new(&conn, sql)?;
/// mapper.with_params(&[("empno", 7000)])?;
///
/// // The first row as a loosely-typed row
/// let row = mapper.take(1).next().unwrap()?;
/// assert_eq!(row.get::<_, String>("ENAME")?, "SMITH");
/// assert_eq!(row.get_value("comm")?, &Value::Null);
///
/// // Remaining rows as structs
/// let emps = mapper.take_all_as::<Emp>().collect::<Result<Vec<_>>>()?;
/// assert_eq!(emps.len(), 2);
/// assert_eq!(emps[1].ename, "WARD");
/// # Ok(())
/// # }
/// ```
pub struct QueryMapper<'conn, C>
where
    C: Connection + 'conn,
{
    conn: &'conn C,
    sql: String,
    command_type: CommandType,
    param_prefix: String,
    param_suffix: String,
    params: Vec<Parameter>,
    // Number of leading `params` already attached to the command
    attached: usize,
    column_names: OnceCell<Rc<[String]>>,
    bindings: HashMap<TypeId, Rc<Binding>>,
    // The cursor must be dropped before the command.
    cursor: Option<CursorOf<'conn, C>>,
    command: C::Command<'conn>,
}

impl<'conn, C> QueryMapper<'conn, C>
where
    C: Connection + 'conn,
{
    /// Creates a mapper for a SQL statement.
    pub fn new(conn: &'conn C, sql: &str) -> Result<QueryMapper<'conn, C>> {
        QueryMapper::builder(conn, sql).build()
    }

    /// Creates a mapper for a query of the specified kind.
    pub fn with_command_type(
        conn: &'conn C,
        sql: &str,
        command_type: CommandType,
    ) -> Result<QueryMapper<'conn, C>> {
        QueryMapper::builder(conn, sql)
            .command_type(command_type)
            .build()
    }

    pub fn builder<'sql>(conn: &'conn C, sql: &'sql str) -> QueryMapperBuilder<'conn, 'sql, C> {
        QueryMapperBuilder::new(conn, sql)
    }

    /// Binds parameters with the prefix and suffix configured by the builder.
    /// The defaults are `@` and empty.
    ///
    /// This fails with [`ErrorKind::InvalidState`](crate::ErrorKind::InvalidState)
    /// after the query is executed and with
    /// [`ErrorKind::InvalidBindName`](crate::ErrorKind::InvalidBindName) when a
    /// name is already bound. No parameter is added on failure.
    pub fn with_params<P>(&mut self, params: &P) -> Result<&mut QueryMapper<'conn, C>>
    where
        P: ToParams + ?Sized,
    {
        let prefix = self.param_prefix.clone();
        let suffix = self.param_suffix.clone();
        self.with_params_affixed(params, &prefix, &suffix)
    }

    /// Binds parameters named `prefix + name + suffix`.
    pub fn with_params_affixed<P>(
        &mut self,
        params: &P,
        prefix: &str,
        suffix: &str,
    ) -> Result<&mut QueryMapper<'conn, C>>
    where
        P: ToParams + ?Sized,
    {
        self.check_unexecuted()?;
        let params: Vec<Parameter> = params
            .to_params()
            .into_iter()
            .map(|(name, value)| Parameter::new(format!("{}{}{}", prefix, name, suffix), value))
            .collect();
        for (idx, param) in params.iter().enumerate() {
            if params[..idx].iter().any(|p| p.name() == param.name()) {
                return Err(Error::invalid_bind_name(param.name()));
            }
            self.check_unbound(param)?;
        }
        for param in params {
            self.add_param(param);
        }
        Ok(self)
    }

    /// Binds one parameter with full control of its attributes.
    pub fn with_parameter<N, V>(
        &mut self,
        name: N,
        value: V,
        direction: Direction,
        value_type: ValueType,
        size: Option<usize>,
    ) -> Result<&mut QueryMapper<'conn, C>>
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let mut param = Parameter::new(name, value)
            .with_direction(direction)
            .with_value_type(value_type);
        if let Some(size) = size {
            param = param.with_size(size);
        }
        self.with_param(param)
    }

    /// Binds one parameter.
    pub fn with_param(&mut self, param: Parameter) -> Result<&mut QueryMapper<'conn, C>> {
        self.check_unexecuted()?;
        self.check_unbound(&param)?;
        self.add_param(param);
        Ok(self)
    }

    /// Advances the cursor by `n` rows, executing the query if it was not.
    /// It stops silently at the end of the result set.
    pub fn skip(&mut self, n: usize) -> Result<&mut QueryMapper<'conn, C>> {
        let cursor = self.cursor()?;
        for _ in 0..n {
            if !cursor.read()? {
                break;
            }
        }
        Ok(self)
    }

    /// Returns an iterator over at most `n` loosely-typed rows.
    pub fn take(&mut self, n: usize) -> Rows<'_, 'conn, C> {
        Rows::new(self, n)
    }

    /// Returns an iterator over all remaining loosely-typed rows.
    pub fn take_all(&mut self) -> Rows<'_, 'conn, C> {
        Rows::new(self, usize::MAX)
    }

    /// Returns an iterator over at most `n` rows mapped to `T`.
    ///
    /// See [`FromRow`] how columns are bound to fields.
    pub fn take_as<T>(&mut self, n: usize) -> MappedRows<'_, 'conn, C, T>
    where
        T: FromRow + 'static,
    {
        MappedRows::new(self, n)
    }

    /// Returns an iterator over all remaining rows mapped to `T`.
    pub fn take_all_as<T>(&mut self) -> MappedRows<'_, 'conn, C, T>
    where
        T: FromRow + 'static,
    {
        MappedRows::new(self, usize::MAX)
    }

    /// Executes the query once more by a new command and appends the whole
    /// result set to `table`, or to a new table when it is `None`.
    ///
    /// The new command gets the same query text, kind and parameters. The
    /// cursor of this mapper is not touched. See [`DataTable`] how columns
    /// are merged.
    pub fn fill_table(&self, table: Option<DataTable>) -> Result<DataTable> {
        let mut table = table.unwrap_or_default();
        let mut command = self.conn.create_command(&self.sql, self.command_type)?;
        for param in &self.params {
            command.add_parameter(param.clone())?;
        }
        debug!(
            sql = %self.sql,
            command_type = %self.command_type,
            params = self.params.len(),
            "filling table"
        );
        let rows = command.fill(&mut table)?;
        debug!(rows, columns = table.column_count(), "table filled");
        Ok(table)
    }

    /// Releases the cursor and the command. Same as dropping the mapper.
    pub fn close(self) {}

    pub fn connection(&self) -> &'conn C {
        self.conn
    }

    pub fn command(&self) -> &C::Command<'conn> {
        &self.command
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// Returns bound parameters in the order of binding.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns `true` after the query is executed.
    pub fn is_executed(&self) -> bool {
        self.cursor.is_some()
    }

    /// Returns the column names of the result set, executing the query if
    /// it was not.
    pub fn column_names(&mut self) -> Result<&[String]> {
        Ok(&self.shared_column_names()?[..])
    }

    pub(crate) fn read_row(&mut self) -> Result<Option<Row>> {
        let column_names = self.shared_column_names()?.clone();
        let cursor = self.cursor()?;
        if !cursor.read()? {
            return Ok(None);
        }
        let mut values = Vec::with_capacity(column_names.len());
        for idx in 0..column_names.len() {
            values.push(value_at(&*cursor, idx)?);
        }
        Ok(Some(Row::new(column_names, values)))
    }

    /// Returns the column binding of `T`, resolving it at the first call
    /// for each type.
    pub(crate) fn binding<T>(&mut self) -> Result<Rc<Binding>>
    where
        T: FromRow + 'static,
    {
        let type_id = TypeId::of::<T>();
        if let Some(binding) = self.bindings.get(&type_id) {
            return Ok(binding.clone());
        }
        let binding = Rc::new(Binding::new::<T>(self.column_names()?)?);
        self.bindings.insert(type_id, binding.clone());
        Ok(binding)
    }

    pub(crate) fn read_mapped<T>(&mut self, binding: &Binding) -> Result<Option<T>>
    where
        T: FromRow,
    {
        let cursor = self.cursor()?;
        if !cursor.read()? {
            return Ok(None);
        }
        let mut obj = T::default();
        binding.apply(&mut obj, |idx| value_at(&*cursor, idx))?;
        Ok(Some(obj))
    }

    fn check_unexecuted(&self) -> Result<()> {
        if self.cursor.is_some() {
            Err(Error::invalid_state(
                "parameters cannot be bound after the query is executed",
            ))
        } else {
            Ok(())
        }
    }

    fn check_unbound(&self, param: &Parameter) -> Result<()> {
        if self.params.iter().any(|p| p.name() == param.name()) {
            Err(Error::invalid_bind_name(param.name()))
        } else {
            Ok(())
        }
    }

    fn add_param(&mut self, param: Parameter) {
        trace!(
            name = param.name(),
            direction = %param.direction(),
            value_type = %param.value_type(),
            "binding parameter"
        );
        self.params.push(param);
    }

    fn cursor(&mut self) -> Result<&mut CursorOf<'conn, C>> {
        if self.cursor.is_none() {
            debug!(
                sql = %self.sql,
                command_type = %self.command_type,
                params = self.params.len(),
                "executing query"
            );
            while let Some(param) = self.params.get(self.attached) {
                self.command.add_parameter(param.clone())?;
                self.attached += 1;
            }
            let cursor = self.command.execute_reader()?;
            self.cursor = Some(cursor);
        }
        self.cursor
            .as_mut()
            .ok_or_else(|| Error::internal_error("no cursor after execution"))
    }

    fn shared_column_names(&mut self) -> Result<&Rc<[String]>> {
        self.cursor()?;
        let cursor = &self.cursor;
        self.column_names.get_or_try_init(|| match cursor {
            Some(cursor) => Ok(Rc::from(cursor.field_names()?)),
            None => Err(Error::internal_error("no cursor after execution")),
        })
    }
}

impl<'conn, C> Drop for QueryMapper<'conn, C>
where
    C: Connection + 'conn,
{
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            drop(cursor);
            trace!(sql = %self.sql, "cursor released");
        }
        trace!(sql = %self.sql, "releasing command");
    }
}

fn value_at<R>(cursor: &R, idx: usize) -> Result<Value>
where
    R: Cursor + ?Sized,
{
    if cursor.is_null(idx)? {
        Ok(Value::Null)
    } else {
        cursor.get_value(idx)
    }
}
