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

use std::cell::Cell;
use std::cell::RefCell;
use std::env;

use querymapper::{Command, CommandType, Connection, Cursor, Error, Parameter, Result, Value};

#[allow(dead_code)]
fn env_var_or(env_name: &str, default: &str) -> String {
    match env::var_os(env_name) {
        Some(env_var) => env_var.into_string().unwrap(),
        None => String::from(default),
    }
}

/// Call counts recorded by [`ScriptedConnection`]
#[derive(Debug, Default)]
pub struct Counters {
    pub opens: Cell<usize>,
    pub commands_created: Cell<usize>,
    pub commands_released: Cell<usize>,
    pub executions: Cell<usize>,
    pub cursors_released: Cell<usize>,
    pub values_read: Cell<usize>,
    pub releases: RefCell<Vec<&'static str>>,
}

fn incr(cell: &Cell<usize>) {
    cell.set(cell.get() + 1);
}

/// An in-memory data source returning the same result set for every command
#[allow(dead_code)]
pub struct ScriptedConnection {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    open: Cell<bool>,
    fail_open: bool,
    fail_at_row: Option<usize>,
    pub counters: Counters,
    /// Parameters of the last executed command
    pub executed_params: RefCell<Vec<Parameter>>,
    /// Query text and kind of the last created command
    pub last_command: RefCell<Option<(String, CommandType)>>,
}

#[allow(dead_code)]
impl ScriptedConnection {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> ScriptedConnection {
        ScriptedConnection {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows,
            open: Cell::new(true),
            fail_open: false,
            fail_at_row: None,
            counters: Counters::default(),
            executed_params: RefCell::new(Vec::new()),
            last_command: RefCell::new(None),
        }
    }

    /// A result set `(ID, NAME)` with `n` rows; `NAME` is null in even rows.
    pub fn with_rows(n: usize) -> ScriptedConnection {
        let rows = (0..n)
            .map(|i| {
                let name = if i % 2 == 0 {
                    Value::Null
                } else {
                    Value::from(format!("name{}", i))
                };
                vec![Value::from(i as i64), name]
            })
            .collect();
        ScriptedConnection::new(&["ID", "NAME"], rows)
    }

    pub fn closed(self) -> ScriptedConnection {
        self.open.set(false);
        self
    }

    pub fn failing_open(mut self) -> ScriptedConnection {
        self.open.set(false);
        self.fail_open = true;
        self
    }

    /// Makes the cursor fail when it reaches the row at `idx`.
    pub fn failing_at_row(mut self, idx: usize) -> ScriptedConnection {
        self.fail_at_row = Some(idx);
        self
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }
}

impl Connection for ScriptedConnection {
    type Command<'conn> = ScriptedCommand<'conn>;

    fn is_open(&self) -> bool {
        self.open.get()
    }

    fn open(&self) -> Result<()> {
        incr(&self.counters.opens);
        if self.fail_open {
            return Err(Error::connection("connection refused"));
        }
        self.open.set(true);
        Ok(())
    }

    fn create_command(&self, sql: &str, command_type: CommandType) -> Result<ScriptedCommand<'_>> {
        if !self.is_open() {
            return Err(Error::connection("the connection is closed"));
        }
        incr(&self.counters.commands_created);
        *self.last_command.borrow_mut() = Some((sql.to_string(), command_type));
        Ok(ScriptedCommand {
            conn: self,
            params: Vec::new(),
        })
    }
}

pub struct ScriptedCommand<'conn> {
    conn: &'conn ScriptedConnection,
    params: Vec<Parameter>,
}

impl<'conn> Command for ScriptedCommand<'conn> {
    type Cursor = ScriptedCursor<'conn>;

    fn add_parameter(&mut self, param: Parameter) -> Result<()> {
        self.params.push(param);
        Ok(())
    }

    fn execute_reader(&mut self) -> Result<ScriptedCursor<'conn>> {
        incr(&self.conn.counters.executions);
        *self.conn.executed_params.borrow_mut() = self.params.clone();
        Ok(ScriptedCursor {
            conn: self.conn,
            next: 0,
            current: None,
        })
    }
}

impl Drop for ScriptedCommand<'_> {
    fn drop(&mut self) {
        incr(&self.conn.counters.commands_released);
        self.conn.counters.releases.borrow_mut().push("command");
    }
}

pub struct ScriptedCursor<'conn> {
    conn: &'conn ScriptedConnection,
    next: usize,
    current: Option<usize>,
}

impl ScriptedCursor<'_> {
    fn current_row(&self) -> Result<&Vec<Value>> {
        match self.current {
            Some(idx) => Ok(&self.conn.rows[idx]),
            None => Err(Error::invalid_operation("no current row")),
        }
    }
}

impl Cursor for ScriptedCursor<'_> {
    fn field_count(&self) -> usize {
        self.conn.columns.len()
    }

    fn field_name(&self, idx: usize) -> Result<&str> {
        self.conn
            .columns
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| Error::invalid_column_index(idx))
    }

    fn read(&mut self) -> Result<bool> {
        if self.fail_at(self.next) {
            return Err(Error::execution("injected failure"));
        }
        if self.next < self.conn.rows.len() {
            self.current = Some(self.next);
            self.next += 1;
            Ok(true)
        } else {
            self.current = None;
            Ok(false)
        }
    }

    fn is_null(&self, idx: usize) -> Result<bool> {
        Ok(self.current_row()?[idx].is_null())
    }

    fn get_value(&self, idx: usize) -> Result<Value> {
        incr(&self.conn.counters.values_read);
        Ok(self.current_row()?[idx].clone())
    }
}

impl ScriptedCursor<'_> {
    fn fail_at(&self, idx: usize) -> bool {
        self.conn.fail_at_row == Some(idx)
    }
}

impl Drop for ScriptedCursor<'_> {
    fn drop(&mut self) {
        incr(&self.conn.counters.cursors_released);
        self.conn.counters.releases.borrow_mut().push("cursor");
    }
}

#[cfg(feature = "sqlite")]
#[allow(dead_code)]
pub fn test_db() -> String {
    env_var_or("QUERYMAPPER_TEST_DB", ":memory:")
}

/// Opens the test database and creates the `emp` table.
#[cfg(feature = "sqlite")]
#[allow(dead_code)]
pub fn sqlite() -> querymapper::SqliteConnection {
    let conn = querymapper::SqliteConnection::new(test_db());
    conn.execute_batch(
        "drop table if exists emp;
         create table emp (
             empno integer primary key,
             ename text not null,
             job text,
             mgr integer,
             sal real,
             comm real,
             deptno integer
         );
         insert into emp values (7369, 'SMITH', 'CLERK', 7902, 800, null, 20);
         insert into emp values (7499, 'ALLEN', 'SALESMAN', 7698, 1600, 300, 30);
         insert into emp values (7521, 'WARD', 'SALESMAN', 7698, 1250, 500, 30);
         insert into emp values (7566, 'JONES', 'MANAGER', 7839, 2975, null, 20);
         insert into emp values (7698, 'BLAKE', 'MANAGER', 7839, 2850, null, 30);
         insert into emp values (7839, 'KING', 'PRESIDENT', null, 5000, null, 10);",
    )
    .unwrap();
    conn
}
