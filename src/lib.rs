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

/*!
This crate executes a query through a data source and maps the result set
to loosely-typed rows or to your structs.

The data source is anything implementing the [`Connection`], [`Command`]
and [`Cursor`] traits. An implementation for SQLite is included as
[`SqliteConnection`].

## Usage

Put this in your `Cargo.toml`:

```text
[dependencies]
querymapper = "0.1"
```

## Optional Features

| Feature | Description |
| --- | --- |
| `sqlite` | Enabled by default. [`SqliteConnection`] based on [rusqlite](https://docs.rs/rusqlite) with bundled SQLite. |
| `chrono` | [`Value::Timestamp`] and conversions from/to [chrono](https://docs.rs/chrono) types. |

## Examples

Loosely-typed rows:

```
# use querymapper::*;
# fn main() -> Result<()> {
let conn = SqliteConnection::in_memory();
conn.execute_batch(
    "create table emp (empno integer, ename text, sal real);
     insert into emp values (7369, 'SMITH', 800);
     insert into emp values (7499, 'ALLEN', null);",
)?;

let mut mapper = QueryMapper::new(&conn, "select * from emp order by empno")?;
for row in mapper.take_all() {
    let row = row?;
    let empno: i32 = row.get("empno")?;
    let sal: Option<f64> = row.get("SAL")?;
    println!("{} {:?}", empno, sal);
}
# Ok(())
# }
```

Structs with named parameters:

```
# use querymapper::*;
# fn main() -> Result<()> {
# let conn = SqliteConnection::in_memory();
# conn.execute_batch(
#     "create table emp (empno integer, ename text, deptno integer);
#      insert into emp values (7369, 'SMITH', 20);
#      insert into emp values (7499, 'ALLEN', 30);",
# )?;
#[derive(Debug, Default, FromRow)]
struct Emp {
    #[from_row(rename = "EMPNO")]
    id: i32,
    ename: String,
}

#[derive(ToParams)]
struct Filter {
    deptno: i32,
}

let emps = QueryMapper::new(&conn, "select * from emp where deptno = @deptno")?
    .with_params(&Filter { deptno: 30 })?
    .take_all_as::<Emp>()
    .collect::<Result<Vec<_>>>()?;
assert_eq!(emps.len(), 1);
assert_eq!(emps[0].id, 7499);
# Ok(())
# }
```

The whole result set as a table:

```
# use querymapper::*;
# fn main() -> Result<()> {
# let conn = SqliteConnection::in_memory();
# conn.execute_batch("create table t (a integer); insert into t values (1);")?;
let mapper = QueryMapper::new(&conn, "select a, a * 2 as b from t")?;
let table = mapper.fill_table(None)?;
assert_eq!(table.columns(), &["a", "b"]);
assert_eq!(table.get::<_, i64>(0, "B")?, 2);
# Ok(())
# }
```

## Logging

Events are emitted through [tracing](https://docs.rs/tracing). Query
execution, table fills and connection opening are logged at the debug
level. Parameter binding, column binding and releasing cursors and
commands are logged at the trace level. No subscriber is installed by
this crate.
*/

// Code generated by the derive macros refers to `::querymapper`.
extern crate self as querymapper;

use std::result;

mod binding;
mod connection;
mod error;
mod mapper;
mod parameter;
#[cfg(doctest)]
mod procmacro;
mod row;
#[cfg(feature = "sqlite")]
mod sqlite;
mod table;
mod util;
mod value;

pub use crate::binding::FromRow;
pub use crate::binding::Indexer;
pub use crate::binding::MappedRows;
pub use crate::connection::Command;
pub use crate::connection::CommandType;
pub use crate::connection::Connection;
pub use crate::connection::Cursor;
pub use crate::error::Error;
pub use crate::error::ErrorKind;
pub use crate::mapper::QueryMapper;
pub use crate::mapper::QueryMapperBuilder;
pub use crate::parameter::Direction;
pub use crate::parameter::Parameter;
pub use crate::parameter::ToParams;
pub use crate::row::ColumnIndex;
pub use crate::row::Row;
pub use crate::row::Rows;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteCommand;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteConnection;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteCursor;
pub use crate::table::DataTable;
pub use crate::value::FromValue;
pub use crate::value::Value;
pub use crate::value::ValueType;

/// Derive macros sharing names with the traits they implement
pub use querymapper_procmacro::FromRow;
pub use querymapper_procmacro::ToParams;

pub type Result<T> = result::Result<T, Error>;

trait AssertSend: Send {}
trait AssertSync: Sync {}
