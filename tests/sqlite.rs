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

#![cfg(feature = "sqlite")]

mod common;

use std::collections::HashMap;

use querymapper::*;

#[derive(Debug, Default, PartialEq, FromRow)]
struct Emp {
    empno: i32,
    ename: String,
    job: Option<String>,
    mgr: Option<i32>,
    sal: f64,
    comm: Option<f64>,
    #[from_row(rename = "DEPTNO")]
    dept: i32,
}

#[test]
fn take_all_as_struct() {
    let conn = common::sqlite();
    let mut mapper = QueryMapper::new(
        &conn,
        "select * from emp where deptno = @deptno order by empno",
    )
    .unwrap();
    mapper.with_params(&[("deptno", 20)]).unwrap();
    let emps = mapper
        .take_all_as::<Emp>()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(
        emps,
        vec![
            Emp {
                empno: 7369,
                ename: "SMITH".into(),
                job: Some("CLERK".into()),
                mgr: Some(7902),
                sal: 800.0,
                comm: None,
                dept: 20,
            },
            Emp {
                empno: 7566,
                ename: "JONES".into(),
                job: Some("MANAGER".into()),
                mgr: Some(7839),
                sal: 2975.0,
                comm: None,
                dept: 20,
            },
        ]
    );
}

#[test]
fn loose_rows_with_aliases() {
    let conn = common::sqlite();
    let mut mapper = QueryMapper::new(
        &conn,
        "select ename as Name, comm as \"Commission\" from emp \
         where empno in (7369, 7499) order by empno",
    )
    .unwrap();
    let rows = mapper.take_all().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].column_names(), &["Name", "Commission"]);
    assert_eq!(rows[0].get_value("commission").unwrap(), &Value::Null);
    assert_eq!(rows[1].get::<_, f64>("COMMISSION").unwrap(), 300.0);
    assert_eq!(
        rows[1].clone().into_pairs(),
        vec![
            ("Name".to_string(), Value::from("ALLEN")),
            ("Commission".to_string(), Value::Float64(300.0)),
        ]
    );
}

#[test]
fn numeric_aliases_go_to_indexer() {
    #[derive(Debug, Default, FromRow)]
    struct Pivot {
        ename: String,
        #[from_row(indexer)]
        sal_by_dept: HashMap<usize, f64>,
    }

    let conn = common::sqlite();
    let mut mapper = QueryMapper::new(
        &conn,
        "select ename, sal as \"10\", null as \"20\" from emp where empno = 7839",
    )
    .unwrap();
    let pivot = mapper.take_as::<Pivot>(1).next().unwrap().unwrap();
    assert_eq!(pivot.ename, "KING");
    assert_eq!(pivot.sal_by_dept.len(), 1);
    assert_eq!(pivot.sal_by_dept[&10], 5000.0);
}

#[test]
fn skip_and_take() {
    let conn = common::sqlite();
    let mut mapper = QueryMapper::new(&conn, "select empno from emp order by empno").unwrap();
    let empnos = mapper
        .skip(4)
        .unwrap()
        .take_all()
        .map(|row| row.and_then(|row| row.get::<_, i32>(0)))
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(empnos, vec![7698, 7839]);

    let mut mapper = QueryMapper::new(&conn, "select empno from emp").unwrap();
    assert_eq!(mapper.skip(100).unwrap().take_all().count(), 0);
}

#[test]
fn parameters_with_custom_prefix() {
    let conn = common::sqlite();
    let sql = "select ename from emp where job = :job and sal > :sal order by ename";
    let mut mapper = QueryMapper::builder(&conn, sql)
        .param_prefix(":")
        .build()
        .unwrap();
    let mut params = HashMap::new();
    params.insert("job", Value::from("SALESMAN"));
    params.insert("sal", Value::Float64(1300.0));
    mapper.with_params(&params).unwrap();
    let names = mapper
        .take_all()
        .map(|row| row.and_then(|row| row.get::<_, String>("ename")))
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(names, vec!["ALLEN"]);
}

#[test]
fn output_parameters_are_not_sent() {
    let conn = common::sqlite();
    let sql = "select count(*) as cnt from emp where deptno = @deptno";
    let mut mapper = QueryMapper::new(&conn, sql).unwrap();
    mapper
        .with_parameter("@deptno", 30, Direction::Input, ValueType::Int64, None)
        .unwrap()
        .with_parameter("@ret", None::<i64>, Direction::ReturnValue, ValueType::Int64, None)
        .unwrap();
    let row = mapper.take(1).next().unwrap().unwrap();
    assert_eq!(row.get::<_, i64>("CNT").unwrap(), 3);
}

#[test]
fn missing_parameter_fails_at_execution() {
    let conn = common::sqlite();
    let mut mapper = QueryMapper::new(&conn, "select * from emp where empno = @empno").unwrap();
    mapper.with_params(&[("id", 1)]).unwrap();
    let err = mapper.take_all().next().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBindName);
}

#[test]
fn struct_fields_not_in_query_are_ignored() {
    #[derive(ToParams)]
    struct Filter {
        deptno: i32,
        job: String,
    }

    let conn = common::sqlite();
    let sql = "select ename from emp where deptno = @deptno order by empno";
    let mut mapper = QueryMapper::new(&conn, sql).unwrap();
    mapper
        .with_params(&Filter {
            deptno: 10,
            job: "PRESIDENT".into(),
        })
        .unwrap();
    let row = mapper.take(1).next().unwrap().unwrap();
    assert_eq!(row.get::<_, String>(0).unwrap(), "KING");
}

#[test]
fn rejected_parameters_are_not_attached() {
    let conn = common::sqlite();
    let sql = "select count(*) from emp where deptno = @a or deptno = @b";
    let mut mapper = QueryMapper::new(&conn, sql).unwrap();
    mapper.with_param(Parameter::new("@b", 10)).unwrap();
    let err = mapper.with_params(&[("a", 20), ("b", 30)]).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidBindName);
    let names: Vec<_> = mapper.params().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["@b"]);

    mapper.with_params(&[("a", 20)]).unwrap();
    let row = mapper.take(1).next().unwrap().unwrap();
    assert_eq!(row.get::<_, i64>(0).unwrap(), 3);
}

#[test]
fn rows_before_a_failing_row_are_returned() {
    let conn = common::sqlite();
    conn.execute_batch(
        "drop table if exists n;
         create table n (x integer);
         insert into n values (1);
         insert into n values (2);
         insert into n values (-9223372036854775807 - 1);",
    )
    .unwrap();
    let mut mapper = QueryMapper::new(&conn, "select abs(x) as x from n order by rowid").unwrap();
    let mut rows = mapper.take_all();
    assert_eq!(rows.next().unwrap().unwrap().get::<_, i64>("x").unwrap(), 1);
    assert_eq!(rows.next().unwrap().unwrap().get::<_, i64>("x").unwrap(), 2);
    let err = rows.next().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(rows.next().is_none());
}

#[test]
fn take_reads_only_requested_rows() {
    let conn = common::sqlite();
    let sql = "with recursive c(x) as (select 1 union all select x + 1 from c) select x from c";
    let mut mapper = QueryMapper::new(&conn, sql).unwrap();
    let xs = mapper
        .skip(2)
        .unwrap()
        .take(2)
        .map(|row| row.and_then(|row| row.get::<_, i64>(0)))
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(xs, vec![3, 4]);
}

#[test]
fn fill_table_twice() {
    let conn = common::sqlite();
    let sql = "select empno, ename from emp where deptno = @deptno";
    let mut mapper = QueryMapper::new(&conn, sql).unwrap();
    mapper.with_params(&[("deptno", 30)]).unwrap();
    let table = mapper.fill_table(None).unwrap();
    assert_eq!(table.columns(), &["empno", "ename"]);
    assert_eq!(table.row_count(), 3);

    let table = mapper.fill_table(Some(table)).unwrap();
    assert_eq!(table.row_count(), 6);
    assert_eq!(table.column_count(), 2);
}

#[test]
fn stored_procedure_is_not_supported() {
    let conn = common::sqlite();
    let err = QueryMapper::with_command_type(&conn, "get_emps", CommandType::StoredProcedure)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn syntax_error_is_execution_error() {
    let conn = common::sqlite();
    let mut mapper = QueryMapper::new(&conn, "select from where").unwrap();
    let err = mapper.column_names().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[test]
fn connection_is_left_open() {
    let mut conn = SqliteConnection::in_memory();
    assert!(!conn.is_open());
    {
        let mut mapper = QueryMapper::new(&conn, "select 1 as one").unwrap();
        assert_eq!(mapper.take_all().count(), 1);
    }
    assert!(conn.is_open());
    conn.close().unwrap();
    assert!(!conn.is_open());
}
