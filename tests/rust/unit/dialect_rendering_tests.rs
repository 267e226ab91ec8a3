use ormgraph::dialect::dialect_by_name;
use ormgraph::{sql, Expr, Query, Value};
use test_case::test_case;

use crate::fixtures::Team;

fn team_query(dialect: &str) -> Query {
    Query::from::<Team>(dialect_by_name(dialect).unwrap())
}

#[test_case("sqlite", "WHERE (\"Team\".\"Id\" = @0)" ; "sqlite")]
#[test_case("postgres", "WHERE (\"Team\".\"Id\" = $1)" ; "postgres")]
#[test_case("sqlserver", "WHERE ([Team].[Id] = @0)" ; "sqlserver")]
#[test_case("mysql", "WHERE (`Team`.`Id` = @0)" ; "mysql")]
#[test_case("oracle", "WHERE (\"Team\".\"Id\" = :0)" ; "oracle")]
fn test_filter_placeholders(dialect: &str, expected: &str) {
    let mut q = team_query(dialect);
    q.filter(Team::ID.eq(5)).unwrap();
    let compiled = q.to_select_statement();
    assert!(compiled.sql.ends_with(expected), "{}", compiled.sql);
    assert_eq!(compiled.values(), vec![Value::Int(5)]);
}

#[test_case("sqlite", "\nLIMIT 10 OFFSET 20" ; "sqlite")]
#[test_case("postgres", "\nLIMIT 10 OFFSET 20" ; "postgres")]
#[test_case("mysql", "\nLIMIT 20, 10" ; "mysql")]
#[test_case("oracle", "\nOFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY" ; "oracle")]
#[test_case("sqlserver", "\nORDER BY [Team].[Name]\nOFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY" ; "sqlserver")]
fn test_ordered_paging(dialect: &str, expected: &str) {
    let mut q = team_query(dialect);
    q.order_by(Team::NAME).unwrap();
    q.limit(10).skip(20);
    let sql = q.to_select_statement().sql;
    assert!(sql.ends_with(expected), "{sql}");
}

#[test_case("sqlite", "((\"Team\".\"Name\" || @0) = @1)" ; "sqlite")]
#[test_case("mysql", "(CONCAT(`Team`.`Name`, @0) = @1)" ; "mysql")]
#[test_case("sqlserver", "(CONCAT([Team].[Name], @0) = @1)" ; "sqlserver")]
fn test_concat_goes_through_dialect(dialect: &str, expected: &str) {
    let mut q = team_query(dialect);
    q.filter(sql::concat(vec![Team::NAME.expr(), Expr::literal("!")]).eq("Red!"))
        .unwrap();
    let sql = q.to_select_statement().sql;
    assert!(sql.ends_with(&format!("WHERE {expected}")), "{sql}");
}

#[test]
fn test_postgres_numbering_continues_through_filters() {
    let mut q = team_query("postgres");
    q.filter(Team::NAME.eq("Red"))
        .unwrap()
        .filter(Team::ID.in_list([1, 2]))
        .unwrap();
    let compiled = q.to_select_statement();
    assert!(compiled
        .sql
        .ends_with("WHERE (\"Team\".\"Name\" = $1) AND (\"Team\".\"Id\" IN ($2,$3))"));
    assert_eq!(compiled.params.len(), 3);
}

#[test]
fn test_unknown_dialect_name() {
    assert!(dialect_by_name("informix").is_none());
}
